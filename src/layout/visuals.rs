use std::collections::HashMap;

use crate::roadmap::{
    DiscoveredSet, LinkKey, Node, NodeType, UnlockedMap, is_unlocked, percent_label,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Glyph {
    Undiscovered,
    Start,
    Main,
    Sub,
    SubDone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeClass {
    pub glyph: Glyph,
    pub locked: bool,
}

impl NodeClass {
    pub fn resolve(
        node: &Node,
        unlocked: &UnlockedMap,
        discovered: &DiscoveredSet,
        start_id: &str,
    ) -> Self {
        let glyph = if !discovered.contains(&node.id) {
            Glyph::Undiscovered
        } else if node.id == start_id {
            Glyph::Start
        } else {
            match node.kind {
                NodeType::Main => Glyph::Main,
                NodeType::Start => Glyph::Start,
                NodeType::Sub if node.all_exercises_complete() => Glyph::SubDone,
                NodeType::Sub => Glyph::Sub,
            }
        };

        Self {
            glyph,
            locked: !is_unlocked(unlocked, &node.id, start_id),
        }
    }

    pub fn names(self) -> Vec<&'static str> {
        let mut names = vec!["node"];
        names.extend(match self.glyph {
            Glyph::Undiscovered => &["undiscovered"][..],
            Glyph::Start => &["start"][..],
            Glyph::Main => &["main"][..],
            Glyph::Sub => &["sub"][..],
            Glyph::SubDone => &["sub", "done"][..],
        });
        if self.locked {
            names.push("locked");
        }
        names
    }

    pub fn is_major(self) -> bool {
        matches!(self.glyph, Glyph::Start | Glyph::Main)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeVisual {
    pub class: NodeClass,
    pub label: String,
    pub percent: Option<String>,
}

impl NodeVisual {
    pub fn resolve(
        node: &Node,
        unlocked: &UnlockedMap,
        discovered: &DiscoveredSet,
        start_id: &str,
    ) -> Self {
        let label = if discovered.contains(&node.id) {
            node.title.clone()
        } else {
            String::new()
        };
        Self {
            class: NodeClass::resolve(node, unlocked, discovered, start_id),
            label,
            percent: percent_label(node, discovered),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkStyle {
    Solid,
    Dashed,
}

impl LinkStyle {
    pub fn resolve(key: &LinkKey, unlocked: &UnlockedMap, start_id: &str) -> Self {
        if is_unlocked(unlocked, &key.source, start_id)
            && is_unlocked(unlocked, &key.target, start_id)
        {
            Self::Solid
        } else {
            Self::Dashed
        }
    }
}

#[derive(Debug, Default)]
pub struct VisualBindings {
    nodes: HashMap<String, NodeVisual>,
    links: HashMap<LinkKey, LinkStyle>,
}

impl VisualBindings {
    pub fn bind_node(&mut self, id: &str, visual: NodeVisual) -> bool {
        match self.nodes.get_mut(id) {
            Some(existing) => {
                *existing = visual;
                false
            }
            None => {
                self.nodes.insert(id.to_owned(), visual);
                true
            }
        }
    }

    pub fn bind_links<'a>(
        &mut self,
        keys: impl IntoIterator<Item = &'a LinkKey>,
        unlocked: &UnlockedMap,
        start_id: &str,
    ) {
        self.links = keys
            .into_iter()
            .map(|key| (key.clone(), LinkStyle::resolve(key, unlocked, start_id)))
            .collect();
    }

    pub fn node(&self, id: &str) -> Option<&NodeVisual> {
        self.nodes.get(id)
    }

    pub fn link(&self, key: &LinkKey) -> Option<LinkStyle> {
        self.links.get(key).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}
