use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::notify::NotificationItem;

pub type UnlockedMap = BTreeMap<String, bool>;
pub type DiscoveredSet = BTreeSet<String>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Main,
    #[default]
    Sub,
    Start,
}

impl NodeType {
    pub fn is_major(self) -> bool {
        matches!(self, Self::Main | Self::Start)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_link: Option<String>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub user_notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
}

impl Node {
    pub fn references(&self) -> Vec<&str> {
        let mut references: Vec<&str> = Vec::with_capacity(self.prerequisites.len() + 1);
        let candidates = self
            .parent_id
            .as_deref()
            .into_iter()
            .chain(self.prerequisites.iter().map(String::as_str));
        for reference in candidates {
            let reference = reference.trim();
            if reference.is_empty() || references.contains(&reference) {
                continue;
            }
            references.push(reference);
        }
        references
    }

    pub fn all_exercises_complete(&self) -> bool {
        !self.exercises.is_empty() && self.exercises.iter().all(|exercise| exercise.completed)
    }

    pub fn has_incomplete_optional(&self) -> bool {
        self.exercises
            .iter()
            .any(|exercise| exercise.optional && !exercise.completed)
    }

    pub fn exercise(&self, exercise_id: &str) -> Option<&Exercise> {
        self.exercises
            .iter()
            .find(|exercise| exercise.id == exercise_id)
    }
}

fn default_points() -> u32 {
    10
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey {
    pub source: String,
    pub target: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn key(&self) -> LinkKey {
        LinkKey {
            source: self.source.clone(),
            target: self.target.clone(),
        }
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ctf {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub completed: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earned_at: Option<String>,
    #[serde(default)]
    pub shown: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    #[serde(default)]
    pub streak: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub unlocked: UnlockedMap,
    #[serde(default)]
    pub discovered: Vec<String>,
    #[serde(default)]
    pub streak: Streak,
    #[serde(default)]
    pub ctfs: Vec<Ctf>,
    #[serde(default)]
    pub badges: Vec<Badge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abilities: Option<BTreeMap<String, u32>>,
    #[serde(default)]
    pub notifications: Vec<NotificationItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_graph: Option<String>,
}

impl Snapshot {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn find_exercise(&self, exercise_id: &str) -> Option<(&Node, &Exercise)> {
        self.nodes.iter().find_map(|node| {
            node.exercise(exercise_id)
                .map(|exercise| (node, exercise))
        })
    }

    pub fn ctf(&self, ctf_id: &str) -> Option<&Ctf> {
        self.ctfs.iter().find(|ctf| ctf.id == ctf_id)
    }

    pub fn pending_notifications(&self) -> Vec<NotificationItem> {
        let mut items = self
            .badges
            .iter()
            .filter(|badge| !badge.shown)
            .map(NotificationItem::from)
            .collect::<Vec<_>>();
        items.extend(self.notifications.iter().cloned());
        items
    }
}
