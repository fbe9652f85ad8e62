mod forces;
mod quadtree;
mod simulation;
mod visuals;

use std::collections::HashMap;

use eframe::egui::Vec2;
use tracing::{debug, warn};

use crate::config::ForceConfig;
use crate::roadmap::{DiscoveredSet, Link, Node, UnlockedMap};

pub use simulation::{ALPHA_MIN, Body, SimLink, SimNode, Simulation, merge_preserving_physics};
pub use visuals::{Glyph, LinkStyle, NodeClass, NodeVisual, VisualBindings};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub merged: usize,
    pub unknown_ids: Vec<String>,
    pub missing_ids: Vec<String>,
    pub skipped_links: usize,
}

pub struct LayoutSync {
    forces: ForceConfig,
    start_id: String,
    simulation: Option<Simulation>,
    visuals: VisualBindings,
}

impl LayoutSync {
    pub fn new(forces: ForceConfig, start_id: impl Into<String>) -> Self {
        Self {
            forces,
            start_id: start_id.into(),
            simulation: None,
            visuals: VisualBindings::default(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.simulation.is_some()
    }

    pub fn init(
        &mut self,
        nodes: &[Node],
        links: &[Link],
        unlocked: &UnlockedMap,
        discovered: &DiscoveredSet,
    ) {
        let simulation = Simulation::new(nodes, links, self.forces);
        let skipped = links.len().saturating_sub(simulation.links().len());
        if skipped > 0 {
            debug!(skipped, "some links were dropped while building the layout");
        }

        self.visuals = VisualBindings::default();
        self.bind_visuals(&simulation, unlocked, discovered);
        debug!(nodes = simulation.nodes().len(), "layout initialized");
        self.simulation = Some(simulation);
    }

    pub fn update(
        &mut self,
        nodes: &[Node],
        links: &[Link],
        unlocked: &UnlockedMap,
        discovered: &DiscoveredSet,
    ) -> Option<UpdateReport> {
        let Some(mut simulation) = self.simulation.take() else {
            warn!("layout update requested before the layout was initialized");
            return None;
        };

        let incoming = nodes
            .iter()
            .map(|node| (node.id.as_str(), node))
            .collect::<HashMap<_, _>>();
        let mut report = UpdateReport::default();

        let mut merged = Vec::with_capacity(simulation.nodes().len());
        for current in simulation.nodes() {
            match incoming.get(current.id()) {
                Some(node) => merged.push(merge_preserving_physics(current, node)),
                None => report.missing_ids.push(current.id().to_owned()),
            }
        }
        report.merged = merged.len();
        for node in merged {
            simulation.replace(node);
        }

        for node in nodes {
            if simulation.index_of(&node.id).is_none() {
                report.unknown_ids.push(node.id.clone());
            }
        }
        if !report.unknown_ids.is_empty() {
            warn!(
                ids = ?report.unknown_ids,
                "update carries nodes the layout has never seen; ignored"
            );
        }
        if !report.missing_ids.is_empty() {
            warn!(
                ids = ?report.missing_ids,
                "update is missing nodes; keeping their previous data"
            );
        }

        report.skipped_links = simulation.set_links(links);
        if report.skipped_links > 0 {
            warn!(
                skipped = report.skipped_links,
                "links with unknown endpoints were skipped"
            );
        }

        self.bind_visuals(&simulation, unlocked, discovered);
        simulation.reheat(self.forces.reheat_alpha);
        self.simulation = Some(simulation);
        Some(report)
    }

    fn bind_visuals(
        &mut self,
        simulation: &Simulation,
        unlocked: &UnlockedMap,
        discovered: &DiscoveredSet,
    ) {
        for sim_node in simulation.nodes() {
            self.visuals.bind_node(
                sim_node.id(),
                NodeVisual::resolve(&sim_node.node, unlocked, discovered, &self.start_id),
            );
        }
        self.visuals.bind_links(
            simulation.links().iter().map(|link| &link.key),
            unlocked,
            &self.start_id,
        );
    }

    pub fn tick(&mut self) -> bool {
        self.simulation
            .as_mut()
            .is_some_and(|simulation| simulation.tick())
    }

    pub fn pin(&mut self, id: &str, position: Vec2) -> bool {
        let Some(simulation) = self.simulation.as_mut() else {
            return false;
        };
        let pinned = simulation.pin(id, position);
        if pinned {
            simulation.reheat(self.forces.reheat_alpha);
        }
        pinned
    }

    pub fn release(&mut self, id: &str) -> bool {
        self.simulation
            .as_mut()
            .is_some_and(|simulation| simulation.release(id))
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    pub fn nodes(&self) -> &[SimNode] {
        self.simulation
            .as_ref()
            .map(Simulation::nodes)
            .unwrap_or_default()
    }

    pub fn links(&self) -> &[SimLink] {
        self.simulation
            .as_ref()
            .map(Simulation::links)
            .unwrap_or_default()
    }

    pub fn visual(&self, id: &str) -> Option<&NodeVisual> {
        self.visuals.node(id)
    }

    pub fn visuals(&self) -> &VisualBindings {
        &self.visuals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roadmap::{Exercise, NodeType};

    fn node(id: &str, kind: NodeType) -> Node {
        Node {
            id: id.to_owned(),
            title: id.to_uppercase(),
            kind,
            ..Node::default()
        }
    }

    fn graph() -> (Vec<Node>, Vec<Link>) {
        let mut sub = node("a1", NodeType::Sub);
        sub.exercises = vec![Exercise {
            id: "e1".into(),
            label: "First".into(),
            points: 10,
            optional: false,
            completed: false,
            categories: Vec::new(),
        }];
        (
            vec![node("Start", NodeType::Start), node("a", NodeType::Main), sub],
            vec![Link::new("Start", "a"), Link::new("a", "a1")],
        )
    }

    fn open(ids: &[&str]) -> (UnlockedMap, DiscoveredSet) {
        let unlocked = ids.iter().map(|id| ((*id).to_owned(), true)).collect();
        let discovered = ids.iter().map(|id| (*id).to_owned()).collect();
        (unlocked, discovered)
    }

    fn bodies(layout: &LayoutSync) -> Vec<(String, Body)> {
        layout
            .nodes()
            .iter()
            .map(|node| (node.id().to_owned(), node.body))
            .collect()
    }

    #[test]
    fn update_before_init_is_rejected() {
        let (nodes, links) = graph();
        let (unlocked, discovered) = open(&["Start"]);
        let mut layout = LayoutSync::new(ForceConfig::default(), "Start");
        assert_eq!(layout.update(&nodes, &links, &unlocked, &discovered), None);
        assert!(!layout.tick());
    }

    #[test]
    fn identical_update_does_not_move_nodes() {
        let (nodes, links) = graph();
        let (unlocked, discovered) = open(&["Start", "a", "a1"]);
        let mut layout = LayoutSync::new(ForceConfig::default(), "Start");
        layout.init(&nodes, &links, &unlocked, &discovered);
        for _ in 0..25 {
            layout.tick();
        }

        let before = bodies(&layout);
        let report = layout.update(&nodes, &links, &unlocked, &discovered).unwrap();
        assert_eq!(bodies(&layout), before);
        assert_eq!(report.merged, 3);
        assert!(report.unknown_ids.is_empty());
        assert!(report.missing_ids.is_empty());
    }

    #[test]
    fn update_refreshes_data_and_visuals_but_keeps_positions() {
        let (mut nodes, links) = graph();
        let (unlocked, discovered) = open(&["Start", "a", "a1"]);
        let mut layout = LayoutSync::new(ForceConfig::default(), "Start");
        layout.init(&nodes, &links, &unlocked, &discovered);
        layout.tick();
        let before = layout.simulation().unwrap().node("a1").unwrap().body;

        nodes[2].exercises[0].completed = true;
        nodes[2].percent = Some(100);
        layout.update(&nodes, &links, &unlocked, &discovered).unwrap();

        let after = layout.simulation().unwrap().node("a1").unwrap();
        assert_eq!(after.body, before);
        assert_eq!(after.node.percent, Some(100));
        let visual = layout.visual("a1").unwrap();
        assert_eq!(visual.class.glyph, Glyph::SubDone);
        assert_eq!(visual.percent.as_deref(), Some("100%"));
    }

    #[test]
    fn update_reports_integrity_problems() {
        let (nodes, links) = graph();
        let (unlocked, discovered) = open(&["Start"]);
        let mut layout = LayoutSync::new(ForceConfig::default(), "Start");
        layout.init(&nodes, &links, &unlocked, &discovered);

        let mut shifted = nodes[..2].to_vec();
        shifted.push(node("stranger", NodeType::Sub));
        let mut new_links = links.clone();
        new_links.push(Link::new("a", "stranger"));

        let report = layout
            .update(&shifted, &new_links, &unlocked, &discovered)
            .unwrap();
        assert_eq!(report.unknown_ids, vec!["stranger".to_owned()]);
        assert_eq!(report.missing_ids, vec!["a1".to_owned()]);
        assert_eq!(report.skipped_links, 1);
        assert_eq!(layout.nodes().len(), 3);
        assert_eq!(layout.visuals().link_count(), 2);
    }

    #[test]
    fn update_reheats_a_cooled_layout() {
        let (nodes, links) = graph();
        let (unlocked, discovered) = open(&["Start", "a"]);
        let mut layout = LayoutSync::new(ForceConfig::default(), "Start");
        layout.init(&nodes, &links, &unlocked, &discovered);
        while layout.tick() {}
        assert!(layout.simulation().unwrap().is_settled());

        layout.update(&nodes, &links, &unlocked, &discovered);
        assert_eq!(layout.simulation().unwrap().alpha(), 0.3);
        assert!(layout.tick());
    }

    #[test]
    fn link_styles_track_unlock_state() {
        let (nodes, links) = graph();
        let (unlocked, discovered) = open(&["Start", "a"]);
        let mut layout = LayoutSync::new(ForceConfig::default(), "Start");
        layout.init(&nodes, &links, &unlocked, &discovered);
        assert_eq!(
            layout.visuals().link(&Link::new("a", "a1").key()),
            Some(LinkStyle::Dashed)
        );

        let (unlocked, discovered) = open(&["Start", "a", "a1"]);
        layout.update(&nodes, &links, &unlocked, &discovered);
        assert_eq!(
            layout.visuals().link(&Link::new("a", "a1").key()),
            Some(LinkStyle::Solid)
        );
    }
}
