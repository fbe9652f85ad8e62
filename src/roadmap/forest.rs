use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::util::compare_titles;

use super::model::{Link, Node, NodeType};

#[derive(Clone, Debug, PartialEq)]
pub struct ForestEntry {
    pub id: String,
    pub title: String,
    pub kind: NodeType,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrphanRef {
    pub node_id: String,
    pub missing_id: String,
}

#[derive(Clone, Debug, Default)]
pub struct Forest {
    entries: Vec<ForestEntry>,
    index_by_id: HashMap<String, usize>,
    roots: Vec<usize>,
    links: Vec<Link>,
    orphans: Vec<OrphanRef>,
}

pub fn build_forest(nodes: &[Node]) -> Forest {
    let mut entries = Vec::with_capacity(nodes.len());
    let mut index_by_id = HashMap::with_capacity(nodes.len());
    let mut sources = Vec::with_capacity(nodes.len());

    for node in nodes {
        if index_by_id.contains_key(&node.id) {
            warn!(node = %node.id, "duplicate node id in roadmap; keeping the first record");
            continue;
        }
        index_by_id.insert(node.id.clone(), entries.len());
        entries.push(ForestEntry {
            id: node.id.clone(),
            title: node.title.clone(),
            kind: node.kind,
            parent: None,
            children: Vec::new(),
        });
        sources.push(node);
    }

    let mut links = Vec::new();
    let mut seen_edges = HashSet::new();
    let mut orphans = Vec::new();

    for (index, node) in sources.iter().enumerate() {
        for reference in node.references() {
            let Some(&parent) = index_by_id.get(reference) else {
                warn!(
                    node = %node.id,
                    missing = reference,
                    "prerequisite does not exist; node promoted to root"
                );
                orphans.push(OrphanRef {
                    node_id: node.id.clone(),
                    missing_id: reference.to_owned(),
                });
                continue;
            };

            if parent == index {
                warn!(node = %node.id, "node lists itself as a prerequisite; ignored");
                continue;
            }

            if seen_edges.insert((parent, index)) {
                links.push(Link::new(reference, node.id.as_str()));
            }

            if entries[index].parent.is_none() {
                entries[index].parent = Some(parent);
                if !entries[parent].children.contains(&index) {
                    entries[parent].children.push(index);
                }
            }
        }
    }

    let mut roots = entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.parent.is_none())
        .map(|(index, _)| index)
        .collect::<Vec<_>>();

    let mut reached = vec![false; entries.len()];
    for &root in &roots {
        mark_reachable(&entries, root, &mut reached);
    }

    for index in 0..entries.len() {
        if reached[index] {
            continue;
        }

        let cycle_member = find_cycle_member(&entries, index);
        if let Some(parent) = entries[cycle_member].parent.take() {
            entries[parent].children.retain(|&child| child != cycle_member);
            warn!(
                node = %entries[cycle_member].id,
                parent = %entries[parent].id,
                "prerequisite cycle detected; node promoted to root"
            );
        }
        roots.push(cycle_member);
        mark_reachable(&entries, cycle_member, &mut reached);
    }

    sort_by_title(&entries, &mut roots);
    for index in 0..entries.len() {
        let mut children = std::mem::take(&mut entries[index].children);
        sort_by_title(&entries, &mut children);
        entries[index].children = children;
    }

    Forest {
        entries,
        index_by_id,
        roots,
        links,
        orphans,
    }
}

fn mark_reachable(entries: &[ForestEntry], start: usize, reached: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(index) = stack.pop() {
        if reached[index] {
            continue;
        }
        reached[index] = true;
        stack.extend(entries[index].children.iter().copied());
    }
}

fn find_cycle_member(entries: &[ForestEntry], start: usize) -> usize {
    let mut trail = HashSet::new();
    let mut cursor = start;
    while trail.insert(cursor) {
        match entries[cursor].parent {
            Some(parent) => cursor = parent,
            None => break,
        }
    }
    cursor
}

fn sort_by_title(entries: &[ForestEntry], indices: &mut [usize]) {
    indices.sort_by(|&a, &b| {
        compare_titles(
            &entries[a].title,
            &entries[a].id,
            &entries[b].title,
            &entries[b].id,
        )
    });
}

impl Forest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ForestEntry> {
        self.index_by_id.get(id).map(|&index| &self.entries[index])
    }

    pub fn roots(&self) -> impl Iterator<Item = &ForestEntry> {
        self.roots.iter().map(|&index| &self.entries[index])
    }

    pub fn children(&self, id: &str) -> Vec<&ForestEntry> {
        self.index_by_id
            .get(id)
            .map(|&index| {
                self.entries[index]
                    .children
                    .iter()
                    .map(|&child| &self.entries[child])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn parent(&self, id: &str) -> Option<&ForestEntry> {
        let index = *self.index_by_id.get(id)?;
        self.entries[index].parent.map(|parent| &self.entries[parent])
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn orphans(&self) -> &[OrphanRef] {
        &self.orphans
    }

    pub fn walk(&self) -> Vec<(usize, &ForestEntry)> {
        let mut ordered = Vec::with_capacity(self.entries.len());
        let mut stack = self
            .roots
            .iter()
            .rev()
            .map(|&index| (0usize, index))
            .collect::<Vec<_>>();

        while let Some((depth, index)) = stack.pop() {
            let entry = &self.entries[index];
            ordered.push((depth, entry));
            stack.extend(entry.children.iter().rev().map(|&child| (depth + 1, child)));
        }

        ordered
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use proptest::prelude::*;

    use super::*;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn build_logged(nodes: &[Node]) -> (Forest, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let forest = tracing::subscriber::with_default(subscriber, || build_forest(nodes));
        let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
        (forest, logs)
    }

    fn node(id: &str, title: &str, parent: Option<&str>) -> Node {
        Node {
            id: id.to_owned(),
            title: title.to_owned(),
            parent_id: parent.map(str::to_owned),
            ..Node::default()
        }
    }

    fn ids<'a>(entries: impl Iterator<Item = &'a ForestEntry>) -> Vec<&'a str> {
        entries.map(|entry| entry.id.as_str()).collect()
    }

    #[test]
    fn missing_parent_promotes_node_to_root() {
        let (forest, logs) = build_logged(&[
            node("Start", "Start", None),
            node("A", "Alpha", Some("missing")),
        ]);

        assert!(logs.contains("WARN"));
        assert!(logs.contains("prerequisite does not exist; node promoted to root"));
        assert!(logs.contains("missing"));

        assert_eq!(ids(forest.roots()), vec!["A", "Start"]);
        assert_eq!(
            forest.orphans(),
            &[OrphanRef {
                node_id: "A".into(),
                missing_id: "missing".into(),
            }]
        );
        assert!(forest.links().is_empty());
    }

    #[test]
    fn children_and_roots_sort_case_insensitively() {
        let forest = build_forest(&[
            node("root", "Root", None),
            node("c", "charlie", Some("root")),
            node("b", "Bravo", Some("root")),
            node("a", "alpha", Some("root")),
            node("z", "zulu", None),
        ]);

        assert_eq!(ids(forest.roots()), vec!["root", "z"]);
        assert_eq!(ids(forest.children("root").into_iter()), vec!["a", "b", "c"]);
        assert_eq!(forest.parent("b").map(|entry| entry.id.as_str()), Some("root"));
    }

    #[test]
    fn extra_prerequisites_emit_links_but_single_tree_placement() {
        let mut gate = node("gate", "Gate", Some("a"));
        gate.prerequisites = vec!["b".into(), "a".into()];
        let forest = build_forest(&[node("a", "A", None), node("b", "B", None), gate]);

        assert_eq!(
            forest.links(),
            &[Link::new("a", "gate"), Link::new("b", "gate")]
        );
        assert_eq!(ids(forest.children("a").into_iter()), vec!["gate"]);
        assert!(forest.children("b").is_empty());
    }

    #[test]
    fn duplicate_ids_keep_first_record() {
        let forest = build_forest(&[node("a", "First", None), node("a", "Second", None)]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest.get("a").map(|entry| entry.title.as_str()), Some("First"));
    }

    #[test]
    fn parent_cycles_are_broken_without_recursion() {
        let forest = build_forest(&[
            node("a", "A", Some("b")),
            node("b", "B", Some("a")),
            node("c", "C", Some("a")),
            node("self", "Self", Some("self")),
        ]);

        let walked = forest.walk();
        assert_eq!(walked.len(), 4);
        assert_eq!(ids(forest.roots()), vec!["a", "self"]);
        assert_eq!(ids(forest.children("a").into_iter()), vec!["b", "c"]);
    }

    #[test]
    fn walk_is_depth_first_preorder() {
        let forest = build_forest(&[
            node("root", "Root", None),
            node("x", "X", Some("root")),
            node("x1", "X1", Some("x")),
            node("y", "Y", Some("root")),
        ]);

        let walked = forest
            .walk()
            .into_iter()
            .map(|(depth, entry)| (depth, entry.id.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(walked, vec![(0, "root"), (1, "x"), (2, "x1"), (1, "y")]);
    }

    proptest! {
        #[test]
        fn every_node_is_placed_exactly_once(
            parents in proptest::collection::vec(proptest::option::of(0..40usize), 1..30)
        ) {
            let count = parents.len();
            let nodes = parents
                .iter()
                .enumerate()
                .map(|(index, parent)| {
                    let parent_id = parent.map(|parent| format!("n{parent}"));
                    Node {
                        id: format!("n{index}"),
                        title: format!("Title {}", count - index),
                        parent_id,
                        ..Node::default()
                    }
                })
                .collect::<Vec<_>>();

            let forest = build_forest(&nodes);

            let mut placements: HashMap<&str, usize> = HashMap::new();
            for root in forest.roots() {
                *placements.entry(root.id.as_str()).or_default() += 1;
            }
            for node in &nodes {
                for child in forest.children(&node.id) {
                    *placements.entry(child.id.as_str()).or_default() += 1;
                }
            }

            prop_assert_eq!(placements.len(), count);
            prop_assert!(placements.values().all(|&placed| placed == 1));
            prop_assert_eq!(forest.walk().len(), count);
        }
    }
}
