use std::collections::{HashMap, HashSet, VecDeque};

use tracing::warn;

use crate::roadmap::{Link, Node, NodeType, UnlockedMap};

pub fn node_percent(node: &Node) -> u8 {
    let required = node
        .exercises
        .iter()
        .filter(|exercise| !exercise.optional)
        .collect::<Vec<_>>();
    let counted = if required.is_empty() {
        node.exercises.iter().collect::<Vec<_>>()
    } else {
        required
    };
    if counted.is_empty() {
        return 0;
    }

    let done = counted.iter().filter(|exercise| exercise.completed).count();
    (done as f64 * 100.0 / counted.len() as f64).round() as u8
}

fn children_of(nodes: &[Node]) -> HashMap<&str, Vec<&Node>> {
    let mut children: HashMap<&str, Vec<&Node>> = HashMap::new();
    for node in nodes {
        let Some(parent) = node.parent_id.as_deref().map(str::trim) else {
            continue;
        };
        if !parent.is_empty() && parent != node.id {
            children.entry(parent).or_default().push(node);
        }
    }
    children
}

pub fn apply_percents(nodes: &mut [Node]) {
    let mut percents = nodes
        .iter()
        .map(|node| {
            let percent = match node.kind {
                NodeType::Start => 100,
                NodeType::Sub => node_percent(node),
                NodeType::Main => 0,
            };
            (node.id.clone(), percent)
        })
        .collect::<HashMap<_, _>>();

    let children = children_of(nodes);
    for node in nodes.iter().filter(|node| node.kind == NodeType::Main) {
        let mut seen = HashSet::from([node.id.as_str()]);
        let mut queue = VecDeque::from([node.id.as_str()]);
        let mut sub_percents = Vec::new();

        while let Some(current) = queue.pop_front() {
            for child in children.get(current).into_iter().flatten() {
                if child.kind == NodeType::Main || !seen.insert(child.id.as_str()) {
                    continue;
                }
                if child.kind == NodeType::Sub {
                    sub_percents.push(f64::from(percents[child.id.as_str()]));
                }
                queue.push_back(child.id.as_str());
            }
        }

        let mean = if sub_percents.is_empty() {
            0.0
        } else {
            sub_percents.iter().sum::<f64>() / sub_percents.len() as f64
        };
        percents.insert(node.id.clone(), mean.round() as u8);
    }

    for node in nodes.iter_mut() {
        node.percent = percents.get(&node.id).copied();
    }
}

pub fn resolve_unlocked(nodes: &[Node], start_id: &str, unlock_percent: u8) -> UnlockedMap {
    let mut unlocked = nodes
        .iter()
        .map(|node| (node.id.clone(), node.id == start_id))
        .collect::<UnlockedMap>();
    let percent_of = nodes
        .iter()
        .map(|node| (node.id.as_str(), node.percent.unwrap_or(0)))
        .collect::<HashMap<_, _>>();

    let is_open = |unlocked: &UnlockedMap, id: &str| unlocked.get(id).copied().unwrap_or(false);
    let max_passes = nodes.len() + 1;
    let mut stable = false;

    for _ in 0..max_passes {
        let mut changed = false;
        for node in nodes {
            if is_open(&unlocked, &node.id) {
                continue;
            }
            let prerequisites = node
                .prerequisites
                .iter()
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .collect::<Vec<_>>();

            let opens = match node.kind {
                NodeType::Start => true,
                NodeType::Main if prerequisites.is_empty() => is_open(&unlocked, start_id),
                NodeType::Main => prerequisites.iter().all(|&id| {
                    is_open(&unlocked, id)
                        && percent_of.get(id).copied().unwrap_or(0) >= unlock_percent
                }),
                NodeType::Sub => {
                    let parent_open = node
                        .parent_id
                        .as_deref()
                        .is_some_and(|parent| is_open(&unlocked, parent.trim()));
                    parent_open && prerequisites.iter().all(|&id| is_open(&unlocked, id))
                }
            };

            if opens {
                unlocked.insert(node.id.clone(), true);
                changed = true;
            }
        }
        if !changed {
            stable = true;
            break;
        }
    }

    if !stable {
        warn!(passes = max_passes, "unlock resolution did not settle");
    }
    unlocked
}

pub fn graph_links(nodes: &[Node], start_id: &str) -> Vec<Link> {
    let known = nodes.iter().map(|node| node.id.as_str()).collect::<HashSet<_>>();
    let mut links = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |links: &mut Vec<Link>, source: &str, target: &str| {
        if source != target && seen.insert((source.to_owned(), target.to_owned())) {
            links.push(Link::new(source, target));
        }
    };

    for node in nodes {
        if node.id == start_id {
            continue;
        }
        let references = node
            .references()
            .into_iter()
            .filter(|reference| known.contains(reference))
            .collect::<Vec<_>>();
        if references.is_empty() && known.contains(start_id) {
            push(&mut links, start_id, &node.id);
            continue;
        }
        for reference in references {
            push(&mut links, reference, &node.id);
        }
    }
    links
}

pub fn required_exercise_counts(nodes: &[Node]) -> (usize, usize) {
    let required = nodes
        .iter()
        .flat_map(|node| node.exercises.iter())
        .filter(|exercise| !exercise.optional);
    required.fold((0, 0), |(done, total), exercise| {
        (done + usize::from(exercise.completed), total + 1)
    })
}
