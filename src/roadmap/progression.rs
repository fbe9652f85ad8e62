use std::collections::HashMap;

use crate::config::CTF_CATEGORY;

use super::model::{Ctf, DiscoveredSet, Node, NodeType, UnlockedMap};

const MIN_LEVEL_COUNT: usize = 49;
pub const MAX_LEVEL_COUNT: usize = 1000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progression {
    pub earned_xp: u64,
    pub level: u32,
    pub xp_into_level: u64,
    pub xp_for_level: u64,
}

impl Progression {
    pub fn progress_percent(&self) -> u8 {
        if self.xp_for_level == 0 {
            return 100;
        }
        let percent = (self.xp_into_level as f64 * 100.0 / self.xp_for_level as f64).round();
        percent.clamp(0.0, 100.0) as u8
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelTable {
    thresholds: Vec<u64>,
}

impl LevelTable {
    pub fn new(level_count: usize) -> Self {
        let level_count = level_count.clamp(MIN_LEVEL_COUNT, MAX_LEVEL_COUNT);
        let mut thresholds = Vec::with_capacity(level_count + 1);
        thresholds.push(0u64);
        let mut total = 0u64;
        for index in 1..=level_count as u64 {
            total += 50 + index * 10;
            thresholds.push(total);
        }
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &[u64] {
        &self.thresholds
    }

    pub fn max_level(&self) -> u32 {
        self.thresholds.len() as u32
    }

    pub fn level_for(&self, xp: u64) -> u32 {
        let reached = self.thresholds.partition_point(|&threshold| threshold <= xp);
        reached.max(1) as u32
    }

    pub fn progression(&self, earned_xp: u64) -> Progression {
        let level = self.level_for(earned_xp);
        let floor = self.thresholds[level as usize - 1];
        let xp_for_level = self
            .thresholds
            .get(level as usize)
            .map(|ceiling| ceiling - floor)
            .unwrap_or(0);

        Progression {
            earned_xp,
            level,
            xp_into_level: earned_xp - floor,
            xp_for_level,
        }
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self::new(MIN_LEVEL_COUNT)
    }
}

pub fn earned_xp(nodes: &[Node], ctfs: &[Ctf], unlocked: &UnlockedMap, ctf_points: u32) -> u64 {
    let exercise_xp = nodes
        .iter()
        .filter(|node| unlocked.get(&node.id).copied() != Some(false))
        .flat_map(|node| node.exercises.iter())
        .filter(|exercise| exercise.completed)
        .map(|exercise| u64::from(exercise.points))
        .sum::<u64>();
    let ctf_xp = ctfs
        .iter()
        .map(|ctf| u64::from(ctf.completed) * u64::from(ctf_points))
        .sum::<u64>();
    exercise_xp + ctf_xp
}

pub fn percent_label(node: &Node, discovered: &DiscoveredSet) -> Option<String> {
    if node.kind != NodeType::Sub || !discovered.contains(&node.id) {
        return None;
    }
    let percent = node.percent?;
    if percent >= 100 && node.has_incomplete_optional() {
        Some(format!("{percent}%*"))
    } else {
        Some(format!("{percent}%"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbilityScore {
    pub category: String,
    pub score: u32,
}

pub fn ability_scores(nodes: &[Node], ctfs: &[Ctf], categories: &[String]) -> Vec<AbilityScore> {
    let mut counters = categories
        .iter()
        .map(|category| (category.as_str(), 0u32))
        .collect::<HashMap<_, _>>();

    for exercise in nodes.iter().flat_map(|node| node.exercises.iter()) {
        if !exercise.completed {
            continue;
        }
        for category in &exercise.categories {
            if let Some(counter) = counters.get_mut(category.as_str()) {
                *counter += 1;
            }
        }
    }

    if let Some(counter) = counters.get_mut(CTF_CATEGORY) {
        *counter = ctfs.iter().map(|ctf| ctf.completed).sum();
    }

    categories
        .iter()
        .map(|category| AbilityScore {
            category: category.clone(),
            score: counters.get(category.as_str()).copied().unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::roadmap::model::Exercise;

    fn exercise(id: &str, points: u32, completed: bool) -> Exercise {
        Exercise {
            id: id.to_owned(),
            label: id.to_owned(),
            points,
            optional: false,
            completed,
            categories: Vec::new(),
        }
    }

    fn ctf(id: &str, completed: u32) -> Ctf {
        Ctf {
            id: id.to_owned(),
            title: id.to_owned(),
            description: String::new(),
            link: String::new(),
            completed,
        }
    }

    #[test]
    fn exercise_and_ctf_xp_add_up() {
        let nodes = vec![Node {
            id: "n".into(),
            exercises: vec![exercise("e1", 10, true), exercise("e2", 40, false)],
            ..Node::default()
        }];
        let xp = earned_xp(&nodes, &[ctf("c", 2)], &UnlockedMap::new(), 30);
        assert_eq!(xp, 70);
    }

    #[test]
    fn explicitly_locked_nodes_do_not_earn_xp() {
        let nodes = vec![
            Node {
                id: "open".into(),
                exercises: vec![exercise("e1", 10, true)],
                ..Node::default()
            },
            Node {
                id: "shut".into(),
                exercises: vec![exercise("e2", 99, true)],
                ..Node::default()
            },
        ];
        let unlocked = [("open".to_owned(), true), ("shut".to_owned(), false)]
            .into_iter()
            .collect();
        assert_eq!(earned_xp(&nodes, &[], &unlocked, 30), 10);
    }

    #[test]
    fn level_table_matches_threshold_formula() {
        let table = LevelTable::default();
        assert_eq!(&table.thresholds()[..4], &[0, 60, 130, 210]);
        assert_eq!(table.thresholds().len(), 50);
    }

    #[test]
    fn level_count_is_capped() {
        let table = LevelTable::new(usize::MAX);
        assert_eq!(table.thresholds().len(), MAX_LEVEL_COUNT + 1);
        assert_eq!(LevelTable::new(3), LevelTable::default());
    }

    #[test]
    fn progression_inside_a_level() {
        let table = LevelTable::default();
        let progression = table.progression(70);
        assert_eq!(progression.level, 2);
        assert_eq!(progression.xp_into_level, 10);
        assert_eq!(progression.xp_for_level, 70);
        assert_eq!(progression.progress_percent(), 14);

        let start = table.progression(0);
        assert_eq!(start.level, 1);
        assert_eq!(start.xp_for_level, 60);
        assert_eq!(start.progress_percent(), 0);
    }

    #[test]
    fn exact_threshold_starts_the_next_level() {
        let table = LevelTable::default();
        assert_eq!(table.level_for(59), 1);
        assert_eq!(table.level_for(60), 2);
    }

    #[test]
    fn top_of_table_reports_full_progress() {
        let table = LevelTable::default();
        let top = table.progression(10_000_000);
        assert_eq!(top.level, table.max_level());
        assert_eq!(top.xp_for_level, 0);
        assert_eq!(top.progress_percent(), 100);
    }

    #[test]
    fn percent_label_marks_incomplete_optionals() {
        let mut node = Node {
            id: "s".into(),
            kind: NodeType::Sub,
            percent: Some(100),
            exercises: vec![exercise("req", 10, true)],
            ..Node::default()
        };
        let discovered = DiscoveredSet::from(["s".to_owned()]);
        assert_eq!(percent_label(&node, &discovered).as_deref(), Some("100%"));

        node.exercises.push(Exercise {
            optional: true,
            ..exercise("bonus", 5, false)
        });
        assert_eq!(percent_label(&node, &discovered).as_deref(), Some("100%*"));

        node.percent = Some(40);
        assert_eq!(percent_label(&node, &discovered).as_deref(), Some("40%"));

        assert_eq!(percent_label(&node, &DiscoveredSet::new()), None);
        node.kind = NodeType::Main;
        assert_eq!(percent_label(&node, &discovered), None);
    }

    #[test]
    fn abilities_count_known_categories_only() {
        let categories = vec!["System Analysis".to_owned(), CTF_CATEGORY.to_owned()];
        let mut done = exercise("e1", 10, true);
        done.categories = vec!["System Analysis".into(), "Cooking".into()];
        let mut open = exercise("e2", 10, false);
        open.categories = vec!["System Analysis".into()];
        let nodes = vec![Node {
            id: "n".into(),
            exercises: vec![done, open],
            ..Node::default()
        }];

        let scores = ability_scores(&nodes, &[ctf("a", 2), ctf("b", 3)], &categories);
        assert_eq!(
            scores,
            vec![
                AbilityScore {
                    category: "System Analysis".into(),
                    score: 1,
                },
                AbilityScore {
                    category: CTF_CATEGORY.into(),
                    score: 5,
                },
            ]
        );
    }

    proptest! {
        #[test]
        fn level_never_decreases_with_more_xp(a in 0u64..200_000, b in 0u64..200_000) {
            let table = LevelTable::default();
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(table.level_for(low) <= table.level_for(high));
            prop_assert_eq!(table.level_for(low), table.level_for(low));
        }
    }
}
