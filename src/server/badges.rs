use serde::{Deserialize, Serialize};

use crate::roadmap::{Node, NodeType};

const LEVEL_MILESTONES: [u32; 6] = [5, 10, 15, 20, 25, 30];
const EXERCISE_MILESTONES: [usize; 5] = [10, 25, 50, 75, 100];
const CTF_MILESTONES: [u32; 6] = [5, 10, 15, 20, 25, 30];
const STREAK_MILESTONES: [u32; 4] = [7, 14, 21, 28];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Achievements<'a> {
    pub nodes: &'a [Node],
    pub level: u32,
    pub completed_required: usize,
    pub total_required: usize,
    pub ctf_completions: u32,
    pub streak: u32,
}

impl Achievements<'_> {
    pub fn badge_ids(&self) -> Vec<String> {
        let mut ids = self
            .nodes
            .iter()
            .filter(|node| node.kind == NodeType::Main && node.percent == Some(100))
            .map(|node| format!("main-{}", node.id))
            .collect::<Vec<_>>();

        ids.extend(
            LEVEL_MILESTONES
                .iter()
                .filter(|&&level| self.level >= level)
                .map(|level| format!("level-{level}")),
        );

        let mut exercise_counts = EXERCISE_MILESTONES.to_vec();
        if self.total_required > 0 {
            exercise_counts.push(self.total_required);
        }
        exercise_counts.sort_unstable();
        exercise_counts.dedup();
        ids.extend(
            exercise_counts
                .into_iter()
                .filter(|&count| self.completed_required >= count)
                .map(|count| format!("exercises-{count}")),
        );

        ids.extend(
            CTF_MILESTONES
                .iter()
                .filter(|&&count| self.ctf_completions >= count)
                .map(|count| format!("ctf-{count}")),
        );
        ids.extend(
            STREAK_MILESTONES
                .iter()
                .filter(|&&days| self.streak >= days)
                .map(|days| format!("streak-{days}")),
        );
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_earned_on_a_fresh_roadmap() {
        let achievements = Achievements {
            level: 1,
            streak: 1,
            total_required: 40,
            ..Achievements::default()
        };
        assert!(achievements.badge_ids().is_empty());
    }

    #[test]
    fn milestones_accumulate() {
        let nodes = vec![
            Node {
                id: "linux".into(),
                kind: NodeType::Main,
                percent: Some(100),
                ..Node::default()
            },
            Node {
                id: "web".into(),
                kind: NodeType::Main,
                percent: Some(99),
                ..Node::default()
            },
        ];
        let achievements = Achievements {
            nodes: &nodes,
            level: 11,
            completed_required: 12,
            total_required: 12,
            ctf_completions: 5,
            streak: 14,
        };

        assert_eq!(
            achievements.badge_ids(),
            vec![
                "main-linux",
                "level-5",
                "level-10",
                "exercises-10",
                "exercises-12",
                "ctf-5",
                "streak-7",
                "streak-14",
            ]
        );
    }
}
