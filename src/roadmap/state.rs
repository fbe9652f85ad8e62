use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;

use super::discovery::resolve_discovered;
use super::forest::{Forest, build_forest};
use super::model::{DiscoveredSet, Link, Node, NodeType, Snapshot};
use super::progression::{AbilityScore, LevelTable, Progression, ability_scores, earned_xp};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rules {
    pub start_id: String,
    pub ctf_points: u32,
    pub categories: Vec<String>,
    pub levels: LevelTable,
}

impl Rules {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            start_id: config.start_node_id.clone(),
            ctf_points: config.ctf_points,
            categories: config.categories.clone(),
            levels: LevelTable::new(config.level_count),
        }
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MainProgress {
    pub id: String,
    pub title: String,
    pub percent: u8,
}

#[derive(Clone, Debug, Default)]
pub struct DerivedView {
    pub forest: Forest,
    pub links: Vec<Link>,
    pub discovered: DiscoveredSet,
    pub progression: Progression,
    pub abilities: Vec<AbilityScore>,
    pub main_progress: Vec<MainProgress>,
}

impl DerivedView {
    pub fn derive(snapshot: &Snapshot, rules: &Rules) -> Self {
        let forest = build_forest(&snapshot.nodes);
        let links = if snapshot.links.is_empty() {
            forest.links().to_vec()
        } else {
            snapshot.links.clone()
        };
        let discovered = resolve_discovered(&snapshot.unlocked, &links, &rules.start_id);
        let xp = earned_xp(
            &snapshot.nodes,
            &snapshot.ctfs,
            &snapshot.unlocked,
            rules.ctf_points,
        );

        Self {
            links,
            discovered,
            progression: rules.levels.progression(xp),
            abilities: ability_scores(&snapshot.nodes, &snapshot.ctfs, &rules.categories),
            main_progress: main_progress(&snapshot.nodes, &forest),
            forest,
        }
    }
}

fn main_progress(nodes: &[Node], forest: &Forest) -> Vec<MainProgress> {
    let by_id = nodes
        .iter()
        .map(|node| (node.id.as_str(), node))
        .collect::<BTreeMap<_, _>>();
    forest
        .walk()
        .into_iter()
        .filter(|(_, entry)| entry.kind == NodeType::Main)
        .map(|(_, entry)| MainProgress {
            id: entry.id.clone(),
            title: entry.title.clone(),
            percent: by_id
                .get(entry.id.as_str())
                .and_then(|node| node.percent)
                .unwrap_or(0),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    ToggleExercise { exercise_id: String },
    AdjustCtf { ctf_id: String },
    SaveNotes { node_id: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingToggle {
    pub seq: u64,
    pub completed: bool,
}

#[derive(Clone, Debug)]
pub enum Event {
    FetchStarted { seq: u64 },
    SnapshotArrived { seq: u64, snapshot: Snapshot },
    FetchFailed { seq: u64, message: String },
    ExerciseToggleRequested {
        seq: u64,
        exercise_id: String,
        completed: bool,
    },
    MutationFailed {
        seq: u64,
        mutation: Mutation,
        message: String,
    },
    DismissStatus,
}

#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub snapshot: Option<Snapshot>,
    pub view: Option<DerivedView>,
    pub applied_seq: u64,
    pub loading: bool,
    pub pending_toggles: BTreeMap<String, PendingToggle>,
    pub status: Option<String>,
}

impl AppState {
    pub fn is_ready(&self) -> bool {
        self.snapshot.is_some() && self.view.is_some()
    }

    pub fn exercise_checked(&self, exercise_id: &str) -> Option<bool> {
        if let Some(pending) = self.pending_toggles.get(exercise_id) {
            return Some(pending.completed);
        }
        self.snapshot
            .as_ref()?
            .find_exercise(exercise_id)
            .map(|(_, exercise)| exercise.completed)
    }

    pub fn is_toggle_in_flight(&self, exercise_id: &str) -> bool {
        self.pending_toggles.contains_key(exercise_id)
    }

    pub fn is_stale(&self, seq: u64) -> bool {
        seq <= self.applied_seq
    }
}

pub fn reduce(mut state: AppState, event: Event, rules: &Rules) -> AppState {
    match event {
        Event::FetchStarted { seq } => {
            debug!(seq, "fetching roadmap state");
            state.loading = true;
        }
        Event::SnapshotArrived { seq, snapshot } => {
            state.pending_toggles.retain(|_, pending| pending.seq != seq);
            if state.is_stale(seq) {
                debug!(seq, applied = state.applied_seq, "dropping stale snapshot");
                return state;
            }

            let view = DerivedView::derive(&snapshot, rules);
            info!(
                seq,
                nodes = snapshot.nodes.len(),
                discovered = view.discovered.len(),
                level = view.progression.level,
                "applied roadmap snapshot"
            );
            state.view = Some(view);
            state.snapshot = Some(snapshot);
            state.applied_seq = seq;
            state.loading = false;
        }
        Event::FetchFailed { seq, message } => {
            warn!(seq, %message, "failed to fetch roadmap state");
            state.loading = false;
            state.status = Some(format!("Could not load the roadmap: {message}"));
        }
        Event::ExerciseToggleRequested {
            seq,
            exercise_id,
            completed,
        } => {
            state
                .pending_toggles
                .insert(exercise_id, PendingToggle { seq, completed });
        }
        Event::MutationFailed {
            seq,
            mutation,
            message,
        } => {
            warn!(seq, ?mutation, %message, "roadmap update failed");
            let summary = match &mutation {
                Mutation::ToggleExercise { exercise_id } => {
                    if state
                        .pending_toggles
                        .get(exercise_id)
                        .is_some_and(|pending| pending.seq == seq)
                    {
                        state.pending_toggles.remove(exercise_id);
                    }
                    "Could not update the exercise"
                }
                Mutation::AdjustCtf { .. } => "Could not update the CTF counter",
                Mutation::SaveNotes { .. } => "Could not save your notes",
            };
            state.status = Some(format!("{summary}: {message}"));
        }
        Event::DismissStatus => state.status = None,
    }
    state
}
