use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::RoadmapBackend;
use crate::config::EngineConfig;
use crate::error::BackendError;
use crate::roadmap::{
    Badge, Ctf, LevelTable, Node, NotificationItem, ShownAck, Snapshot, earned_xp,
    resolve_discovered,
};

use super::badges::{Achievements, BadgeDefinition};
use super::rules::{apply_percents, graph_links, required_exercise_counts, resolve_unlocked};
use super::streak::StreakRecord;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CtfDefinition {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadmapDefinition {
    pub graphs: BTreeMap<String, Vec<Node>>,
    #[serde(default)]
    pub ctfs: Vec<CtfDefinition>,
    #[serde(default)]
    pub badges: Vec<BadgeDefinition>,
}

impl RoadmapDefinition {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read roadmap definition {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid roadmap definition {}", path.display()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedBadge {
    pub id: String,
    pub earned_at: String,
    #[serde(default)]
    pub shown: bool,
}

fn first_level() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub completed: BTreeSet<String>,
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
    #[serde(default)]
    pub ctfs: BTreeMap<String, u32>,
    #[serde(default)]
    pub badges: Vec<EarnedBadge>,
    #[serde(default)]
    pub streak: Option<StreakRecord>,
    #[serde(default = "first_level")]
    pub highest_level_shown: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            completed: BTreeSet::new(),
            notes: BTreeMap::new(),
            ctfs: BTreeMap::new(),
            badges: Vec::new(),
            streak: None,
            highest_level_shown: first_level(),
        }
    }
}

impl Progress {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no progress file yet; starting fresh");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read progress file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid progress file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).context("failed to encode progress")?;
        fs::write(path, raw)
            .with_context(|| format!("failed to write progress file {}", path.display()))
    }

    fn earned(&self, badge_id: &str) -> Option<&EarnedBadge> {
        self.badges.iter().find(|badge| badge.id == badge_id)
    }
}

pub struct LocalBackend {
    definition: RoadmapDefinition,
    definition_path: PathBuf,
    progress_path: PathBuf,
    progress: Mutex<Progress>,
    start_id: String,
    unlock_percent: u8,
    ctf_points: u32,
    levels: LevelTable,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl LocalBackend {
    pub fn open(
        definition_path: &Path,
        progress_path: &Path,
        config: &EngineConfig,
    ) -> Result<Self> {
        let definition = RoadmapDefinition::load(definition_path)?;
        let progress = Progress::load(progress_path)?;
        info!(
            graphs = definition.graphs.len(),
            ctfs = definition.ctfs.len(),
            badges = definition.badges.len(),
            "loaded local roadmap"
        );
        Ok(Self::new(definition, progress, config)
            .with_paths(definition_path.to_path_buf(), progress_path.to_path_buf()))
    }

    pub fn new(definition: RoadmapDefinition, progress: Progress, config: &EngineConfig) -> Self {
        Self {
            definition,
            definition_path: PathBuf::new(),
            progress_path: PathBuf::new(),
            progress: Mutex::new(progress),
            start_id: config.start_node_id.clone(),
            unlock_percent: config.unlock_percent,
            ctf_points: config.ctf_points,
            levels: LevelTable::new(config.level_count),
            today: local_today,
        }
    }

    fn with_paths(mut self, definition_path: PathBuf, progress_path: PathBuf) -> Self {
        self.definition_path = definition_path;
        self.progress_path = progress_path;
        self
    }

    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn progress(&self) -> Result<Progress, BackendError> {
        self.lock().map(|progress| progress.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Progress>, BackendError> {
        self.progress.lock().map_err(|_| BackendError::Store {
            path: self.progress_path.clone(),
            message: "progress lock poisoned".to_owned(),
        })
    }

    fn transact<T>(
        &self,
        change: impl FnOnce(&mut Progress) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let mut progress = self.lock()?;
        let mut next = progress.clone();
        let outcome = change(&mut next)?;
        *progress = next;
        Ok(outcome)
    }

    fn persist(&self, progress: &Progress) -> Result<(), BackendError> {
        if self.progress_path.as_os_str().is_empty() {
            return Ok(());
        }
        progress.save(&self.progress_path).map_err(|error| BackendError::Store {
            path: self.progress_path.clone(),
            message: format!("{error:#}"),
        })
    }

    fn graph(&self, roadmap: &str) -> Result<&[Node], BackendError> {
        self.definition
            .graphs
            .get(roadmap)
            .map(Vec::as_slice)
            .ok_or_else(|| BackendError::Store {
                path: self.definition_path.clone(),
                message: format!("no roadmap named {roadmap}"),
            })
    }

    fn ctfs(&self, progress: &Progress) -> Vec<Ctf> {
        self.definition
            .ctfs
            .iter()
            .map(|ctf| Ctf {
                id: ctf.id.clone(),
                title: ctf.title.clone(),
                description: ctf.description.clone(),
                link: ctf.link.clone(),
                completed: progress.ctfs.get(&ctf.id).copied().unwrap_or(0),
            })
            .collect()
    }

    fn award_badges(&self, progress: &mut Progress, achievements: &Achievements<'_>) {
        for id in achievements.badge_ids() {
            if progress.earned(&id).is_some() {
                continue;
            }
            if !self.definition.badges.iter().any(|badge| badge.id == id) {
                debug!(badge = %id, "earned badge has no definition; skipping");
                continue;
            }
            info!(badge = %id, "badge earned");
            progress.badges.push(EarnedBadge {
                id,
                earned_at: Utc::now().to_rfc3339(),
                shown: false,
            });
        }
    }

    fn badges(&self, progress: &Progress) -> Vec<Badge> {
        progress
            .badges
            .iter()
            .filter_map(|earned| {
                let definition = self
                    .definition
                    .badges
                    .iter()
                    .find(|badge| badge.id == earned.id)?;
                Some(Badge {
                    id: earned.id.clone(),
                    title: definition.title.clone(),
                    description: definition.description.clone(),
                    image: definition.image.clone(),
                    earned_at: Some(earned.earned_at.clone()),
                    shown: earned.shown,
                })
            })
            .collect()
    }

    fn snapshot(&self, roadmap: &str, progress: &mut Progress) -> Result<Snapshot, BackendError> {
        let mut nodes = self.graph(roadmap)?.to_vec();
        for node in &mut nodes {
            for exercise in &mut node.exercises {
                exercise.completed = progress.completed.contains(&exercise.id);
            }
            node.user_notes = progress.notes.get(&node.id).cloned().unwrap_or_default();
        }
        apply_percents(&mut nodes);

        let unlocked = resolve_unlocked(&nodes, &self.start_id, self.unlock_percent);
        let links = graph_links(&nodes, &self.start_id);
        let discovered = resolve_discovered(&unlocked, &links, &self.start_id);

        let streak = StreakRecord::advance(progress.streak, (self.today)());
        progress.streak = Some(streak);

        let ctfs = self.ctfs(progress);
        let level = self
            .levels
            .level_for(earned_xp(&nodes, &ctfs, &unlocked, self.ctf_points));
        let (completed_required, total_required) = required_exercise_counts(&nodes);
        self.award_badges(
            progress,
            &Achievements {
                nodes: &nodes,
                level,
                completed_required,
                total_required,
                ctf_completions: ctfs.iter().map(|ctf| ctf.completed).sum(),
                streak: streak.streak,
            },
        );
        self.persist(progress)?;

        let notifications = (progress.highest_level_shown + 1..=level)
            .map(|level| NotificationItem::LevelUp { level })
            .collect();

        Ok(Snapshot {
            nodes,
            links,
            unlocked,
            discovered: discovered.into_iter().collect(),
            streak: streak.into(),
            ctfs,
            badges: self.badges(progress),
            abilities: None,
            notifications,
            current_graph: Some(roadmap.to_owned()),
        })
    }
}

impl RoadmapBackend for LocalBackend {
    fn fetch_state(&self, roadmap: &str) -> Result<Snapshot, BackendError> {
        self.transact(|progress| self.snapshot(roadmap, progress))
    }

    fn toggle_exercise(
        &self,
        roadmap: &str,
        exercise_id: &str,
        completed: bool,
    ) -> Result<Snapshot, BackendError> {
        let known = self
            .graph(roadmap)?
            .iter()
            .any(|node| node.exercise(exercise_id).is_some());
        if !known {
            return Err(BackendError::UnknownExercise(exercise_id.to_owned()));
        }

        self.transact(|progress| {
            if completed {
                progress.completed.insert(exercise_id.to_owned());
            } else {
                progress.completed.remove(exercise_id);
            }
            debug!(exercise_id, completed, "exercise updated");
            self.snapshot(roadmap, progress)
        })
    }

    fn adjust_ctf(
        &self,
        roadmap: &str,
        ctf_id: &str,
        delta: i32,
    ) -> Result<Snapshot, BackendError> {
        if !self.definition.ctfs.iter().any(|ctf| ctf.id == ctf_id) {
            return Err(BackendError::UnknownCtf(ctf_id.to_owned()));
        }

        self.transact(|progress| {
            let current = progress.ctfs.get(ctf_id).copied().unwrap_or(0);
            let next = current.saturating_add_signed(delta);
            if next == 0 {
                progress.ctfs.remove(ctf_id);
            } else {
                progress.ctfs.insert(ctf_id.to_owned(), next);
            }
            debug!(ctf_id, current, next, "ctf counter updated");
            self.snapshot(roadmap, progress)
        })
    }

    fn save_notes(
        &self,
        roadmap: &str,
        node_id: &str,
        notes: &str,
    ) -> Result<Snapshot, BackendError> {
        if !self.graph(roadmap)?.iter().any(|node| node.id == node_id) {
            return Err(BackendError::UnknownNode(node_id.to_owned()));
        }

        self.transact(|progress| {
            if notes.trim().is_empty() {
                progress.notes.remove(node_id);
            } else {
                progress.notes.insert(node_id.to_owned(), notes.to_owned());
            }
            self.snapshot(roadmap, progress)
        })
    }

    fn mark_shown(&self, ack: &ShownAck) -> Result<(), BackendError> {
        self.transact(|progress| {
            match ack {
                ShownAck::Badge { id } => {
                    let Some(badge) = progress.badges.iter_mut().find(|badge| &badge.id == id)
                    else {
                        warn!(badge = %id, "asked to mark a badge that was never earned");
                        return Err(BackendError::NothingToMark(ack.to_string()));
                    };
                    badge.shown = true;
                }
                ShownAck::LevelUp { level } => {
                    progress.highest_level_shown = progress.highest_level_shown.max(*level);
                }
            }
            self.persist(progress)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roadmap::{Exercise, NodeType};

    fn definition() -> RoadmapDefinition {
        let exercise = |id: &str, points: u32| Exercise {
            id: id.into(),
            label: id.into(),
            points,
            optional: false,
            completed: false,
            categories: Vec::new(),
        };
        let nodes = vec![
            Node {
                id: "Start".into(),
                title: "Start".into(),
                kind: NodeType::Start,
                ..Node::default()
            },
            Node {
                id: "linux".into(),
                title: "Linux".into(),
                kind: NodeType::Main,
                parent_id: Some("Start".into()),
                ..Node::default()
            },
            Node {
                id: "shell".into(),
                title: "Shell".into(),
                parent_id: Some("linux".into()),
                exercises: vec![exercise("ls", 40), exercise("grep", 40)],
                ..Node::default()
            },
        ];
        RoadmapDefinition {
            graphs: BTreeMap::from([("x".to_owned(), nodes)]),
            ctfs: vec![CtfDefinition {
                id: "pico".into(),
                title: "picoCTF".into(),
                ..CtfDefinition::default()
            }],
            badges: vec![BadgeDefinition {
                id: "main-linux".into(),
                title: "Linux done".into(),
                description: String::new(),
                image: String::new(),
            }],
        }
    }

    fn backend() -> LocalBackend {
        LocalBackend::new(definition(), Progress::default(), &EngineConfig::default())
            .with_clock(|| NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    #[test]
    fn completing_a_topic_awards_its_badge_once() {
        let backend = backend();
        backend.toggle_exercise("x", "ls", true).unwrap();
        let snapshot = backend.toggle_exercise("x", "grep", true).unwrap();

        assert_eq!(snapshot.node("linux").and_then(|node| node.percent), Some(100));
        assert_eq!(snapshot.badges.len(), 1);
        assert!(!snapshot.badges[0].shown);
        assert_eq!(snapshot.notifications, vec![NotificationItem::LevelUp { level: 2 }]);

        backend
            .mark_shown(&ShownAck::Badge {
                id: "main-linux".into(),
            })
            .unwrap();
        backend.mark_shown(&ShownAck::LevelUp { level: 2 }).unwrap();
        let snapshot = backend.fetch_state("x").unwrap();
        assert_eq!(snapshot.badges.len(), 1);
        assert!(snapshot.badges[0].shown);
        assert!(snapshot.notifications.is_empty());
    }

    #[test]
    fn ctf_counter_never_goes_negative() {
        let backend = backend();
        let snapshot = backend.adjust_ctf("x", "pico", -3).unwrap();
        assert_eq!(snapshot.ctf("pico").map(|ctf| ctf.completed), Some(0));

        let snapshot = backend.adjust_ctf("x", "pico", 2).unwrap();
        assert_eq!(snapshot.ctf("pico").map(|ctf| ctf.completed), Some(2));
        assert!(matches!(
            backend.adjust_ctf("x", "nope", 1),
            Err(BackendError::UnknownCtf(_))
        ));
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let backend = backend();
        assert!(matches!(
            backend.toggle_exercise("x", "missing", true),
            Err(BackendError::UnknownExercise(_))
        ));
        assert!(matches!(
            backend.save_notes("x", "missing", "hi"),
            Err(BackendError::UnknownNode(_))
        ));
        assert!(matches!(
            backend.fetch_state("other"),
            Err(BackendError::Store { .. })
        ));
        assert!(matches!(
            backend.mark_shown(&ShownAck::Badge { id: "ghost".into() }),
            Err(BackendError::NothingToMark(_))
        ));
    }

    #[test]
    fn notes_round_into_the_snapshot() {
        let backend = backend();
        let snapshot = backend.save_notes("x", "shell", "use ripgrep").unwrap();
        assert_eq!(
            snapshot.node("shell").map(|node| node.user_notes.as_str()),
            Some("use ripgrep")
        );
        assert_eq!(snapshot.streak.streak, 1);
        assert_eq!(snapshot.current_graph.as_deref(), Some("x"));
    }
}
