use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::model::Badge;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NotificationItem {
    Badge {
        id: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        image: String,
    },
    LevelUp {
        level: u32,
    },
    #[serde(other)]
    Unknown,
}

impl From<&Badge> for NotificationItem {
    fn from(badge: &Badge) -> Self {
        Self::Badge {
            id: badge.id.clone(),
            title: badge.title.clone(),
            description: badge.description.clone(),
            image: badge.image.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ShownAck {
    Badge { id: String },
    LevelUp { level: u32 },
}

impl fmt::Display for ShownAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Badge { id } => write!(f, "badge {id}"),
            Self::LevelUp { level } => write!(f, "level {level}"),
        }
    }
}

impl NotificationItem {
    pub fn ack(&self) -> Option<ShownAck> {
        match self {
            Self::Badge { id, .. } => Some(ShownAck::Badge { id: id.clone() }),
            Self::LevelUp { level } => Some(ShownAck::LevelUp { level: *level }),
            Self::Unknown => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Showing(NotificationItem),
    Confirming(NotificationItem),
    Pacing { until: Instant },
}

#[derive(Debug)]
pub struct NotificationQueue {
    pending: VecDeque<NotificationItem>,
    phase: Phase,
    known: HashSet<ShownAck>,
    delay: Duration,
}

impl NotificationQueue {
    pub fn new(delay: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            phase: Phase::Idle,
            known: HashSet::new(),
            delay,
        }
    }

    pub fn enqueue(&mut self, items: impl IntoIterator<Item = NotificationItem>) {
        for item in items {
            match item.ack() {
                Some(key) => {
                    if self.known.insert(key) {
                        self.pending.push_back(item);
                    }
                }
                None => warn!("skipping notification of unknown type"),
            }
        }

        if self.phase == Phase::Idle {
            self.present_next();
        }
    }

    pub fn current(&self) -> Option<&NotificationItem> {
        match &self.phase {
            Phase::Showing(item) | Phase::Confirming(item) => Some(item),
            Phase::Idle | Phase::Pacing { .. } => None,
        }
    }

    pub fn is_showing(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    pub fn is_confirming(&self) -> bool {
        matches!(self.phase, Phase::Confirming(_))
    }

    pub fn len(&self) -> usize {
        let in_flight = usize::from(matches!(
            self.phase,
            Phase::Showing(_) | Phase::Confirming(_)
        ));
        self.pending.len() + in_flight
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn acknowledge(&mut self) -> Option<ShownAck> {
        let Phase::Showing(item) = &self.phase else {
            return None;
        };
        let item = item.clone();
        let ack = item.ack();
        self.phase = Phase::Confirming(item);
        ack
    }

    pub fn confirm<E: fmt::Display>(&mut self, result: Result<(), E>, now: Instant) {
        let Phase::Confirming(item) = &self.phase else {
            debug!("shown confirmation arrived with nothing awaiting it");
            return;
        };

        if let Err(error) = result
            && let Some(key) = item.ack()
        {
            warn!(
                %key,
                %error,
                "failed to record notification as shown; it will return on a later refresh"
            );
            self.known.remove(&key);
        }

        self.phase = Phase::Pacing {
            until: now + self.delay,
        };
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        let Phase::Pacing { until } = self.phase else {
            return false;
        };
        if now < until {
            return false;
        }
        self.phase = Phase::Idle;
        self.present_next();
        true
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Pacing { until } => Some(until),
            _ => None,
        }
    }

    fn present_next(&mut self) {
        if let Some(item) = self.pending.pop_front() {
            debug!(?item, "presenting notification");
            self.phase = Phase::Showing(item);
        }
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}
