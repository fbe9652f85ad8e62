use std::time::Instant;

use eframe::egui::Vec2;
use tracing::{debug, info, warn};

use crate::client::{BackendCall, Outcome, Request, Response};
use crate::config::EngineConfig;
use crate::layout::LayoutSync;
use crate::roadmap::{AppState, Event, Mutation, NotificationQueue, Rules, reduce};

#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    Refresh,
    SwitchRoadmap(String),
    ToggleExercise { exercise_id: String, completed: bool },
    AdjustCtf { ctf_id: String, delta: i32 },
    SaveNotes { node_id: String, notes: String },
    AcknowledgeNotification,
    DismissStatus,
    Pin { node_id: String, position: Vec2 },
    Release { node_id: String },
}

pub struct Controller {
    roadmap: String,
    config: EngineConfig,
    rules: Rules,
    state: AppState,
    layout: LayoutSync,
    notifications: NotificationQueue,
    next_seq: u64,
    outbox: Vec<Request>,
}

impl Controller {
    pub fn new(config: EngineConfig, roadmap: impl Into<String>) -> Self {
        Self {
            roadmap: roadmap.into(),
            rules: Rules::from_config(&config),
            layout: LayoutSync::new(config.forces, config.start_node_id.clone()),
            notifications: NotificationQueue::new(config.notification_delay()),
            config,
            state: AppState::default(),
            next_seq: 1,
            outbox: Vec::new(),
        }
    }

    pub fn roadmap(&self) -> &str {
        &self.roadmap
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn layout(&self) -> &LayoutSync {
        &self.layout
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn drain_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.outbox)
    }

    fn issue(&mut self, call: BackendCall) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.outbox.push(Request {
            seq,
            roadmap: self.roadmap.clone(),
            call,
        });
        seq
    }

    fn apply(&mut self, event: Event) {
        let applied_before = self.state.applied_seq;
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, event, &self.rules);

        if self.state.applied_seq != applied_before {
            self.on_snapshot_applied();
        }
    }

    fn on_snapshot_applied(&mut self) {
        let (Some(snapshot), Some(view)) = (&self.state.snapshot, &self.state.view) else {
            return;
        };

        if self.layout.is_initialized() {
            self.layout
                .update(&snapshot.nodes, &view.links, &snapshot.unlocked, &view.discovered);
        } else {
            self.layout
                .init(&snapshot.nodes, &view.links, &snapshot.unlocked, &view.discovered);
        }

        self.notifications.enqueue(snapshot.pending_notifications());
    }

    pub fn dispatch(&mut self, intent: Intent) {
        match intent {
            Intent::Refresh => {
                let seq = self.issue(BackendCall::FetchState);
                self.apply(Event::FetchStarted { seq });
            }
            Intent::SwitchRoadmap(roadmap) => {
                if roadmap == self.roadmap && self.state.is_ready() {
                    return;
                }
                info!(from = %self.roadmap, to = %roadmap, "switching roadmap");
                self.roadmap = roadmap;
                self.state = AppState {
                    applied_seq: self.next_seq.saturating_sub(1),
                    ..AppState::default()
                };
                self.layout =
                    LayoutSync::new(self.config.forces, self.config.start_node_id.clone());
                self.notifications = NotificationQueue::new(self.config.notification_delay());
                self.dispatch(Intent::Refresh);
            }
            Intent::ToggleExercise {
                exercise_id,
                completed,
            } => {
                if self.state.is_toggle_in_flight(&exercise_id) {
                    debug!(%exercise_id, "toggle ignored while its previous request is in flight");
                    return;
                }
                let seq = self.issue(BackendCall::ToggleExercise {
                    exercise_id: exercise_id.clone(),
                    completed,
                });
                self.apply(Event::ExerciseToggleRequested {
                    seq,
                    exercise_id,
                    completed,
                });
            }
            Intent::AdjustCtf { ctf_id, delta } => {
                if delta != 0 {
                    self.issue(BackendCall::AdjustCtf { ctf_id, delta });
                }
            }
            Intent::SaveNotes { node_id, notes } => {
                self.issue(BackendCall::SaveNotes { node_id, notes });
            }
            Intent::AcknowledgeNotification => {
                if let Some(ack) = self.notifications.acknowledge() {
                    self.issue(BackendCall::MarkShown(ack));
                }
            }
            Intent::DismissStatus => self.apply(Event::DismissStatus),
            Intent::Pin { node_id, position } => {
                self.layout.pin(&node_id, position);
            }
            Intent::Release { node_id } => {
                self.layout.release(&node_id);
            }
        }
    }

    pub fn handle(&mut self, response: Response, now: Instant) {
        let Response { seq, call, result } = response;

        match result {
            Ok(Outcome::Snapshot(snapshot)) => {
                let stale = self.state.is_stale(seq);
                self.apply(Event::SnapshotArrived { seq, snapshot });
                if stale && call.is_mutation() {
                    debug!(seq, %call, "mutation answered with an outdated snapshot; refetching");
                    self.dispatch(Intent::Refresh);
                }
            }
            Ok(Outcome::Shown) => self.notifications.confirm(Ok::<(), String>(()), now),
            Err(error) => {
                if error.is_network() {
                    warn!(seq, %call, "roadmap backend is unreachable");
                }
                let message = error.to_string();
                match call {
                    BackendCall::FetchState => self.apply(Event::FetchFailed { seq, message }),
                    BackendCall::MarkShown(_) => self.notifications.confirm(Err(error), now),
                    BackendCall::ToggleExercise { exercise_id, .. } => {
                        self.apply(Event::MutationFailed {
                            seq,
                            mutation: Mutation::ToggleExercise { exercise_id },
                            message,
                        })
                    }
                    BackendCall::AdjustCtf { ctf_id, .. } => self.apply(Event::MutationFailed {
                        seq,
                        mutation: Mutation::AdjustCtf { ctf_id },
                        message,
                    }),
                    BackendCall::SaveNotes { node_id, .. } => self.apply(Event::MutationFailed {
                        seq,
                        mutation: Mutation::SaveNotes { node_id },
                        message,
                    }),
                }
            }
        }
    }

    pub fn tick(&mut self, now: Instant) -> bool {
        self.notifications.poll(now);
        let moving = self.layout.tick();
        moving || self.notifications.next_deadline().is_some()
    }
}
