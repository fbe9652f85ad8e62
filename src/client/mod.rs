mod http;
mod worker;

use std::fmt;

use crate::error::BackendError;
use crate::roadmap::{ShownAck, Snapshot};

pub use http::HttpBackend;
pub use worker::Worker;

pub trait RoadmapBackend: Send + Sync {
    fn fetch_state(&self, roadmap: &str) -> Result<Snapshot, BackendError>;

    fn toggle_exercise(
        &self,
        roadmap: &str,
        exercise_id: &str,
        completed: bool,
    ) -> Result<Snapshot, BackendError>;

    fn adjust_ctf(&self, roadmap: &str, ctf_id: &str, delta: i32)
    -> Result<Snapshot, BackendError>;

    fn save_notes(&self, roadmap: &str, node_id: &str, notes: &str)
    -> Result<Snapshot, BackendError>;

    fn mark_shown(&self, ack: &ShownAck) -> Result<(), BackendError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendCall {
    FetchState,
    ToggleExercise { exercise_id: String, completed: bool },
    AdjustCtf { ctf_id: String, delta: i32 },
    SaveNotes { node_id: String, notes: String },
    MarkShown(ShownAck),
}

impl BackendCall {
    pub fn execute(
        &self,
        backend: &dyn RoadmapBackend,
        roadmap: &str,
    ) -> Result<Outcome, BackendError> {
        match self {
            Self::FetchState => backend.fetch_state(roadmap).map(Outcome::Snapshot),
            Self::ToggleExercise {
                exercise_id,
                completed,
            } => backend
                .toggle_exercise(roadmap, exercise_id, *completed)
                .map(Outcome::Snapshot),
            Self::AdjustCtf { ctf_id, delta } => backend
                .adjust_ctf(roadmap, ctf_id, *delta)
                .map(Outcome::Snapshot),
            Self::SaveNotes { node_id, notes } => backend
                .save_notes(roadmap, node_id, notes)
                .map(Outcome::Snapshot),
            Self::MarkShown(ack) => backend.mark_shown(ack).map(|()| Outcome::Shown),
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::FetchState)
    }
}

impl fmt::Display for BackendCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchState => write!(f, "fetch state"),
            Self::ToggleExercise {
                exercise_id,
                completed,
            } => write!(f, "set exercise {exercise_id} to {completed}"),
            Self::AdjustCtf { ctf_id, delta } => write!(f, "adjust ctf {ctf_id} by {delta}"),
            Self::SaveNotes { node_id, .. } => write!(f, "save notes for {node_id}"),
            Self::MarkShown(ack) => write!(f, "mark {ack} shown"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub seq: u64,
    pub roadmap: String,
    pub call: BackendCall,
}

#[derive(Debug)]
pub enum Outcome {
    Snapshot(Snapshot),
    Shown,
}

#[derive(Debug)]
pub struct Response {
    pub seq: u64,
    pub call: BackendCall,
    pub result: Result<Outcome, BackendError>,
}

impl Request {
    pub fn run(self, backend: &dyn RoadmapBackend) -> Response {
        let result = self.call.execute(backend, &self.roadmap);
        Response {
            seq: self.seq,
            call: self.call,
            result,
        }
    }
}
