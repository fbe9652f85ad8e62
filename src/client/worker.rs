use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use tracing::{debug, error};

use crate::error::BackendError;

use super::{RoadmapBackend, Request, Response};

pub struct Worker {
    backend: Arc<dyn RoadmapBackend>,
    tx: Sender<Response>,
    rx: Receiver<Response>,
    failed: VecDeque<Response>,
    in_flight: usize,
}

impl Worker {
    pub fn new(backend: Arc<dyn RoadmapBackend>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            tx,
            rx,
            failed: VecDeque::new(),
            in_flight: 0,
        }
    }

    pub fn submit(&mut self, request: Request) {
        debug!(seq = request.seq, call = %request.call, "dispatching backend request");
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let seq = request.seq;
        let call = request.call.clone();

        let spawned = thread::Builder::new()
            .name(format!("roadmap-request-{seq}"))
            .spawn(move || {
                let response = request.run(backend.as_ref());
                let _ = tx.send(response);
            });

        match spawned {
            Ok(_) => self.in_flight += 1,
            Err(spawn_error) => {
                error!(seq, %spawn_error, "failed to start backend request thread");
                self.failed.push_back(Response {
                    seq,
                    call,
                    result: Err(BackendError::Disconnected),
                });
            }
        }
    }

    pub fn poll(&mut self) -> Vec<Response> {
        let mut ready = self.failed.drain(..).collect::<Vec<_>>();
        loop {
            match self.rx.try_recv() {
                Ok(response) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    ready.push(response);
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        ready
    }

    pub fn wait(&mut self, timeout: Duration) -> Option<Response> {
        if let Some(response) = self.failed.pop_front() {
            return Some(response);
        }
        if self.in_flight == 0 {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(response) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(response)
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight == 0 && self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{BackendCall, Outcome};
    use crate::roadmap::{ShownAck, Snapshot};

    struct Echo;

    impl RoadmapBackend for Echo {
        fn fetch_state(&self, roadmap: &str) -> Result<Snapshot, BackendError> {
            Ok(Snapshot {
                current_graph: Some(roadmap.to_owned()),
                ..Snapshot::default()
            })
        }

        fn toggle_exercise(
            &self,
            _: &str,
            exercise_id: &str,
            _: bool,
        ) -> Result<Snapshot, BackendError> {
            Err(BackendError::UnknownExercise(exercise_id.to_owned()))
        }

        fn adjust_ctf(&self, _: &str, ctf_id: &str, _: i32) -> Result<Snapshot, BackendError> {
            Err(BackendError::UnknownCtf(ctf_id.to_owned()))
        }

        fn save_notes(&self, roadmap: &str, _: &str, _: &str) -> Result<Snapshot, BackendError> {
            self.fetch_state(roadmap)
        }

        fn mark_shown(&self, _: &ShownAck) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[test]
    fn responses_come_back_with_their_sequence_numbers() {
        let mut worker = Worker::new(Arc::new(Echo));
        worker.submit(Request {
            seq: 7,
            roadmap: "x".into(),
            call: BackendCall::FetchState,
        });
        worker.submit(Request {
            seq: 8,
            roadmap: "x".into(),
            call: BackendCall::ToggleExercise {
                exercise_id: "nope".into(),
                completed: true,
            },
        });
        assert_eq!(worker.in_flight(), 2);

        let mut responses = Vec::new();
        while let Some(response) = worker.wait(Duration::from_secs(5)) {
            responses.push(response);
        }
        responses.sort_by_key(|response| response.seq);

        assert!(worker.is_idle());
        assert!(matches!(
            &responses[0].result,
            Ok(Outcome::Snapshot(snapshot)) if snapshot.current_graph.as_deref() == Some("x")
        ));
        assert!(matches!(
            &responses[1].result,
            Err(BackendError::UnknownExercise(id)) if id == "nope"
        ));
        assert!(worker.poll().is_empty());
    }
}
