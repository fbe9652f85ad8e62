use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BackendError;
use crate::roadmap::{ShownAck, Snapshot};

use super::RoadmapBackend;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct ExerciseUpdate<'a> {
    exercise_id: &'a str,
    completed: bool,
}

#[derive(Serialize)]
struct NotesUpdate<'a> {
    node_id: &'a str,
    notes: &'a str,
}

#[derive(Serialize)]
enum DataUpdate<'a> {
    #[serde(rename = "exercise_update")]
    Exercise(ExerciseUpdate<'a>),
    #[serde(rename = "notes_update")]
    Notes(NotesUpdate<'a>),
}

#[derive(Serialize)]
struct CtfCount<'a> {
    id: &'a str,
    completed: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BadgeShown<'a> {
    badge_ids: [&'a str; 1],
}

#[derive(Serialize)]
struct LevelShown {
    level: u32,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| BackendError::Http {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn send(&self, url: &str, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().map_err(|source| BackendError::Http {
            url: url.to_owned(),
            source,
        })?;
        let status = response.status();
        let body = response.text().map_err(|source| BackendError::Http {
            url: url.to_owned(),
            source,
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|error| error.error)
                .unwrap_or(body);
            return Err(BackendError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
                body: message,
            });
        }
        Ok(body)
    }

    fn decode_snapshot(url: &str, body: &str) -> Result<Snapshot, BackendError> {
        serde_json::from_str(body).map_err(|source| BackendError::Decode {
            context: url.to_owned(),
            source,
        })
    }

    fn snapshot_or_refetch(
        &self,
        roadmap: &str,
        url: &str,
        body: &str,
    ) -> Result<Snapshot, BackendError> {
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|source| BackendError::Decode {
                context: url.to_owned(),
                source,
            })?;
        if value.get("nodes").is_some() {
            return serde_json::from_value(value).map_err(|source| BackendError::Decode {
                context: url.to_owned(),
                source,
            });
        }
        debug!(url, "mutation answered with a confirmation; refetching state");
        self.fetch_state(roadmap)
    }

    fn post_data(&self, roadmap: &str, update: &DataUpdate<'_>) -> Result<Snapshot, BackendError> {
        let url = self.url("data");
        let body = self.send(
            &url,
            self.client
                .post(&url)
                .query(&[("graph", roadmap)])
                .json(update),
        )?;
        self.snapshot_or_refetch(roadmap, &url, &body)
    }
}

impl RoadmapBackend for HttpBackend {
    fn fetch_state(&self, roadmap: &str) -> Result<Snapshot, BackendError> {
        let url = self.url("data");
        let body = self.send(&url, self.client.get(&url).query(&[("graph", roadmap)]))?;
        Self::decode_snapshot(&url, &body)
    }

    fn toggle_exercise(
        &self,
        roadmap: &str,
        exercise_id: &str,
        completed: bool,
    ) -> Result<Snapshot, BackendError> {
        self.post_data(
            roadmap,
            &DataUpdate::Exercise(ExerciseUpdate {
                exercise_id,
                completed,
            }),
        )
    }

    fn adjust_ctf(
        &self,
        roadmap: &str,
        ctf_id: &str,
        delta: i32,
    ) -> Result<Snapshot, BackendError> {
        let current = self.fetch_state(roadmap)?;
        let ctf = current
            .ctf(ctf_id)
            .ok_or_else(|| BackendError::UnknownCtf(ctf_id.to_owned()))?;
        let completed = (i64::from(ctf.completed) + i64::from(delta)).clamp(0, i64::from(u32::MAX));

        let url = self.url("ctfs");
        let body = self.send(
            &url,
            self.client
                .post(&url)
                .query(&[("graph", roadmap)])
                .json(&[CtfCount {
                    id: ctf_id,
                    completed: completed as u32,
                }]),
        )?;
        self.snapshot_or_refetch(roadmap, &url, &body)
    }

    fn save_notes(
        &self,
        roadmap: &str,
        node_id: &str,
        notes: &str,
    ) -> Result<Snapshot, BackendError> {
        self.post_data(roadmap, &DataUpdate::Notes(NotesUpdate { node_id, notes }))
    }

    fn mark_shown(&self, ack: &ShownAck) -> Result<(), BackendError> {
        let (url, request) = match ack {
            ShownAck::Badge { id } => {
                let url = self.url("update_badges");
                let request = self.client.post(&url).json(&BadgeShown {
                    badge_ids: [id.as_str()],
                });
                (url, request)
            }
            ShownAck::LevelUp { level } => {
                let url = self.url("update_levels");
                let request = self.client.post(&url).json(&LevelShown { level: *level });
                (url, request)
            }
        };
        self.send(&url, request).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_updates_use_server_field_names() {
        let exercise = serde_json::to_value(DataUpdate::Exercise(ExerciseUpdate {
            exercise_id: "xss-1",
            completed: true,
        }))
        .unwrap();
        assert_eq!(
            exercise,
            serde_json::json!({"exercise_update": {"exercise_id": "xss-1", "completed": true}})
        );

        let notes = serde_json::to_value(DataUpdate::Notes(NotesUpdate {
            node_id: "web",
            notes: "burp",
        }))
        .unwrap();
        assert_eq!(
            notes,
            serde_json::json!({"notes_update": {"node_id": "web", "notes": "burp"}})
        );
    }

    #[test]
    fn badge_acknowledgment_names_one_badge() {
        let body = serde_json::to_value(BadgeShown {
            badge_ids: ["ctf-5"],
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"badgeIds": ["ctf-5"]}));
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:5000/").unwrap();
        assert_eq!(backend.base_url(), "http://localhost:5000");
        assert_eq!(backend.url("data"), "http://localhost:5000/data");
    }

    #[test]
    fn unreachable_server_is_a_network_error() {
        let backend = HttpBackend::new("http://127.0.0.1:9").unwrap();
        let error = backend.fetch_state("x").unwrap_err();
        assert!(error.is_network());
    }
}
