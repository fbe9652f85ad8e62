use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("could not decode response from {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("roadmap store at {path}: {message}")]
    Store { path: PathBuf, message: String },

    #[error("unknown exercise {0}")]
    UnknownExercise(String),

    #[error("unknown ctf {0}")]
    UnknownCtf(String),

    #[error("unknown node {0}")]
    UnknownNode(String),

    #[error("nothing to mark as shown for {0}")]
    NothingToMark(String),

    #[error("backend worker disconnected")]
    Disconnected,
}

impl BackendError {
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Disconnected)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config value {field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_failures_count_as_network_errors() {
        assert!(BackendError::Disconnected.is_network());
        assert!(
            !BackendError::Status {
                url: "http://localhost:5000/data".into(),
                status: 500,
                body: "boom".into(),
            }
            .is_network()
        );
        assert!(!BackendError::UnknownCtf("htb".into()).is_network());
    }
}
