//! Error types for agency-topology

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Agency transport ===
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Agency returned {status}: {message}")]
    Agency { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Topology mutation ===
    #[error("Write rejected by agency: {0}")]
    WriteRejected(String),

    #[error("Concurrent modification detected at {0}")]
    Conflict(String),

    #[error("Partially applied: {applied} succeeded, then {failed}")]
    PartiallyApplied {
        applied: String,
        #[source]
        failed: Box<Error>,
    },

    // === Topology data ===
    #[error("Corrupted topology entry: {0}")]
    Corrupted(String),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    /// Is this a retryable error?
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::Agency { status, .. } => *status >= 500,
            Error::Conflict(_) => true,
            _ => false,
        }
    }
}
