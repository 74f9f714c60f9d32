//! Worker error types.

use thiserror::Error;

use shortcast_media::MediaError;
use shortcast_models::ConfigError;
use shortcast_timeline::TimelineError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid thread reference: {0}")]
    InvalidThread(String),

    #[error("Content fetch failed: {0}")]
    ContentFetch(String),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Thread already produced: {0}")]
    AlreadyProduced(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn content_fetch(msg: impl Into<String>) -> Self {
        Self::ContentFetch(msg.into())
    }

    pub fn ledger(msg: impl Into<String>) -> Self {
        Self::Ledger(msg.into())
    }

    /// Check if a later attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::ContentFetch(_) | WorkerError::Http(_) => true,
            WorkerError::Timeline(e) => matches!(
                e,
                TimelineError::ContentUnavailable(_)
                    | TimelineError::TotalSelectionFailure { .. }
                    | TimelineError::SynthesisTimeout(_)
            ),
            WorkerError::Media(e) => matches!(e, MediaError::Timeout(_)),
            _ => false,
        }
    }

    /// Already-produced threads are skipped, not failed.
    pub fn is_skip(&self) -> bool {
        matches!(self, WorkerError::AlreadyProduced(_))
    }
}

impl From<ConfigError> for WorkerError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}
