use thiserror::Error;

/// Errors that stop a run before or while workers are being set up.
///
/// Request-level failures never show up here; workers absorb them and the
/// counters record them.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid target URL {url}: {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Failed to serialize payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<validator::ValidationErrors> for LoadError {
    fn from(errors: validator::ValidationErrors) -> Self {
        LoadError::InvalidConfig(errors.to_string())
    }
}
