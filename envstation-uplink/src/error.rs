//! Error types for the upload sinks.

use thiserror::Error;

/// Result type alias using [`UploadError`].
pub type Result<T> = std::result::Result<T, UploadError>;

/// Errors that can occur while publishing a reading set.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The sink answered with a status other than the one it signals success with.
    #[error("Upload rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The request never produced a response (DNS, TLS, timeout, connection reset).
    #[error("Upload transport failure: {0}")]
    Transport(String),

    /// Service-account token could not be obtained.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Sink configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl UploadError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// HTTP status code, if the sink answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
