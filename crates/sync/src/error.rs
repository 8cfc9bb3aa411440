//! Error types for the remote sync crate.

use thiserror::Error;
use trimlog_core::errors::Error;
use trimlog_core::sync::{classify_http_status, SyncOutcome};

/// Result type alias for remote calls.
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Errors that can occur while talking to the remote collaborator.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success response from the remote service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request did not finish within its timeout.
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// The remote could not be reached at all.
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid request (bad token, unusable base URL, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RemoteError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Classifies a reqwest failure that happened before a response arrived.
    pub fn from_transport(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout_ms)
        } else if err.is_connect() || err.is_request() {
            Self::Network(err.to_string())
        } else {
            Self::Http(err)
        }
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Timeout(ms) => Error::Timeout(ms),
            RemoteError::Network(message) => Error::Network(message),
            RemoteError::Http(e) if e.is_timeout() => Error::Timeout(0),
            RemoteError::Http(e) => Error::Network(e.to_string()),
            RemoteError::Api { status, message } => match classify_http_status(status) {
                SyncOutcome::AuthError => Error::Auth(message),
                _ => Error::Server(message),
            },
            RemoteError::Json(e) => Error::Serialization(e),
            RemoteError::InvalidRequest(message) => Error::invalid_input(message),
        }
    }
}
