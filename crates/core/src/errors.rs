//! Error taxonomy shared by the storage and sync layers.

use thiserror::Error;

/// Result alias used across the core crate and its implementors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the local store, the coordinators and the synchronizers.
#[derive(Debug, Error)]
pub enum Error {
    /// Opening the local connection or upgrading its schema failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The schema upgrade could not proceed because another handle holds the database.
    #[error("Schema upgrade blocked: {0}")]
    Blocked(String),

    /// A store operation failed inside a transaction.
    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The remote call exceeded its timeout.
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    /// The remote collaborator reported a failure.
    #[error("Server error: {0}")]
    Server(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    /// A post-write read-back did not match the submitted value.
    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Input problems detected before any store operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("store name is missing")]
    MissingStoreName,

    #[error("key is missing for store '{0}'")]
    MissingKey(String),

    #[error("payload is missing for store '{0}'")]
    MissingPayload(String),

    #[error("store '{0}' is not part of the schema")]
    UnknownStore(String),

    #[error("index '{index}' does not exist on store '{store}'")]
    UnknownIndex { store: String, index: String },

    #[error("{0}")]
    InvalidInput(String),
}

impl Error {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction(message.into())
    }

    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::InvalidInput(message.into()))
    }

    /// Stable code used when the error is logged remotely or queued.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::Blocked(_) => "UPGRADE_BLOCKED",
            Self::Transaction(_) => "TRANSACTION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Timeout(_) => "REQUEST_TIMEOUT",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Server(_) => "SERVER_ERROR",
            Self::Auth(_) => "AUTH_ERROR",
            Self::Verification(_) => "VERIFICATION_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// True when the failure happened before the remote side answered.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Network(_))
    }
}
