use thiserror::Error;
use trimlog_core::errors::Error;

/// Failures raised by the SQLite layer before they are folded into the core taxonomy.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Could not open database: {0}")]
    Open(#[from] diesel::ConnectionError),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] Error),
}

impl StorageError {
    /// SQLite reports a held write lock as "database is locked" once `busy_timeout` expires.
    pub fn is_lock_contention(&self) -> bool {
        match self {
            StorageError::Query(diesel::result::Error::DatabaseError(_, info)) => {
                info.message().contains("database is locked")
            }
            StorageError::Migration(message) => message.contains("database is locked"),
            _ => false,
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Core(inner) => inner,
            StorageError::Pool(e) => Error::Connection(e.to_string()),
            StorageError::Open(e) => Error::Connection(e.to_string()),
            StorageError::Io(e) => Error::Connection(e.to_string()),
            StorageError::Migration(message) => Error::Connection(message),
            StorageError::Query(e) => Error::Transaction(e.to_string()),
        }
    }
}
