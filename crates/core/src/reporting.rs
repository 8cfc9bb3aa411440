//! Single error-reporting path for local and sync failures.

use async_trait::async_trait;
use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Error entry as it is sent to the remote log or parked in the local error queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub id: String,
    pub code: String,
    pub message: String,
    pub context: String,
    pub queued_at: String,
}

impl ErrorLogEntry {
    pub fn from_error(error: &Error, context: &str) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            code: error.code().to_string(),
            message: error.to_string(),
            context: context.to_string(),
            queued_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Injected reporter: every component hands its failures to one of these.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    /// Records the failure.
    fn log(&self, error: &Error, context: &str);

    /// Shows a user-facing message.
    fn display(&self, message: &str);

    /// Parks an entry for later delivery to the remote log.
    async fn queue_for_retry(&self, entry: ErrorLogEntry) -> Result<()>;
}

/// Per call site choice between "throw" and "report and continue".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorHandling {
    pub display: Option<String>,
    pub rethrow: bool,
}

impl ErrorHandling {
    pub fn rethrow() -> Self {
        Self {
            display: None,
            rethrow: true,
        }
    }

    pub fn report_only() -> Self {
        Self::default()
    }

    pub fn with_display(mut self, message: impl Into<String>) -> Self {
        self.display = Some(message.into());
        self
    }
}

/// Hands `error` to the reporter and gives it back for propagation with `?`.
pub fn reported(reporter: &dyn ErrorReporter, context: &str, error: Error) -> Error {
    reporter.log(&error, context);
    error
}

/// Logs `error`, optionally displays a message, then re-raises or swallows it.
pub fn report_error(
    reporter: &dyn ErrorReporter,
    context: &str,
    error: Error,
    handling: ErrorHandling,
) -> Result<()> {
    let error = reported(reporter, context, error);
    if let Some(message) = handling.display.as_deref() {
        reporter.display(message);
    }
    if handling.rethrow {
        Err(error)
    } else {
        Ok(())
    }
}

/// Reporter that writes through the `log` facade and never queues.
#[derive(Debug, Default, Clone)]
pub struct LogErrorReporter;

#[async_trait]
impl ErrorReporter for LogErrorReporter {
    fn log(&self, error: &Error, context: &str) {
        error!("[{}] {} ({})", context, error, error.code());
    }

    fn display(&self, message: &str) {
        warn!("{}", message);
    }

    async fn queue_for_retry(&self, entry: ErrorLogEntry) -> Result<()> {
        warn!(
            "Dropping error log entry {} ({}): no error queue configured",
            entry.id, entry.code
        );
        Ok(())
    }
}
