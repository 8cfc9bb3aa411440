use serde_json::Value;
use std::sync::Arc;

use trimlog_core::errors::{Error, Result};
use trimlog_core::reporting::{report_error, ErrorHandling, ErrorReporter};
use trimlog_core::sync::{
    outcome_for_error, IndicatorColor, RemoteCollaborator, RemoteRequest, SyncIndicator,
    TableSyncResult, DEFAULT_REQUEST_TIMEOUT_MS,
};

/// Collaborators and request settings shared by the push and pull synchronizers.
#[derive(Clone)]
pub struct SyncSession {
    remote: Arc<dyn RemoteCollaborator>,
    indicator: Arc<dyn SyncIndicator>,
    reporter: Arc<dyn ErrorReporter>,
    auth_token: Option<String>,
    timeout_ms: u64,
}

impl SyncSession {
    pub fn new(
        remote: Arc<dyn RemoteCollaborator>,
        indicator: Arc<dyn SyncIndicator>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            remote,
            indicator,
            reporter,
            auth_token: None,
            timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub(crate) async fn call(&self, endpoint: &str, payload: Value) -> Result<Value> {
        self.remote
            .request(
                RemoteRequest::new(endpoint)
                    .payload(payload)
                    .auth_token(self.auth_token.clone())
                    .timeout_ms(self.timeout_ms),
            )
            .await
    }

    pub(crate) fn start(&self, table: &str) {
        self.indicator.set_color(table, IndicatorColor::Yellow);
    }

    /// Reports `error` and turns it into the table's result.
    pub(crate) fn failed(&self, table: &str, context: &str, error: Error) -> TableSyncResult {
        let result =
            TableSyncResult::new(table, outcome_for_error(&error)).with_message(error.to_string());
        let _ = report_error(
            self.reporter.as_ref(),
            context,
            error,
            ErrorHandling::report_only(),
        );
        result
    }

    /// Sets the final indicator color of a finished attempt.
    pub(crate) fn finish(&self, result: TableSyncResult) -> TableSyncResult {
        self.indicator.set_color(&result.table, result.outcome.color());
        result
    }
}
