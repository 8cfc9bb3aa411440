use std::time::Duration;

use trimlog_core::sync::DEFAULT_REQUEST_TIMEOUT_MS;

pub const API_URL_ENV: &str = "TRIMLOG_API_URL";
pub const SYNC_TIMEOUT_ENV: &str = "TRIMLOG_SYNC_TIMEOUT_MS";

/// Where the remote collaborator lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    /// Applied to requests that do not carry their own timeout.
    pub default_timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            default_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Reads `TRIMLOG_API_URL` and `TRIMLOG_SYNC_TIMEOUT_MS`.
    ///
    /// Returns `None` when no API URL is configured; remote sync is disabled then.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var(API_URL_ENV)
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())?;

        let timeout = std::env::var(SYNC_TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);

        Some(Self::new(&base_url).with_timeout(Duration::from_millis(timeout)))
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}
