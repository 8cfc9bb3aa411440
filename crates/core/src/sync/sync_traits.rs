use async_trait::async_trait;
use serde_json::Value;

use super::{CounterUpdate, IndicatorColor, PushEntry};
use crate::errors::Result;
use crate::reporting::ErrorLogEntry;
use crate::stores::StoreKey;

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// One call to the remote collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub endpoint: String,
    pub payload: Option<Value>,
    pub auth_token: Option<String>,
    /// When false the raw body is returned as a JSON string.
    pub as_json: bool,
    pub timeout_ms: u64,
}

impl RemoteRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            payload: None,
            auth_token: None,
            as_json: true,
            timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn raw(mut self) -> Self {
        self.as_json = false;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Remote side of push, pull and error logging.
///
/// Failures map to `Error::Timeout`, `Error::Network`, `Error::Server` or `Error::Auth`.
#[async_trait]
pub trait RemoteCollaborator: Send + Sync {
    async fn request(&self, request: RemoteRequest) -> Result<Value>;
}

pub trait SyncIndicator: Send + Sync {
    fn set_color(&self, table: &str, color: IndicatorColor);
}

/// What a wholesale store replacement wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceReport {
    /// Distinct keys written, in first-seen order.
    pub written_keys: Vec<StoreKey>,
    /// Items dropped because no key could be resolved.
    pub skipped: usize,
    /// Items that replaced an earlier item of the same batch.
    pub overwritten: usize,
}

/// Store access the synchronizers need.
#[async_trait]
pub trait SyncStoreRepositoryTrait: Send + Sync {
    /// All records of a mirror store with their keys, in key order.
    async fn pending_entries(&self, store: &str) -> Result<Vec<PushEntry>>;

    /// Removes acknowledged records; returns how many existed.
    async fn delete_entries(&self, store: &str, keys: Vec<StoreKey>) -> Result<usize>;

    async fn clear_store(&self, store: &str) -> Result<()>;

    /// Mirror stores currently holding at least one record.
    async fn dirty_stores(&self) -> Result<Vec<String>>;

    /// In one transaction: clear `store`, insert `records`, apply `counters`.
    async fn replace_store(
        &self,
        store: &str,
        records: Vec<Value>,
        counters: Vec<CounterUpdate>,
    ) -> Result<ReplaceReport>;

    async fn stored_keys(&self, store: &str) -> Result<Vec<StoreKey>>;
}

/// Local parking lot for error log entries that could not be delivered.
#[async_trait]
pub trait ErrorQueueRepositoryTrait: Send + Sync {
    async fn enqueue(&self, entry: ErrorLogEntry) -> Result<StoreKey>;

    async fn queued(&self) -> Result<Vec<(StoreKey, ErrorLogEntry)>>;

    async fn remove(&self, keys: Vec<StoreKey>) -> Result<usize>;
}
