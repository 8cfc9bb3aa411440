use async_trait::async_trait;
use log::warn;
use std::sync::Arc;

use trimlog_core::errors::Result;
use trimlog_core::reporting::ErrorLogEntry;
use trimlog_core::stores::{names, StoreKey};
use trimlog_core::sync::ErrorQueueRepositoryTrait;

use crate::store::LocalStoreManager;

/// Error log entries waiting for the remote log to become reachable.
pub struct ErrorQueueRepository {
    store: Arc<LocalStoreManager>,
}

impl ErrorQueueRepository {
    pub fn new(store: Arc<LocalStoreManager>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ErrorQueueRepositoryTrait for ErrorQueueRepository {
    /// Writes without reporting: a failure here must not produce another entry to queue.
    async fn enqueue(&self, entry: ErrorLogEntry) -> Result<StoreKey> {
        let value = serde_json::to_value(&entry)?;
        self.store
            .write(&[names::ERROR_QUEUE], move |tx| {
                tx.add(names::ERROR_QUEUE, value, None)
            })
            .await
    }

    async fn queued(&self) -> Result<Vec<(StoreKey, ErrorLogEntry)>> {
        let entries = self.store.get_all_entries(names::ERROR_QUEUE).await?;
        let mut queued = Vec::with_capacity(entries.len());
        for (key, record) in entries {
            match serde_json::from_value::<ErrorLogEntry>(record) {
                Ok(entry) => queued.push((key, entry)),
                Err(e) => warn!("Unreadable error queue entry {}: {}", key, e),
            }
        }
        Ok(queued)
    }

    async fn remove(&self, keys: Vec<StoreKey>) -> Result<usize> {
        self.store
            .write(&[names::ERROR_QUEUE], move |tx| {
                let mut removed = 0;
                for key in &keys {
                    if tx.delete(names::ERROR_QUEUE, key)? {
                        removed += 1;
                    }
                }
                Ok(removed)
            })
            .await
    }
}
