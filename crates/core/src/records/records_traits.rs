use async_trait::async_trait;
use serde_json::Value;

use super::EntityFamily;
use crate::errors::Result;
use crate::stores::{BackupTarget, StoreKey};

/// Storage side of the record coordinator. Each mutation is one atomic transaction over the
/// family's primary store, counters and the optional mirror store.
#[async_trait]
pub trait RecordRepositoryTrait: Send + Sync {
    /// Allocates the record key (and nested keys), writes record, counters and mirror.
    async fn insert_record(
        &self,
        family: &'static EntityFamily,
        record: Value,
        backup: Option<BackupTarget>,
    ) -> Result<Value>;

    /// Reads the current record (or a synthesized `{key_path: key}`), merges `patch` into it
    /// and writes record plus mirror.
    async fn update_record(
        &self,
        family: &'static EntityFamily,
        key: StoreKey,
        patch: Value,
        backup: Option<BackupTarget>,
    ) -> Result<Value>;

    /// Deletes the record and writes the mirror. Returns the removed record, if any.
    async fn delete_record(
        &self,
        family: &'static EntityFamily,
        key: StoreKey,
        backup: Option<BackupTarget>,
    ) -> Result<Option<Value>>;

    async fn get_record(&self, store: &str, key: StoreKey) -> Result<Option<Value>>;

    async fn list_records(&self, store: &str) -> Result<Vec<Value>>;

    async fn list_records_by_index(
        &self,
        store: &str,
        index: &str,
        value: Value,
    ) -> Result<Vec<Value>>;
}
