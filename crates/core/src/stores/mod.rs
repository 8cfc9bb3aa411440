//! Logical store model: keys, schema descriptors and the fixed catalog.

mod catalog;
mod key;

pub use catalog::*;
pub use key::StoreKey;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Access mode declared when a transaction is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

/// Role a store plays in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Primary,
    Settings,
    Counter,
    Mirror,
    ErrorQueue,
}

/// Secondary index over a record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: &'static str,
    pub key_path: &'static str,
}

/// Fixed schema descriptor of a logical store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreDescriptor {
    pub name: &'static str,
    pub kind: StoreKind,
    /// In-line key path; `None` means keys are out-of-line.
    pub key_path: Option<&'static str>,
    pub auto_increment: bool,
    pub indexes: &'static [IndexDescriptor],
    /// Schema version that introduced the store.
    pub since_version: i64,
}

impl StoreDescriptor {
    pub fn index(&self, name: &str) -> Option<&IndexDescriptor> {
        self.indexes.iter().find(|idx| idx.name == name)
    }

    /// Reads the in-line key of `record`, if the store has a key path and the field is set.
    pub fn key_of(&self, record: &Value) -> Option<StoreKey> {
        let path = self.key_path?;
        lookup_path(record, path).and_then(StoreKey::from_value)
    }
}

/// Resolves a dotted key path inside a JSON object.
pub fn lookup_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |current, segment| current.get(segment))
        .filter(|value| !value.is_null())
}

/// Mirror store and operation tag written next to a primary mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupTarget {
    pub store: String,
    pub tag: String,
}

impl BackupTarget {
    pub fn new(store: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            tag: tag.into(),
        }
    }

    /// Builds the mirror record: the mutation payload plus `"<tag>": true`.
    pub fn mirror_record(&self, payload: &Value) -> Value {
        let mut record = match payload {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other.clone());
                map
            }
        };
        record.insert(self.tag.clone(), Value::Bool(true));
        record.insert(
            "queued_at".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        Value::Object(record)
    }
}
