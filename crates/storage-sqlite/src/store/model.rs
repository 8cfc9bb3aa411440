use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use trimlog_core::stores::StoreDescriptor;

/// Row of `store_catalog`: one per created logical store.
#[derive(
    Queryable, Identifiable, Insertable, Selectable, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(primary_key(store_name))]
#[diesel(table_name = crate::schema::store_catalog)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StoreCatalogDB {
    pub store_name: String,
    pub kind: String,
    pub key_path: Option<String>,
    pub auto_increment: bool,
    /// JSON array of `{name, keyPath}` objects.
    pub indexes: String,
    pub schema_version: i64,
    pub created_at: String,
}

impl StoreCatalogDB {
    pub fn from_descriptor(descriptor: &StoreDescriptor, schema_version: i64) -> Self {
        let indexes = descriptor
            .indexes
            .iter()
            .map(|idx| serde_json::json!({ "name": idx.name, "keyPath": idx.key_path }))
            .collect::<Vec<_>>();
        Self {
            store_name: descriptor.name.to_string(),
            kind: serde_json::to_value(descriptor.kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            key_path: descriptor.key_path.map(str::to_string),
            auto_increment: descriptor.auto_increment,
            indexes: serde_json::Value::Array(indexes).to_string(),
            schema_version,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
