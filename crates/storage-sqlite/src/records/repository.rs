use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value};
use std::sync::Arc;

use trimlog_core::errors::{Error, Result};
use trimlog_core::records::{EntityFamily, NestedSequence, RecordRepositoryTrait};
use trimlog_core::stores::{BackupTarget, StoreKey};

use crate::store::{next_id, record_issued_id, set_path, LocalStoreManager, StoreTx};

/// Gives every element of the nested array an ID, drawing new ones from the nested counter.
fn assign_nested_ids(tx: &mut StoreTx<'_>, nested: &NestedSequence, record: &mut Value) -> Result<()> {
    let Some(items) = record.get_mut(nested.field).and_then(Value::as_array_mut) else {
        return Ok(());
    };

    let mut next = next_id(tx, nested.counter)?;
    let mut highest = None;
    for item in items.iter_mut() {
        let Value::Object(fields) = item else {
            continue;
        };
        let id = match fields.get(nested.key_path).and_then(Value::as_i64) {
            Some(existing) => existing,
            None => {
                let issued = next;
                next += 1;
                fields.insert(nested.key_path.to_string(), Value::from(issued));
                issued
            }
        };
        highest = highest.max(Some(id));
    }

    if let Some(id) = highest {
        record_issued_id(tx, nested.counter, id)?;
    }
    Ok(())
}

fn write_mirror(tx: &mut StoreTx<'_>, backup: Option<&BackupTarget>, payload: &Value) -> Result<()> {
    if let Some(target) = backup {
        tx.add(&target.store, target.mirror_record(payload), None)?;
    }
    Ok(())
}

fn merge_into(current: &mut Value, patch: Value) {
    match (current, patch) {
        (Value::Object(target), Value::Object(fields)) => {
            for (name, value) in fields {
                target.insert(name, value);
            }
        }
        (current, patch) => *current = patch,
    }
}

/// Record coordinator storage: one atomic transaction per mutation over the family's primary
/// store, its counters and the optional mirror store.
pub struct RecordRepository {
    store: Arc<LocalStoreManager>,
}

impl RecordRepository {
    pub fn new(store: Arc<LocalStoreManager>) -> Self {
        Self { store }
    }

    fn scope(family: &EntityFamily, backup: Option<&BackupTarget>) -> Vec<String> {
        family.transaction_scope(backup)
    }
}

#[async_trait]
impl RecordRepositoryTrait for RecordRepository {
    async fn insert_record(
        &self,
        family: &'static EntityFamily,
        mut record: Value,
        backup: Option<BackupTarget>,
    ) -> Result<Value> {
        let scope = Self::scope(family, backup.as_ref());
        let stores: Vec<&str> = scope.iter().map(String::as_str).collect();
        let written = self
            .store
            .write(&stores, move |tx| {
                let id = next_id(tx, family.counter)?;
                if !record.is_object() {
                    return Err(Error::invalid_input(format!(
                        "{} must be a JSON object",
                        family.name
                    )));
                }
                set_path(&mut record, family.key_path, Value::from(id));
                if let Some(nested) = family.nested.as_ref() {
                    assign_nested_ids(tx, nested, &mut record)?;
                }

                tx.add(family.store, record.clone(), None)?;
                record_issued_id(tx, family.counter, id)?;
                write_mirror(tx, backup.as_ref(), &record)?;
                Ok(record)
            })
            .await?;
        debug!("Inserted {} into '{}'", family.name, family.store);
        Ok(written)
    }

    async fn update_record(
        &self,
        family: &'static EntityFamily,
        key: StoreKey,
        patch: Value,
        backup: Option<BackupTarget>,
    ) -> Result<Value> {
        let scope = Self::scope(family, backup.as_ref());
        let stores: Vec<&str> = scope.iter().map(String::as_str).collect();
        self.store
            .write(&stores, move |tx| {
                let mut current = match tx.get(family.store, &key)? {
                    Some(existing) => existing,
                    None => {
                        let mut seed = Value::Object(Map::new());
                        set_path(&mut seed, family.key_path, key.to_value());
                        seed
                    }
                };
                merge_into(&mut current, patch);
                set_path(&mut current, family.key_path, key.to_value());
                if let Some(nested) = family.nested.as_ref() {
                    assign_nested_ids(tx, nested, &mut current)?;
                }

                tx.put(family.store, current.clone(), None)?;
                write_mirror(tx, backup.as_ref(), &current)?;
                Ok(current)
            })
            .await
    }

    async fn delete_record(
        &self,
        family: &'static EntityFamily,
        key: StoreKey,
        backup: Option<BackupTarget>,
    ) -> Result<Option<Value>> {
        let scope = Self::scope(family, backup.as_ref());
        let stores: Vec<&str> = scope.iter().map(String::as_str).collect();
        self.store
            .write(&stores, move |tx| {
                let removed = tx.get(family.store, &key)?;
                tx.delete(family.store, &key)?;

                let payload = match removed.as_ref() {
                    Some(record) => record.clone(),
                    None => {
                        let mut seed = Value::Object(Map::new());
                        set_path(&mut seed, family.key_path, key.to_value());
                        seed
                    }
                };
                write_mirror(tx, backup.as_ref(), &payload)?;
                Ok(removed)
            })
            .await
    }

    async fn get_record(&self, store: &str, key: StoreKey) -> Result<Option<Value>> {
        self.store.get(store, key).await
    }

    async fn list_records(&self, store: &str) -> Result<Vec<Value>> {
        self.store.get_all(store).await
    }

    async fn list_records_by_index(
        &self,
        store: &str,
        index: &str,
        value: Value,
    ) -> Result<Vec<Value>> {
        self.store.get_all_by_index(store, index, value).await
    }
}
