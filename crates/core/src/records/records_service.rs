use log::debug;
use serde_json::Value;
use std::sync::Arc;

use super::{EntityFamily, MutationOptions, RecordOperation, RecordRepositoryTrait};
use crate::errors::{Error, Result};
use crate::reporting::{self, ErrorReporter};
use crate::stores::{lookup_path, StoreKey};

/// Read-modify-write coordinator shared by every keyed entity family.
///
/// The repository performs each mutation as one atomic transaction; this layer resolves the
/// mirror target, funnels failures through the reporter and optionally verifies the write.
#[derive(Clone)]
pub struct RecordCoordinator {
    repository: Arc<dyn RecordRepositoryTrait>,
    reporter: Arc<dyn ErrorReporter>,
}

impl RecordCoordinator {
    pub fn new(
        repository: Arc<dyn RecordRepositoryTrait>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            repository,
            reporter,
        }
    }

    fn reported(&self, context: &str, err: Error) -> Error {
        reporting::reported(self.reporter.as_ref(), context, err)
    }

    pub async fn insert(
        &self,
        family: &'static EntityFamily,
        record: Value,
        options: MutationOptions,
    ) -> Result<Value> {
        let context = format!("add {}", family.name);
        if !record.is_object() {
            return Err(self.reported(
                &context,
                Error::invalid_input(format!("{} must be a JSON object", family.name)),
            ));
        }

        let backup = options.resolve(family, RecordOperation::Add);
        let written = self
            .repository
            .insert_record(family, record, backup)
            .await
            .map_err(|err| self.reported(&context, err))?;

        if options.wait_for_completion {
            self.verify_written(family, &written)
                .await
                .map_err(|err| self.reported(&context, err))?;
        }
        debug!("Added {} to '{}'", family.name, family.store);
        Ok(written)
    }

    pub async fn update(
        &self,
        family: &'static EntityFamily,
        key: StoreKey,
        patch: Value,
        options: MutationOptions,
    ) -> Result<Value> {
        let context = format!("update {} {}", family.name, key);
        if !patch.is_object() {
            return Err(self.reported(
                &context,
                Error::invalid_input(format!("{} patch must be a JSON object", family.name)),
            ));
        }

        let backup = options.resolve(family, RecordOperation::Edit);
        let written = self
            .repository
            .update_record(family, key, patch, backup)
            .await
            .map_err(|err| self.reported(&context, err))?;

        if options.wait_for_completion {
            self.verify_written(family, &written)
                .await
                .map_err(|err| self.reported(&context, err))?;
        }
        Ok(written)
    }

    pub async fn delete(
        &self,
        family: &'static EntityFamily,
        key: StoreKey,
        options: MutationOptions,
    ) -> Result<Option<Value>> {
        let context = format!("delete {} {}", family.name, key);
        let backup = options.resolve(family, RecordOperation::Delete);
        let removed = self
            .repository
            .delete_record(family, key.clone(), backup)
            .await
            .map_err(|err| self.reported(&context, err))?;

        if options.wait_for_completion {
            let still_there = self
                .repository
                .get_record(family.store, key.clone())
                .await
                .map_err(|err| self.reported(&context, err))?;
            if still_there.is_some() {
                return Err(self.reported(
                    &context,
                    Error::verification(format!("{} {} still present after delete", family.name, key)),
                ));
            }
        }
        Ok(removed)
    }

    pub async fn get(&self, family: &'static EntityFamily, key: StoreKey) -> Result<Option<Value>> {
        self.repository.get_record(family.store, key).await
    }

    pub async fn list(&self, family: &'static EntityFamily) -> Result<Vec<Value>> {
        self.repository.list_records(family.store).await
    }

    pub async fn list_by_index(
        &self,
        family: &'static EntityFamily,
        index: &str,
        value: Value,
    ) -> Result<Vec<Value>> {
        self.repository
            .list_records_by_index(family.store, index, value)
            .await
    }

    async fn verify_written(&self, family: &EntityFamily, written: &Value) -> Result<()> {
        let key = lookup_path(written, family.key_path)
            .and_then(StoreKey::from_value)
            .ok_or_else(|| {
                Error::verification(format!("written {} carries no '{}'", family.name, family.key_path))
            })?;
        let persisted = self.repository.get_record(family.store, key.clone()).await?;
        match persisted {
            Some(value) if &value == written => Ok(()),
            Some(_) => Err(Error::verification(format!(
                "stored {} {} differs from the submitted value",
                family.name, key
            ))),
            None => Err(Error::verification(format!(
                "{} {} was not found after the write",
                family.name, key
            ))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::records::NOTE_FAMILY;
    use crate::reporting::LogErrorReporter;
    use crate::stores::BackupTarget;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory stand-in for the SQLite repository, shared with the entity service tests.
    #[derive(Default)]
    pub(crate) struct MemoryRecordRepository {
        pub stores: Mutex<BTreeMap<String, BTreeMap<StoreKey, Value>>>,
        pub mirrors: Mutex<Vec<(BackupTarget, Value)>>,
        pub counters: Mutex<BTreeMap<String, i64>>,
        pub drop_writes: bool,
    }

    impl MemoryRecordRepository {
        fn next_id(&self, counter: &str) -> i64 {
            let mut counters = self.counters.lock().unwrap();
            let next = counters.get(counter).copied().unwrap_or(0) + 1;
            counters.insert(counter.to_string(), next);
            next
        }

        fn mirror(&self, backup: Option<BackupTarget>, payload: &Value) {
            if let Some(target) = backup {
                let record = target.mirror_record(payload);
                self.mirrors.lock().unwrap().push((target, record));
            }
        }

        fn store(&self, store: &str, key: StoreKey, record: Value) {
            if self.drop_writes {
                return;
            }
            self.stores
                .lock()
                .unwrap()
                .entry(store.to_string())
                .or_default()
                .insert(key, record);
        }
    }

    #[async_trait]
    impl RecordRepositoryTrait for MemoryRecordRepository {
        async fn insert_record(
            &self,
            family: &'static EntityFamily,
            mut record: Value,
            backup: Option<BackupTarget>,
        ) -> Result<Value> {
            let id = self.next_id(family.counter);
            record[family.key_path] = json!(id);
            if let Some(nested) = family.nested {
                if let Some(items) = record.get_mut(nested.field).and_then(Value::as_array_mut) {
                    for item in items.iter_mut() {
                        if item.get(nested.key_path).is_none() {
                            item[nested.key_path] = json!(self.next_id(nested.counter));
                        }
                    }
                }
            }
            self.store(family.store, StoreKey::Int(id), record.clone());
            self.mirror(backup, &record);
            Ok(record)
        }

        async fn update_record(
            &self,
            family: &'static EntityFamily,
            key: StoreKey,
            patch: Value,
            backup: Option<BackupTarget>,
        ) -> Result<Value> {
            let mut current = self
                .get_record(family.store, key.clone())
                .await?
                .unwrap_or_else(|| json!({ family.key_path: key.to_value() }));
            if let (Some(target), Some(fields)) = (current.as_object_mut(), patch.as_object()) {
                for (field, value) in fields {
                    target.insert(field.clone(), value.clone());
                }
            }
            self.store(family.store, key, current.clone());
            self.mirror(backup, &current);
            Ok(current)
        }

        async fn delete_record(
            &self,
            family: &'static EntityFamily,
            key: StoreKey,
            backup: Option<BackupTarget>,
        ) -> Result<Option<Value>> {
            let removed = self
                .stores
                .lock()
                .unwrap()
                .get_mut(family.store)
                .and_then(|store| store.remove(&key));
            let payload = removed
                .clone()
                .unwrap_or_else(|| json!({ family.key_path: key.to_value() }));
            self.mirror(backup, &payload);
            Ok(removed)
        }

        async fn get_record(&self, store: &str, key: StoreKey) -> Result<Option<Value>> {
            Ok(self
                .stores
                .lock()
                .unwrap()
                .get(store)
                .and_then(|records| records.get(&key).cloned()))
        }

        async fn list_records(&self, store: &str) -> Result<Vec<Value>> {
            Ok(self
                .stores
                .lock()
                .unwrap()
                .get(store)
                .map(|records| records.values().cloned().collect())
                .unwrap_or_default())
        }

        async fn list_records_by_index(
            &self,
            store: &str,
            index: &str,
            value: Value,
        ) -> Result<Vec<Value>> {
            let records = self.list_records(store).await?;
            Ok(records
                .into_iter()
                .filter(|record| record.get(index) == Some(&value))
                .collect())
        }
    }

    fn coordinator(repository: Arc<MemoryRecordRepository>) -> RecordCoordinator {
        RecordCoordinator::new(repository, Arc::new(LogErrorReporter))
    }

    #[tokio::test]
    async fn insert_writes_family_mirror_by_default() {
        let repository = Arc::new(MemoryRecordRepository::default());
        let written = coordinator(repository.clone())
            .insert(&NOTE_FAMILY, json!({ "note": "farrier visit" }), MutationOptions::default())
            .await
            .unwrap();

        assert_eq!(written["noteID"], json!(1));
        let mirrors = repository.mirrors.lock().unwrap();
        assert_eq!(mirrors.len(), 1);
        assert_eq!(mirrors[0].0.store, "ADDNOTE");
        assert_eq!(mirrors[0].1["add_note"], json!(true));
    }

    #[tokio::test]
    async fn local_only_mutation_leaves_no_mirror() {
        let repository = Arc::new(MemoryRecordRepository::default());
        coordinator(repository.clone())
            .insert(&NOTE_FAMILY, json!({ "note": "x" }), MutationOptions::local_only())
            .await
            .unwrap();
        assert!(repository.mirrors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_record_starts_from_its_key() {
        let repository = Arc::new(MemoryRecordRepository::default());
        let written = coordinator(repository)
            .update(
                &NOTE_FAMILY,
                StoreKey::Int(9),
                json!({ "note": "new" }),
                MutationOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(written, json!({ "noteID": 9, "note": "new" }));
    }

    #[tokio::test]
    async fn verification_fails_when_the_write_did_not_land() {
        let repository = Arc::new(MemoryRecordRepository {
            drop_writes: true,
            ..Default::default()
        });
        let result = coordinator(repository)
            .insert(
                &NOTE_FAMILY,
                json!({ "note": "lost" }),
                MutationOptions::default().verified(),
            )
            .await;
        assert!(matches!(result, Err(Error::Verification(_))));
    }

    #[tokio::test]
    async fn non_object_payload_is_rejected() {
        let repository = Arc::new(MemoryRecordRepository::default());
        let result = coordinator(repository)
            .insert(&NOTE_FAMILY, json!("text"), MutationOptions::default())
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
