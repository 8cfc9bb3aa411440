use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;

use trimlog_core::errors::{Error, Result};
use trimlog_core::stores::{descriptor, mirror_store_names, StoreKey, StoreKind};
use trimlog_core::sync::{CounterUpdate, PushEntry, ReplaceReport, SyncStoreRepositoryTrait};

use crate::store::{record_issued_id, LocalStoreManager};

/// Counter updates that target a real counter store; anything else is dropped with a warning.
fn usable_counters(counters: Vec<CounterUpdate>) -> Vec<CounterUpdate> {
    counters
        .into_iter()
        .filter(|update| match descriptor(&update.store) {
            Some(desc) if desc.kind == StoreKind::Counter => {
                if desc.key_path != Some(update.key_path.as_str()) {
                    warn!(
                        "Counter '{}' reported key path '{}', using '{}'",
                        update.store,
                        update.key_path,
                        desc.key_path.unwrap_or_default()
                    );
                }
                true
            }
            _ => {
                warn!("Ignoring counter update for unknown store '{}'", update.store);
                false
            }
        })
        .collect()
}

pub struct SyncStoreRepository {
    store: Arc<LocalStoreManager>,
}

impl SyncStoreRepository {
    pub fn new(store: Arc<LocalStoreManager>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SyncStoreRepositoryTrait for SyncStoreRepository {
    async fn pending_entries(&self, store: &str) -> Result<Vec<PushEntry>> {
        Ok(self
            .store
            .get_all_entries(store)
            .await?
            .into_iter()
            .map(|(key, record)| PushEntry { key, record })
            .collect())
    }

    async fn delete_entries(&self, store: &str, keys: Vec<StoreKey>) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let name = store.to_string();
        self.store
            .write(&[store], move |tx| {
                let mut removed = 0;
                for key in &keys {
                    if tx.delete(&name, key)? {
                        removed += 1;
                    }
                }
                Ok(removed)
            })
            .await
    }

    async fn clear_store(&self, store: &str) -> Result<()> {
        self.store.clear(store).await
    }

    async fn dirty_stores(&self) -> Result<Vec<String>> {
        let mirrors = mirror_store_names();
        let scope = mirrors.clone();
        self.store
            .read(&scope, move |tx| {
                let mut dirty = Vec::new();
                for name in mirrors {
                    if tx.count(name)? > 0 {
                        dirty.push(name.to_string());
                    }
                }
                Ok(dirty)
            })
            .await
    }

    async fn replace_store(
        &self,
        store: &str,
        records: Vec<Value>,
        counters: Vec<CounterUpdate>,
    ) -> Result<ReplaceReport> {
        let desc = descriptor(store)
            .ok_or_else(|| Error::invalid_input(format!("store '{}' is not part of the schema", store)))?;
        if desc.key_path.is_none() && !desc.auto_increment {
            return Err(Error::invalid_input(format!(
                "store '{}' has no key path to replace records by",
                store
            )));
        }

        let counters = usable_counters(counters);
        let mut scope = vec![store.to_string()];
        for update in &counters {
            if !scope.contains(&update.store) {
                scope.push(update.store.clone());
            }
        }
        let stores: Vec<&str> = scope.iter().map(String::as_str).collect();
        let name = store.to_string();

        let report = self
            .store
            .write(&stores, move |tx| {
                let mut report = ReplaceReport::default();
                tx.clear(&name)?;
                for record in records {
                    if desc.key_path.is_some() && desc.key_of(&record).is_none() {
                        report.skipped += 1;
                        continue;
                    }
                    let key = tx.put(&name, record, None)?;
                    if report.written_keys.contains(&key) {
                        report.overwritten += 1;
                    } else {
                        report.written_keys.push(key);
                    }
                }
                for update in &counters {
                    record_issued_id(tx, &update.store, update.id)?;
                }
                Ok(report)
            })
            .await?;

        if report.skipped > 0 {
            warn!(
                "Skipped {} record(s) without a key while replacing '{}'",
                report.skipped, store
            );
        }
        if report.overwritten > 0 {
            warn!(
                "{} record(s) repeated an earlier key while replacing '{}'",
                report.overwritten, store
            );
        }
        debug!(
            "Replaced '{}' with {} record(s)",
            store,
            report.written_keys.len()
        );
        Ok(report)
    }

    async fn stored_keys(&self, store: &str) -> Result<Vec<StoreKey>> {
        Ok(self
            .store
            .get_all_entries(store)
            .await?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }
}
