use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use trimlog_core::errors::Result;
use trimlog_core::settings::{
    SettingsAggregate, SettingsProperty, SettingsRepositoryTrait, DEFAULT_SETTINGS_USER_ID,
};
use trimlog_core::stores::{names, BackupTarget};

use crate::store::{LocalStoreManager, StoreTx};

fn load_row(tx: &mut StoreTx<'_>) -> Result<Option<SettingsAggregate>> {
    match tx.get_all(names::SETTINGS)?.into_iter().next() {
        Some(record) => Ok(Some(SettingsAggregate::from_record(&record)?)),
        None => Ok(None),
    }
}

/// The settings row lives alone in the `settings` store.
pub struct SettingsRepository {
    store: Arc<LocalStoreManager>,
}

impl SettingsRepository {
    pub fn new(store: Arc<LocalStoreManager>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SettingsRepositoryTrait for SettingsRepository {
    async fn load_settings(&self) -> Result<Option<SettingsAggregate>> {
        self.store.read(&[names::SETTINGS], load_row).await
    }

    async fn apply_settings_update(
        &self,
        property: SettingsProperty,
        data: Value,
        backup: Option<BackupTarget>,
    ) -> Result<SettingsAggregate> {
        let mut stores = vec![names::SETTINGS.to_string()];
        if let Some(target) = backup.as_ref() {
            stores.push(target.store.clone());
        }
        let scope: Vec<&str> = stores.iter().map(String::as_str).collect();

        self.store
            .write(&scope, move |tx| {
                let mut settings = load_row(tx)?
                    .unwrap_or_else(|| SettingsAggregate::synthesized(DEFAULT_SETTINGS_USER_ID));
                settings.set(property, data.clone());
                tx.put_clear_first(names::SETTINGS, settings.to_record()?, None)?;

                if let Some(target) = backup.as_ref() {
                    let mut change = Map::new();
                    change.insert("userID".to_string(), Value::from(settings.user_id));
                    change.insert(property.as_str().to_string(), data);
                    tx.add(&target.store, target.mirror_record(&Value::Object(change)), None)?;
                }
                Ok(settings)
            })
            .await
    }
}
