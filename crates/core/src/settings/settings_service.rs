use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    SettingsAggregate, SettingsCache, SettingsProperty, SettingsRepositoryTrait,
    SettingsServiceTrait, SettingsUpdate,
};
use crate::errors::{Error, Result};
use crate::reporting::{self, ErrorReporter};

/// Transactional coordinator for the settings aggregate, fronted by an in-memory cache.
pub struct SettingsService {
    repository: Arc<dyn SettingsRepositoryTrait>,
    reporter: Arc<dyn ErrorReporter>,
    cache: SettingsCache,
}

impl SettingsService {
    pub fn new(
        repository: Arc<dyn SettingsRepositoryTrait>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            repository,
            reporter,
            cache: SettingsCache::new(),
        }
    }

    pub fn cache(&self) -> &SettingsCache {
        &self.cache
    }

    fn reported(&self, context: &str, err: Error) -> Error {
        reporting::reported(self.reporter.as_ref(), context, err)
    }

    async fn verify_persisted(&self, property: SettingsProperty, expected: &Value) -> Result<()> {
        let stored = self.repository.load_settings().await?;
        let actual = stored.as_ref().and_then(|s| s.get(property));
        match actual {
            Some(value) if value == expected => Ok(()),
            Some(_) => Err(Error::verification(format!(
                "stored '{}' differs from the submitted value",
                property.as_str()
            ))),
            None => Err(Error::verification(format!(
                "'{}' was not found after the write",
                property.as_str()
            ))),
        }
    }
}

#[async_trait]
impl SettingsServiceTrait for SettingsService {
    async fn get_settings(&self) -> Result<Option<SettingsAggregate>> {
        let (generation, cached) = self.cache.snapshot();
        if cached.is_some() {
            return Ok(cached);
        }

        let loaded = self.repository.load_settings().await?;
        if let Some(settings) = loaded.as_ref() {
            if !self.cache.fill(generation, settings.clone()) {
                debug!("Settings changed while loading; cache left empty");
            }
        }
        Ok(loaded)
    }

    async fn get_settings_properties(
        &self,
        properties: &[SettingsProperty],
    ) -> Result<BTreeMap<SettingsProperty, Value>> {
        let Some(settings) = self.get_settings().await? else {
            return Ok(BTreeMap::new());
        };
        if properties.is_empty() {
            return Ok(settings.select(&SettingsProperty::ALL));
        }
        Ok(settings.select(properties))
    }

    async fn update_settings(&self, update: SettingsUpdate) -> Result<SettingsAggregate> {
        let SettingsUpdate {
            property,
            data,
            backup,
            wait_for_completion,
        } = update;
        let context = format!("update settings '{}'", property.as_str());

        let written = self
            .repository
            .apply_settings_update(property, data.clone(), backup)
            .await
            .map_err(|err| self.reported(&context, err))?;
        self.cache.invalidate();

        if wait_for_completion {
            self.verify_persisted(property, &data)
                .await
                .map_err(|err| self.reported(&context, err))?;
        }

        debug!("Settings property '{}' updated", property.as_str());
        Ok(written)
    }

    fn invalidate_cache(&self) {
        self.cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::LogErrorReporter;
    use crate::stores::BackupTarget;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySettingsRepository {
        row: Mutex<Option<SettingsAggregate>>,
        mirrors: Mutex<Vec<(BackupTarget, Value)>>,
        loads: AtomicUsize,
        corrupt_writes: bool,
    }

    #[async_trait]
    impl SettingsRepositoryTrait for MemorySettingsRepository {
        async fn load_settings(&self) -> Result<Option<SettingsAggregate>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.row.lock().unwrap().clone())
        }

        async fn apply_settings_update(
            &self,
            property: SettingsProperty,
            data: Value,
            backup: Option<BackupTarget>,
        ) -> Result<SettingsAggregate> {
            let mut row = self.row.lock().unwrap();
            let mut settings = row.clone().unwrap_or_else(|| SettingsAggregate::synthesized(1));
            let stored = if self.corrupt_writes { json!("corrupt") } else { data.clone() };
            settings.set(property, stored);
            if let Some(target) = backup {
                self.mirrors.lock().unwrap().push((target, data));
            }
            *row = Some(settings.clone());
            Ok(settings)
        }
    }

    fn service(repository: Arc<MemorySettingsRepository>) -> SettingsService {
        SettingsService::new(repository, Arc::new(LogErrorReporter))
    }

    #[tokio::test]
    async fn uninitialized_settings_read_as_none() {
        let service = service(Arc::new(MemorySettingsRepository::default()));
        assert!(service.get_settings().await.unwrap().is_none());
        assert!(service
            .get_settings_properties(&[SettingsProperty::Reminders])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn next_read_after_update_reflects_new_value() {
        let repository = Arc::new(MemorySettingsRepository::default());
        let service = service(repository.clone());

        service
            .update_settings(SettingsUpdate::new(
                SettingsProperty::FarrierPrices,
                json!({ "trim": 40 }),
            ))
            .await
            .unwrap();
        let first = service.get_settings().await.unwrap().unwrap();
        assert_eq!(first.get(SettingsProperty::FarrierPrices), Some(&json!({ "trim": 40 })));

        service
            .update_settings(SettingsUpdate::new(
                SettingsProperty::FarrierPrices,
                json!({ "trim": 55 }),
            ))
            .await
            .unwrap();
        let second = service.get_settings().await.unwrap().unwrap();
        assert_eq!(second.get(SettingsProperty::FarrierPrices), Some(&json!({ "trim": 55 })));
    }

    #[tokio::test]
    async fn cached_reads_do_not_hit_the_repository() {
        let repository = Arc::new(MemorySettingsRepository::default());
        let service = service(repository.clone());
        service
            .update_settings(SettingsUpdate::new(SettingsProperty::DateTime, json!({ "tz": "UTC" })))
            .await
            .unwrap();

        service.get_settings().await.unwrap();
        service.get_settings().await.unwrap();
        assert_eq!(repository.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backup_target_is_forwarded_to_the_repository() {
        let repository = Arc::new(MemorySettingsRepository::default());
        let service = service(repository.clone());
        service
            .update_settings(
                SettingsUpdate::new(SettingsProperty::FarrierPrices, json!({ "trim": 40 }))
                    .with_backup("EDITSETTINGS", "farrier_prices"),
            )
            .await
            .unwrap();
        let mirrors = repository.mirrors.lock().unwrap();
        assert_eq!(mirrors.len(), 1);
        assert_eq!(mirrors[0].0.tag, "farrier_prices");
    }

    #[tokio::test]
    async fn wait_for_completion_detects_mismatched_readback() {
        let repository = Arc::new(MemorySettingsRepository {
            corrupt_writes: true,
            ..Default::default()
        });
        let service = service(repository);
        let result = service
            .update_settings(
                SettingsUpdate::new(SettingsProperty::Reminders, json!({ "days": 2 }))
                    .wait_for_completion(),
            )
            .await;
        assert!(matches!(result, Err(Error::Verification(_))));
    }

    #[tokio::test]
    async fn empty_property_request_on_uninitialized_settings_is_empty() {
        let service = service(Arc::new(MemorySettingsRepository::default()));
        assert!(service.get_settings_properties(&[]).await.unwrap().is_empty());
        assert!(service.get_settings().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_property_request_returns_every_present_property() {
        let service = service(Arc::new(MemorySettingsRepository::default()));
        service
            .update_settings(SettingsUpdate::new(SettingsProperty::BlockedDates, json!(["2026-01-01"])))
            .await
            .unwrap();
        let all = service.get_settings_properties(&[]).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key(&SettingsProperty::BlockedDates));
    }
}
