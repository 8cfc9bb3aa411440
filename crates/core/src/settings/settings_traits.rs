use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use super::{SettingsAggregate, SettingsProperty, SettingsUpdate};
use crate::errors::Result;
use crate::stores::BackupTarget;

/// Storage side of the settings coordinator.
#[async_trait]
pub trait SettingsRepositoryTrait: Send + Sync {
    /// Reads the settings row, `None` when it was never written.
    async fn load_settings(&self) -> Result<Option<SettingsAggregate>>;

    /// Read-modify-write of one property plus the optional mirror record, in one transaction.
    async fn apply_settings_update(
        &self,
        property: SettingsProperty,
        data: Value,
        backup: Option<BackupTarget>,
    ) -> Result<SettingsAggregate>;
}

#[async_trait]
pub trait SettingsServiceTrait: Send + Sync {
    /// Full aggregate, or `None` when uninitialized.
    async fn get_settings(&self) -> Result<Option<SettingsAggregate>>;

    /// Requested properties that are present and non-null. An empty request returns every
    /// present property. Uninitialized settings yield an empty map for any request; callers
    /// that must tell "uninitialized" apart from "nothing set" use `get_settings`.
    async fn get_settings_properties(
        &self,
        properties: &[SettingsProperty],
    ) -> Result<BTreeMap<SettingsProperty, Value>>;

    async fn update_settings(&self, update: SettingsUpdate) -> Result<SettingsAggregate>;

    fn invalidate_cache(&self);
}
