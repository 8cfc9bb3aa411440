//! Pull synchronizer: fetches canonical tables and settings properties and lands them locally.

use futures::future::join_all;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

use trimlog_core::errors::{Error, Result};
use trimlog_core::settings::{SettingsProperty, SettingsServiceTrait, SettingsUpdate};
use trimlog_core::stores::StoreKey;
use trimlog_core::sync::{
    classify_completion, outcome_for_pull_status, pull_table, PullRequestPayload, PullResponse,
    PullTable, PullTarget, SyncOutcome, SyncStoreRepositoryTrait, SyncSummary, TableSyncResult,
    PULL_ENDPOINT, PULL_TABLES,
};

use crate::session::SyncSession;

pub struct PullSynchronizer {
    session: SyncSession,
    repository: Arc<dyn SyncStoreRepositoryTrait>,
    settings: Arc<dyn SettingsServiceTrait>,
}

impl PullSynchronizer {
    pub fn new(
        session: SyncSession,
        repository: Arc<dyn SyncStoreRepositoryTrait>,
        settings: Arc<dyn SettingsServiceTrait>,
    ) -> Self {
        Self {
            session,
            repository,
            settings,
        }
    }

    /// Pulls every fixed table concurrently.
    pub async fn pull_all(&self) -> SyncSummary {
        let results = join_all(PULL_TABLES.iter().map(|table| self.pull_one(table))).await;
        let summary = SyncSummary::from_results(results, PULL_TABLES.len());
        info!(
            "Pull finished: {} successful, {} partial, {} failed, {} no data, {} server errors, {} auth errors ({}/{})",
            summary.successful,
            summary.partial,
            summary.failed,
            summary.no_data,
            summary.server_error,
            summary.auth_error,
            summary.processed,
            summary.total
        );
        summary
    }

    /// Pulls a subset of the fixed tables by name. Unknown names fail without a remote call.
    pub async fn pull_tables(&self, names: &[&str]) -> SyncSummary {
        let results = join_all(names.iter().map(|name| async move {
            match pull_table(name) {
                Some(table) => self.pull_one(table).await,
                None => {
                    let error = Error::invalid_input(format!("'{}' is not a pull table", name));
                    self.session
                        .finish(self.session.failed(name, &format!("pull {}", name), error))
                }
            }
        }))
        .await;
        SyncSummary::from_results(results, PULL_TABLES.len())
    }

    pub async fn pull_one(&self, table: &PullTable) -> TableSyncResult {
        self.session.start(table.name);
        let result = match self.try_pull(table).await {
            Ok(result) => result,
            Err(e) => self
                .session
                .failed(table.name, &format!("pull {}", table.name), e),
        };
        self.session.finish(result)
    }

    async fn try_pull(&self, table: &PullTable) -> Result<TableSyncResult> {
        let payload = PullRequestPayload {
            table: table.name.to_string(),
        };
        let response = self
            .session
            .call(PULL_ENDPOINT, serde_json::to_value(&payload)?)
            .await?;
        let response: PullResponse = serde_json::from_value(response)?;

        if let Some(outcome) = outcome_for_pull_status(response.status) {
            debug!("Pull '{}' answered {:?}", table.name, response.status);
            let mut result = TableSyncResult::new(table.name, outcome);
            if let Some(msg) = response.msg {
                result = result.with_message(msg);
            }
            return Ok(result);
        }

        match table.target {
            PullTarget::Store(store) => self.replace_store(table.name, store, response).await,
            PullTarget::Property(property) => {
                self.merge_property(table.name, property, response).await
            }
        }
    }

    async fn replace_store(
        &self,
        table: &str,
        store: &str,
        response: PullResponse,
    ) -> Result<TableSyncResult> {
        let records = match response.data {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => Vec::new(),
            Some(_) => {
                return Err(Error::invalid_input(format!(
                    "pull '{}' returned a non-array payload",
                    table
                )))
            }
        };

        let expected = records.len();
        let report = self
            .repository
            .replace_store(store, records, response.max_id)
            .await?;
        if report.skipped > 0 {
            warn!("Pull '{}': skipped {} records without a key", table, report.skipped);
        }

        let stored: BTreeSet<StoreKey> =
            self.repository.stored_keys(store).await?.into_iter().collect();
        let completed = report
            .written_keys
            .iter()
            .filter(|key| stored.contains(*key))
            .count();

        debug!("Pull '{}': {} of {} records stored", table, completed, expected);
        Ok(TableSyncResult::new(table, classify_completion(completed, expected))
            .with_counts(completed, expected))
    }

    async fn merge_property(
        &self,
        table: &str,
        property: SettingsProperty,
        response: PullResponse,
    ) -> Result<TableSyncResult> {
        if let Some(name) = response.property.as_deref() {
            if name != property.as_str() {
                warn!(
                    "Pull '{}' answered for property '{}'; storing as '{}'",
                    table,
                    name,
                    property.as_str()
                );
            }
        }

        let data = match response.data {
            None | Some(Value::Null) => return Ok(TableSyncResult::new(table, SyncOutcome::NoData)),
            Some(data) => data,
        };

        self.settings
            .update_settings(SettingsUpdate::new(property, data).wait_for_completion())
            .await?;
        Ok(TableSyncResult::new(table, SyncOutcome::Success).with_counts(1, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::IndicatorPanel;
    use crate::test_support::{context, session, ScriptedRemote};
    use serde_json::json;
    use tempfile::tempdir;
    use trimlog_core::stores::names;
    use trimlog_core::sync::IndicatorColor;

    #[tokio::test]
    async fn store_pull_replaces_previous_contents() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        ctx.store
            .put(names::MILEAGE, json!({ "mileageID": 99, "miles": 1 }), false)
            .await
            .unwrap();

        let remote = Arc::new(ScriptedRemote::new());
        remote.respond(
            names::MILEAGE,
            Ok(json!({
                "status": "success",
                "data": [
                    { "mileageID": 1, "miles": 12 },
                    { "mileageID": 2, "miles": 30 },
                    { "miles": 4 }
                ],
                "maxID": [{ "id": 2, "keyPath": "mileageID", "store": "max_mileage_id" }]
            })),
        );
        let panel = Arc::new(IndicatorPanel::new());
        let puller = PullSynchronizer::new(
            session(remote.clone(), panel.clone()),
            ctx.sync_repository.clone(),
            ctx.settings_service.clone(),
        );

        let summary = puller.pull_tables(&[names::MILEAGE]).await;
        let result = summary.result(names::MILEAGE).unwrap();

        assert_eq!(result.outcome, SyncOutcome::Partial);
        assert_eq!((result.completed, result.expected), (2, 3));
        assert_eq!(ctx.store.count(names::MILEAGE).await.unwrap(), 2);
        assert!(ctx.store.get(names::MILEAGE, StoreKey::Int(99)).await.unwrap().is_none());
        assert_eq!(
            ctx.store.get_all(names::MAX_MILEAGE_ID).await.unwrap(),
            vec![json!({ "mileageID": 2 })]
        );
        assert_eq!(panel.color(names::MILEAGE), Some(IndicatorColor::Orange));
        assert_eq!(
            remote.requests()[0].payload,
            Some(json!({ "table": "mileage" }))
        );
    }

    #[tokio::test]
    async fn repeated_keys_make_a_store_pull_partial() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        let remote = Arc::new(ScriptedRemote::new());
        remote.respond(
            names::MILEAGE,
            Ok(json!({
                "status": "success",
                "data": [
                    { "mileageID": 1, "miles": 12 },
                    { "mileageID": 1, "miles": 13 }
                ]
            })),
        );
        let panel = Arc::new(IndicatorPanel::new());
        let puller = PullSynchronizer::new(
            session(remote, panel.clone()),
            ctx.sync_repository.clone(),
            ctx.settings_service.clone(),
        );

        let summary = puller.pull_tables(&[names::MILEAGE]).await;
        let result = summary.result(names::MILEAGE).unwrap();

        assert_eq!(result.outcome, SyncOutcome::Partial);
        assert_eq!((result.completed, result.expected), (1, 2));
        assert_eq!(ctx.store.count(names::MILEAGE).await.unwrap(), 1);
        assert_eq!(panel.color(names::MILEAGE), Some(IndicatorColor::Orange));
    }

    #[tokio::test]
    async fn property_pull_merges_into_settings_without_a_mirror() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        let remote = Arc::new(ScriptedRemote::new());
        remote.respond(
            "farrier_prices",
            Ok(json!({
                "status": "success",
                "property": "farrier_prices",
                "data": { "trim": 45, "shoes": 120 }
            })),
        );
        let panel = Arc::new(IndicatorPanel::new());
        let puller = PullSynchronizer::new(
            session(remote, panel.clone()),
            ctx.sync_repository.clone(),
            ctx.settings_service.clone(),
        );

        let summary = puller.pull_tables(&["farrier_prices"]).await;

        assert_eq!(summary.successful, 1);
        let settings = ctx.settings_service.get_settings().await.unwrap().unwrap();
        assert_eq!(
            settings.get(SettingsProperty::FarrierPrices),
            Some(&json!({ "trim": 45, "shoes": 120 }))
        );
        assert_eq!(ctx.store.count(names::EDIT_SETTINGS).await.unwrap(), 0);
        assert_eq!(panel.color("farrier_prices"), Some(IndicatorColor::Green));
    }

    #[tokio::test]
    async fn status_pass_through_and_transport_failures() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        let remote = Arc::new(ScriptedRemote::new());
        remote.respond(
            names::CLIENTS,
            Ok(json!({ "status": "auth-error", "msg": "token expired" })),
        );
        remote.respond(
            names::TRIMMING_INFO,
            Ok(json!({ "status": "server-error", "msg": "maintenance" })),
        );
        remote.respond(names::PERSONAL_NOTES, Err(Error::Network("offline".to_string())));
        let panel = Arc::new(IndicatorPanel::new());
        let puller = PullSynchronizer::new(
            session(remote, panel.clone()),
            ctx.sync_repository.clone(),
            ctx.settings_service.clone(),
        );

        let summary = puller
            .pull_tables(&[names::CLIENTS, names::TRIMMING_INFO, names::PERSONAL_NOTES, "invoices"])
            .await;

        assert_eq!(summary.auth_error, 1);
        assert_eq!(summary.server_error, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(
            summary.result(names::CLIENTS).unwrap().message.as_deref(),
            Some("token expired")
        );
        for table in [names::CLIENTS, names::TRIMMING_INFO, names::PERSONAL_NOTES, "invoices"] {
            assert_eq!(panel.color(table), Some(IndicatorColor::Red));
        }
    }

    #[tokio::test]
    async fn pull_all_covers_every_table_and_never_leaves_yellow() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let remote = Arc::new(ScriptedRemote::new());
        let panel = Arc::new(IndicatorPanel::new());
        let puller = PullSynchronizer::new(
            session(remote, panel.clone()),
            ctx.sync_repository.clone(),
            ctx.settings_service.clone(),
        );

        let summary = puller.pull_all().await;

        assert_eq!(summary.total, PULL_TABLES.len());
        assert_eq!(summary.processed, PULL_TABLES.len());
        assert!(panel
            .snapshot()
            .values()
            .all(|color| *color != IndicatorColor::Yellow));
        assert_eq!(panel.snapshot().len(), PULL_TABLES.len());
    }
}
