//! Push synchronizer: sends pending mirror records and drops the acknowledged ones.

use futures::future::join_all;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;

use trimlog_core::errors::Result;
use trimlog_core::stores::StoreKey;
use trimlog_core::sync::{
    classify_completion, PushAck, PushBatch, PushEntry, SyncOutcome, SyncStoreRepositoryTrait,
    SyncSummary, TableSyncResult, PUSH_ENDPOINT,
};

use crate::session::SyncSession;

/// What a push response asks the local side to do.
#[derive(Debug, Default, PartialEq, Eq)]
struct AckPlan {
    clear_store: bool,
    keys: BTreeSet<StoreKey>,
}

/// Reads the response against the submitted batch. An acknowledging item without a key
/// acknowledges the whole store.
fn plan_acks(entries: &[PushEntry], acks: &[PushAck]) -> AckPlan {
    let mut plan = AckPlan::default();
    for ack in acks.iter().filter(|ack| ack.status.is_ack()) {
        match &ack.key {
            Some(key) if !ack.clear_store => {
                plan.keys.insert(key.clone());
            }
            _ => plan.clear_store = true,
        }
    }
    if !plan.clear_store && acks.len() != entries.len() {
        warn!(
            "Push response has {} items for a batch of {}",
            acks.len(),
            entries.len()
        );
    }
    plan
}

pub struct PushSynchronizer {
    session: SyncSession,
    repository: Arc<dyn SyncStoreRepositoryTrait>,
}

impl PushSynchronizer {
    pub fn new(session: SyncSession, repository: Arc<dyn SyncStoreRepositoryTrait>) -> Self {
        Self {
            session,
            repository,
        }
    }

    /// Mirror stores currently holding pending records.
    pub async fn dirty_stores(&self) -> Result<Vec<String>> {
        self.repository.dirty_stores().await
    }

    /// Pushes every dirty mirror store.
    pub async fn push_dirty(&self) -> Result<SyncSummary> {
        let dirty = self.dirty_stores().await?;
        let stores: Vec<&str> = dirty.iter().map(String::as_str).collect();
        Ok(self.push_stores(&stores).await)
    }

    /// Pushes the given stores concurrently. A failing store never affects the others.
    pub async fn push_stores(&self, stores: &[&str]) -> SyncSummary {
        let results = join_all(stores.iter().map(|store| self.push_store(store))).await;
        let summary = SyncSummary::from_results(results, stores.len());
        info!(
            "Push finished: {} of {} stores clean ({} partial, {} failed)",
            summary.successful,
            summary.total,
            summary.partial,
            summary.failed + summary.server_error + summary.auth_error
        );
        summary
    }

    pub async fn push_store(&self, store: &str) -> TableSyncResult {
        self.session.start(store);
        let result = match self.try_push(store).await {
            Ok(result) => result,
            Err(e) => self.session.failed(store, &format!("push {}", store), e),
        };
        self.session.finish(result)
    }

    async fn try_push(&self, store: &str) -> Result<TableSyncResult> {
        let entries = self.repository.pending_entries(store).await?;
        if entries.is_empty() {
            debug!("Nothing to push for '{}'", store);
            return Ok(TableSyncResult::new(store, SyncOutcome::Success));
        }

        let expected = entries.len();
        let batch = PushBatch {
            store: store.to_string(),
            records: entries,
        };
        let response = self
            .session
            .call(PUSH_ENDPOINT, serde_json::to_value(&batch)?)
            .await?;
        let acks: Vec<PushAck> = serde_json::from_value(response)?;

        let plan = plan_acks(&batch.records, &acks);
        let completed = if plan.clear_store {
            self.repository.clear_store(store).await?;
            expected
        } else {
            let submitted: BTreeSet<&StoreKey> = batch.records.iter().map(|e| &e.key).collect();
            let keys: Vec<StoreKey> = plan
                .keys
                .into_iter()
                .filter(|key| submitted.contains(key))
                .collect();
            self.repository.delete_entries(store, keys).await?
        };

        debug!("Push '{}': {} of {} acknowledged", store, completed, expected);
        Ok(TableSyncResult::new(store, classify_completion(completed, expected))
            .with_counts(completed, expected))
    }
}
