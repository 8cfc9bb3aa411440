//! Push/pull wire shapes and per-table results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::settings::SettingsProperty;
use crate::stores::{names, StoreKey};

/// Remote endpoints used by the synchronizers.
pub const PUSH_ENDPOINT: &str = "sync/push";
pub const PULL_ENDPOINT: &str = "sync/pull";
pub const ERROR_LOG_ENDPOINT: &str = "errors/log";

/// Result of one table/property pull or one store push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncOutcome {
    Success,
    Partial,
    Failed,
    NoData,
    ServerError,
    AuthError,
}

impl SyncOutcome {
    /// Indicator color shown once the attempt has finished.
    pub fn color(self) -> IndicatorColor {
        match self {
            Self::Success => IndicatorColor::Green,
            Self::Partial | Self::NoData => IndicatorColor::Orange,
            Self::Failed | Self::ServerError | Self::AuthError => IndicatorColor::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorColor {
    Green,
    Yellow,
    Red,
    Orange,
}

impl IndicatorColor {
    pub fn asset(self) -> &'static str {
        match self {
            Self::Green => "assets/indicators/green.svg",
            Self::Yellow => "assets/indicators/yellow.svg",
            Self::Red => "assets/indicators/red.svg",
            Self::Orange => "assets/indicators/orange.svg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PullStatus {
    Success,
    NoData,
    Error,
    ServerError,
    AuthError,
}

/// Counter store update delivered with pulled data, e.g. `{id: 5, keyPath: "cID", store: "max_client_id"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterUpdate {
    pub id: i64,
    pub key_path: String,
    pub store: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullResponse {
    pub status: PullStatus,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(rename = "maxID", default)]
    pub max_id: Vec<CounterUpdate>,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub property: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestPayload {
    pub table: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PushAckStatus {
    Ok,
    NoUpdate,
    Error,
}

impl PushAckStatus {
    pub fn is_ack(self) -> bool {
        matches!(self, Self::Ok | Self::NoUpdate)
    }
}

/// One element of the push response, aligned with the submitted batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushAck {
    pub status: PushAckStatus,
    #[serde(default)]
    pub key: Option<StoreKey>,
    #[serde(default)]
    pub clear_store: bool,
}

/// Pending mirror record with its store key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEntry {
    pub key: StoreKey,
    pub record: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushBatch {
    pub store: String,
    pub records: Vec<PushEntry>,
}

/// What a pull table lands in locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullTarget {
    /// Array-backed store replaced wholesale.
    Store(&'static str),
    /// One property of the settings aggregate.
    Property(SettingsProperty),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullTable {
    pub name: &'static str,
    pub target: PullTarget,
}

const fn store_table(name: &'static str) -> PullTable {
    PullTable {
        name,
        target: PullTarget::Store(name),
    }
}

const fn property_table(property: SettingsProperty, name: &'static str) -> PullTable {
    PullTable {
        name,
        target: PullTarget::Property(property),
    }
}

pub static PULL_TABLES: [PullTable; 11] = [
    store_table(names::CLIENTS),
    store_table(names::TRIMMING_INFO),
    store_table(names::PERSONAL_NOTES),
    store_table(names::MILEAGE),
    property_table(SettingsProperty::DateTime, "date_time"),
    property_table(SettingsProperty::FarrierPrices, "farrier_prices"),
    property_table(SettingsProperty::ScheduleOptions, "schedule_options"),
    property_table(SettingsProperty::ColorOptions, "color_options"),
    property_table(SettingsProperty::MileageCharges, "mileage_charges"),
    property_table(SettingsProperty::BlockedDates, "blocked_dates"),
    property_table(SettingsProperty::Reminders, "reminders"),
];

pub fn pull_table(name: &str) -> Option<&'static PullTable> {
    PULL_TABLES.iter().find(|table| table.name == name)
}

/// Outcome of one table (pull) or one store (push).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSyncResult {
    pub table: String,
    pub outcome: SyncOutcome,
    /// Items written (pull) or acknowledged (push).
    pub completed: usize,
    /// Items received (pull) or submitted (push).
    pub expected: usize,
    pub message: Option<String>,
}

impl TableSyncResult {
    pub fn new(table: impl Into<String>, outcome: SyncOutcome) -> Self {
        Self {
            table: table.into(),
            outcome,
            completed: 0,
            expected: 0,
            message: None,
        }
    }

    pub fn with_counts(mut self, completed: usize, expected: usize) -> Self {
        self.completed = completed;
        self.expected = expected;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Aggregated counts over one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub successful: usize,
    pub partial: usize,
    pub failed: usize,
    pub no_data: usize,
    pub server_error: usize,
    pub auth_error: usize,
    pub processed: usize,
    pub total: usize,
    pub results: Vec<TableSyncResult>,
}

impl SyncSummary {
    pub fn from_results(results: Vec<TableSyncResult>, total: usize) -> Self {
        let mut summary = Self {
            total,
            processed: results.len(),
            ..Default::default()
        };
        for result in &results {
            match result.outcome {
                SyncOutcome::Success => summary.successful += 1,
                SyncOutcome::Partial => summary.partial += 1,
                SyncOutcome::Failed => summary.failed += 1,
                SyncOutcome::NoData => summary.no_data += 1,
                SyncOutcome::ServerError => summary.server_error += 1,
                SyncOutcome::AuthError => summary.auth_error += 1,
            }
        }
        summary.results = results;
        summary
    }

    pub fn result(&self, table: &str) -> Option<&TableSyncResult> {
        self.results.iter().find(|r| r.table == table)
    }

    pub fn is_clean(&self) -> bool {
        self.successful == self.processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pull_response_parses_wire_shape() {
        let response: PullResponse = serde_json::from_value(json!({
            "status": "success",
            "data": [{ "cID": 1 }],
            "maxID": [{ "id": 5, "keyPath": "cID", "store": "max_client_id" }]
        }))
        .unwrap();
        assert_eq!(response.status, PullStatus::Success);
        assert_eq!(response.max_id[0].store, "max_client_id");

        let no_data: PullResponse = serde_json::from_value(json!({ "status": "no-data" })).unwrap();
        assert_eq!(no_data.status, PullStatus::NoData);
        assert!(no_data.max_id.is_empty());
    }

    #[test]
    fn push_ack_accepts_key_and_clear_store() {
        let acks: Vec<PushAck> = serde_json::from_value(json!([
            { "status": "ok", "key": 3 },
            { "status": "no-update", "clearStore": true },
            { "status": "error" }
        ]))
        .unwrap();
        assert_eq!(acks[0].key, Some(StoreKey::Int(3)));
        assert!(acks[1].clear_store && acks[1].status.is_ack());
        assert!(!acks[2].status.is_ack());
    }

    #[test]
    fn outcome_colors_never_yellow() {
        for outcome in [
            SyncOutcome::Success,
            SyncOutcome::Partial,
            SyncOutcome::Failed,
            SyncOutcome::NoData,
            SyncOutcome::ServerError,
            SyncOutcome::AuthError,
        ] {
            assert_ne!(outcome.color(), IndicatorColor::Yellow);
        }
        assert_eq!(SyncOutcome::NoData.color(), IndicatorColor::Orange);
        assert_eq!(IndicatorColor::Red.asset(), "assets/indicators/red.svg");
    }

    #[test]
    fn summary_counts_each_bucket() {
        let summary = SyncSummary::from_results(
            vec![
                TableSyncResult::new("clients", SyncOutcome::Success),
                TableSyncResult::new("personal_notes", SyncOutcome::NoData),
                TableSyncResult::new("mileage", SyncOutcome::AuthError),
            ],
            PULL_TABLES.len(),
        );
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.no_data, 1);
        assert_eq!(summary.auth_error, 1);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.total, 11);
        assert!(!summary.is_clean());
    }
}
