use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::stores::BackupTarget;

/// Key of the single settings row.
pub const DEFAULT_SETTINGS_USER_ID: i64 = 1;

/// Named sub-objects of the settings aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsProperty {
    DateTime,
    FarrierPrices,
    ScheduleOptions,
    ColorOptions,
    MileageCharges,
    BlockedDates,
    Reminders,
}

impl SettingsProperty {
    pub const ALL: [SettingsProperty; 7] = [
        SettingsProperty::DateTime,
        SettingsProperty::FarrierPrices,
        SettingsProperty::ScheduleOptions,
        SettingsProperty::ColorOptions,
        SettingsProperty::MileageCharges,
        SettingsProperty::BlockedDates,
        SettingsProperty::Reminders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DateTime => "date_time",
            Self::FarrierPrices => "farrier_prices",
            Self::ScheduleOptions => "schedule_options",
            Self::ColorOptions => "color_options",
            Self::MileageCharges => "mileage_charges",
            Self::BlockedDates => "blocked_dates",
            Self::Reminders => "reminders",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }
}

/// The single settings row. Every property is an opaque sub-object owned by its feature page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsAggregate {
    #[serde(rename = "userID")]
    pub user_id: i64,
    #[serde(flatten)]
    pub properties: BTreeMap<SettingsProperty, Value>,
}

impl SettingsAggregate {
    /// Default structure used when no row exists yet.
    pub fn synthesized(user_id: i64) -> Self {
        Self {
            user_id,
            properties: BTreeMap::new(),
        }
    }

    /// Returns the property when it is present and non-null.
    pub fn get(&self, property: SettingsProperty) -> Option<&Value> {
        self.properties.get(&property).filter(|v| !v.is_null())
    }

    pub fn set(&mut self, property: SettingsProperty, value: Value) {
        self.properties.insert(property, value);
    }

    /// Projects the requested properties; only present, non-null ones are returned.
    pub fn select(&self, properties: &[SettingsProperty]) -> BTreeMap<SettingsProperty, Value> {
        properties
            .iter()
            .filter_map(|p| self.get(*p).map(|v| (*p, v.clone())))
            .collect()
    }

    pub fn to_record(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Parses a stored row, ignoring unknown columns so older rows still load.
    pub fn from_record(record: &Value) -> serde_json::Result<Self> {
        let mut cleaned = Map::new();
        if let Value::Object(map) = record {
            for (name, value) in map {
                if name == "userID" || SettingsProperty::parse(name).is_some() {
                    cleaned.insert(name.clone(), value.clone());
                }
            }
        }
        serde_json::from_value(Value::Object(cleaned))
    }
}

/// Input of the coordinator's `update` operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsUpdate {
    pub property: SettingsProperty,
    pub data: Value,
    /// Mirror store and tag; `None` keeps the change local.
    pub backup: Option<BackupTarget>,
    /// Re-read after commit and fail unless the stored value matches.
    pub wait_for_completion: bool,
}

impl SettingsUpdate {
    pub fn new(property: SettingsProperty, data: Value) -> Self {
        Self {
            property,
            data,
            backup: None,
            wait_for_completion: false,
        }
    }

    pub fn with_backup(mut self, store: impl Into<String>, tag: impl Into<String>) -> Self {
        self.backup = Some(BackupTarget::new(store, tag));
        self
    }

    pub fn wait_for_completion(mut self) -> Self {
        self.wait_for_completion = true;
        self
    }
}
