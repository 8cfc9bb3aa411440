use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A horse stored inside its owner's client record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Horse {
    /// Assigned from `max_horse_id` when the owning client is written.
    #[serde(rename = "hID", default, skip_serializing_if = "Option::is_none")]
    pub h_id: Option<i64>,
    pub horse_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Horse {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            h_id: None,
            horse_name: name.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    #[serde(rename = "cID")]
    pub c_id: i64,
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub horses: Vec<Horse>,
    /// Page-owned fields this layer carries through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Input for a client that has no `cID` yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub horses: Vec<Horse>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewClient {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            phone: None,
            horses: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_horse(mut self, horse: Horse) -> Self {
        self.horses.push(horse);
        self
    }
}
