use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimmingSession {
    #[serde(rename = "trimID")]
    pub trim_id: i64,
    #[serde(rename = "cID")]
    pub c_id: i64,
    /// ISO date of the visit.
    pub trim_date: String,
    #[serde(default)]
    pub horses: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrimmingSession {
    #[serde(rename = "cID")]
    pub c_id: i64,
    pub trim_date: String,
    #[serde(default)]
    pub horses: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewTrimmingSession {
    pub fn new(c_id: i64, trim_date: impl Into<String>) -> Self {
        Self {
            c_id,
            trim_date: trim_date.into(),
            horses: Vec::new(),
            extra: Map::new(),
        }
    }
}
