use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form personal note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalNote {
    #[serde(rename = "noteID")]
    pub note_id: i64,
    pub note_date: String,
    pub note: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNote {
    pub note_date: String,
    pub note: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewNote {
    pub fn new(note_date: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            note_date: note_date.into(),
            note: note.into(),
            extra: Map::new(),
        }
    }
}
