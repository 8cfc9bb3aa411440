use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Primary key of a record: integer or string.
///
/// Integer keys order before string keys, matching SQLite's ordering of the
/// backing column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreKey {
    Int(i64),
    Text(String),
}

impl StoreKey {
    /// Converts a JSON scalar into a key. Integral floats are accepted, empty strings are not.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int).or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| Self::Int(f as i64))
            }),
            Value::String(s) if !s.trim().is_empty() => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(v) => Value::from(*v),
            Self::Text(v) => Value::String(v.clone()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for StoreKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for StoreKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StoreKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
