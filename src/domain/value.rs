//! Loosely-typed submission values

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value as it arrives from the transport boundary.
///
/// Anything that is not a JSON scalar is kept as its raw JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub enum DynamicValue {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    Unknown(String),
}

impl DynamicValue {
    /// Absent-equivalent for required-field checks: null or an empty string
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Null => "null",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl From<Value> for DynamicValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::String(s),
            Value::Number(n) => match n.as_f64() {
                Some(f) => Self::Number(f),
                None => Self::Unknown(n.to_string()),
            },
            Value::Bool(b) => Self::Bool(b),
            Value::Null => Self::Null,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<&str> for DynamicValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for DynamicValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for DynamicValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for DynamicValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
