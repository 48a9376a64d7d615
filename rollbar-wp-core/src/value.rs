//! Setting values as they travel between the option store, the resolver and
//! the reporting backend.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A persisted option mapping (`rollbar_wp` in the option store).
pub type OptionMap = BTreeMap<String, SettingValue>;

/// Setting value types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool), // Must be before Int to avoid bool -> int coercion
    Int(i64),
    String(String),
}

impl SettingValue {
    /// Host "empty" semantics: `false`, `0`, `""` and `"0"` count as unset.
    pub fn is_empty(&self) -> bool {
        match self {
            SettingValue::Bool(b) => !b,
            SettingValue::Int(i) => *i == 0,
            SettingValue::String(s) => s.is_empty() || s == "0",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            SettingValue::Bool(b) => Some(i64::from(*b)),
            SettingValue::String(s) => s.trim().parse().ok(),
        }
    }

    /// Coerces to the integer 0/1 flag the enable switches are stored as.
    pub fn to_flag(&self) -> SettingValue {
        SettingValue::Int(i64::from(!self.is_empty()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::String(_) => "string",
            SettingValue::Int(_) => "int",
            SettingValue::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Int(i) => write!(f, "{i}"),
            SettingValue::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Int(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::String(value)
    }
}

impl From<SettingValue> for serde_json::Value {
    fn from(value: SettingValue) -> Self {
        match value {
            SettingValue::Bool(b) => b.into(),
            SettingValue::Int(i) => i.into(),
            SettingValue::String(s) => s.into(),
        }
    }
}
