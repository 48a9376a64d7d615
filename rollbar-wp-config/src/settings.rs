//! The resolved plugin settings record.

use serde::{Deserialize, Serialize};

use rollbar_wp_core::value::{OptionMap, SettingValue};

use crate::error::SettingsError;

pub const PHP_LOGGING_ENABLED: &str = "php_logging_enabled";
pub const JS_LOGGING_ENABLED: &str = "js_logging_enabled";
pub const SERVER_SIDE_ACCESS_TOKEN: &str = "server_side_access_token";
pub const CLIENT_SIDE_ACCESS_TOKEN: &str = "client_side_access_token";
pub const LOGGING_LEVEL: &str = "logging_level";
pub const ENVIRONMENT: &str = "environment";

/// Plugin-level keys resolved with coercion rather than copied verbatim.
pub const PLUGIN_KEYS: [&str; 5] = [
    PHP_LOGGING_ENABLED,
    JS_LOGGING_ENABLED,
    SERVER_SIDE_ACCESS_TOKEN,
    CLIENT_SIDE_ACCESS_TOKEN,
    LOGGING_LEVEL,
];

/// Every option name a resolved record is guaranteed to hold.
pub fn known_options() -> impl Iterator<Item = &'static str> {
    PLUGIN_KEYS.into_iter().chain(crate::defaults::list_options())
}

/// Mapping from option name to value, total over [`known_options`] once
/// resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsRecord {
    values: OptionMap,
}

impl SettingsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Result<&SettingValue, SettingsError> {
        self.values
            .get(name)
            .ok_or_else(|| SettingsError::UnknownOption(name.to_string()))
    }

    /// Writes in memory only. Persisting is the caller's job.
    pub fn set(&mut self, name: &str, value: impl Into<SettingValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// String form of any value; integers and booleans are rendered.
    pub fn string(&self, name: &str) -> Result<String, SettingsError> {
        self.get(name).map(ToString::to_string)
    }

    /// Whether an enable switch is on (`0`, `false` and `""` are off).
    pub fn enabled(&self, name: &str) -> Result<bool, SettingsError> {
        self.get(name).map(|value| !value.is_empty())
    }

    pub fn int(&self, name: &str) -> Result<i64, SettingsError> {
        let value = self.get(name)?;
        value.as_int().ok_or_else(|| SettingsError::WrongType {
            name: name.to_string(),
            expected: "int",
            found: value.type_name(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &OptionMap {
        &self.values
    }

    pub fn into_map(self) -> OptionMap {
        self.values
    }
}

impl From<OptionMap> for SettingsRecord {
    fn from(values: OptionMap) -> Self {
        Self { values }
    }
}

impl Extend<(String, SettingValue)> for SettingsRecord {
    fn extend<T: IntoIterator<Item = (String, SettingValue)>>(&mut self, iter: T) {
        self.values.extend(iter);
    }
}
