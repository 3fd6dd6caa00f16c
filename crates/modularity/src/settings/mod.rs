//! Flat key-value settings and their binding onto configurable modules.
//!
//! Settings are a flat map of dotted keys (`"WidgetModule.Timeout"`) to raw
//! string values. They are assembled from layered [`SettingsSource`]s and
//! handed to the container builder, where modules bind them onto their own
//! properties with [`SettingsBinder`].

pub mod binder;
pub mod error;
pub mod sources;

pub use binder::*;
pub use error::SettingsError;
pub use sources::*;

use std::collections::BTreeMap;

/// Where a setting value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingSource {
    /// Value loaded from a settings file
    File(String),
    /// Value loaded from an environment variable
    EnvVar(String),
    /// Value provided programmatically
    Programmatic,
}

impl SettingSource {
    /// Get source description
    pub fn description(&self) -> String {
        match self {
            SettingSource::File(path) => format!("Settings file: {}", path),
            SettingSource::EnvVar(var) => format!("Environment variable: {}", var),
            SettingSource::Programmatic => "Programmatically set".to_string(),
        }
    }
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SettingValue {
    value: String,
    source: SettingSource,
}

/// Read-only flat settings map, enumerable by key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, SettingValue>,
}

impl Settings {
    /// Create empty settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or override a value
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        source: SettingSource,
    ) {
        self.values.insert(
            key.into(),
            SettingValue {
                value: value.into(),
                source,
            },
        );
    }

    /// Get the raw value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.value.as_str())
    }

    /// Get the provenance of a key
    pub fn source_of(&self, key: &str) -> Option<&SettingSource> {
        self.values.get(key).map(|v| &v.source)
    }

    /// Iterate all key/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.value.as_str()))
    }

    /// Iterate all keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge `other` over `self`; keys in `other` win
    pub fn merge(&mut self, other: Settings) {
        self.values.extend(other.values);
    }
}

impl<K, V> FromIterator<(K, V)> for Settings
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Settings::new();
        for (key, value) in iter {
            settings.insert(key, value, SettingSource::Programmatic);
        }
        settings
    }
}
