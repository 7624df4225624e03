//! Hardware: configuration of a plugin instance bridging to a physical protocol.

use serde::{Deserialize, Serialize};

use crate::id::HardwareId;

/// One `[[hardware]]` entry of the configuration.
///
/// `hardware_type` is both the plugin kind and the key devices bind to
/// through `protocol.hardware_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareConfig {
    #[serde(rename = "type")]
    pub hardware_type: HardwareId,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Plugin-specific settings, passed through untouched.
    #[serde(default)]
    pub settings: serde_json::Value,
}

fn enabled_by_default() -> bool {
    true
}

impl HardwareConfig {
    #[must_use]
    pub fn new(hardware_type: impl Into<HardwareId>) -> Self {
        Self {
            hardware_type: hardware_type.into(),
            enabled: true,
            settings: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: serde_json::Value) -> Self {
        self.settings = settings;
        self
    }

    /// Read a settings field as `T`, if present and well-formed.
    #[must_use]
    pub fn setting<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.settings
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}
