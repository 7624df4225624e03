//! Virtual plugin settings, read from the `settings` table of its hardware entry.

use serde::Deserialize;

/// Configuration for the virtual plugin.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VirtualSettings {
    /// Seconds between simulated sensor readings; `0` disables the simulation.
    pub interval_secs: u64,
    /// Centre of the simulated temperature curve, in °C.
    pub base_temperature: f64,
}

impl Default for VirtualSettings {
    fn default() -> Self {
        Self {
            interval_secs: 0,
            base_temperature: 20.0,
        }
    }
}

impl VirtualSettings {
    /// Parse the raw settings value; `null` yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns the deserialisation error for malformed settings.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
    }
}
