//! Configuration loading: TOML file with environment variable overrides.
//!
//! Reads `domohub.toml` from the working directory, or the file named by
//! `DOMOHUB_CONFIG`. Every field has a default so the file is optional.
//! `DOMOHUB_LOG` and `RUST_LOG` override the log filter.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use domohub_app::hub::HubSettings;
use domohub_domain::device::DeviceDefinition;
use domohub_domain::hardware::HardwareConfig;
use domohub_domain::solar::Location;

const DEFAULT_PATH: &str = "domohub.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Core runtime settings.
    pub hub: HubConfig,
    /// Where the hub is, for solar timers.
    pub location: Location,
    pub logging: LoggingConfig,
    /// Plugin instances, one per `[[hardware]]` entry.
    pub hardware: Vec<HardwareConfig>,
    /// Devices, in the order they are registered.
    pub devices: Vec<DeviceDefinition>,
}

/// `[hub]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Base URL output action URIs are rooted at.
    pub server_address: String,
    /// Upper bound on a single plugin command.
    pub dispatch_timeout_secs: u64,
    /// Buffered device events per slow observer.
    pub event_capacity: usize,
    /// Buffered plugin reports awaiting ingestion.
    pub input_capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load the configuration file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("DOMOHUB_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse `path`, or return the defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    /// Parse configuration text.
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not a valid configuration.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DOMOHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    /// Check values that would make the hub unusable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hub.dispatch_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "hub.dispatch_timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.hub.event_capacity == 0 || self.hub.input_capacity == 0 {
            return Err(ConfigError::Validation(
                "hub channel capacities must be non-zero".to_string(),
            ));
        }
        if !self.location.is_valid() {
            return Err(ConfigError::Validation(format!(
                "location {},{} is out of range",
                self.location.latitude, self.location.longitude
            )));
        }
        Ok(())
    }

    /// Settings handed to [`Hub::bootstrap`](domohub_app::hub::Hub::bootstrap).
    #[must_use]
    pub fn hub_settings(&self) -> HubSettings {
        HubSettings {
            server_address: self.hub.server_address.clone(),
            dispatch_timeout: Duration::from_secs(self.hub.dispatch_timeout_secs),
            event_capacity: self.hub.event_capacity,
            input_capacity: self.hub.input_capacity,
            location: self.location,
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        let defaults = HubSettings::default();
        Self {
            server_address: defaults.server_address,
            dispatch_timeout_secs: defaults.dispatch_timeout.as_secs(),
            event_capacity: defaults.event_capacity,
            input_capacity: defaults.input_capacity,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "domohub=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use domohub_domain::device::{DeviceType, Role};

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.hub.server_address, "http://localhost:3000/");
        assert_eq!(config.hub.dispatch_timeout_secs, 10);
        assert_eq!(config.hub.event_capacity, 256);
        assert!(config.hardware.is_empty());
        assert!(config.devices.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_empty_file() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.hub.input_capacity, 256);
    }

    #[test]
    fn should_parse_full_file() {
        let config = Config::parse(
            r#"
            [hub]
            server_address = "http://10.0.0.2:8080/"
            dispatch_timeout_secs = 3

            [location]
            latitude = 48.85
            longitude = 2.35

            [logging]
            filter = "debug"

            [[hardware]]
            type = "virtual"
            settings = { interval_secs = 30 }

            [[hardware]]
            type = "shell"
            enabled = false

            [[devices]]
            id = "TEMP1"
            role = "input"
            type = "temperature"
            protocol = { hardware_id = "virtual", inputs = [{ id = "S1" }] }

            [[devices]]
            id = "LAMP1"
            name = "Porch"
            role = "output"
            type = "light"

            [devices.protocol]
            hardware_id = "virtual"

            [[devices.timers]]
            type = "sun"
            condition = "sunset"
            offset = "+00:30"
            state = "on"
            "#,
        )
        .unwrap();

        assert_eq!(config.hub.server_address, "http://10.0.0.2:8080/");
        assert_eq!(config.hub.dispatch_timeout_secs, 3);
        assert_eq!(config.hub.event_capacity, 256);
        assert_eq!(config.location, Location::new(48.85, 2.35));
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.hardware.len(), 2);
        assert_eq!(config.hardware[0].setting::<u64>("interval_secs"), Some(30));
        assert!(!config.hardware[1].enabled);
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].role, Role::Input);
        assert_eq!(config.devices[0].protocol.inputs[0].id, "S1");
        assert_eq!(config.devices[1].device_type, DeviceType::Light);
        assert_eq!(config.devices[1].timers.len(), 1);
    }

    #[test]
    fn should_convert_into_hub_settings() {
        let mut config = Config::default();
        config.hub.dispatch_timeout_secs = 4;
        config.location = Location::new(-33.9, 151.2);

        let settings = config.hub_settings();

        assert_eq!(settings.dispatch_timeout, Duration::from_secs(4));
        assert_eq!(settings.location, Location::new(-33.9, 151.2));
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent-domohub.toml").unwrap();
        assert_eq!(config.hub.dispatch_timeout_secs, 10);
    }

    #[test]
    fn should_reject_zero_dispatch_timeout() {
        let mut config = Config::default();
        config.hub.dispatch_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_zero_capacity() {
        let mut config = Config::default();
        config.hub.input_capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_out_of_range_location() {
        let mut config = Config::default();
        config.location = Location::new(91.0, 0.0);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        assert!(matches!(
            Config::parse("invalid {{{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn should_report_parse_error_for_unknown_device_type() {
        let result = Config::parse(
            r#"
            [[devices]]
            id = "X"
            role = "output"
            type = "toaster"
            protocol = { hardware_id = "virtual" }
            "#,
        );
        assert!(result.is_err());
    }
}
