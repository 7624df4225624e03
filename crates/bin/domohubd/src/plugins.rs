//! Built-in hardware plugins and the factory selecting them by type.

use std::fmt;
use std::str::FromStr;

use domohub_adapter_shell::ShellPlugin;
use domohub_adapter_virtual::VirtualPlugin;
use domohub_app::ports::{HardwarePlugin, PluginContext, PluginFactory};
use domohub_domain::device::{Device, DeviceState};
use domohub_domain::error::HubError;
use domohub_domain::hardware::HardwareConfig;

/// Hardware types this daemon ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareKind {
    Virtual,
    Shell,
}

impl HardwareKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Virtual => "virtual",
            Self::Shell => "shell",
        }
    }
}

impl fmt::Display for HardwareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown hardware type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hardware type {0:?}")]
pub struct UnknownHardware(pub String);

impl FromStr for HardwareKind {
    type Err = UnknownHardware;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "virtual" => Ok(Self::Virtual),
            "shell" => Ok(Self::Shell),
            other => Err(UnknownHardware(other.to_string())),
        }
    }
}

/// One of the built-in plugins.
pub enum AnyPlugin {
    Virtual(VirtualPlugin),
    Shell(ShellPlugin),
}

impl AnyPlugin {
    #[must_use]
    pub fn kind(&self) -> HardwareKind {
        match self {
            Self::Virtual(_) => HardwareKind::Virtual,
            Self::Shell(_) => HardwareKind::Shell,
        }
    }
}

impl HardwarePlugin for AnyPlugin {
    async fn init(&mut self, config: &HardwareConfig, ctx: PluginContext) -> Result<(), HubError> {
        match self {
            Self::Virtual(plugin) => plugin.init(config, ctx).await,
            Self::Shell(plugin) => plugin.init(config, ctx).await,
        }
    }

    fn register_device(&self, device: &Device) -> Result<(), HubError> {
        match self {
            Self::Virtual(plugin) => plugin.register_device(device),
            Self::Shell(plugin) => plugin.register_device(device),
        }
    }

    async fn accept_command(
        &self,
        device: &Device,
        desired: &DeviceState,
    ) -> Result<DeviceState, HubError> {
        match self {
            Self::Virtual(plugin) => plugin.accept_command(device, desired).await,
            Self::Shell(plugin) => plugin.accept_command(device, desired).await,
        }
    }

    async fn teardown(&self) -> Result<(), HubError> {
        match self {
            Self::Virtual(plugin) => plugin.teardown().await,
            Self::Shell(plugin) => plugin.teardown().await,
        }
    }
}

/// Factory for every built-in plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinPluginFactory;

impl PluginFactory for BuiltinPluginFactory {
    type Plugin = AnyPlugin;

    fn create(&self, config: &HardwareConfig) -> Option<AnyPlugin> {
        let kind = match config.hardware_type.as_str().parse::<HardwareKind>() {
            Ok(kind) => kind,
            Err(err) => {
                tracing::debug!(%err, "no built-in plugin");
                return None;
            }
        };
        Some(match kind {
            HardwareKind::Virtual => AnyPlugin::Virtual(VirtualPlugin::new()),
            HardwareKind::Shell => AnyPlugin::Shell(ShellPlugin::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_known_hardware_kinds() {
        assert_eq!("virtual".parse(), Ok(HardwareKind::Virtual));
        assert_eq!("shell".parse(), Ok(HardwareKind::Shell));
    }

    #[test]
    fn should_reject_unknown_hardware_kind() {
        let err = "rfxcom".parse::<HardwareKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown hardware type \"rfxcom\"");
    }

    #[test]
    fn should_create_plugin_matching_hardware_type() {
        let factory = BuiltinPluginFactory;
        let plugin = factory.create(&HardwareConfig::new("shell")).unwrap();
        assert_eq!(plugin.kind(), HardwareKind::Shell);
        let plugin = factory.create(&HardwareConfig::new("virtual")).unwrap();
        assert_eq!(plugin.kind(), HardwareKind::Virtual);
    }

    #[test]
    fn should_not_create_plugin_for_unknown_type() {
        assert!(BuiltinPluginFactory.create(&HardwareConfig::new("zwave")).is_none());
    }

    #[test]
    fn should_display_kind_as_config_name() {
        assert_eq!(HardwareKind::Virtual.to_string(), "virtual");
    }
}
