//! # domohub-adapter-shell
//!
//! Hardware plugin driving outputs through shell commands. Each output lists
//! one command per state in `protocol.actions`:
//!
//! ```toml
//! [[devices]]
//! id = "CHIME1"
//! role = "output"
//! type = "chime"
//!
//! [devices.protocol]
//! hardware_id = "shell"
//! actions = { on = "aplay /usr/share/sounds/ding.wav", off = "true" }
//! ```
//!
//! The command for the requested state runs through the configured
//! interpreter (`sh -c` by default). `toggle` runs the command of the
//! opposite of the current state. A non-zero exit fails the command.
//!
//! ## Dependency rule
//!
//! Depends on `domohub-app` (port traits) and `domohub-domain` only.

mod config;
mod error;

pub use config::ShellSettings;
pub use error::ShellError;

use tokio::process::Command;

use domohub_app::ports::{HardwarePlugin, PluginContext};
use domohub_domain::device::{Device, DeviceState, Role};
use domohub_domain::error::HubError;
use domohub_domain::hardware::HardwareConfig;

/// Runs configured shell commands.
#[derive(Debug, Default)]
pub struct ShellPlugin {
    settings: ShellSettings,
}

impl ShellPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The state `desired` resolves to for `device`.
    fn target(device: &Device, desired: &DeviceState) -> DeviceState {
        if desired.as_str() == "toggle" {
            device
                .state
                .as_ref()
                .map_or_else(DeviceState::on, DeviceState::toggled)
        } else {
            desired.clone()
        }
    }

    async fn run(&self, command: &str) -> Result<(), ShellError> {
        let output = Command::new(&self.settings.program)
            .args(&self.settings.args)
            .arg(command)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ShellError::Spawn)?;
        tracing::debug!(
            command,
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "shell command finished"
        );
        if !output.status.success() {
            return Err(ShellError::Failed {
                command: command.to_string(),
                status: output.status,
            });
        }
        Ok(())
    }
}

impl HardwarePlugin for ShellPlugin {
    async fn init(&mut self, config: &HardwareConfig, _ctx: PluginContext) -> Result<(), HubError> {
        self.settings =
            ShellSettings::from_value(&config.settings).map_err(ShellError::Settings)?;
        tracing::debug!(program = %self.settings.program, "shell plugin ready");
        Ok(())
    }

    fn register_device(&self, device: &Device) -> Result<(), HubError> {
        if device.role == Role::Output && device.protocol.actions.is_empty() {
            return Err(ShellError::NoActions {
                device_id: device.id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn accept_command(
        &self,
        device: &Device,
        desired: &DeviceState,
    ) -> Result<DeviceState, HubError> {
        let target = Self::target(device, desired);
        let command = device
            .protocol
            .actions
            .get(target.as_str())
            .ok_or_else(|| ShellError::MissingAction {
                device_id: device.id.to_string(),
                state: target.to_string(),
            })?;
        self.run(command).await?;
        tracing::info!(device_id = %device.id, state = %target, "shell action executed");
        Ok(target)
    }
}
