//! # domohub-adapter-virtual
//!
//! Hardware plugin without hardware. Outputs bound to it accept every
//! command and remember their state; temperature inputs bound to it can
//! receive simulated readings.
//!
//! ## Settings
//!
//! | Key | Default | Meaning |
//! |-----|---------|---------|
//! | `interval_secs` | `0` | Seconds between simulated readings (`0` = off) |
//! | `base_temperature` | `20.0` | Centre of the simulated curve, in °C |
//!
//! ## Dependency rule
//!
//! Depends on `domohub-app` (port traits) and `domohub-domain` only.

mod config;
mod error;
mod simulation;

pub use config::VirtualSettings;
pub use error::VirtualError;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use domohub_app::ports::{HardwarePlugin, PluginContext};
use domohub_domain::device::{Device, DeviceState, DeviceType, Role};
use domohub_domain::error::HubError;
use domohub_domain::hardware::HardwareConfig;
use domohub_domain::id::DeviceId;

/// Simulated hardware.
#[derive(Default)]
pub struct VirtualPlugin {
    settings: VirtualSettings,
    outputs: Mutex<HashMap<DeviceId, DeviceState>>,
    sensors: Arc<Mutex<Vec<String>>>,
    simulation: Mutex<Option<JoinHandle<()>>>,
}

impl VirtualPlugin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The state the simulated hardware holds for an output.
    #[must_use]
    pub fn output_state(&self, device_id: &str) -> Option<DeviceState> {
        self.lock_outputs().get(device_id).cloned()
    }

    /// Addresses receiving simulated readings.
    #[must_use]
    pub fn sensor_addresses(&self) -> Vec<String> {
        self.sensors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_outputs(&self) -> std::sync::MutexGuard<'_, HashMap<DeviceId, DeviceState>> {
        self.outputs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(
        &self,
        device_id: &DeviceId,
        desired: &DeviceState,
    ) -> Result<DeviceState, VirtualError> {
        let mut outputs = self.lock_outputs();
        let current = outputs
            .get_mut(device_id)
            .ok_or_else(|| VirtualError::UnknownDevice(device_id.to_string()))?;
        *current = if desired.as_str() == "toggle" {
            current.toggled()
        } else {
            desired.clone()
        };
        Ok(current.clone())
    }
}

impl HardwarePlugin for VirtualPlugin {
    async fn init(&mut self, config: &HardwareConfig, ctx: PluginContext) -> Result<(), HubError> {
        self.settings =
            VirtualSettings::from_value(&config.settings).map_err(VirtualError::Settings)?;
        if self.settings.interval_secs == 0 {
            tracing::debug!("virtual sensor simulation disabled");
            return Ok(());
        }
        let period = Duration::from_secs(self.settings.interval_secs);
        let task = tokio::spawn(simulation::run(
            Arc::clone(&self.sensors),
            ctx.inputs,
            period,
            self.settings.base_temperature,
        ));
        *self.simulation.get_mut().unwrap_or_else(PoisonError::into_inner) = Some(task);
        tracing::info!(interval_secs = self.settings.interval_secs, "virtual sensor simulation started");
        Ok(())
    }

    fn register_device(&self, device: &Device) -> Result<(), HubError> {
        match (device.role, device.device_type) {
            (Role::Output, _) => {
                let state = device.state.clone().unwrap_or_else(DeviceState::off);
                self.lock_outputs().insert(device.id.clone(), state);
            }
            (Role::Input, DeviceType::Temperature) => {
                let mut sensors = self.sensors.lock().unwrap_or_else(PoisonError::into_inner);
                sensors.extend(device.protocol.id.iter().cloned());
                sensors.extend(device.protocol.inputs.iter().map(|input| input.id.clone()));
            }
            (Role::Input, _) => {}
        }
        tracing::debug!(device_id = %device.id, "device registered with virtual plugin");
        Ok(())
    }

    async fn accept_command(
        &self,
        device: &Device,
        desired: &DeviceState,
    ) -> Result<DeviceState, HubError> {
        let applied = self.apply(&device.id, desired)?;
        tracing::debug!(device_id = %device.id, %applied, "virtual output switched");
        Ok(applied)
    }

    async fn teardown(&self) -> Result<(), HubError> {
        let task = self
            .simulation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
        Ok(())
    }
}
