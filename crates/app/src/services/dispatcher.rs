//! Command dispatcher: the round trip from "set LAMP1 to on" to an applied state.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use domohub_domain::device::{DeviceState, Role};
use domohub_domain::error::{
    DispatchTimeoutError, HubError, UnboundHardwareError, ValidationError,
};
use domohub_domain::event::DeviceEvent;
use domohub_domain::id::DeviceId;
use domohub_domain::time::{Timestamp, now};

use crate::ports::{EventPublisher, HardwarePlugin};
use crate::services::device_registry::DeviceRegistry;
use crate::services::plugin_registry::PluginRegistry;

/// Default bound on a single plugin command.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedState {
    pub device_id: DeviceId,
    pub state: DeviceState,
    pub last_updated: Timestamp,
}

/// Routes commands to the plugin owning each device.
pub struct CommandDispatcher<P, E> {
    devices: Arc<DeviceRegistry>,
    plugins: Arc<PluginRegistry<P>>,
    publisher: E,
    timeout: Duration,
}

impl<P, E> CommandDispatcher<P, E>
where
    P: HardwarePlugin + 'static,
    E: EventPublisher + Send + Sync,
{
    pub fn new(
        devices: Arc<DeviceRegistry>,
        plugins: Arc<PluginRegistry<P>>,
        publisher: E,
        timeout: Duration,
    ) -> Self {
        Self {
            devices,
            plugins,
            publisher,
            timeout,
        }
    }

    /// Send `desired` to the device's plugin and apply the outcome.
    ///
    /// Commands to the same device are serialised; commands to different
    /// devices run in parallel. On success the device state is updated and
    /// exactly one event carrying the device is published. On failure the
    /// device state is left untouched and nothing is published.
    ///
    /// # Errors
    ///
    /// - [`HubError::NotFound`] when `device_id` is unknown
    /// - [`HubError::Validation`] when the device is an input
    /// - [`HubError::UnboundHardware`] when no plugin is bound for the device
    /// - [`HubError::Timeout`] when the plugin does not answer in time
    /// - the plugin's own error otherwise
    #[tracing::instrument(skip(self, desired), fields(state = %desired))]
    pub async fn dispatch(
        &self,
        device_id: &str,
        desired: DeviceState,
    ) -> Result<AppliedState, HubError> {
        let slot = self.devices.get(device_id)?;
        let (role, hardware_id) = slot.update(|device| (device.role, device.hardware_id().clone()));
        if role == Role::Input {
            return Err(ValidationError::NotAnOutput(device_id.to_string()).into());
        }
        let plugin = self
            .plugins
            .resolve(hardware_id.as_str())
            .map_err(|_| UnboundHardwareError {
                device_id: device_id.to_string(),
                hardware_id: hardware_id.to_string(),
            })?;

        let _gate = slot.command_gate().lock().await;
        let device = slot.update(|device| {
            device.busy = true;
            device.clone()
        });

        let outcome =
            match tokio::time::timeout(self.timeout, plugin.accept_command(&device, &desired)).await
            {
                Ok(result) => result,
                Err(_) => Err(DispatchTimeoutError {
                    device_id: device_id.to_string(),
                    after: self.timeout,
                }
                .into()),
            };

        let applied = match outcome {
            Ok(applied) => applied,
            Err(err) => {
                slot.update(|device| device.busy = false);
                tracing::warn!(%err, "command failed");
                return Err(err);
            }
        };

        let _publishing = slot.publish_gate().lock().await;
        let updated = slot.update(|device| {
            device.busy = false;
            device.apply_state(applied.clone(), now());
            device.clone()
        });
        let result = AppliedState {
            device_id: updated.id.clone(),
            state: applied,
            last_updated: updated.last_updated,
        };

        if let Err(err) = self.publisher.publish(DeviceEvent::single(updated)).await {
            tracing::warn!(%err, "unable to publish device update");
        }
        tracing::info!(applied = %result.state, "command applied");
        Ok(result)
    }
}
