//! Input ingestion: plugin reports turned into device updates.

use std::sync::Arc;

use tokio::sync::mpsc;

use domohub_domain::device::{DeviceState, DeviceType};
use domohub_domain::error::HubError;
use domohub_domain::event::DeviceEvent;
use domohub_domain::id::DeviceId;
use domohub_domain::time::now;

use crate::ports::{EventPublisher, HardwarePlugin, InputReport};
use crate::services::device_registry::DeviceRegistry;
use crate::services::dispatcher::CommandDispatcher;

/// What a report turned into.
#[derive(Debug, Clone, PartialEq)]
enum Routed {
    /// No device uses the address, or a switch report had no command.
    Dropped,
    /// Data was merged and an event published.
    Merged,
    /// A switch press to execute as a command.
    Forward {
        device_id: DeviceId,
        command: DeviceState,
    },
}

/// Consumes plugin reports.
pub struct InputIngestion<P, E> {
    devices: Arc<DeviceRegistry>,
    dispatcher: Arc<CommandDispatcher<P, E>>,
    publisher: E,
}

impl<P, E> InputIngestion<P, E>
where
    P: HardwarePlugin + 'static,
    E: EventPublisher + Send + Sync + 'static,
{
    pub fn new(
        devices: Arc<DeviceRegistry>,
        dispatcher: Arc<CommandDispatcher<P, E>>,
        publisher: E,
    ) -> Self {
        Self {
            devices,
            dispatcher,
            publisher,
        }
    }

    /// Apply one report.
    ///
    /// Reports from unknown addresses are dropped. Switch reports are
    /// executed as commands on the switch device and awaited; other reports
    /// are merged into the device data and published.
    ///
    /// # Errors
    ///
    /// Returns the dispatch error of a forwarded switch command.
    pub async fn on_new_input(&self, report: InputReport) -> Result<(), HubError> {
        match self.route(report).await {
            Routed::Forward { device_id, command } => {
                self.dispatcher.dispatch(device_id.as_str(), command).await?;
                Ok(())
            }
            Routed::Dropped | Routed::Merged => Ok(()),
        }
    }

    /// Consume reports until every sender is gone.
    ///
    /// Switch commands run in their own tasks so a slow plugin round trip
    /// never holds up telemetry.
    pub async fn run(self: Arc<Self>, mut reports: mpsc::Receiver<InputReport>) {
        while let Some(report) = reports.recv().await {
            if let Routed::Forward { device_id, command } = self.route(report).await {
                let dispatcher = Arc::clone(&self.dispatcher);
                tokio::spawn(async move {
                    if let Err(err) = dispatcher.dispatch(device_id.as_str(), command).await {
                        tracing::warn!(%err, %device_id, "switch command failed");
                    }
                });
            }
        }
        tracing::debug!("input channel closed, ingestion stopped");
    }

    async fn route(&self, report: InputReport) -> Routed {
        let Ok(slot) = self.devices.find_by_hardware_id(&report.address) else {
            tracing::debug!(address = %report.address, "input from unregistered hardware, dropping");
            return Routed::Dropped;
        };

        if slot.update(|device| device.device_type) == DeviceType::Switch {
            return match report.command {
                Some(command) => Routed::Forward {
                    device_id: slot.id().clone(),
                    command,
                },
                None => {
                    tracing::debug!(device_id = %slot.id(), "switch report without command, dropping");
                    Routed::Dropped
                }
            };
        }

        let _publishing = slot.publish_gate().lock().await;
        let updated = slot.update(|device| {
            device.merge_data(report.data, now());
            device.clone()
        });
        tracing::debug!(device_id = %updated.id, "input data merged");
        if let Err(err) = self.publisher.publish(DeviceEvent::single(updated)).await {
            tracing::warn!(%err, "unable to publish device update");
        }
        Routed::Merged
    }
}
