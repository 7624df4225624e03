//! Plugin port: lifecycle and command handling for hardware integrations.
//!
//! A plugin bridges a physical protocol (radio, serial meter, shell, …) into
//! the hub. It is created from a `[[hardware]]` entry, told about every device
//! bound to it, executes commands for output devices, and pushes telemetry
//! back through an [`InputSink`].

use std::future::Future;

use tokio::sync::mpsc;

use domohub_domain::device::{Device, DeviceData, DeviceState};
use domohub_domain::error::HubError;
use domohub_domain::hardware::HardwareConfig;
use domohub_domain::solar::Location;

/// A pluggable hardware integration.
///
/// The plugin registry calls the lifecycle methods in order:
///
/// 1. [`init`](Self::init): connect, spawn readers, keep the context
/// 2. [`register_device`](Self::register_device): once per bound device
/// 3. (the hub runs, forwarding commands via [`accept_command`](Self::accept_command))
/// 4. [`teardown`](Self::teardown): stop background work
pub trait HardwarePlugin: Send + Sync {
    /// Initialise the plugin from its hardware entry.
    ///
    /// Plugins that report input keep `ctx.inputs` and push
    /// [`InputReport`]s through it from their own tasks.
    fn init(
        &mut self,
        config: &HardwareConfig,
        ctx: PluginContext,
    ) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Make the plugin aware of a device bound to it.
    ///
    /// # Errors
    ///
    /// Returns an error when the device's protocol block is unusable for
    /// this plugin. The device stays registered in the hub.
    fn register_device(&self, device: &Device) -> Result<(), HubError>;

    /// Execute a command for an output device and return the applied state.
    fn accept_command(
        &self,
        device: &Device,
        desired: &DeviceState,
    ) -> impl Future<Output = Result<DeviceState, HubError>> + Send;

    /// Called on graceful shutdown.
    fn teardown(&self) -> impl Future<Output = Result<(), HubError>> + Send {
        async { Ok(()) }
    }
}

/// Builds plugins from hardware entries.
///
/// Returns `None` for a hardware type the factory does not know.
pub trait PluginFactory {
    type Plugin: HardwarePlugin + 'static;

    fn create(&self, config: &HardwareConfig) -> Option<Self::Plugin>;
}

/// Everything a plugin receives from the hub at initialisation.
#[derive(Debug, Clone)]
pub struct PluginContext {
    /// Where to push telemetry and switch presses.
    pub inputs: InputSink,
    /// Configured hub location.
    pub location: Location,
}

impl PluginContext {
    #[must_use]
    pub fn new(inputs: InputSink, location: Location) -> Self {
        Self { inputs, location }
    }
}

/// A single report pushed by a plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct InputReport {
    /// Hardware address the report originates from, resolved against
    /// device protocol blocks.
    pub address: String,
    /// Reported fields, merged into the device data.
    pub data: DeviceData,
    /// Command carried by switch presses.
    pub command: Option<DeviceState>,
}

impl InputReport {
    /// Telemetry report.
    #[must_use]
    pub fn data(address: impl Into<String>, data: DeviceData) -> Self {
        Self {
            address: address.into(),
            data,
            command: None,
        }
    }

    /// Switch press report.
    #[must_use]
    pub fn command(address: impl Into<String>, command: impl Into<DeviceState>) -> Self {
        Self {
            address: address.into(),
            data: DeviceData::new(),
            command: Some(command.into()),
        }
    }
}

/// Sending half of the hub's input channel, handed to plugins.
#[derive(Debug, Clone)]
pub struct InputSink {
    sender: mpsc::Sender<InputReport>,
}

impl InputSink {
    /// Create a sink and the receiver consumed by input ingestion.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<InputReport>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Push a report, waiting for room in the channel.
    ///
    /// Reports sent after the hub stopped are dropped.
    pub async fn report(&self, report: InputReport) {
        if let Err(err) = self.sender.send(report).await {
            tracing::debug!(address = %err.0.address, "input channel closed, dropping report");
        }
    }

    /// Whether the hub stopped consuming reports.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
