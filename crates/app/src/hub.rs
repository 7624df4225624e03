//! Hub: the orchestrator object owning every registry and service.
//!
//! Built once at process start by [`Hub::bootstrap`]; the daemon and any
//! outer surface talk to the core only through it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use domohub_domain::device::{Device, DeviceDefinition, DeviceState, Role};
use domohub_domain::error::HubError;
use domohub_domain::event::DeviceEvent;
use domohub_domain::hardware::HardwareConfig;
use domohub_domain::solar::Location;
use domohub_domain::time::now;

use crate::event_bus::InProcessEventBus;
use crate::ports::{
    HardwarePlugin, InputReport, InputSink, PluginContext, PluginFactory, Scheduler,
    SolarTimeSource,
};
use crate::services::device_registry::DeviceRegistry;
use crate::services::dispatcher::{AppliedState, CommandDispatcher, DEFAULT_DISPATCH_TIMEOUT};
use crate::services::ingestion::InputIngestion;
use crate::services::plugin_registry::PluginRegistry;
use crate::timer_orchestrator::TimerOrchestrator;

type Bus = Arc<InProcessEventBus>;

/// Runtime knobs of the hub.
#[derive(Debug, Clone, PartialEq)]
pub struct HubSettings {
    /// Base URL output action URIs are rooted at.
    pub server_address: String,
    pub dispatch_timeout: Duration,
    pub event_capacity: usize,
    pub input_capacity: usize,
    pub location: Location,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            server_address: "http://localhost:3000/".to_string(),
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            event_capacity: 256,
            input_capacity: 256,
            location: Location::default(),
        }
    }
}

/// The running orchestration core.
pub struct Hub<P: HardwarePlugin + 'static> {
    devices: Arc<DeviceRegistry>,
    plugins: Arc<PluginRegistry<P>>,
    dispatcher: Arc<CommandDispatcher<P, Bus>>,
    ingestion: Arc<InputIngestion<P, Bus>>,
    bus: Bus,
    inputs: InputSink,
    location: Location,
    ingestion_task: Mutex<Option<JoinHandle<()>>>,
    timers: Mutex<Option<Arc<TimerOrchestrator<P, Bus>>>>,
}

impl<P: HardwarePlugin + 'static> Hub<P> {
    /// Load plugins, initialise and bind devices, and start consuming input.
    ///
    /// Unknown or failing hardware, disabled devices, invalid or duplicate
    /// devices are logged and skipped. Devices whose hardware is not loaded
    /// stay registered but every command to them fails.
    pub async fn bootstrap<F>(
        settings: HubSettings,
        factory: &F,
        hardware: &[HardwareConfig],
        definitions: Vec<DeviceDefinition>,
    ) -> Self
    where
        F: PluginFactory<Plugin = P>,
    {
        let bus = Arc::new(InProcessEventBus::new(settings.event_capacity));
        let (inputs, reports) = InputSink::channel(settings.input_capacity);
        let ctx = PluginContext::new(inputs.clone(), settings.location);

        let mut plugins = PluginRegistry::new();
        let loaded = plugins.load_all(factory, hardware, &ctx).await;

        let mut devices = DeviceRegistry::new();
        for definition in definitions {
            let device_id = definition.id.clone();
            if !definition.enabled {
                tracing::info!(%device_id, "device disabled, skipping");
                continue;
            }
            let device = match Device::from_definition(definition, &settings.server_address, now())
            {
                Ok(device) => device,
                Err(err) => {
                    tracing::warn!(%err, %device_id, "invalid device, skipping");
                    continue;
                }
            };
            let slot = match devices.register(device) {
                Ok(slot) => slot,
                Err(err) => {
                    tracing::warn!(%err, %device_id, "unable to register device, skipping");
                    continue;
                }
            };
            if let Err(err) = plugins.register_device(&slot.snapshot()) {
                tracing::warn!(%err, %device_id, "device has no working hardware, commands will fail");
            }
        }
        tracing::info!(devices = devices.len(), plugins = loaded, "hub initialised");

        let devices = Arc::new(devices);
        let plugins = Arc::new(plugins);
        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::clone(&devices),
            Arc::clone(&plugins),
            Arc::clone(&bus),
            settings.dispatch_timeout,
        ));
        let ingestion = Arc::new(InputIngestion::new(
            Arc::clone(&devices),
            Arc::clone(&dispatcher),
            Arc::clone(&bus),
        ));
        let ingestion_task = tokio::spawn(Arc::clone(&ingestion).run(reports));

        Self {
            devices,
            plugins,
            dispatcher,
            ingestion,
            bus,
            inputs,
            location: settings.location,
            ingestion_task: Mutex::new(Some(ingestion_task)),
            timers: Mutex::new(None),
        }
    }

    /// Schedule every configured device timer.
    ///
    /// Returns the number of timers scheduled.
    pub fn schedule_timers(
        &self,
        scheduler: Arc<dyn Scheduler>,
        solar: Arc<dyn SolarTimeSource>,
    ) -> usize {
        let orchestrator = TimerOrchestrator::new(
            Arc::clone(&self.dispatcher),
            scheduler,
            solar,
            self.location,
        );
        let scheduled = orchestrator.schedule_all(&self.devices);
        *self.timers.lock().unwrap_or_else(PoisonError::into_inner) = Some(orchestrator);
        scheduled
    }

    /// Send a command to a device.
    ///
    /// # Errors
    ///
    /// See [`CommandDispatcher::dispatch`].
    pub async fn dispatch_command(
        &self,
        device_id: &str,
        state: impl Into<DeviceState>,
    ) -> Result<AppliedState, HubError> {
        self.dispatcher.dispatch(device_id, state.into()).await
    }

    /// Apply a report directly, bypassing the input channel.
    ///
    /// # Errors
    ///
    /// See [`InputIngestion::on_new_input`].
    pub async fn on_new_input(&self, report: InputReport) -> Result<(), HubError> {
        self.ingestion.on_new_input(report).await
    }

    /// Snapshots of every device with `role`, in configuration order.
    #[must_use]
    pub fn list_by_role(&self, role: Role) -> Vec<Device> {
        self.devices.list_by_role(role)
    }

    /// What a newly connected observer receives: every input, then every output.
    #[must_use]
    pub fn snapshot(&self) -> [DeviceEvent; 2] {
        [
            DeviceEvent::bulk(Role::Input, self.list_by_role(Role::Input)),
            DeviceEvent::bulk(Role::Output, self.list_by_role(Role::Output)),
        ]
    }

    /// Subscribe to device updates published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.bus.subscribe()
    }

    /// Sender plugins use to push reports.
    #[must_use]
    pub fn input_sink(&self) -> InputSink {
        self.inputs.clone()
    }

    #[must_use]
    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    #[must_use]
    pub fn plugins(&self) -> &PluginRegistry<P> {
        &self.plugins
    }

    /// Stop consuming input and tear plugins down.
    pub async fn shutdown(&self) {
        let task = self
            .ingestion_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.plugins.teardown_all().await;
        tracing::info!("hub stopped");
    }
}
