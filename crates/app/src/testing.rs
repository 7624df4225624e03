//! In-memory test doubles shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Datelike, NaiveDate, NaiveTime, TimeDelta};

use domohub_domain::device::{Device, DeviceDefinition, DeviceState, DeviceType, Protocol, Role};
use domohub_domain::error::HubError;
use domohub_domain::event::DeviceEvent;
use domohub_domain::hardware::HardwareConfig;
use domohub_domain::solar::{Location, SolarEvent, SolarTimes};
use domohub_domain::time::{Timestamp, now};

use crate::ports::{
    EventPublisher, HardwarePlugin, Job, PluginContext, PluginFactory, Scheduler,
    SolarTimeSource,
};
use crate::services::device_registry::DeviceRegistry;

pub(crate) fn device_with(
    id: &str,
    role: Role,
    device_type: DeviceType,
    protocol: Protocol,
) -> Device {
    let definition = DeviceDefinition::builder()
        .id(id)
        .role(role)
        .device_type(device_type)
        .protocol(protocol)
        .build()
        .unwrap();
    Device::from_definition(definition, "http://hub.test/", now()).unwrap()
}

/// Output light bound to the `stub` hardware.
pub(crate) fn lamp(id: &str) -> Device {
    device_with(id, Role::Output, DeviceType::Light, Protocol::new("stub").with_output(id))
}

/// Temperature input bound to the `stub` hardware, reporting as `address`.
pub(crate) fn thermometer(id: &str, address: &str) -> Device {
    device_with(
        id,
        Role::Input,
        DeviceType::Temperature,
        Protocol::new("stub").with_input(address),
    )
}

/// Wall switch bound to the `stub` hardware, reporting as `address`.
pub(crate) fn switch(id: &str, address: &str) -> Device {
    device_with(
        id,
        Role::Output,
        DeviceType::Switch,
        Protocol::new("stub").with_input(address),
    )
}

pub(crate) fn registry_of(devices: impl IntoIterator<Item = Device>) -> Arc<DeviceRegistry> {
    let mut registry = DeviceRegistry::new();
    for device in devices {
        registry.register(device).unwrap();
    }
    Arc::new(registry)
}

/// Plugin recording every call, optionally slow or failing.
#[derive(Default)]
pub(crate) struct StubPlugin {
    registered: Mutex<Vec<String>>,
    commands: Mutex<Vec<(String, String)>>,
    delays: HashMap<String, Duration>,
    fail_commands: bool,
    fail_init: bool,
    context: Mutex<Option<PluginContext>>,
}

impl StubPlugin {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_commands: true,
            ..Self::default()
        }
    }

    /// Answer commands for `state` only after `delay`.
    pub(crate) fn with_delay(mut self, state: &str, delay: Duration) -> Self {
        self.delays.insert(state.to_string(), delay);
        self
    }

    pub(crate) fn registered(&self) -> Vec<String> {
        self.registered.lock().unwrap().clone()
    }

    pub(crate) fn commands(&self) -> Vec<(String, String)> {
        self.commands.lock().unwrap().clone()
    }

    pub(crate) fn context(&self) -> Option<PluginContext> {
        self.context.lock().unwrap().clone()
    }
}

impl HardwarePlugin for StubPlugin {
    async fn init(&mut self, _config: &HardwareConfig, ctx: PluginContext) -> Result<(), HubError> {
        if self.fail_init {
            return Err(HubError::plugin(std::io::Error::other("stub init failure")));
        }
        *self.context.lock().unwrap() = Some(ctx);
        Ok(())
    }

    fn register_device(&self, device: &Device) -> Result<(), HubError> {
        self.registered.lock().unwrap().push(device.id.to_string());
        Ok(())
    }

    async fn accept_command(
        &self,
        device: &Device,
        desired: &DeviceState,
    ) -> Result<DeviceState, HubError> {
        self.commands
            .lock()
            .unwrap()
            .push((device.id.to_string(), desired.to_string()));
        if let Some(delay) = self.delays.get(desired.as_str()).copied() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_commands {
            return Err(HubError::plugin(std::io::Error::other("stub command failure")));
        }
        Ok(desired.clone())
    }
}

/// Builds [`StubPlugin`]s for a fixed set of hardware types.
pub(crate) struct StubFactory {
    types: Vec<String>,
    fail_init: bool,
}

impl StubFactory {
    pub(crate) fn new<'a>(types: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            types: types.into_iter().map(str::to_string).collect(),
            fail_init: false,
        }
    }

    pub(crate) fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }
}

impl PluginFactory for StubFactory {
    type Plugin = StubPlugin;

    fn create(&self, config: &HardwareConfig) -> Option<StubPlugin> {
        self.types
            .iter()
            .any(|t| t == config.hardware_type.as_str())
            .then(|| StubPlugin {
                fail_init: self.fail_init,
                ..StubPlugin::default()
            })
    }
}

/// Publisher keeping every event in memory.
#[derive(Default)]
pub(crate) struct SpyPublisher {
    events: Mutex<Vec<DeviceEvent>>,
}

impl SpyPublisher {
    pub(crate) fn events(&self) -> Vec<DeviceEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventPublisher for SpyPublisher {
    async fn publish(&self, event: DeviceEvent) -> Result<(), HubError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Publisher whose first publish takes `delay`, recording events in
/// arrival order.
pub(crate) struct SlowFirstPublisher {
    delay: Duration,
    delayed: AtomicBool,
    events: Mutex<Vec<DeviceEvent>>,
}

impl SlowFirstPublisher {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            delayed: AtomicBool::new(false),
            events: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn events(&self) -> Vec<DeviceEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventPublisher for SlowFirstPublisher {
    async fn publish(&self, event: DeviceEvent) -> Result<(), HubError> {
        if !self.delayed.swap(true, Ordering::SeqCst) {
            tokio::time::sleep(self.delay).await;
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// What a [`RecordingScheduler`] was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Registration {
    At(Timestamp),
    Daily(NaiveTime),
}

/// Scheduler that records registrations and fires them on demand.
#[derive(Default)]
pub(crate) struct RecordingScheduler {
    entries: Mutex<Vec<(Registration, Job)>>,
}

impl RecordingScheduler {
    pub(crate) fn registrations(&self) -> Vec<Registration> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(registration, _)| *registration)
            .collect()
    }

    /// Run the job of the `index`-th registration once.
    pub(crate) async fn fire(&self, index: usize) {
        let job = Arc::clone(&self.entries.lock().unwrap()[index].1);
        job().await;
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule_at(&self, at: Timestamp, job: Job) {
        self.entries
            .lock()
            .unwrap()
            .push((Registration::At(at), job));
    }

    fn schedule_daily(&self, time: NaiveTime, job: Job) {
        self.entries
            .lock()
            .unwrap()
            .push((Registration::Daily(time), job));
    }
}

/// Predictable solar source: sunrise 06:MM and sunset 18:MM UTC, where MM
/// shifts with the day of the year so consecutive days differ.
#[derive(Debug, Clone, Default)]
pub(crate) struct FixedSolarSource {
    dark_until: Option<NaiveDate>,
}

impl FixedSolarSource {
    /// No events at all before `date`, like a polar night.
    pub(crate) fn without_events_before(mut self, date: NaiveDate) -> Self {
        self.dark_until = Some(date);
        self
    }

    fn at(date: NaiveDate, hour: u32) -> Timestamp {
        let minutes = i64::from(date.ordinal() % 60);
        date.and_hms_opt(hour, 0, 0).unwrap().and_utc() + TimeDelta::minutes(minutes)
    }

    pub(crate) fn sunrise(&self, date: NaiveDate) -> Timestamp {
        Self::at(date, 6)
    }

    pub(crate) fn sunset(&self, date: NaiveDate) -> Timestamp {
        Self::at(date, 18)
    }
}

impl SolarTimeSource for FixedSolarSource {
    fn solar_times(&self, date: NaiveDate, _location: Location) -> SolarTimes {
        if self.dark_until.is_some_and(|until| date < until) {
            return SolarTimes::from_times(date, []);
        }
        SolarTimes::from_times(
            date,
            [
                (SolarEvent::Sunrise, self.sunrise(date)),
                (SolarEvent::Sunset, self.sunset(date)),
            ],
        )
    }
}
