//! # domohubd: domohub daemon
//!
//! Composition root that wires the built-in plugins into the orchestration
//! core and keeps it running.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Select plugins for every `[[hardware]]` entry
//! - Bootstrap the [`Hub`] and schedule device timers
//! - Log device updates for observers
//! - Tear everything down on shutdown
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

pub mod config;
pub mod plugins;

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use domohub_app::hub::Hub;
use domohub_app::ports::Scheduler;
use domohub_app::scheduler::TokioScheduler;
use domohub_app::solar::AstronomicalSolarSource;
use domohub_domain::event::DeviceEvent;

use crate::config::Config;
use crate::plugins::{AnyPlugin, BuiltinPluginFactory};

/// A running hub with its timers.
pub struct Daemon {
    hub: Hub<AnyPlugin>,
    scheduler: Arc<TokioScheduler>,
    events: JoinHandle<()>,
}

impl Daemon {
    /// Bootstrap the hub from `config` and arm every device timer.
    pub async fn start(config: Config) -> Self {
        let settings = config.hub_settings();
        let Config {
            hardware, devices, ..
        } = config;

        let hub = Hub::bootstrap(settings, &BuiltinPluginFactory, &hardware, devices).await;
        let events = spawn_event_logger(hub.subscribe());

        let scheduler = Arc::new(TokioScheduler::new());
        let shared: Arc<dyn Scheduler> = scheduler.clone();
        let timers = hub.schedule_timers(shared, Arc::new(AstronomicalSolarSource));
        tracing::info!(timers, "daemon started");

        Self {
            hub,
            scheduler,
            events,
        }
    }

    #[must_use]
    pub fn hub(&self) -> &Hub<AnyPlugin> {
        &self.hub
    }

    /// Registrations still waiting on the scheduler.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// Abort timers, stop the hub and tear plugins down.
    pub async fn shutdown(self) {
        self.scheduler.shutdown();
        self.hub.shutdown().await;
        self.events.abort();
    }
}

/// Log every device update published on the hub's bus.
pub fn spawn_event_logger(events: broadcast::Receiver<DeviceEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = BroadcastStream::new(events);
        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => {
                    for device in &event.devices {
                        tracing::info!(
                            channel = event.channel(),
                            device_id = %device.id,
                            state = ?device.state,
                            "device updated"
                        );
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event logger lagging behind");
                }
            }
        }
    })
}
