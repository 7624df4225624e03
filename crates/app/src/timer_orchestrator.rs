//! Timer orchestrator: turns configured device timers into scheduled jobs.
//!
//! Fixed-time timers become one daily job each. Solar timers are one-shot
//! jobs that re-arm themselves for the following day after firing, since
//! solar instants drift from one day to the next.

use std::sync::{Arc, Weak};

use chrono::{Days, Local, NaiveDate};

use domohub_domain::device::{DeviceState, Role};
use domohub_domain::id::DeviceId;
use domohub_domain::solar::Location;
use domohub_domain::time::now;
use domohub_domain::timer::{Timer, TimerSchedule};

use crate::ports::{EventPublisher, HardwarePlugin, Job, JobFuture, Scheduler, SolarTimeSource};
use crate::services::device_registry::DeviceRegistry;
use crate::services::dispatcher::CommandDispatcher;

/// How many following days are tried when a solar event does not occur.
const SOLAR_LOOKAHEAD_DAYS: u64 = 366;

/// Schedules device timers and fires their commands.
pub struct TimerOrchestrator<P, E> {
    dispatcher: Arc<CommandDispatcher<P, E>>,
    scheduler: Arc<dyn Scheduler>,
    solar: Arc<dyn SolarTimeSource>,
    location: Location,
}

impl<P, E> TimerOrchestrator<P, E>
where
    P: HardwarePlugin + 'static,
    E: EventPublisher + Send + Sync + 'static,
{
    pub fn new(
        dispatcher: Arc<CommandDispatcher<P, E>>,
        scheduler: Arc<dyn Scheduler>,
        solar: Arc<dyn SolarTimeSource>,
        location: Location,
    ) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            scheduler,
            solar,
            location,
        })
    }

    /// Schedule the timers of every device, starting today.
    ///
    /// Returns the number of timers scheduled.
    pub fn schedule_all(self: &Arc<Self>, devices: &DeviceRegistry) -> usize {
        self.schedule_all_from(devices, Local::now().date_naive())
    }

    /// Schedule the timers of every device, with solar timers starting on `date`.
    ///
    /// Disabled timers are skipped. Devices with at least one scheduled
    /// timer get `has_timers` set.
    pub fn schedule_all_from(self: &Arc<Self>, devices: &DeviceRegistry, date: NaiveDate) -> usize {
        let mut total = 0;
        for slot in devices.iter() {
            let device = slot.snapshot();
            if device.timers.is_empty() {
                continue;
            }
            if device.role == Role::Input {
                tracing::warn!(device_id = %device.id, "timers on input devices are ignored");
                continue;
            }

            let mut scheduled = 0;
            for timer in &device.timers {
                if !timer.enabled {
                    tracing::info!(device_id = %device.id, %timer, "timer disabled, skipping");
                    continue;
                }
                if self.schedule(&device.id, timer, date) {
                    tracing::info!(device_id = %device.id, %timer, "timer scheduled");
                    scheduled += 1;
                }
            }

            if scheduled > 0 {
                slot.update(|device| device.has_timers = true);
            }
            total += scheduled;
        }
        total
    }

    fn schedule(self: &Arc<Self>, device_id: &DeviceId, timer: &Timer, date: NaiveDate) -> bool {
        match &timer.schedule {
            TimerSchedule::Time { time } => {
                let job = self.dispatch_job(device_id.clone(), timer.state.clone());
                self.scheduler.schedule_daily(time.as_naive(), job);
                true
            }
            TimerSchedule::Sun { .. } => self.arm_solar(device_id.clone(), timer.clone(), date),
        }
    }

    /// Schedule the first future occurrence of a solar timer on or after `date`.
    ///
    /// Dates on which the event does not happen, or whose instant already
    /// passed, are skipped.
    fn arm_solar(self: &Arc<Self>, device_id: DeviceId, timer: Timer, date: NaiveDate) -> bool {
        let current = now();
        for ahead in 0..SOLAR_LOOKAHEAD_DAYS {
            let Some(day) = date.checked_add_days(Days::new(ahead)) else {
                break;
            };
            let times = self.solar.solar_times(day, self.location);
            let Some(at) = timer.solar_instant(&times) else {
                continue;
            };
            if at <= current {
                continue;
            }
            let job = self.solar_job(device_id.clone(), timer.clone(), day);
            self.scheduler.schedule_at(at, job);
            tracing::debug!(%device_id, %timer, %at, "solar timer armed");
            return true;
        }
        tracing::warn!(%device_id, %timer, "solar event does not occur within a year, timer dropped");
        false
    }

    fn dispatch_job(&self, device_id: DeviceId, state: DeviceState) -> Job {
        let dispatcher = Arc::clone(&self.dispatcher);
        Arc::new(move || -> JobFuture {
            let dispatcher = Arc::clone(&dispatcher);
            let device_id = device_id.clone();
            let state = state.clone();
            Box::pin(async move { fire(&dispatcher, &device_id, state).await })
        })
    }

    fn solar_job(self: &Arc<Self>, device_id: DeviceId, timer: Timer, day: NaiveDate) -> Job {
        let this: Weak<Self> = Arc::downgrade(self);
        Arc::new(move || -> JobFuture {
            let this = this.clone();
            let device_id = device_id.clone();
            let timer = timer.clone();
            Box::pin(async move {
                let Some(this) = this.upgrade() else {
                    return;
                };
                fire(&this.dispatcher, &device_id, timer.state.clone()).await;
                if let Some(next) = day.succ_opt() {
                    this.arm_solar(device_id, timer, next);
                }
            })
        })
    }
}

async fn fire<P, E>(dispatcher: &CommandDispatcher<P, E>, device_id: &DeviceId, state: DeviceState)
where
    P: HardwarePlugin + 'static,
    E: EventPublisher + Send + Sync,
{
    if let Err(err) = dispatcher.dispatch(device_id.as_str(), state).await {
        tracing::warn!(%err, %device_id, "timer command failed, waiting for next firing");
    }
}
