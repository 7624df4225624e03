//! Scheduler running jobs as tokio tasks.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{Days, Local, NaiveTime, TimeZone};
use tokio::task::JoinHandle;

use domohub_domain::time::{Timestamp, now};

use crate::ports::{Job, Scheduler};

/// [`Scheduler`] backed by the ambient tokio runtime.
///
/// Every registration is a task sleeping until its instant; every firing
/// runs in a task of its own so a slow job never delays another one.
/// Must be used from within a runtime.
#[derive(Debug, Default)]
pub struct TokioScheduler {
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TokioScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Number of registrations still waiting to fire.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|task| !task.is_finished())
            .count()
    }

    /// Abort every pending registration.
    pub fn shutdown(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in &tasks {
            task.abort();
        }
        tracing::debug!(aborted = tasks.len(), "scheduler stopped");
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_at(&self, at: Timestamp, job: Job) {
        let delay = until(at);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(job());
        });
        self.track(handle);
    }

    fn schedule_daily(&self, time: NaiveTime, job: Job) {
        let handle = tokio::spawn(async move {
            loop {
                let Some(next) = next_local_occurrence(time, now()) else {
                    tracing::warn!(%time, "no upcoming local occurrence, daily job stopped");
                    return;
                };
                tokio::time::sleep(until(next)).await;
                tokio::spawn(job());
            }
        });
        self.track(handle);
    }
}

fn until(at: Timestamp) -> Duration {
    (at - now()).to_std().unwrap_or(Duration::ZERO)
}

/// The first instant strictly after `after` at which the local wall clock
/// reads `time`. Days where `time` does not exist (DST gaps) are skipped.
fn next_local_occurrence(time: NaiveTime, after: Timestamp) -> Option<Timestamp> {
    let today = after.with_timezone(&Local).date_naive();
    (0..=2)
        .filter_map(|ahead| today.checked_add_days(Days::new(ahead)))
        .filter_map(|day| Local.from_local_datetime(&day.and_time(time)).earliest())
        .map(|local| local.to_utc())
        .find(|candidate| *candidate > after)
}
