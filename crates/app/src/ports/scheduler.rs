//! Scheduler port: run jobs at an instant or every day at a time.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::NaiveTime;

use domohub_domain::time::Timestamp;

/// Future produced by a [`Job`] invocation.
pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A schedulable unit of work. Recurring jobs are invoked once per firing.
pub type Job = Arc<dyn Fn() -> JobFuture + Send + Sync>;

/// Timer-driven job execution.
///
/// Jobs scheduled on the same scheduler run independently; there is no
/// ordering guarantee between unrelated jobs.
pub trait Scheduler: Send + Sync {
    /// Run `job` once at `at`. Instants in the past fire immediately.
    fn schedule_at(&self, at: Timestamp, job: Job);

    /// Run `job` every day at the local wall-clock `time`.
    fn schedule_daily(&self, time: NaiveTime, job: Job);
}

impl<T: Scheduler + ?Sized> Scheduler for Arc<T> {
    fn schedule_at(&self, at: Timestamp, job: Job) {
        (**self).schedule_at(at, job);
    }

    fn schedule_daily(&self, time: NaiveTime, job: Job) {
        (**self).schedule_daily(time, job);
    }
}
