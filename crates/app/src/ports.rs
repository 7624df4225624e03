//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the orchestration core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod event_bus;
pub mod plugin;
pub mod scheduler;
pub mod solar;

pub use event_bus::EventPublisher;
pub use plugin::{HardwarePlugin, InputReport, InputSink, PluginContext, PluginFactory};
pub use scheduler::{Job, JobFuture, Scheduler};
pub use solar::SolarTimeSource;
