//! # domohub-app
//!
//! Application layer: orchestration use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `HardwarePlugin` / `PluginFactory`: bridge to a physical protocol
//!   - `EventPublisher`: fire-and-forget device update notifications
//!   - `Scheduler`: one-shot and daily jobs
//!   - `SolarTimeSource`: solar instants for a date and location
//! - Provide the **services** every input path goes through:
//!   - `DeviceRegistry`: canonical device set, per-device locking
//!   - `PluginRegistry`: hardware id to plugin binding
//!   - `CommandDispatcher`: device command round trip
//!   - `InputIngestion`: plugin telemetry into device data
//!   - `TimerOrchestrator`: fixed-time and solar timers
//! - Provide **in-process infrastructure** (event bus, tokio scheduler)
//! - Assemble everything into a [`Hub`](hub::Hub)
//!
//! ## Dependency rule
//! Depends on `domohub-domain` only (plus `tokio` for channels, tasks and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod hub;
pub mod ports;
pub mod scheduler;
pub mod services;
pub mod solar;
pub mod timer_orchestrator;

#[cfg(test)]
pub(crate) mod testing;
