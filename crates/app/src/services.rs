//! Application services: use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod device_registry;
pub mod dispatcher;
pub mod ingestion;
pub mod plugin_registry;
