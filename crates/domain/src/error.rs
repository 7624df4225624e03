//! Common error types used across the workspace.
//!
//! Each failure class has its own typed error; [`HubError`] aggregates them
//! through `#[from]` conversions so callers can `?` freely and still match on
//! the precise cause.

use std::time::Duration;

/// Top-level error for every orchestration operation.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// A device with the same id is already registered.
    #[error("duplicate device")]
    Duplicate(#[from] DuplicateDeviceError),

    /// A device or plugin lookup failed.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A device references hardware without a loaded plugin.
    #[error("unbound hardware")]
    UnboundHardware(#[from] UnboundHardwareError),

    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A plugin did not answer a command in time.
    #[error("dispatch timed out")]
    Timeout(#[from] DispatchTimeoutError),

    /// A plugin reported a transport or protocol failure.
    #[error("plugin error")]
    Plugin(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Raised when registering a device whose id is already taken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("device {id} is already registered")]
pub struct DuplicateDeviceError {
    pub id: String,
}

/// Raised when a lookup does not match anything.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Raised when a device's hardware id has no successfully loaded plugin.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("device {device_id} references unbound hardware {hardware_id}")]
pub struct UnboundHardwareError {
    pub device_id: String,
    pub hardware_id: String,
}

/// Raised when a plugin command exceeds the configured dispatch timeout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("command to device {device_id} timed out after {after:?}")]
pub struct DispatchTimeoutError {
    pub device_id: String,
    pub after: Duration,
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("device id must not be empty")]
    EmptyDeviceId,
    #[error("hardware id must not be empty")]
    EmptyHardwareId,
    #[error("invalid time of day {0:?}, expected HH:MM or HH:MM:SS")]
    InvalidTimeOfDay(String),
    #[error("invalid offset {0:?}, expected [+-]HH:MM")]
    InvalidOffset(String),
    #[error("device {0} is an input and accepts no commands")]
    NotAnOutput(String),
    #[error("hardware {0} is already loaded")]
    DuplicateHardware(String),
}

impl HubError {
    /// Wrap an adapter-specific failure as a [`HubError::Plugin`].
    pub fn plugin(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Plugin(Box::new(err))
    }
}
