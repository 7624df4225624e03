//! Shell plugin error types.

use std::process::ExitStatus;

use domohub_domain::error::HubError;

/// Errors specific to the shell plugin.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// The `settings` table of the hardware entry could not be parsed.
    #[error("invalid shell plugin settings")]
    Settings(#[source] serde_json::Error),

    /// An output device has no command configured at all.
    #[error("device {device_id} has no shell actions configured")]
    NoActions { device_id: String },

    /// No command is configured for the requested state.
    #[error("device {device_id} has no shell action for state {state}")]
    MissingAction { device_id: String, state: String },

    /// The interpreter could not be started.
    #[error("unable to run shell command")]
    Spawn(#[source] std::io::Error),

    /// The command ran and reported failure.
    #[error("shell command {command:?} failed with {status}")]
    Failed { command: String, status: ExitStatus },
}

impl ShellError {
    /// Convert into a [`HubError::Plugin`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> HubError {
        HubError::plugin(self)
    }
}

impl From<ShellError> for HubError {
    fn from(err: ShellError) -> Self {
        err.into_domain()
    }
}
