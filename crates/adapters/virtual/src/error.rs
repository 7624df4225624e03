//! Virtual plugin error types.

use domohub_domain::error::HubError;

/// Errors specific to the virtual plugin.
#[derive(Debug, thiserror::Error)]
pub enum VirtualError {
    /// The `settings` table of the hardware entry could not be parsed.
    #[error("invalid virtual plugin settings")]
    Settings(#[source] serde_json::Error),

    /// A command targeted a device that was never registered with the plugin.
    #[error("device {0} is not registered with the virtual plugin")]
    UnknownDevice(String),
}

impl VirtualError {
    /// Convert into a [`HubError::Plugin`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> HubError {
        HubError::plugin(self)
    }
}

impl From<VirtualError> for HubError {
    fn from(err: VirtualError) -> Self {
        err.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_unknown_device_error() {
        let err = VirtualError::UnknownDevice("LAMP9".to_string());
        assert_eq!(
            err.to_string(),
            "device LAMP9 is not registered with the virtual plugin"
        );
    }

    #[test]
    fn should_convert_into_plugin_error() {
        let err: HubError = VirtualError::UnknownDevice("LAMP9".to_string()).into();
        assert!(matches!(err, HubError::Plugin(_)));
    }
}
