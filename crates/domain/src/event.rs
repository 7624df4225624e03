//! Event: a device update notification published to observers.
//!
//! Input and output updates travel on separate channels so clients can
//! subscribe to one kind only. A bulk event carries several devices at once.

use serde::{Deserialize, Serialize};

use crate::device::{Device, Role};

/// Channel name for input device updates.
pub const INPUT_CHANNEL: &str = "inputDeviceUpdate";
/// Channel name for output device updates.
pub const OUTPUT_CHANNEL: &str = "outputDeviceUpdate";

/// Snapshot of one or more devices after a change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub role: Role,
    pub devices: Vec<Device>,
}

impl DeviceEvent {
    /// Event carrying a single device snapshot.
    #[must_use]
    pub fn single(device: Device) -> Self {
        Self {
            role: device.role,
            devices: vec![device],
        }
    }

    /// Bulk event for a set of devices sharing `role`.
    #[must_use]
    pub fn bulk(role: Role, devices: Vec<Device>) -> Self {
        Self { role, devices }
    }

    /// Name of the channel this event is delivered on.
    #[must_use]
    pub fn channel(&self) -> &'static str {
        match self.role {
            Role::Input => INPUT_CHANNEL,
            Role::Output => OUTPUT_CHANNEL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceDefinition, DeviceType, Protocol};
    use crate::time::now;

    fn device(id: &str, role: Role, device_type: DeviceType) -> Device {
        let definition = DeviceDefinition::builder()
            .id(id)
            .role(role)
            .device_type(device_type)
            .protocol(Protocol::new("virtual"))
            .build()
            .unwrap();
        Device::from_definition(definition, "http://hub", now()).unwrap()
    }

    #[test]
    fn should_route_output_event_to_output_channel() {
        let event = DeviceEvent::single(device("LAMP1", Role::Output, DeviceType::Light));
        assert_eq!(event.channel(), "outputDeviceUpdate");
        assert_eq!(event.devices.len(), 1);
    }

    #[test]
    fn should_route_input_event_to_input_channel() {
        let event = DeviceEvent::single(device("TEMP1", Role::Input, DeviceType::Temperature));
        assert_eq!(event.channel(), "inputDeviceUpdate");
    }

    #[test]
    fn should_carry_every_device_in_bulk_event() {
        let event = DeviceEvent::bulk(
            Role::Input,
            vec![
                device("TEMP1", Role::Input, DeviceType::Temperature),
                device("P1", Role::Input, DeviceType::Power),
            ],
        );
        assert_eq!(event.devices.len(), 2);
        assert_eq!(event.channel(), INPUT_CHANNEL);
    }
}
