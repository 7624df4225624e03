//! Device: a logical input (reports telemetry) or output (accepts commands).
//!
//! Devices are described in configuration by a [`DeviceDefinition`] and
//! turned into a live [`Device`] at startup. The protocol block tells which
//! hardware plugin drives the device and under which addresses the plugin
//! reports it.

mod value;

pub use value::{DataValue, DeviceData};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HubError, ValidationError};
use crate::id::{DeviceId, HardwareId};
use crate::time::Timestamp;
use crate::timer::Timer;

/// Whether a device reports data or accepts commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Input,
    Output,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// Closed set of device kinds known to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Temperature,
    Power,
    Heating,
    /// Wall switch reporting presses; its reports are forwarded as commands.
    Switch,
    Light,
    Screen,
    Chime,
}

impl DeviceType {
    /// The data bag a freshly initialised device of this type starts with.
    #[must_use]
    pub fn initial_data(self) -> DeviceData {
        let keys: &[&str] = match self {
            Self::Temperature => &[
                "device_type_string",
                "temperature",
                "humidity",
                "humidity_status",
                "barometer",
                "battery_level",
                "rssi",
            ],
            Self::Heating => &["temperature", "setpoint", "pressure"],
            Self::Power => {
                let mut data = DeviceData::new();
                data.insert(
                    "electricity".to_string(),
                    DataValue::Json(serde_json::json!({
                        "received": {
                            "tariff1": { "value": null, "unit": "kWh" },
                            "tariff2": { "value": null, "unit": "kWh" },
                            "actual": { "value": null, "unit": "kW" },
                        }
                    })),
                );
                return data;
            }
            Self::Switch | Self::Light | Self::Screen | Self::Chime => &[],
        };
        keys.iter()
            .map(|key| ((*key).to_string(), DataValue::Null))
            .collect()
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Temperature => "temperature",
            Self::Power => "power",
            Self::Heating => "heating",
            Self::Switch => "switch",
            Self::Light => "light",
            Self::Screen => "screen",
            Self::Chime => "chime",
        };
        f.write_str(name)
    }
}

/// Command set exposed by an output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// `on` / `off`.
    #[default]
    OnOff,
    /// Screens and shutters; driven through `on` / `off` as well.
    UpDown,
    /// Single `trigger` command (doorbells, pulses).
    Momentary,
}

impl OutputKind {
    /// Command names an output of this kind accepts.
    #[must_use]
    pub fn commands(self) -> &'static [&'static str] {
        match self {
            Self::OnOff | Self::UpDown => &["on", "off"],
            Self::Momentary => &["trigger"],
        }
    }
}

/// Free-form state token of an output device (`"on"`, `"off"`, `"trigger"`, …).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceState(String);

impl DeviceState {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn on() -> Self {
        Self::new("on")
    }

    #[must_use]
    pub fn off() -> Self {
        Self::new("off")
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `off` for `on`, `on` for anything else.
    #[must_use]
    pub fn toggled(&self) -> Self {
        if self.0 == "on" { Self::off() } else { Self::on() }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceState {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeviceState {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<&str> for DeviceState {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A sub-address under which a plugin reports or drives a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: String,
}

impl Address {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// How a device is reached through its hardware plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    /// Plugin binding key.
    pub hardware_id: HardwareId,
    /// Direct protocol address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Output sub-address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Address>,
    /// Input sub-addresses, in configuration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<Address>,
    /// Plugin-specific command payloads keyed by state (e.g. shell commands).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<String, String>,
}

impl Protocol {
    #[must_use]
    pub fn new(hardware_id: impl Into<HardwareId>) -> Self {
        Self {
            hardware_id: hardware_id.into(),
            id: None,
            output: None,
            inputs: Vec::new(),
            actions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_output(mut self, id: impl Into<String>) -> Self {
        self.output = Some(Address::new(id));
        self
    }

    #[must_use]
    pub fn with_input(mut self, id: impl Into<String>) -> Self {
        self.inputs.push(Address::new(id));
        self
    }

    #[must_use]
    pub fn with_action(mut self, state: impl Into<String>, payload: impl Into<String>) -> Self {
        self.actions.insert(state.into(), payload.into());
        self
    }

    #[must_use]
    pub fn matches_direct(&self, hardware_id: &str) -> bool {
        self.id.as_deref() == Some(hardware_id)
    }

    #[must_use]
    pub fn matches_output(&self, hardware_id: &str) -> bool {
        self.output.as_ref().is_some_and(|o| o.id == hardware_id)
    }

    #[must_use]
    pub fn matches_input(&self, hardware_id: &str) -> bool {
        self.inputs.iter().any(|i| i.id == hardware_id)
    }
}

/// A device as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDefinition {
    pub id: DeviceId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub role: Role,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub sub_type: OutputKind,
    pub protocol: Protocol,
    #[serde(default)]
    pub timers: Vec<Timer>,
}

fn enabled_by_default() -> bool {
    true
}

impl DeviceDefinition {
    /// Create a builder for constructing a [`DeviceDefinition`].
    #[must_use]
    pub fn builder() -> DeviceDefinitionBuilder {
        DeviceDefinitionBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when:
    /// - `id` is empty ([`ValidationError::EmptyDeviceId`])
    /// - `protocol.hardware_id` is empty ([`ValidationError::EmptyHardwareId`])
    pub fn validate(&self) -> Result<(), HubError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyDeviceId.into());
        }
        if self.protocol.hardware_id.is_empty() {
            return Err(ValidationError::EmptyHardwareId.into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`DeviceDefinition`].
#[derive(Debug, Default)]
pub struct DeviceDefinitionBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    enabled: Option<bool>,
    role: Option<Role>,
    device_type: Option<DeviceType>,
    sub_type: OutputKind,
    protocol: Option<Protocol>,
    timers: Vec<Timer>,
}

impl DeviceDefinitionBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<DeviceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    #[must_use]
    pub fn device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = Some(device_type);
        self
    }

    #[must_use]
    pub fn sub_type(mut self, sub_type: OutputKind) -> Self {
        self.sub_type = sub_type;
        self
    }

    #[must_use]
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    #[must_use]
    pub fn timer(mut self, timer: Timer) -> Self {
        self.timers.push(timer);
        self
    }

    /// Consume the builder, validate, and return a [`DeviceDefinition`].
    ///
    /// Role defaults to output and type to light.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if the id or hardware id is missing.
    pub fn build(self) -> Result<DeviceDefinition, HubError> {
        let id = self.id.unwrap_or_else(|| DeviceId::new(""));
        let definition = DeviceDefinition {
            name: self.name.unwrap_or_else(|| id.to_string()),
            id,
            enabled: self.enabled.unwrap_or(true),
            role: self.role.unwrap_or(Role::Output),
            device_type: self.device_type.unwrap_or(DeviceType::Light),
            sub_type: self.sub_type,
            protocol: self.protocol.unwrap_or_else(|| Protocol::new("")),
            timers: self.timers,
        };
        definition.validate()?;
        Ok(definition)
    }
}

/// A live device held by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub role: Role,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub protocol: Protocol,
    /// Current output state; `None` for inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<DeviceState>,
    pub data: DeviceData,
    pub last_updated: Timestamp,
    pub has_timers: bool,
    /// A command is in flight.
    pub busy: bool,
    pub timers: Vec<Timer>,
    /// Invokable command names mapped to dispatch URIs.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<String, String>,
}

impl Device {
    /// Initialise a device from its definition.
    ///
    /// Inputs start with the data template of their type. Outputs start
    /// `off`, with one action URI per command of their sub-type, rooted at
    /// `server_address`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if the definition violates invariants.
    pub fn from_definition(
        definition: DeviceDefinition,
        server_address: &str,
        now: Timestamp,
    ) -> Result<Self, HubError> {
        definition.validate()?;
        let DeviceDefinition {
            id,
            name,
            role,
            device_type,
            sub_type,
            protocol,
            timers,
            ..
        } = definition;

        let (state, actions) = match role {
            Role::Input => (None, BTreeMap::new()),
            Role::Output => {
                let base = server_address.trim_end_matches('/');
                let actions = sub_type
                    .commands()
                    .iter()
                    .map(|cmd| {
                        (
                            (*cmd).to_string(),
                            format!("{base}/output/command/{id}/{cmd}"),
                        )
                    })
                    .collect();
                (Some(DeviceState::off()), actions)
            }
        };

        Ok(Self {
            name: if name.is_empty() { id.to_string() } else { name },
            id,
            role,
            device_type,
            protocol,
            state,
            data: device_type.initial_data(),
            last_updated: now,
            has_timers: false,
            busy: false,
            timers,
            actions,
        })
    }

    /// The plugin binding key of this device.
    #[must_use]
    pub fn hardware_id(&self) -> &HardwareId {
        &self.protocol.hardware_id
    }

    /// Record a confirmed state change.
    pub fn apply_state(&mut self, state: DeviceState, at: Timestamp) {
        self.state = Some(state);
        self.last_updated = at;
    }

    /// Shallow-merge reported fields into `data`; later values win per key.
    pub fn merge_data(&mut self, data: DeviceData, at: Timestamp) {
        self.data.extend(data);
        self.last_updated = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;

    fn lamp_definition() -> DeviceDefinition {
        DeviceDefinition::builder()
            .id("LAMP1")
            .role(Role::Output)
            .device_type(DeviceType::Light)
            .protocol(Protocol::new("virtual").with_output("L1"))
            .build()
            .unwrap()
    }

    #[test]
    fn should_reject_definition_without_id() {
        let result = DeviceDefinition::builder()
            .protocol(Protocol::new("virtual"))
            .build();
        assert!(matches!(
            result,
            Err(HubError::Validation(ValidationError::EmptyDeviceId))
        ));
    }

    #[test]
    fn should_reject_definition_without_hardware_id() {
        let result = DeviceDefinition::builder().id("LAMP1").build();
        assert!(matches!(
            result,
            Err(HubError::Validation(ValidationError::EmptyHardwareId))
        ));
    }

    #[test]
    fn should_initialise_output_off_with_on_off_actions() {
        let device =
            Device::from_definition(lamp_definition(), "http://hub.local:3000/", now()).unwrap();

        assert_eq!(device.state, Some(DeviceState::off()));
        assert!(!device.has_timers);
        assert_eq!(device.name, "LAMP1");
        assert_eq!(
            device.actions.get("on").map(String::as_str),
            Some("http://hub.local:3000/output/command/LAMP1/on")
        );
        assert_eq!(
            device.actions.get("off").map(String::as_str),
            Some("http://hub.local:3000/output/command/LAMP1/off")
        );
    }

    #[test]
    fn should_expose_trigger_action_for_momentary_output() {
        let definition = DeviceDefinition::builder()
            .id("CHIME1")
            .device_type(DeviceType::Chime)
            .sub_type(OutputKind::Momentary)
            .protocol(Protocol::new("shell"))
            .build()
            .unwrap();
        let device = Device::from_definition(definition, "http://hub", now()).unwrap();
        assert_eq!(device.actions.keys().collect::<Vec<_>>(), vec!["trigger"]);
    }

    #[test]
    fn should_initialise_temperature_input_with_null_template() {
        let definition = DeviceDefinition::builder()
            .id("TEMP1")
            .role(Role::Input)
            .device_type(DeviceType::Temperature)
            .protocol(Protocol::new("virtual").with_input("S1"))
            .build()
            .unwrap();
        let device = Device::from_definition(definition, "http://hub", now()).unwrap();

        assert_eq!(device.state, None);
        assert!(device.actions.is_empty());
        assert_eq!(device.data.get("temperature"), Some(&DataValue::Null));
        assert_eq!(device.data.get("rssi"), Some(&DataValue::Null));
    }

    #[test]
    fn should_initialise_power_input_with_nested_electricity_template() {
        let data = DeviceType::Power.initial_data();
        let Some(DataValue::Json(electricity)) = data.get("electricity") else {
            panic!("expected electricity object");
        };
        assert_eq!(electricity["received"]["actual"]["unit"], "kW");
    }

    #[test]
    fn should_merge_data_shallowly() {
        let definition = DeviceDefinition::builder()
            .id("TEMP1")
            .role(Role::Input)
            .device_type(DeviceType::Temperature)
            .protocol(Protocol::new("virtual"))
            .build()
            .unwrap();
        let mut device = Device::from_definition(definition, "http://hub", now()).unwrap();
        let before = device.last_updated;

        let mut update = DeviceData::new();
        update.insert("temperature".to_string(), DataValue::Float(21.5));
        update.insert("custom".to_string(), DataValue::Int(3));
        let later = before + chrono::Duration::seconds(5);
        device.merge_data(update, later);

        assert_eq!(device.data.get("temperature"), Some(&DataValue::Float(21.5)));
        assert_eq!(device.data.get("custom"), Some(&DataValue::Int(3)));
        assert_eq!(device.data.get("humidity"), Some(&DataValue::Null));
        assert_eq!(device.last_updated, later);
    }

    #[test]
    fn should_match_protocol_tiers() {
        let protocol = Protocol::new("rfxcom")
            .with_id("A1")
            .with_output("B1")
            .with_input("C1")
            .with_input("C2");
        assert!(protocol.matches_direct("A1"));
        assert!(protocol.matches_output("B1"));
        assert!(protocol.matches_input("C2"));
        assert!(!protocol.matches_direct("B1"));
        assert!(!protocol.matches_input("A1"));
    }

    #[test]
    fn should_toggle_state() {
        assert_eq!(DeviceState::on().toggled(), DeviceState::off());
        assert_eq!(DeviceState::off().toggled(), DeviceState::on());
        assert_eq!(DeviceState::new("up").toggled(), DeviceState::on());
    }

    #[test]
    fn should_parse_definition_from_toml() {
        let toml = r#"
            id = "LAMP1"
            name = "Living room lamp"
            role = "output"
            type = "light"

            [protocol]
            hardware_id = "shell"
            actions = { on = "lamp on", off = "lamp off" }

            [[timers]]
            type = "time"
            time = "07:00"
            state = "on"
        "#;
        let definition: DeviceDefinition = toml::from_str(toml).unwrap();
        assert!(definition.enabled);
        assert_eq!(definition.device_type, DeviceType::Light);
        assert_eq!(definition.sub_type, OutputKind::OnOff);
        assert_eq!(definition.protocol.actions.len(), 2);
        assert_eq!(definition.timers.len(), 1);
    }

    #[test]
    fn should_serialize_device_with_type_field() {
        let device = Device::from_definition(lamp_definition(), "http://hub", now()).unwrap();
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["type"], "light");
        assert_eq!(json["role"], "output");
        assert_eq!(json["state"], "off");
    }
}
