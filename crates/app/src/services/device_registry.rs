//! Device registry: the canonical set of devices.
//!
//! Structural changes ([`register`](DeviceRegistry::register)) happen during
//! startup only; the registry is then frozen behind an `Arc` and shared. Each
//! device lives in its own [`DeviceSlot`] so that unrelated devices never
//! contend for a lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use domohub_domain::device::{Device, Role};
use domohub_domain::error::{DuplicateDeviceError, HubError, NotFoundError};
use domohub_domain::id::DeviceId;

/// One device plus the locks guarding it.
#[derive(Debug)]
pub struct DeviceSlot {
    id: DeviceId,
    device: Mutex<Device>,
    gate: tokio::sync::Mutex<()>,
    publishing: tokio::sync::Mutex<()>,
}

impl DeviceSlot {
    fn new(device: Device) -> Self {
        Self {
            id: device.id.clone(),
            device: Mutex::new(device),
            gate: tokio::sync::Mutex::new(()),
            publishing: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    /// A copy of the current device.
    #[must_use]
    pub fn snapshot(&self) -> Device {
        self.update(|device| device.clone())
    }

    /// Run a read-modify-write on the device under its data lock.
    ///
    /// The lock is never held across an await point.
    pub fn update<R>(&self, f: impl FnOnce(&mut Device) -> R) -> R {
        let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut device)
    }

    /// Serialises commands sent to this device.
    pub(crate) fn command_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.gate
    }

    /// Held from a change to the device until its event is published, so
    /// events of one device leave in the order the changes were made.
    ///
    /// Never held across a plugin round trip.
    pub(crate) fn publish_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.publishing
    }
}

/// Devices keyed by id, in insertion order.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    slots: Vec<Arc<DeviceSlot>>,
    index: HashMap<DeviceId, usize>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Duplicate`] if a device with the same id is
    /// already registered; the first one is kept.
    #[tracing::instrument(skip(self, device), fields(device_id = %device.id))]
    pub fn register(&mut self, device: Device) -> Result<Arc<DeviceSlot>, HubError> {
        if self.index.contains_key(&device.id) {
            return Err(DuplicateDeviceError {
                id: device.id.to_string(),
            }
            .into());
        }
        let slot = Arc::new(DeviceSlot::new(device));
        self.index.insert(slot.id().clone(), self.slots.len());
        self.slots.push(Arc::clone(&slot));
        Ok(slot)
    }

    /// Look up a device by id.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when no device with `id` exists.
    pub fn get(&self, id: &str) -> Result<Arc<DeviceSlot>, HubError> {
        self.index
            .get(id)
            .map(|&position| Arc::clone(&self.slots[position]))
            .ok_or_else(|| {
                NotFoundError {
                    entity: "Device",
                    id: id.to_string(),
                }
                .into()
            })
    }

    /// Resolve the device a hardware address belongs to.
    ///
    /// Address spaces are searched in priority order: direct protocol id,
    /// then output sub-address, then input sub-addresses. Within a space the
    /// first device in insertion order wins.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when no device uses `hardware_id`.
    pub fn find_by_hardware_id(&self, hardware_id: &str) -> Result<Arc<DeviceSlot>, HubError> {
        let tiers: [fn(&Device, &str) -> bool; 3] = [
            |d, id| d.protocol.matches_direct(id),
            |d, id| d.protocol.matches_output(id),
            |d, id| d.protocol.matches_input(id),
        ];
        for matches in tiers {
            let found = self
                .slots
                .iter()
                .find(|slot| slot.update(|device| matches(device, hardware_id)));
            if let Some(slot) = found {
                return Ok(Arc::clone(slot));
            }
        }
        Err(NotFoundError {
            entity: "Hardware address",
            id: hardware_id.to_string(),
        }
        .into())
    }

    /// Snapshots of every device with `role`, in insertion order.
    #[must_use]
    pub fn list_by_role(&self, role: Role) -> Vec<Device> {
        self.slots
            .iter()
            .map(|slot| slot.snapshot())
            .filter(|device| device.role == role)
            .collect()
    }

    /// All slots, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<DeviceSlot>> {
        self.slots.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
