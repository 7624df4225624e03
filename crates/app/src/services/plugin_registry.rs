//! Plugin registry: binds hardware ids to live plugin instances.

use std::collections::HashMap;
use std::sync::Arc;

use domohub_domain::device::Device;
use domohub_domain::error::{HubError, NotFoundError, UnboundHardwareError, ValidationError};
use domohub_domain::hardware::HardwareConfig;
use domohub_domain::id::HardwareId;

use crate::ports::{HardwarePlugin, PluginContext, PluginFactory};

/// Exclusive owner of every loaded plugin.
///
/// Devices only reference plugins through their `protocol.hardware_id`.
pub struct PluginRegistry<P> {
    plugins: HashMap<HardwareId, Arc<P>>,
}

impl<P> Default for PluginRegistry<P> {
    fn default() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }
}

impl<P: HardwarePlugin + 'static> PluginRegistry<P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create, initialise and bind the plugin for one hardware entry.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when the factory does not know the
    /// hardware type, [`HubError::Validation`] when that type is already
    /// loaded (the first entry is kept), or the plugin's own error when
    /// initialisation fails.
    #[tracing::instrument(skip(self, factory, config, ctx), fields(hardware = %config.hardware_type))]
    pub async fn load<F>(
        &mut self,
        factory: &F,
        config: &HardwareConfig,
        ctx: PluginContext,
    ) -> Result<(), HubError>
    where
        F: PluginFactory<Plugin = P>,
    {
        if self.plugins.contains_key(&config.hardware_type) {
            return Err(
                ValidationError::DuplicateHardware(config.hardware_type.to_string()).into(),
            );
        }
        let mut plugin = factory.create(config).ok_or_else(|| NotFoundError {
            entity: "Hardware type",
            id: config.hardware_type.to_string(),
        })?;
        plugin.init(config, ctx).await?;
        self.plugins
            .insert(config.hardware_type.clone(), Arc::new(plugin));
        tracing::info!("hardware plugin loaded");
        Ok(())
    }

    /// Load every enabled hardware entry, skipping the ones that fail.
    ///
    /// Returns the number of plugins bound.
    pub async fn load_all<F>(
        &mut self,
        factory: &F,
        configs: &[HardwareConfig],
        ctx: &PluginContext,
    ) -> usize
    where
        F: PluginFactory<Plugin = P>,
    {
        for config in configs {
            if !config.enabled {
                tracing::info!(hardware = %config.hardware_type, "hardware disabled, skipping");
                continue;
            }
            if let Err(err) = self.load(factory, config, ctx.clone()).await {
                tracing::warn!(%err, hardware = %config.hardware_type, "unable to load hardware, skipping");
            }
        }
        self.plugins.len()
    }

    /// The plugin bound under `hardware_id`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when nothing is bound under that id.
    pub fn resolve(&self, hardware_id: &str) -> Result<Arc<P>, HubError> {
        self.plugins.get(hardware_id).cloned().ok_or_else(|| {
            NotFoundError {
                entity: "Plugin",
                id: hardware_id.to_string(),
            }
            .into()
        })
    }

    /// Hand a device to the plugin it is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::UnboundHardware`] when no plugin is loaded for
    /// the device's hardware id, or the plugin's registration error.
    pub fn register_device(&self, device: &Device) -> Result<(), HubError> {
        let plugin = self.plugins.get(device.hardware_id()).ok_or_else(|| {
            UnboundHardwareError {
                device_id: device.id.to_string(),
                hardware_id: device.hardware_id().to_string(),
            }
        })?;
        plugin.register_device(device)
    }

    /// Tear every plugin down, logging failures.
    pub async fn teardown_all(&self) {
        for (hardware_id, plugin) in &self.plugins {
            if let Err(err) = plugin.teardown().await {
                tracing::warn!(%err, hardware = %hardware_id, "plugin teardown failed");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn bind(&mut self, hardware_id: &str, plugin: P) {
        self.plugins.insert(hardware_id.into(), Arc::new(plugin));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
