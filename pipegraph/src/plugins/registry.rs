//! Plugin factories keyed by plugin name.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;

use super::{CommandPlugin, Plugin, PluginConfig};
use crate::errors::{PipegraphError, Result};

/// Factory function type for rebuilding a plugin from its configuration.
pub type PluginFactory =
    Box<dyn Fn(PluginConfig) -> anyhow::Result<Box<dyn Plugin>> + Send + Sync>;

/// Registry of plugin factories used when loading a pipeline config.
#[derive(Default)]
pub struct PluginRegistry {
    factories: RwLock<HashMap<String, PluginFactory>>,
}

impl PluginRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a boxed factory, replacing any previous one for `name`.
    pub fn register_factory(&self, name: impl Into<String>, factory: PluginFactory) {
        self.factories.write().insert(name.into(), factory);
    }

    /// Registers a factory closure.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(PluginConfig) -> anyhow::Result<Box<dyn Plugin>> + Send + Sync + 'static,
    {
        self.register_factory(name, Box::new(factory));
    }

    /// Registers `name` as a [`CommandPlugin`].
    pub fn register_command(&self, name: impl Into<String>) {
        self.register(name, |config| {
            Ok(Box::new(CommandPlugin::from_config(config)?) as Box<dyn Plugin>)
        });
    }

    /// Checks if a factory is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Lists registered plugin names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Rebuilds a plugin from its configuration.
    ///
    /// # Errors
    ///
    /// `UnknownPlugin` when no factory is registered under the config's name,
    /// `Configuration` when the factory rejects the config.
    pub fn instantiate(&self, config: PluginConfig) -> Result<Box<dyn Plugin>> {
        let factories = self.factories.read();
        let factory = factories
            .get(config.name())
            .ok_or_else(|| PipegraphError::UnknownPlugin(config.name().to_string()))?;

        let name = config.name().to_string();
        factory(config).map_err(|e| {
            PipegraphError::Configuration(format!("plugin '{name}' rejected its config: {e:#}"))
        })
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}
