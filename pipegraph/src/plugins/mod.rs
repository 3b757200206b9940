//! Plugin interface.
//!
//! A plugin is an external processing step with named input and output
//! ports. The pipeline only interacts with plugins through the [`Plugin`]
//! trait: it writes port values, attaches the storage backend, asks for the
//! serialized configuration and finally runs the step.

mod command;
mod registry;

pub use command::CommandPlugin;
pub use registry::{PluginFactory, PluginRegistry};

use anyhow::Context as _;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::storage::Storage;

/// Arguments forwarded to every step of a run.
pub type RunArgs = BTreeMap<String, Value>;

/// The value type a port carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    /// A filesystem location; bound through a parameter node.
    #[default]
    Path,
    /// Any other JSON value.
    Scalar,
}

/// A declared input or output port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    /// Port name.
    pub name: String,
    /// Value type.
    #[serde(default)]
    pub kind: PortKind,
    /// Whether the plugin needs a value to run.
    #[serde(default)]
    pub required: bool,
}

impl PortSpec {
    /// Creates a path-typed port.
    #[must_use]
    pub fn path(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::Path,
            required: false,
        }
    }

    /// Creates a scalar port.
    #[must_use]
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::Scalar,
            required: false,
        }
    }

    /// Marks the port as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Static description of a plugin: name, version, ports and command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    /// Plugin name, used as the registry key and index key.
    pub name: String,
    /// Plugin version.
    #[serde(default)]
    pub version: String,
    /// Declared input ports.
    #[serde(default)]
    pub inputs: Vec<PortSpec>,
    /// Declared output ports.
    #[serde(default)]
    pub outputs: Vec<PortSpec>,
    /// Command line used by [`CommandPlugin`]; empty for in-process plugins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_command: Vec<String>,
}

impl PluginDescriptor {
    /// Creates a descriptor without ports.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            base_command: Vec::new(),
        }
    }

    /// Adds an input port.
    #[must_use]
    pub fn input(mut self, port: PortSpec) -> Self {
        self.inputs.push(port);
        self
    }

    /// Adds an output port.
    #[must_use]
    pub fn output(mut self, port: PortSpec) -> Self {
        self.outputs.push(port);
        self
    }

    /// Sets the base command.
    #[must_use]
    pub fn command<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_command = argv.into_iter().map(Into::into).collect();
        self
    }

    /// Input port names in declaration order.
    pub fn input_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.inputs.iter().map(|p| p.name.as_str())
    }

    /// Output port names in declaration order.
    pub fn output_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.outputs.iter().map(|p| p.name.as_str())
    }

    /// Looks up a declared port, inputs first.
    #[must_use]
    pub fn port(&self, name: &str) -> Option<&PortSpec> {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .find(|p| p.name == name)
    }

    /// Returns true if `name` is a declared scalar input.
    #[must_use]
    pub fn is_scalar_input(&self, name: &str) -> bool {
        self.inputs
            .iter()
            .any(|p| p.name == name && p.kind == PortKind::Scalar)
    }
}

/// Serialized state of a plugin: its descriptor plus current values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Static plugin description.
    #[serde(flatten)]
    pub descriptor: PluginDescriptor,
    /// Current value of each port or setting, keyed by name.
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

impl PluginConfig {
    /// Creates a config without values.
    #[must_use]
    pub fn new(descriptor: PluginDescriptor) -> Self {
        Self {
            descriptor,
            values: BTreeMap::new(),
        }
    }

    /// Adds a value.
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Path-valued declared ports, as `(port, path)` pairs in declaration order.
    pub fn path_values(&self) -> impl Iterator<Item = (&str, PathBuf)> + '_ {
        self.descriptor
            .inputs
            .iter()
            .chain(self.descriptor.outputs.iter())
            .filter(|p| p.kind == PortKind::Path)
            .filter_map(move |p| match self.values.get(&p.name) {
                Some(Value::String(s)) if !s.is_empty() => {
                    Some((p.name.as_str(), PathBuf::from(s)))
                }
                _ => None,
            })
    }

    /// Returns a copy with the values of scalar inputs removed.
    #[must_use]
    pub fn without_scalar_inputs(&self) -> Self {
        let mut config = self.clone();
        config
            .values
            .retain(|name, _| !self.descriptor.is_scalar_input(name));
        config
    }
}

/// Trait for pipeline steps.
///
/// Implementors own their port values. `set_value` is called by the binding
/// engine and by staging; `run` is called once per pipeline run, in
/// traversal order.
#[async_trait]
pub trait Plugin: Send + Sync + Debug {
    /// Returns the static description of the plugin.
    fn descriptor(&self) -> &PluginDescriptor;

    /// Returns the plugin name.
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Stores the value of a port or setting.
    fn set_value(&mut self, name: &str, value: Value);

    /// Returns the current value of a port or setting.
    fn value(&self, name: &str) -> Option<&Value>;

    /// Clears the value of a port or setting.
    fn remove_value(&mut self, name: &str) -> Option<Value>;

    /// Attaches the storage backend of the owning pipeline.
    fn attach_storage(&mut self, storage: Arc<dyn Storage>);

    /// Returns the serialized configuration.
    fn config(&self) -> PluginConfig;

    /// Writes the serialized configuration to `path`.
    fn save_config(&self, storage: &dyn Storage, path: &Path) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.config())?;
        storage
            .write(path, &bytes)
            .with_context(|| format!("writing config of '{}'", self.name()))
    }

    /// Runs the step.
    async fn run(&self, args: &RunArgs) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new("threshold", "0.2.1")
            .input(PortSpec::path("inpDir").required())
            .input(PortSpec::scalar("level"))
            .output(PortSpec::path("outDir"))
    }

    #[test]
    fn test_port_lookup() {
        let d = descriptor();
        assert_eq!(d.port("inpDir").map(|p| p.required), Some(true));
        assert_eq!(d.port("outDir").map(|p| p.kind), Some(PortKind::Path));
        assert!(d.port("missing").is_none());
        assert!(d.is_scalar_input("level"));
        assert!(!d.is_scalar_input("inpDir"));
    }

    #[test]
    fn test_config_json_shape() {
        let config = PluginConfig::new(descriptor())
            .with_value("inpDir", "/data")
            .with_value("level", 3);

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["name"], json!("threshold"));
        assert_eq!(value["version"], json!("0.2.1"));
        assert_eq!(value["values"]["level"], json!(3));
        assert!(value.get("baseCommand").is_none());

        let back: PluginConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_path_values_skip_scalars() {
        let config = PluginConfig::new(descriptor())
            .with_value("inpDir", "/data")
            .with_value("outDir", "/staging/out")
            .with_value("level", 3);

        let paths: Vec<(&str, PathBuf)> = config.path_values().collect();
        assert_eq!(
            paths,
            vec![
                ("inpDir", PathBuf::from("/data")),
                ("outDir", PathBuf::from("/staging/out")),
            ]
        );
    }

    #[test]
    fn test_without_scalar_inputs() {
        let config = PluginConfig::new(descriptor())
            .with_value("inpDir", "/data")
            .with_value("level", 3)
            .with_value("verbose", true);

        let stripped = config.without_scalar_inputs();
        assert!(stripped.values.contains_key("inpDir"));
        assert!(stripped.values.contains_key("verbose"));
        assert!(!stripped.values.contains_key("level"));
    }
}
