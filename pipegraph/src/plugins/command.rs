//! A plugin that runs an external command.

use anyhow::{bail, Context as _};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{Plugin, PluginConfig, PluginDescriptor, RunArgs};
use crate::storage::Storage;

/// Runs `base_command` with every set value passed as `--name value`.
///
/// Values are emitted in name order; run arguments override stored values of
/// the same name. `null` values are skipped and booleans become bare flags
/// when true.
pub struct CommandPlugin {
    descriptor: PluginDescriptor,
    values: BTreeMap<String, Value>,
    storage: Option<Arc<dyn Storage>>,
}

impl CommandPlugin {
    /// Creates a command plugin.
    ///
    /// # Errors
    ///
    /// Fails if the descriptor has no base command.
    pub fn new(descriptor: PluginDescriptor) -> anyhow::Result<Self> {
        if descriptor.base_command.is_empty() {
            bail!("plugin '{}' has no base command", descriptor.name);
        }
        Ok(Self {
            descriptor,
            values: BTreeMap::new(),
            storage: None,
        })
    }

    /// Rebuilds a command plugin from its serialized configuration.
    ///
    /// # Errors
    ///
    /// Fails if the descriptor has no base command.
    pub fn from_config(config: PluginConfig) -> anyhow::Result<Self> {
        let mut plugin = Self::new(config.descriptor)?;
        plugin.values = config.values;
        Ok(plugin)
    }

    /// Returns the attached storage backend, if any.
    #[must_use]
    pub fn storage(&self) -> Option<&Arc<dyn Storage>> {
        self.storage.as_ref()
    }

    /// Builds the argument vector for a run.
    #[must_use]
    pub fn command_line(&self, args: &RunArgs) -> Vec<String> {
        let mut merged = self.values.clone();
        merged.extend(args.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut argv = self.descriptor.base_command.clone();
        for (name, value) in merged {
            match value {
                Value::Null | Value::Bool(false) => {}
                Value::Bool(true) => argv.push(format!("--{name}")),
                Value::String(s) => {
                    argv.push(format!("--{name}"));
                    argv.push(s);
                }
                other => {
                    argv.push(format!("--{name}"));
                    argv.push(other.to_string());
                }
            }
        }
        argv
    }
}

impl fmt::Debug for CommandPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandPlugin")
            .field("name", &self.descriptor.name)
            .field("base_command", &self.descriptor.base_command)
            .field("values", &self.values)
            .field("storage", &self.storage.is_some())
            .finish()
    }
}

#[async_trait]
impl Plugin for CommandPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn set_value(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    fn remove_value(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    fn attach_storage(&mut self, storage: Arc<dyn Storage>) {
        self.storage = Some(storage);
    }

    fn config(&self) -> PluginConfig {
        PluginConfig {
            descriptor: self.descriptor.clone(),
            values: self.values.clone(),
        }
    }

    async fn run(&self, args: &RunArgs) -> anyhow::Result<()> {
        let argv = self.command_line(args);
        let Some((program, rest)) = argv.split_first() else {
            bail!("plugin '{}' has no base command", self.descriptor.name);
        };

        debug!(plugin = %self.descriptor.name, ?argv, "spawning command");
        let status = Command::new(program)
            .args(rest)
            .status()
            .await
            .with_context(|| format!("failed to spawn '{program}'"))?;

        if !status.success() {
            warn!(plugin = %self.descriptor.name, %status, "command failed");
            bail!("'{program}' exited with {status}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::PortSpec;
    use serde_json::json;

    fn descriptor(argv: &[&str]) -> PluginDescriptor {
        PluginDescriptor::new("cmd", "1.0")
            .input(PortSpec::path("inpDir"))
            .output(PortSpec::path("outDir"))
            .command(argv.iter().copied())
    }

    #[test]
    fn test_requires_command() {
        assert!(CommandPlugin::new(PluginDescriptor::new("cmd", "1.0")).is_err());
    }

    #[test]
    fn test_command_line() {
        let mut plugin = CommandPlugin::new(descriptor(&["tool", "--fast"])).unwrap();
        plugin.set_value("inpDir", json!("/in"));
        plugin.set_value("level", json!(3));
        plugin.set_value("skip", Value::Null);
        plugin.set_value("verbose", json!(true));

        let mut args = RunArgs::new();
        args.insert("level".to_string(), json!(5));

        assert_eq!(
            plugin.command_line(&args),
            vec!["tool", "--fast", "--inpDir", "/in", "--level", "5", "--verbose"]
        );
    }

    #[tokio::test]
    async fn test_run_success_and_failure() {
        let ok = CommandPlugin::new(descriptor(&["true"])).unwrap();
        assert!(ok.run(&RunArgs::new()).await.is_ok());

        let failing = CommandPlugin::new(descriptor(&["false"])).unwrap();
        let err = failing.run(&RunArgs::new()).await.unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }
}
