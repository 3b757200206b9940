//! Mock plugins for testing.

use anyhow::bail;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::plugins::{Plugin, PluginConfig, PluginDescriptor, RunArgs};
use crate::storage::Storage;

/// One recorded plugin run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    /// Plugin name.
    pub step: String,
    /// Plugin values at run time.
    pub values: BTreeMap<String, Value>,
    /// Run arguments.
    pub args: RunArgs,
    /// Whether a storage backend was attached before the run.
    pub storage_attached: bool,
}

/// Shared, ordered log of plugin runs.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    records: Arc<Mutex<Vec<ExecutionRecord>>>,
}

impl ExecutionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn record(&self, record: ExecutionRecord) {
        self.records.lock().push(record);
    }

    /// All records in run order.
    #[must_use]
    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.records.lock().clone()
    }

    /// Step names in run order.
    #[must_use]
    pub fn steps(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.step.clone()).collect()
    }

    /// Number of recorded runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if nothing ran.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Clears the log.
    pub fn reset(&self) {
        self.records.lock().clear();
    }
}

/// A plugin that records each run into an [`ExecutionLog`].
pub struct RecordingPlugin {
    descriptor: PluginDescriptor,
    values: BTreeMap<String, Value>,
    storage: Option<Arc<dyn Storage>>,
    log: ExecutionLog,
}

impl RecordingPlugin {
    /// Creates a new recording plugin.
    #[must_use]
    pub fn new(descriptor: PluginDescriptor, log: ExecutionLog) -> Self {
        Self {
            descriptor,
            values: BTreeMap::new(),
            storage: None,
            log,
        }
    }

    /// Rebuilds a recording plugin from its config.
    #[must_use]
    pub fn from_config(config: PluginConfig, log: ExecutionLog) -> Self {
        Self {
            descriptor: config.descriptor,
            values: config.values,
            storage: None,
            log,
        }
    }

    /// Returns true once a storage backend was attached.
    #[must_use]
    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }
}

impl fmt::Debug for RecordingPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingPlugin")
            .field("name", &self.descriptor.name)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Plugin for RecordingPlugin {
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
        self.log.record(ExecutionRecord {
            step: self.descriptor.name.clone(),
            values: self.values.clone(),
            args: args.clone(),
            storage_attached: self.has_storage(),
        });
        Ok(())
    }
}

/// A plugin that records its run and then fails.
#[derive(Debug)]
pub struct FailingPlugin {
    inner: RecordingPlugin,
    message: String,
}

impl FailingPlugin {
    /// Creates a new failing plugin.
    #[must_use]
    pub fn new(
        descriptor: PluginDescriptor,
        message: impl Into<String>,
        log: ExecutionLog,
    ) -> Self {
        Self {
            inner: RecordingPlugin::new(descriptor, log),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Plugin for FailingPlugin {
    fn descriptor(&self) -> &PluginDescriptor {
        self.inner.descriptor()
    }

    fn set_value(&mut self, name: &str, value: Value) {
        self.inner.set_value(name, value);
    }

    fn value(&self, name: &str) -> Option<&Value> {
        self.inner.value(name)
    }

    fn remove_value(&mut self, name: &str) -> Option<Value> {
        self.inner.remove_value(name)
    }

    fn attach_storage(&mut self, storage: Arc<dyn Storage>) {
        self.inner.attach_storage(storage);
    }

    fn config(&self) -> PluginConfig {
        self.inner.config()
    }

    async fn run(&self, args: &RunArgs) -> anyhow::Result<()> {
        self.inner.run(args).await?;
        bail!("{}", self.message)
    }
}
