//! Fixtures for building test pipelines.

use crate::nodes::PluginNode;
use crate::plugins::{Plugin, PluginDescriptor, PluginRegistry, PortSpec};

use super::mocks::{ExecutionLog, FailingPlugin, RecordingPlugin};

/// Descriptor with path-typed ports.
#[must_use]
pub fn step_descriptor(name: &str, inputs: &[&str], outputs: &[&str]) -> PluginDescriptor {
    let descriptor = inputs
        .iter()
        .fold(PluginDescriptor::new(name, "0.1.0"), |d, port| d.input(PortSpec::path(*port)));
    outputs
        .iter()
        .fold(descriptor, |d, port| d.output(PortSpec::path(*port)))
}

/// Plugin node wrapping a [`RecordingPlugin`].
#[must_use]
pub fn recording_step(
    name: &str,
    inputs: &[&str],
    outputs: &[&str],
    log: &ExecutionLog,
) -> PluginNode {
    PluginNode::new(RecordingPlugin::new(
        step_descriptor(name, inputs, outputs),
        log.clone(),
    ))
}

/// Plugin node wrapping a [`FailingPlugin`].
#[must_use]
pub fn failing_step(
    name: &str,
    inputs: &[&str],
    outputs: &[&str],
    message: &str,
    log: &ExecutionLog,
) -> PluginNode {
    PluginNode::new(FailingPlugin::new(
        step_descriptor(name, inputs, outputs),
        message,
        log.clone(),
    ))
}

/// Registry rebuilding each named plugin as a [`RecordingPlugin`] sharing `log`.
#[must_use]
pub fn recording_registry(names: &[&str], log: &ExecutionLog) -> PluginRegistry {
    let registry = PluginRegistry::new();
    for name in names {
        let log = log.clone();
        registry.register(*name, move |config| {
            Ok(Box::new(RecordingPlugin::from_config(config, log.clone())) as Box<dyn Plugin>)
        });
    }
    registry
}
