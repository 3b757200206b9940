//! Pipeline config documents.
//!
//! A pipeline config lists the serialized config of every plugin node. On
//! load, path-typed port values are pooled by path: every port carrying the
//! same path is bound to the same parameter node, which is how producer and
//! consumer steps are reconnected.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Pipeline, PipelineBuilder};
use crate::errors::{PipegraphError, Result};
use crate::nodes::{ParameterNode, PluginNode};
use crate::plugins::{PluginConfig, PluginRegistry};
use crate::storage::{LocalStorage, Storage};

/// Serialized form of a whole pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Plugin node configs, in insertion order.
    #[serde(default)]
    pub nodes: Vec<PluginConfig>,
}

impl PipelineConfig {
    /// Parses a config document.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the JSON does not match.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads a config document from storage.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Serialization` if it does not parse.
    pub fn read(storage: &dyn Storage, path: &Path) -> Result<Self> {
        Self::from_json(&storage.read_to_string(path)?)
    }
}

impl PipelineBuilder {
    /// Seeds a builder with the plugin nodes described by `config`.
    ///
    /// Each declaration is rebuilt through `registry` with its scalar input
    /// values dropped; other values are handed to the factory unchanged.
    /// Path-valued ports are bound to one parameter node per distinct path.
    ///
    /// # Errors
    ///
    /// `UnknownPlugin` or `Configuration` from the registry.
    pub fn from_config(config: &PipelineConfig, registry: &PluginRegistry) -> Result<Self> {
        let mut pool: HashMap<PathBuf, ParameterNode> = HashMap::new();
        for declaration in &config.nodes {
            for (_, path) in declaration.path_values() {
                pool.entry(path.clone())
                    .or_insert_with(|| ParameterNode::new(path));
            }
        }
        debug!(plugins = config.nodes.len(), parameters = pool.len(), "loading pipeline config");

        let mut builder = Self::new();
        for declaration in &config.nodes {
            let plugin = registry.instantiate(declaration.without_scalar_inputs())?;
            let mut node = PluginNode::from_boxed(plugin);

            for (port, path) in declaration.path_values() {
                let shared = pool.get(&path).cloned().ok_or_else(|| {
                    PipegraphError::Configuration(format!(
                        "no parameter node pooled for {}",
                        path.display()
                    ))
                })?;
                node.bind(port, shared)?;
            }
            builder = builder.plugin(node);
        }
        Ok(builder)
    }
}

impl Pipeline {
    /// Serialized configs of all plugin nodes. Materializes first.
    ///
    /// # Errors
    ///
    /// Any staging error.
    pub fn config(&mut self) -> Result<PipelineConfig> {
        self.materialize()?;
        Ok(PipelineConfig {
            nodes: self.plugins().map(|n| n.plugin().config()).collect(),
        })
    }

    /// Writes the pipeline config to `path` through the storage backend.
    ///
    /// # Errors
    ///
    /// Any staging error, or `Persistence` if the file cannot be written.
    pub fn save_config(&mut self, path: &Path) -> Result<()> {
        let config = self.config()?;
        let bytes = serde_json::to_vec_pretty(&config)?;
        self.storage
            .write(path, &bytes)
            .map_err(|e| PipegraphError::Persistence {
                path: path.to_path_buf(),
                source: e.into(),
            })?;
        info!(pipeline_id = %self.id, path = %path.display(), "Saved pipeline config");
        Ok(())
    }

    /// Rebuilds a pipeline from a config with default staging.
    ///
    /// # Errors
    ///
    /// Registry errors and any error of [`PipelineBuilder::build`].
    pub fn load_config(config: &PipelineConfig, registry: &PluginRegistry) -> Result<Self> {
        PipelineBuilder::from_config(config, registry)?.build()
    }

    /// Reads a config document from the local filesystem and rebuilds it.
    ///
    /// # Errors
    ///
    /// `Io` or `Serialization` for the file, then as [`Pipeline::load_config`].
    pub fn load_config_file(path: &Path, registry: &PluginRegistry) -> Result<Self> {
        let config = PipelineConfig::read(&LocalStorage::new(), path)?;
        Self::load_config(&config, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::testing::{recording_registry, step_descriptor, ExecutionLog};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_from_json_defaults() {
        let config = PipelineConfig::from_json("{}").unwrap();
        assert!(config.nodes.is_empty());
        assert!(matches!(
            PipelineConfig::from_json("[1]"),
            Err(PipegraphError::Serialization(_))
        ));
    }

    #[test]
    fn test_load_aliases_equal_paths() {
        let log = ExecutionLog::new();
        let registry = recording_registry(&["x", "y"], &log);
        let config = PipelineConfig {
            nodes: vec![
                PluginConfig::new(step_descriptor("x", &["inpDir"], &["outDir"]))
                    .with_value("inpDir", "/data")
                    .with_value("outDir", "/wf/run/out"),
                PluginConfig::new(step_descriptor("y", &["inpDir"], &["outDir"]))
                    .with_value("inpDir", "/wf/run/out")
                    .with_value("outDir", "/wf/run/final"),
            ],
        };

        let pipeline = PipelineBuilder::from_config(&config, &registry)
            .unwrap()
            .staging_root("/wf")
            .storage(Arc::new(MemoryStorage::new()))
            .build()
            .unwrap();

        assert_eq!(pipeline.node_count(), 5);
        let names: Vec<&str> = pipeline.plugins().map(PluginNode::name).collect();
        assert_eq!(names, vec!["x", "y"]);

        let mut plugins = pipeline.plugins();
        let x = plugins.next().unwrap();
        let y = plugins.next().unwrap();
        assert!(x
            .binding("outDir")
            .unwrap()
            .same_node(y.binding("inpDir").unwrap()));
        assert_eq!(pipeline.traverse_plugins(None).unwrap(), vec![x.id(), y.id()]);
    }

    #[test]
    fn test_scalar_inputs_dropped() {
        let log = ExecutionLog::new();
        let registry = recording_registry(&["x"], &log);
        let descriptor = step_descriptor("x", &["inpDir"], &["outDir"])
            .input(crate::plugins::PortSpec::scalar("level"));
        let config = PipelineConfig {
            nodes: vec![PluginConfig::new(descriptor)
                .with_value("inpDir", "/data")
                .with_value("level", 3)
                .with_value("note", "kept")],
        };

        let pipeline = Pipeline::load_config(&config, &registry).unwrap();
        let x = pipeline.plugins().next().unwrap();
        assert!(x.value("level").is_none());
        assert_eq!(x.value("note"), Some(&serde_json::json!("kept")));
    }

    #[test]
    fn test_save_and_reload() {
        let log = ExecutionLog::new();
        let registry = recording_registry(&["x", "y"], &log);
        let storage = MemoryStorage::new();

        let mut x = crate::testing::recording_step("x", &["inpDir"], &["outDir"], &log);
        let mut y = crate::testing::recording_step("y", &["inpDir"], &["outDir"], &log);
        x.bind("inpDir", PathBuf::from("/data")).unwrap();
        y.bind("inpDir", x.binding("outDir").unwrap().clone()).unwrap();

        let mut pipeline = Pipeline::builder()
            .plugin(x)
            .plugin(y)
            .staging_root("/wf")
            .storage(Arc::new(storage.clone()))
            .build()
            .unwrap();

        let path = PathBuf::from("/wf/pipeline.json");
        pipeline.save_config(&path).unwrap();
        assert!(pipeline.is_materialized());

        let config = PipelineConfig::read(&storage, &path).unwrap();
        assert_eq!(config, pipeline.config().unwrap());

        let reloaded = PipelineBuilder::from_config(&config, &registry)
            .unwrap()
            .staging_root("/wf")
            .storage(Arc::new(storage))
            .build()
            .unwrap();
        assert_eq!(reloaded.node_count(), pipeline.node_count());
        assert_eq!(reloaded.link_count(), pipeline.link_count());
    }

    #[test]
    fn test_reload_keeps_port_kinds() {
        let log = ExecutionLog::new();
        let registry = recording_registry(&["x"], &log);
        let descriptor = step_descriptor("x", &["inpDir"], &["outDir"])
            .output(crate::plugins::PortSpec::scalar("summary"));

        let mut x = PluginNode::new(crate::testing::RecordingPlugin::new(descriptor, log.clone()));
        x.bind("inpDir", "/data").unwrap();
        x.bind("summary", PathBuf::from("/data/summary.csv")).unwrap();

        let mut pipeline = Pipeline::builder()
            .plugin(x)
            .staging_root("/wf")
            .storage(Arc::new(MemoryStorage::new()))
            .build()
            .unwrap();
        let config = pipeline.config().unwrap();

        let reloaded = PipelineBuilder::from_config(&config, &registry)
            .unwrap()
            .staging_root("/wf")
            .storage(Arc::new(MemoryStorage::new()))
            .build()
            .unwrap();
        assert_eq!(pipeline.link_count(), 2);
        assert_eq!(reloaded.link_count(), pipeline.link_count());
        assert_eq!(reloaded.parameter_count(), pipeline.parameter_count());

        let x = reloaded.plugins().next().unwrap();
        assert_eq!(
            x.binding("inpDir").unwrap().location(),
            Some(Path::new("/data"))
        );
        assert!(x.binding("summary").is_none());
        assert_eq!(x.value("summary"), Some(&serde_json::json!("/data/summary.csv")));
    }

    #[test]
    fn test_load_config_file() {
        let log = ExecutionLog::new();
        let registry = recording_registry(&["x"], &log);
        let config = PipelineConfig {
            nodes: vec![PluginConfig::new(step_descriptor("x", &["inpDir"], &["outDir"]))
                .with_value("inpDir", "/data")],
        };

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("pipeline.json");
        std::fs::write(&path, serde_json::to_vec(&config).unwrap()).unwrap();

        let pipeline = Pipeline::load_config_file(&path, &registry).unwrap();
        assert_eq!(pipeline.plugin_count(), 1);
        assert_eq!(pipeline.parameter_count(), 2);

        let missing = Pipeline::load_config_file(&tmp.path().join("nope.json"), &registry);
        assert!(matches!(missing, Err(PipegraphError::Io(_))));
    }

    #[test]
    fn test_unknown_plugin_in_config() {
        let registry = PluginRegistry::new();
        let config = PipelineConfig {
            nodes: vec![PluginConfig::new(step_descriptor("ghost", &[], &["outDir"]))],
        };
        let err = Pipeline::load_config(&config, &registry).unwrap_err();
        assert!(matches!(err, PipegraphError::UnknownPlugin(_)));
    }
}
