//! Staging directories and the `index.json` document.
//!
//! Layout under the staging directory of a pipeline:
//!
//! ```text
//! <staging_root>/<pipeline id>/
//!     index.json
//!     <node id>/              one per vertex
//!     <plugin node id>/config.json
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Pipeline, StagingState};
use crate::errors::{PipegraphError, Result};
use crate::nodes::{NodeId, ParameterNode};
use crate::storage::Storage;

/// File name of the pipeline index.
pub const INDEX_FILE: &str = "index.json";
/// File name of each plugin node's serialized config.
pub const NODE_CONFIG_FILE: &str = "config.json";

/// A bound port in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedParameter {
    /// Resolved location of the parameter node.
    pub data: String,
    /// Parameter node id.
    pub id: Uuid,
}

/// One plugin node in the index: its bound ports plus its own id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedStep {
    /// Plugin node id.
    pub id: Uuid,
    /// Bound ports by name.
    #[serde(flatten)]
    pub ports: BTreeMap<String, IndexedParameter>,
}

/// Contents of `index.json`.
///
/// Steps are keyed by plugin name; when two plugin nodes share a name the
/// later ones are keyed `<name>-<node id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingIndex {
    /// Step keys in breadth-first order from all roots.
    #[serde(rename = "PluginOrder")]
    pub plugin_order: Vec<String>,
    /// Steps by key.
    #[serde(flatten)]
    pub steps: BTreeMap<String, IndexedStep>,
}

impl StagingIndex {
    /// Looks up the step of a plugin node.
    #[must_use]
    pub fn step_for(&self, id: NodeId) -> Option<(&str, &IndexedStep)> {
        self.steps
            .iter()
            .find(|(_, step)| step.id == id)
            .map(|(key, step)| (key.as_str(), step))
    }
}

fn create_dir(storage: &dyn Storage, path: &Path) -> Result<()> {
    storage
        .create_dir(path)
        .map_err(|source| PipegraphError::StagingIo {
            path: path.to_path_buf(),
            source,
        })
}

fn location_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Pipeline {
    /// Creates the staging directories and writes node configs and the index.
    ///
    /// Every vertex gets `<staging_dir>/<node id>`. Each empty parameter node
    /// bound to a plugin port is resolved to its own directory, and every
    /// bound port's location is written to the plugin. A second call is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// - `StagingIo` when the backend cannot create a directory
    /// - `Persistence` when a node config or the index cannot be written
    pub fn materialize(&mut self) -> Result<()> {
        if self.state == StagingState::Materialized {
            debug!(pipeline_id = %self.id, "already materialized");
            return Ok(());
        }

        let storage = Arc::clone(&self.storage);
        let staging_dir = self.staging_dir.clone();

        if !storage.exists(&staging_dir) {
            create_dir(storage.as_ref(), &staging_dir)?;
        }
        for id in self.graph.node_ids() {
            create_dir(storage.as_ref(), &staging_dir.join(id.to_string()))?;
        }

        for id in self.graph.plugin_ids() {
            let Some(node) = self.graph.node_mut(id).and_then(|n| n.as_plugin_mut()) else {
                continue;
            };

            let bound: Vec<(String, ParameterNode)> = node
                .bound_ports()
                .map(|(port, param)| (port.to_string(), param.clone()))
                .collect();

            let plugin = node.plugin_mut();
            plugin.attach_storage(Arc::clone(&storage));

            for (port, param) in bound {
                if param.is_empty() {
                    let location = staging_dir.join(param.id().to_string());
                    if param.resolve(location.clone()) {
                        create_dir(storage.as_ref(), &location)?;
                        debug!(
                            port = %port,
                            location = %location.display(),
                            "resolved output location"
                        );
                    }
                }
                if let Some(location) = param.location() {
                    plugin.set_value(&port, Value::String(location_string(location)));
                }
            }
        }

        for node in self.plugins() {
            let path = staging_dir.join(node.id().to_string()).join(NODE_CONFIG_FILE);
            node.plugin()
                .save_config(storage.as_ref(), &path)
                .map_err(|source| PipegraphError::Persistence { path, source })?;
        }

        let index_path = staging_dir.join(INDEX_FILE);
        let bytes = serde_json::to_vec_pretty(&self.index())?;
        storage
            .write(&index_path, &bytes)
            .map_err(|e| PipegraphError::Persistence {
                path: index_path.clone(),
                source: e.into(),
            })?;

        self.state = StagingState::Materialized;
        info!(
            pipeline_id = %self.id,
            staging_dir = %staging_dir.display(),
            nodes = self.graph.node_count(),
            "Materialized pipeline"
        );
        Ok(())
    }

    /// Builds the index document from the current bindings.
    ///
    /// Unresolved parameter nodes are listed with an empty `data` string.
    #[must_use]
    pub fn index(&self) -> StagingIndex {
        let mut keys: BTreeMap<NodeId, String> = BTreeMap::new();
        let mut steps = BTreeMap::new();

        for node in self.plugins() {
            let key = if steps.contains_key(node.name()) {
                format!("{}-{}", node.name(), node.id())
            } else {
                node.name().to_string()
            };

            let ports = node
                .bound_ports()
                .map(|(port, param)| {
                    (
                        port.to_string(),
                        IndexedParameter {
                            data: param.location().map(location_string).unwrap_or_default(),
                            id: param.id(),
                        },
                    )
                })
                .collect();

            keys.insert(node.id(), key.clone());
            steps.insert(key, IndexedStep { id: node.id(), ports });
        }

        let plugin_order = self
            .breadth_first(&self.graph.roots(), true)
            .into_iter()
            .filter_map(|id| keys.get(&id).cloned())
            .collect();

        StagingIndex {
            plugin_order,
            steps,
        }
    }

    /// Reads `index.json` back from storage.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Serialization` if it does not parse.
    pub fn read_index(&self) -> Result<StagingIndex> {
        let raw = self.storage.read_to_string(&self.index_path())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Path of `index.json`.
    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.staging_dir.join(INDEX_FILE)
    }

    /// Path of a plugin node's `config.json`.
    #[must_use]
    pub fn node_config_path(&self, id: NodeId) -> PathBuf {
        self.staging_dir.join(id.to_string()).join(NODE_CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, MockStorage};
    use crate::testing::{recording_step, ExecutionLog};
    use pretty_assertions::assert_eq;
    use std::io;

    fn chain(storage: Arc<dyn Storage>) -> (Pipeline, NodeId, NodeId) {
        let log = ExecutionLog::new();
        let mut x = recording_step("x", &["inpDir"], &["outDir"], &log);
        let mut y = recording_step("y", &["inpDir"], &["outDir"], &log);
        x.bind("inpDir", PathBuf::from("/data/images")).unwrap();
        y.bind("inpDir", x.binding("outDir").unwrap().clone()).unwrap();
        let (xid, yid) = (x.id(), y.id());

        let pipeline = Pipeline::builder()
            .plugin(x)
            .plugin(y)
            .staging_root("/wf")
            .storage(storage)
            .build()
            .unwrap();
        (pipeline, xid, yid)
    }

    #[test]
    fn test_materialize_layout() {
        let storage = MemoryStorage::new();
        let (mut pipeline, xid, yid) = chain(Arc::new(storage.clone()));
        pipeline.materialize().unwrap();

        let dir = pipeline.staging_dir().to_path_buf();
        for node in pipeline.nodes() {
            assert!(storage.is_dir(&dir.join(node.id().to_string())));
        }
        assert!(storage.is_file(&pipeline.node_config_path(xid)));
        assert!(storage.is_file(&pipeline.node_config_path(yid)));
        assert!(storage.is_file(&pipeline.index_path()));

        let x = pipeline.plugin(xid).unwrap();
        let shared = x.binding("outDir").unwrap();
        let expected = dir.join(shared.id().to_string());
        assert_eq!(shared.location(), Some(expected.as_path()));
        assert_eq!(
            x.value("outDir"),
            Some(&Value::String(expected.to_string_lossy().into_owned()))
        );
        assert_eq!(x.value("inpDir"), Some(&Value::String("/data/images".into())));
        assert_eq!(pipeline.plugin(yid).unwrap().value("inpDir"), x.value("outDir"));
    }

    #[test]
    fn test_materialize_twice_is_noop() {
        let storage = MemoryStorage::new();
        let (mut pipeline, _, _) = chain(Arc::new(storage.clone()));

        pipeline.materialize().unwrap();
        let calls = storage.create_dir_calls();
        let files = storage.files();

        pipeline.materialize().unwrap();
        assert_eq!(storage.create_dir_calls(), calls);
        assert_eq!(storage.files(), files);
        assert!(pipeline.is_materialized());
    }

    #[test]
    fn test_index_document() {
        let storage = MemoryStorage::new();
        let (mut pipeline, xid, yid) = chain(Arc::new(storage));
        pipeline.materialize().unwrap();

        let index = pipeline.read_index().unwrap();
        assert_eq!(index, pipeline.index());
        assert_eq!(index.plugin_order, vec!["x".to_string(), "y".to_string()]);

        let x = &index.steps["x"];
        assert_eq!(x.id, xid);
        assert_eq!(x.ports["inpDir"].data, "/data/images");
        assert_eq!(index.steps["y"].ports["inpDir"], x.ports["outDir"]);
        assert_eq!(index.step_for(yid).map(|(k, _)| k), Some("y"));

        let raw: Value = serde_json::from_str(
            &pipeline.storage().read_to_string(&pipeline.index_path()).unwrap(),
        )
        .unwrap();
        assert!(raw["PluginOrder"].is_array());
        assert_eq!(raw["x"]["id"], Value::String(xid.to_string()));
        assert!(raw["x"]["outDir"]["data"].is_string());
    }

    #[test]
    fn test_duplicate_names_get_suffix() {
        let log = ExecutionLog::new();
        let mut a = recording_step("same", &["inpDir"], &["outDir"], &log);
        let mut b = recording_step("same", &["inpDir"], &["outDir"], &log);
        a.bind("inpDir", PathBuf::from("/data")).unwrap();
        b.bind("inpDir", a.binding("outDir").unwrap().clone()).unwrap();
        let bid = b.id();

        let pipeline = Pipeline::new([a, b], []).unwrap();
        let index = pipeline.index();
        let second = format!("same-{bid}");
        assert!(index.steps.contains_key("same"));
        assert!(index.steps.contains_key(&second));
        assert_eq!(index.plugin_order, vec!["same".to_string(), second]);
    }

    #[test]
    fn test_storage_failure_is_staging_io() {
        let mut mock = MockStorage::new();
        mock.expect_exists().return_const(false);
        mock.expect_create_dir()
            .returning(|_| Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only")));

        let (mut pipeline, _, _) = chain(Arc::new(mock));
        let err = pipeline.materialize().unwrap_err();
        match err {
            PipegraphError::StagingIo { path, source } => {
                assert_eq!(path, pipeline.staging_dir());
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected StagingIo, got {other:?}"),
        }
        assert!(!pipeline.is_materialized());
    }

    #[test]
    fn test_preexisting_staging_dir_is_reused() {
        let storage = MemoryStorage::new();
        let (mut pipeline, _, _) = chain(Arc::new(storage.clone()));
        storage.create_dir(pipeline.staging_dir()).unwrap();
        let before = storage.create_dir_calls();

        pipeline.materialize().unwrap();
        // one per vertex plus the shared outDir and y's outDir
        assert_eq!(storage.create_dir_calls() - before, pipeline.node_count() + 2);
    }
}
