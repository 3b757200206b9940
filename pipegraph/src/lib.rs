//! # Pipegraph
//!
//! Validated plugin/parameter DAGs with staged, dependency-ordered execution.
//!
//! A pipeline is a bipartite directed graph: [`PluginNode`]s are processing
//! steps and [`ParameterNode`]s are the data locations flowing between them.
//! Binding a plugin port to a parameter node creates the link; sharing one
//! parameter node between a producer's output and a consumer's input is what
//! connects two steps.
//!
//! - **Validation**: pipelines must be connected and acyclic
//! - **Staging**: empty output nodes are resolved to per-node directories on a
//!   pluggable [`Storage`] backend, with an `index.json` describing the run
//! - **Execution**: plugins run one at a time in breadth-first order
//! - **Persistence**: pipeline configs can be saved and rebuilt through a
//!   [`PluginRegistry`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipegraph::prelude::*;
//!
//! let mut threshold = PluginNode::new(CommandPlugin::new(threshold_descriptor)?);
//! let mut measure = PluginNode::new(CommandPlugin::new(measure_descriptor)?);
//! threshold.bind("inpDir", PathBuf::from("/data/images"))?;
//! measure.bind("inpDir", threshold.binding("outDir").cloned().unwrap())?;
//!
//! let mut pipeline = Pipeline::new([threshold, measure], [])?;
//! pipeline.run(None).await?;
//! ```
//!
//! [`PluginNode`]: nodes::PluginNode
//! [`ParameterNode`]: nodes::ParameterNode
//! [`Storage`]: storage::Storage
//! [`PluginRegistry`]: plugins::PluginRegistry

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod errors;
pub mod logging;
pub mod nodes;
pub mod pipeline;
pub mod plugins;
pub mod storage;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{LogFormat, PipelineSettings};
    pub use crate::errors::{PipegraphError, Result};
    pub use crate::logging::init_logging;
    pub use crate::nodes::{
        BindOutcome, BindValue, Direction, Element, GraphElement, Link, Node, NodeId, NodeKind,
        ParameterNode, PluginNode,
    };
    pub use crate::pipeline::{
        Pipeline, PipelineBuilder, PipelineConfig, StagingIndex, StagingState,
    };
    pub use crate::plugins::{
        CommandPlugin, Plugin, PluginConfig, PluginDescriptor, PluginRegistry, PortKind, PortSpec,
        RunArgs,
    };
    pub use crate::storage::{LocalStorage, MemoryStorage, Storage};
}

pub use errors::{PipegraphError, Result};
pub use pipeline::{Pipeline, PipelineBuilder};
