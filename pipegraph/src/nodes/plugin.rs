//! Plugin nodes and the port binding engine.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::{debug, trace};
use uuid::Uuid;

use super::{
    BindOutcome, BindValue, Direction, GraphElement, Link, NodeId, NodeKind, ParameterNode,
    VertexRef,
};
use crate::errors::{PipegraphError, Result};
use crate::plugins::{Plugin, PortKind};

/// Output port that receives an empty parameter node on construction.
pub const OUT_DIR_PORT: &str = "outDir";

/// Port name that cannot hold a parameter node: `index.json` stores the step
/// id under this key next to the bound ports.
pub const RESERVED_PORT: &str = "id";

/// One processing step of a pipeline.
///
/// Wraps a [`Plugin`] and records, per declared port, the parameter node it
/// is bound to and the link created for that binding. Port names come from
/// the plugin's descriptor; inputs take precedence when a name is declared
/// on both sides.
pub struct PluginNode {
    id: NodeId,
    plugin: Box<dyn Plugin>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    bindings: BTreeMap<String, ParameterNode>,
    links: BTreeMap<String, Link>,
}

impl PluginNode {
    /// Wraps a plugin in a new node.
    ///
    /// If the plugin declares an `outDir` output, it is bound to a fresh
    /// empty parameter node.
    #[must_use]
    pub fn new(plugin: impl Plugin + 'static) -> Self {
        Self::from_boxed(Box::new(plugin))
    }

    /// Wraps an already boxed plugin in a new node.
    #[must_use]
    pub fn from_boxed(plugin: Box<dyn Plugin>) -> Self {
        let descriptor = plugin.descriptor();
        let inputs = descriptor.input_names().map(str::to_string).collect();
        let outputs: Vec<String> = descriptor.output_names().map(str::to_string).collect();

        let mut node = Self {
            id: Uuid::new_v4(),
            plugin,
            inputs,
            outputs,
            bindings: BTreeMap::new(),
            links: BTreeMap::new(),
        };

        if node.outputs.iter().any(|o| o == OUT_DIR_PORT) {
            node.link_port(OUT_DIR_PORT, Direction::Output, ParameterNode::empty());
        }

        debug!(node_id = %node.id, plugin = %node.name(), "created PluginNode");
        node
    }

    /// Returns the node id.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    /// Returns the wrapped plugin.
    #[must_use]
    pub fn plugin(&self) -> &dyn Plugin {
        self.plugin.as_ref()
    }

    pub(crate) fn plugin_mut(&mut self) -> &mut dyn Plugin {
        self.plugin.as_mut()
    }

    /// Declared input port names.
    #[must_use]
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Declared output port names.
    #[must_use]
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Returns the side of the plugin a declared port is on.
    #[must_use]
    pub fn direction_of(&self, port: &str) -> Option<Direction> {
        if self.inputs.iter().any(|p| p == port) {
            Some(Direction::Input)
        } else if self.outputs.iter().any(|p| p == port) {
            Some(Direction::Output)
        } else {
            None
        }
    }

    /// Assigns a value to a port.
    ///
    /// - On a declared path port, a [`BindValue::Parameter`] is bound
    ///   directly, while a [`BindValue::Path`] or a non-empty string literal
    ///   is wrapped in a new parameter node. A link is created (`param ->
    ///   plugin` for inputs, `plugin -> param` for outputs), replacing any
    ///   previous binding or literal of the port.
    /// - On a declared scalar port, and for non-string literals on a path
    ///   port, the value is stored on the plugin as a literal and any
    ///   previous node binding is removed.
    /// - Any other name is passed straight to the plugin.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when an unresolved parameter node is assigned
    /// to a scalar port or to a name the plugin does not declare as a port,
    /// or when a node would be bound to [`RESERVED_PORT`].
    pub fn bind(&mut self, port: &str, value: impl Into<BindValue>) -> Result<BindOutcome> {
        let value = value.into();

        let Some(direction) = self.direction_of(port) else {
            let raw = self.literal(port, value)?;
            trace!(plugin = %self.name(), port, "pass-through assignment");
            self.plugin.set_value(port, raw);
            return Ok(BindOutcome::PassThrough);
        };

        let kind = self
            .plugin
            .descriptor()
            .port(port)
            .map_or(PortKind::Path, |declared| declared.kind);

        let node = match (kind, value) {
            (PortKind::Path, BindValue::Parameter(node)) => node,
            (PortKind::Path, BindValue::Path(path)) => ParameterNode::new(path),
            (PortKind::Path, BindValue::Literal(Value::String(path))) if !path.is_empty() => {
                ParameterNode::new(path)
            }
            (_, value) => {
                let raw = self.literal(port, value)?;
                self.unbind(port);
                self.plugin.set_value(port, raw);
                return Ok(BindOutcome::Literal);
            }
        };

        if port == RESERVED_PORT {
            return Err(PipegraphError::Configuration(format!(
                "port '{RESERVED_PORT}' of plugin '{}' is reserved and cannot be bound to a \
                 parameter node",
                self.name()
            )));
        }

        self.plugin.remove_value(port);
        let node_id = node.id();
        let link = self.link_port(port, direction, node);
        Ok(BindOutcome::Linked {
            node: node_id,
            link,
            direction,
        })
    }

    /// Flattens a bind value into the literal stored on the plugin.
    fn literal(&self, port: &str, value: BindValue) -> Result<Value> {
        match value {
            BindValue::Literal(v) => Ok(v),
            BindValue::Path(p) => Ok(Value::String(p.to_string_lossy().into_owned())),
            BindValue::Parameter(node) => match node.location() {
                Some(location) => Ok(Value::String(location.to_string_lossy().into_owned())),
                None => Err(PipegraphError::Configuration(format!(
                    "'{port}' of plugin '{}' takes no parameter node and cannot take an \
                     unresolved one",
                    self.name()
                ))),
            },
        }
    }

    fn link_port(&mut self, port: &str, direction: Direction, node: ParameterNode) -> Uuid {
        let me = VertexRef {
            id: self.id,
            kind: NodeKind::Plugin,
        };
        let param = VertexRef {
            id: node.id(),
            kind: NodeKind::Parameter,
        };
        let link = match direction {
            Direction::Input => Link::between(param, me),
            Direction::Output => Link::between(me, param),
        };
        let link_id = link.id();

        debug!(
            plugin = %self.name(),
            port,
            ?direction,
            parameter = %node.id(),
            link = %link_id,
            "bound port"
        );

        self.bindings.insert(port.to_string(), node);
        self.links.insert(port.to_string(), link);
        link_id
    }

    /// Removes the node binding of a port, if any.
    pub fn unbind(&mut self, port: &str) -> Option<ParameterNode> {
        self.links.remove(port);
        self.bindings.remove(port)
    }

    /// Returns the parameter node bound to a port.
    #[must_use]
    pub fn binding(&self, port: &str) -> Option<&ParameterNode> {
        self.bindings.get(port)
    }

    /// Returns the link created for a port binding.
    #[must_use]
    pub fn link(&self, port: &str) -> Option<&Link> {
        self.links.get(port)
    }

    /// Bound ports in declaration order, inputs first.
    pub fn bound_ports(&self) -> impl Iterator<Item = (&str, &ParameterNode)> + '_ {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .filter_map(move |port| self.bindings.get(port).map(|node| (port.as_str(), node)))
    }

    /// Links induced by the current bindings.
    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.links.values()
    }

    /// Returns the plugin's current value for a name.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.plugin.value(name)
    }
}

impl fmt::Debug for PluginNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginNode")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

impl GraphElement for PluginNode {
    fn vertex(&self) -> Option<VertexRef> {
        Some(VertexRef {
            id: self.id,
            kind: NodeKind::Plugin,
        })
    }

    fn describe(&self) -> String {
        format!("PluginNode {} ({})", self.name(), self.id)
    }
}
