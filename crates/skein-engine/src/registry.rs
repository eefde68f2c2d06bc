//! Node type registry
//!
//! Maps node-type identifiers to a constructor and the type's metadata.
//! Built-in nodes register themselves at link time through `inventory`;
//! hosts may also register additional types by hand. The registry is
//! immutable once the service starts serving graphs.

use std::collections::{BTreeMap, HashMap};

use crate::descriptor::NodeMetadata;
use crate::error::{EngineError, Result};
use crate::node::Node;

/// Constructor for a node instance
pub type ConstructFn = fn() -> Box<dyn Node>;

/// Metadata accessor for a node type
pub type MetaFn = fn() -> NodeMetadata;

/// Generic constructor usable as a [`ConstructFn`] for any `Default` node
pub fn new_node<T: Node + Default + 'static>() -> Box<dyn Node> {
    Box::<T>::default()
}

/// A link-time node registration
///
/// Submitted with `inventory::submit!` next to each node implementation.
/// Dynamic hosts may register types without a metadata accessor; building
/// the registry rejects those.
pub struct NodeRegistration {
    pub node_type: &'static str,
    pub construct: ConstructFn,
    pub meta: Option<MetaFn>,
}

inventory::collect!(NodeRegistration);

/// A registered node type: constructor plus resolved metadata
pub struct NodeDefinition {
    pub construct: ConstructFn,
    pub meta: NodeMetadata,
}

/// Process-wide mapping from node-type id to its definition
pub struct NodeRegistry {
    entries: HashMap<String, NodeDefinition>,
}

impl NodeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Build a registry from every `NodeRegistration` linked into the binary
    pub fn from_inventory() -> Result<Self> {
        let mut registry = Self::new();
        for registration in inventory::iter::<NodeRegistration> {
            registry.register(
                registration.node_type,
                registration.construct,
                registration.meta.map(|meta| meta()),
            )?;
        }
        Ok(registry)
    }

    /// Register a node type. A later registration for the same id wins.
    pub fn register(
        &mut self,
        node_type: &str,
        construct: ConstructFn,
        meta: Option<NodeMetadata>,
    ) -> Result<()> {
        let meta = meta.ok_or_else(|| EngineError::MissingMeta(node_type.to_string()))?;
        log::debug!("registered node type '{node_type}'");
        self.entries
            .insert(node_type.to_string(), NodeDefinition { construct, meta });
        Ok(())
    }

    /// Look up a node type's definition
    pub fn get(&self, node_type: &str) -> Option<&NodeDefinition> {
        self.entries.get(node_type)
    }

    /// Look up a node type's metadata
    pub fn metadata(&self, node_type: &str) -> Option<&NodeMetadata> {
        self.entries.get(node_type).map(|d| &d.meta)
    }

    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.entries.contains_key(node_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The full registry as an ordered `{node_type: metadata}` view,
    /// consumed by authoring UIs
    pub fn all_metadata(&self) -> BTreeMap<&str, &NodeMetadata> {
        self.entries
            .iter()
            .map(|(id, def)| (id.as_str(), &def.meta))
            .collect()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
