//! Node metadata descriptors
//!
//! Every node type describes its ports and presentation through a
//! `NodeMetadata` bag. The scheduler consumes only the input names, the
//! per-input `lazy` flag, and the output names; everything else is for
//! authoring tools and is served verbatim by the metadata query endpoint.

use serde::{Deserialize, Serialize};

use crate::graph::ExecutionMode;

/// Trait for node types that can describe their metadata
///
/// The metadata accessor is the single source of truth for a node's ports.
/// Registrations collected through `inventory` point at this function.
pub trait NodeDescriptor {
    /// Static metadata for this node type
    fn meta() -> NodeMetadata
    where
        Self: Sized;
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Metadata for a single input or output pin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortMetadata {
    /// Pin name, referenced by edges
    pub name: String,
    /// Free-form type tag such as `int`, `list<T>` or `route`
    #[serde(rename = "type")]
    pub port_type: String,
    /// Lazy inputs are not pre-expanded; the node fetches them explicitly
    #[serde(default, skip_serializing_if = "is_false")]
    pub lazy: bool,
    /// Authoring options (defaults, choices)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
    /// Widget hint for authoring tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
}

impl PortMetadata {
    /// Create a pin with a name and type tag
    pub fn new(name: impl Into<String>, port_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port_type: port_type.into(),
            lazy: false,
            options: None,
            widget: None,
        }
    }

    /// Create a route output pin
    pub fn route(name: impl Into<String>) -> Self {
        Self::new(name, "route")
    }

    /// Mark this input as lazy
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Attach authoring options
    pub fn options(mut self, options: serde_json::Value) -> Self {
        self.options = Some(options);
        self
    }

    /// Attach a widget hint
    pub fn widget(mut self, widget: impl Into<String>) -> Self {
        self.widget = Some(widget.into());
        self
    }
}

/// A display surface exposed to authoring frontends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub display_type: String,
}

impl DisplayMetadata {
    /// A plain-text display surface
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_type: "text".to_string(),
        }
    }
}

/// Complete metadata for a node type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Title shown in menus and on the node
    pub title: String,
    /// Menu category; `/` separates levels
    pub category: String,
    /// Default execution mode hint for authoring tools. The graph's
    /// per-node `execution_type` is authoritative at run time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionMode>,
    #[serde(default)]
    pub inputs: Vec<PortMetadata>,
    #[serde(default)]
    pub outputs: Vec<PortMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display: Vec<DisplayMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_types: Vec<String>,
}

impl NodeMetadata {
    /// Create metadata with a title and category
    pub fn new(title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            execution: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            display: Vec::new(),
            generic_types: Vec::new(),
        }
    }

    /// Set the default execution mode hint
    pub fn execution_hint(mut self, mode: ExecutionMode) -> Self {
        self.execution = Some(mode);
        self
    }

    /// Append an input pin
    pub fn input(mut self, port: PortMetadata) -> Self {
        self.inputs.push(port);
        self
    }

    /// Append an output pin
    pub fn output(mut self, port: PortMetadata) -> Self {
        self.outputs.push(port);
        self
    }

    /// Append a display surface
    pub fn display(mut self, display: DisplayMetadata) -> Self {
        self.display.push(display);
        self
    }

    /// Declare a generic type parameter
    pub fn generic(mut self, name: impl Into<String>) -> Self {
        self.generic_types.push(name.into());
        self
    }

    /// Whether the named input pin is declared lazy
    pub fn input_is_lazy(&self, name: &str) -> bool {
        self.inputs.iter().any(|p| p.name == name && p.lazy)
    }

    /// Names of all non-lazy input pins, in declaration order
    pub fn non_lazy_input_names(&self) -> Vec<String> {
        self.inputs
            .iter()
            .filter(|p| !p.lazy)
            .map(|p| p.name.clone())
            .collect()
    }
}
