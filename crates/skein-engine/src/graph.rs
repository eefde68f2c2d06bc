//! Graph model and document parser
//!
//! A graph document is three arrays: `nodes`, `edges` (data edges), and
//! `route_edges` (control-flow edges). The parser validates structural
//! well-formedness only; port compatibility is not type-checked.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// When a node runs relative to the rest of the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Runs only when reached through a route edge
    Triggered,
    /// Recomputed every time a downstream node demands its value
    Data,
    /// Computed on first demand, then cached for the rest of the run
    DataOnce,
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "triggered" => Ok(Self::Triggered),
            "data" => Ok(Self::Data),
            "data_once" => Ok(Self::DataOnce),
            other => Err(format!(
                "unknown execution_type '{other}' (expected triggered, data or data_once)"
            )),
        }
    }
}

fn de_execution_mode<'de, D>(deserializer: D) -> std::result::Result<ExecutionMode, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// A node instance in a graph document
#[derive(Debug, Clone, Deserialize)]
pub struct GraphNode {
    /// Unique identifier for this node instance
    pub id: String,
    /// Node type (a registry key)
    pub node_type: String,
    /// Execution mode, parsed case-insensitively
    #[serde(deserialize_with = "de_execution_mode")]
    pub execution_type: ExecutionMode,
    /// Literal input values keyed by port name; connected inputs win over these
    #[serde(default)]
    pub inputs: serde_json::Map<String, serde_json::Value>,
}

/// A value-carrying connection between an output pin and an input pin
#[derive(Debug, Clone, Deserialize)]
pub struct DataEdge {
    pub source_id: String,
    pub source_pin: String,
    pub target_id: String,
    pub target_pin: String,
}

/// A control-flow connection from a route pin to a node
#[derive(Debug, Clone, Deserialize)]
pub struct RouteEdge {
    pub source_id: String,
    pub source_pin: String,
    pub target_id: String,
}

/// A complete parsed graph document
#[derive(Debug, Clone, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<DataEdge>,
    pub route_edges: Vec<RouteEdge>,
}

impl GraphData {
    /// Parse a graph document from JSON text
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| EngineError::Parse(e.to_string()))
    }

    /// Parse a graph document from an already-deserialized JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| EngineError::Parse(e.to_string()))
    }

    /// Find a node by id
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
