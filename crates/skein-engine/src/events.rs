//! Progress events streamed during graph execution
//!
//! The executor reports progress through a caller-supplied sink. Records
//! have a fixed shape so transports can serialize them directly; the
//! `event` name is open-ended because nodes may define their own display
//! events (`display`, `append`, ...).

use serde::{Deserialize, Serialize};

/// A single progress record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Event name
    pub event: String,
    /// Node the event concerns, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Node-defined payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Error description for failure events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_error: Option<String>,
}

impl ProgressEvent {
    /// Emitted once per producer iteration step
    pub const EXECUTE_NODE: &'static str = "execute_node";
    /// Emitted when a node's producer fails
    pub const EXECUTE_NODE_ERROR: &'static str = "execute_node_error";
    /// Emitted exactly once, after the task stack drains
    pub const FINISH: &'static str = "finish";

    /// An `execute_node` step record
    pub fn execute_node(node_id: &str) -> Self {
        Self {
            event: Self::EXECUTE_NODE.to_string(),
            node_id: Some(node_id.to_string()),
            data: None,
            node_error: None,
        }
    }

    /// An `execute_node_error` failure record
    pub fn execute_node_error(node_id: &str, error: &str) -> Self {
        Self {
            event: Self::EXECUTE_NODE_ERROR.to_string(),
            node_id: Some(node_id.to_string()),
            data: None,
            node_error: Some(error.to_string()),
        }
    }

    /// A node-defined event with a payload
    pub fn node_event(event: impl Into<String>, node_id: &str, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            node_id: Some(node_id.to_string()),
            data: Some(data),
            node_error: None,
        }
    }

    /// The terminal `finish` record
    pub fn finish() -> Self {
        Self {
            event: Self::FINISH.to_string(),
            node_id: None,
            data: None,
            node_error: None,
        }
    }
}
