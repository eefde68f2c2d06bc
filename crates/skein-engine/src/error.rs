//! Error types for the graph engine

use thiserror::Error;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while building or running a graph
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed graph document
    #[error("graph parse error: {0}")]
    Parse(String),

    /// A node registration without a metadata accessor
    #[error("node type '{0}' does not expose metadata")]
    MissingMeta(String),

    /// Structural problem detected before execution starts
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// Dependency cycle among non-triggered nodes
    #[error("circular dependency detected involving node '{0}'")]
    CircularDependency(String),

    /// An upstream output was consumed before it was produced
    #[error("unresolved dependency: {0}")]
    UnresolvedDependency(String),

    /// A node failed while executing
    #[error("node '{node_id}' failed: {message}")]
    Node { node_id: String, message: String },

    /// The run was cancelled
    #[error("execution cancelled")]
    Cancelled,
}

impl EngineError {
    /// Create an invalid-graph error with a message
    pub fn invalid_graph(msg: impl Into<String>) -> Self {
        Self::InvalidGraph(msg.into())
    }
}
