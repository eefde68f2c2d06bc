//! Skein Engine - execution scheduler for blueprint-style dataflow graphs
//!
//! A graph is a set of typed nodes whose pins carry either data or
//! control-flow ("route") signals. This crate decides when each node runs,
//! what inputs it sees, and how outputs propagate:
//!
//! - Demand-driven data resolution with per-node execution modes
//!   (`triggered`, `data`, `data_once`)
//! - Route edges for explicit control flow, including loops among
//!   triggered nodes
//! - Lazy inputs that nodes re-fetch mid-execution
//! - Cooperative, single-threaded scheduling over an explicit task stack
//!
//! # Architecture
//!
//! - [`graph`]: the parsed graph document
//! - [`registry`]: node-type registry fed by `inventory` registrations
//! - [`analysis`]: derived dependency and route tables
//! - [`node`]: the driver protocol nodes implement
//! - [`executor`]: the task loop that runs a graph
//!
//! # Example
//!
//! ```ignore
//! use skein_engine::{GraphData, GraphExecutor, NodeRegistry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(NodeRegistry::from_inventory()?);
//! let graph = GraphData::parse(document)?;
//! let mut executor = GraphExecutor::new(registry, graph)?;
//! executor.execute(&mut |event| println!("{event:?}"))?;
//! ```

pub mod analysis;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod executor;
pub mod graph;
pub mod node;
pub mod registry;
pub mod value;

pub use analysis::DependencyTables;
pub use descriptor::{DisplayMetadata, NodeDescriptor, NodeMetadata, PortMetadata};
pub use error::{EngineError, Result};
pub use events::ProgressEvent;
pub use executor::{CancelToken, GraphExecutor, START_NODE_ID};
pub use graph::{DataEdge, ExecutionMode, GraphData, GraphNode, RouteEdge};
pub use node::{
    Controller, DataNode, Node, NodeError, NodeOutput, NodeProducer, NodeResult, ProducerStep,
    FALLTHROUGH_PIN,
};
pub use registry::{
    new_node, ConstructFn, MetaFn, NodeDefinition, NodeRegistration, NodeRegistry,
};
pub use value::{PortValue, ValueCell, ValueMap};
