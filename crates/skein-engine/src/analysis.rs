//! Dependency analyzer
//!
//! Derives the three lookup tables the executor schedules from: per-pin
//! input sources, non-lazy data dependencies, and the route table. Building
//! the tables also performs the structural validation that must reject a
//! graph before any node runs.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{EngineError, Result};
use crate::graph::{ExecutionMode, GraphData};
use crate::registry::NodeRegistry;

/// Lookup tables derived once from a graph at executor construction
#[derive(Debug, Default)]
pub struct DependencyTables {
    /// `target_id -> target_pin -> (source_id, source_pin)`
    pub data_inputs: HashMap<String, HashMap<String, (String, String)>>,
    /// `target_id -> source_ids`, excluding edges into lazy input pins.
    /// Ordered so sibling traversal is deterministic.
    pub data_dependencies: HashMap<String, BTreeSet<String>>,
    /// `source_id -> source_pin -> target_id`, populated for triggered
    /// nodes only
    pub routes: HashMap<String, HashMap<String, String>>,
}

impl DependencyTables {
    /// Build the tables, validating node types, edge endpoints, and route
    /// sources along the way
    pub fn build(graph: &GraphData, registry: &NodeRegistry) -> Result<Self> {
        let mut ids = HashSet::new();
        for node in &graph.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(EngineError::invalid_graph(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
            if !registry.has_node_type(&node.node_type) {
                return Err(EngineError::invalid_graph(format!(
                    "node '{}' has unknown node type '{}'",
                    node.id, node.node_type
                )));
            }
        }

        let mut tables = Self::default();
        for node in &graph.nodes {
            tables
                .data_dependencies
                .insert(node.id.clone(), BTreeSet::new());
            if node.execution_type == ExecutionMode::Triggered {
                tables.routes.insert(node.id.clone(), HashMap::new());
            }
        }

        for edge in &graph.edges {
            let target = graph.node(&edge.target_id).ok_or_else(|| {
                EngineError::invalid_graph(format!(
                    "data edge targets unknown node '{}'",
                    edge.target_id
                ))
            })?;
            if !ids.contains(edge.source_id.as_str()) {
                return Err(EngineError::invalid_graph(format!(
                    "data edge starts at unknown node '{}'",
                    edge.source_id
                )));
            }

            tables
                .data_inputs
                .entry(edge.target_id.clone())
                .or_default()
                .insert(
                    edge.target_pin.clone(),
                    (edge.source_id.clone(), edge.source_pin.clone()),
                );

            // Lazy pins keep their input entry but contribute no dependency;
            // their upstreams run only on an explicit fetch.
            let meta = registry.metadata(&target.node_type).ok_or_else(|| {
                EngineError::invalid_graph(format!("unknown node type '{}'", target.node_type))
            })?;
            if !meta.input_is_lazy(&edge.target_pin) {
                tables
                    .data_dependencies
                    .entry(edge.target_id.clone())
                    .or_default()
                    .insert(edge.source_id.clone());
            }
        }

        for edge in &graph.route_edges {
            if !ids.contains(edge.target_id.as_str()) {
                return Err(EngineError::invalid_graph(format!(
                    "route edge targets unknown node '{}'",
                    edge.target_id
                )));
            }
            if !ids.contains(edge.source_id.as_str()) {
                return Err(EngineError::invalid_graph(format!(
                    "route edge starts at unknown node '{}'",
                    edge.source_id
                )));
            }
            match tables.routes.get_mut(&edge.source_id) {
                Some(routes) => {
                    routes.insert(edge.source_pin.clone(), edge.target_id.clone());
                }
                None => {
                    return Err(EngineError::invalid_graph(format!(
                        "node '{}' is not a triggered node, but is the source of a route edge",
                        edge.source_id
                    )));
                }
            }
        }

        log::debug!(
            "analyzed graph: {} nodes, {} data edges, {} route edges",
            graph.nodes.len(),
            graph.edges.len(),
            graph.route_edges.len()
        );
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{NodeMetadata, PortMetadata};
    use crate::node::{Controller, DataNode, NodeResult};
    use crate::registry::new_node;
    use crate::value::ValueMap;
    use serde_json::json;

    #[derive(Clone, Default)]
    struct Stub;

    impl DataNode for Stub {
        fn evaluate(
            &mut self,
            _ctx: &mut Controller<'_>,
            _inputs: ValueMap,
        ) -> NodeResult<ValueMap> {
            Ok(ValueMap::new())
        }
    }

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry
            .register(
                "Plain",
                new_node::<Stub>,
                Some(
                    NodeMetadata::new("Plain", "Test")
                        .input(PortMetadata::new("value", "*"))
                        .output(PortMetadata::new("value", "*")),
                ),
            )
            .unwrap();
        registry
            .register(
                "LazyIn",
                new_node::<Stub>,
                Some(
                    NodeMetadata::new("LazyIn", "Test")
                        .input(PortMetadata::new("condition", "bool").lazy())
                        .input(PortMetadata::new("value", "*")),
                ),
            )
            .unwrap();
        registry
    }

    fn graph(value: serde_json::Value) -> GraphData {
        GraphData::from_value(value).unwrap()
    }

    #[test]
    fn test_lazy_pins_are_excluded_from_dependencies() {
        let graph = graph(json!({
            "nodes": [
                {"id": "a", "node_type": "Plain", "execution_type": "data"},
                {"id": "b", "node_type": "Plain", "execution_type": "data"},
                {"id": "c", "node_type": "LazyIn", "execution_type": "triggered"}
            ],
            "edges": [
                {"source_id": "a", "source_pin": "value", "target_id": "c", "target_pin": "condition"},
                {"source_id": "b", "source_pin": "value", "target_id": "c", "target_pin": "value"}
            ],
            "route_edges": []
        }));
        let tables = DependencyTables::build(&graph, &registry()).unwrap();

        let deps = &tables.data_dependencies["c"];
        assert!(!deps.contains("a"), "lazy upstream must not be a dependency");
        assert!(deps.contains("b"));

        // but the lazy pin is still resolvable for an explicit fetch
        assert_eq!(
            tables.data_inputs["c"]["condition"],
            ("a".to_string(), "value".to_string())
        );
    }

    #[test]
    fn test_route_from_non_triggered_source_is_rejected() {
        let graph = graph(json!({
            "nodes": [
                {"id": "a", "node_type": "Plain", "execution_type": "data"},
                {"id": "b", "node_type": "Plain", "execution_type": "triggered"}
            ],
            "edges": [],
            "route_edges": [
                {"source_id": "a", "source_pin": "_", "target_id": "b"}
            ]
        }));
        let err = DependencyTables::build(&graph, &registry()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidGraph(_)), "got {err:?}");
    }

    #[test]
    fn test_unknown_node_type_is_rejected() {
        let graph = graph(json!({
            "nodes": [{"id": "a", "node_type": "Mystery", "execution_type": "data"}],
            "edges": [],
            "route_edges": []
        }));
        let err = DependencyTables::build(&graph, &registry()).unwrap_err();
        assert!(err.to_string().contains("Mystery"), "got {err}");
    }

    #[test]
    fn test_unknown_edge_endpoint_is_rejected() {
        let graph = graph(json!({
            "nodes": [{"id": "a", "node_type": "Plain", "execution_type": "data"}],
            "edges": [
                {"source_id": "ghost", "source_pin": "value", "target_id": "a", "target_pin": "value"}
            ],
            "route_edges": []
        }));
        let err = DependencyTables::build(&graph, &registry()).unwrap_err();
        assert!(err.to_string().contains("ghost"), "got {err}");
    }

    #[test]
    fn test_duplicate_node_id_is_rejected() {
        let graph = graph(json!({
            "nodes": [
                {"id": "a", "node_type": "Plain", "execution_type": "data"},
                {"id": "a", "node_type": "Plain", "execution_type": "data"}
            ],
            "edges": [],
            "route_edges": []
        }));
        let err = DependencyTables::build(&graph, &registry()).unwrap_err();
        assert!(err.to_string().contains("duplicate"), "got {err}");
    }

    #[test]
    fn test_route_table_only_lists_triggered_sources() {
        let graph = graph(json!({
            "nodes": [
                {"id": "t", "node_type": "Plain", "execution_type": "triggered"},
                {"id": "d", "node_type": "Plain", "execution_type": "data"}
            ],
            "edges": [],
            "route_edges": [
                {"source_id": "t", "source_pin": "body", "target_id": "d"}
            ]
        }));
        let tables = DependencyTables::build(&graph, &registry()).unwrap();
        assert_eq!(tables.routes["t"]["body"], "d");
        assert!(!tables.routes.contains_key("d"));
    }
}
