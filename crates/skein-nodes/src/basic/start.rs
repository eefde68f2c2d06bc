//! Graph entry node

use skein_engine::{
    new_node, Controller, DataNode, NodeDescriptor, NodeMetadata, NodeRegistration, NodeResult,
    ValueMap,
};

/// Entry point of every graph
///
/// The executor begins by expanding the node with the reserved id `start`.
/// This node produces nothing and immediately falls through, so execution
/// continues along its `_` route edge.
#[derive(Clone, Default)]
pub struct StartNode;

impl NodeDescriptor for StartNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Start", "_")
    }
}

impl DataNode for StartNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, _inputs: ValueMap) -> NodeResult<ValueMap> {
        Ok(ValueMap::new())
    }
}

inventory::submit!(NodeRegistration {
    node_type: "StartNode",
    construct: new_node::<StartNode>,
    meta: Some(StartNode::meta),
});
