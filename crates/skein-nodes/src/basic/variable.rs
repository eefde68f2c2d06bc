//! Variable nodes
//!
//! A variable is a shared mutable cell flowing through the graph as a
//! `ref<T>` value. Define creates the cell, Set writes through it, Get
//! reads the current content. Get runs in `data` mode so every demand sees
//! the latest write; Define is typically `data_once` so all holders share
//! one cell.

use skein_engine::{
    new_node, Controller, DataNode, ExecutionMode, NodeDescriptor, NodeError, NodeMetadata,
    NodeRegistration, NodeResult, PortMetadata, PortValue, ValueCell, ValueMap,
};

use crate::helpers;

const CATEGORY: &str = "Basic/Variable";

#[derive(Clone, Default)]
pub struct DefineVariableNode;

impl NodeDescriptor for DefineVariableNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Define Variable", CATEGORY)
            .input(PortMetadata::new("initial_value", "T"))
            .output(PortMetadata::new("variable", "ref<T>"))
            .generic("T")
    }
}

impl DataNode for DefineVariableNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let initial = helpers::take(&mut inputs, "initial_value")?;
        let mut out = ValueMap::new();
        out.insert(
            "variable".to_string(),
            PortValue::from(ValueCell::new(initial)),
        );
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "DefineVariableNode",
    construct: new_node::<DefineVariableNode>,
    meta: Some(DefineVariableNode::meta),
});

#[derive(Clone, Default)]
pub struct SetVariableNode;

impl NodeDescriptor for SetVariableNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Set Variable", CATEGORY)
            .input(PortMetadata::new("variable", "ref<T>"))
            .input(PortMetadata::new("value", "T"))
            .output(PortMetadata::new("variable", "ref<T>"))
            .generic("T")
    }
}

impl DataNode for SetVariableNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let variable = helpers::take(&mut inputs, "variable")?;
        let value = helpers::take(&mut inputs, "value")?;
        let cell = variable
            .as_cell()
            .ok_or_else(|| NodeError::invalid_input("variable", "a variable reference"))?;
        cell.set(value);
        let mut out = ValueMap::new();
        out.insert("variable".to_string(), variable.clone());
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "SetVariableNode",
    construct: new_node::<SetVariableNode>,
    meta: Some(SetVariableNode::meta),
});

#[derive(Clone, Default)]
pub struct GetVariableNode;

impl NodeDescriptor for GetVariableNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Get Variable", CATEGORY)
            .execution_hint(ExecutionMode::Data)
            .input(PortMetadata::new("variable", "ref<T>"))
            .output(PortMetadata::new("value", "T"))
            .generic("T")
    }
}

impl DataNode for GetVariableNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let variable = helpers::take(&mut inputs, "variable")?;
        let cell = variable
            .as_cell()
            .ok_or_else(|| NodeError::invalid_input("variable", "a variable reference"))?;
        let mut out = ValueMap::new();
        out.insert("value".to_string(), cell.get());
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "GetVariableNode",
    construct: new_node::<GetVariableNode>,
    meta: Some(GetVariableNode::meta),
});
