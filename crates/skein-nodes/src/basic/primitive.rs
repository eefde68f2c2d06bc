//! Primitive literal nodes
//!
//! Each node carries a single literal set by the graph author and exposes
//! it on its `value` output. They default to `data_once` so a literal is
//! materialized once per run.

use skein_engine::{
    new_node, Controller, DataNode, ExecutionMode, NodeDescriptor, NodeMetadata, NodeRegistration,
    NodeResult, PortMetadata, PortValue, ValueMap,
};

use crate::helpers;

const CATEGORY: &str = "Basic/Primitive";

fn literal_meta(title: &str, type_tag: &str) -> NodeMetadata {
    NodeMetadata::new(title, CATEGORY)
        .execution_hint(ExecutionMode::DataOnce)
        .input(PortMetadata::new("value", type_tag))
        .output(PortMetadata::new("value", type_tag))
}

fn pass_through(mut inputs: ValueMap) -> NodeResult<ValueMap> {
    let value = helpers::take(&mut inputs, "value")?;
    let mut out = ValueMap::new();
    out.insert("value".to_string(), value);
    Ok(out)
}

#[derive(Clone, Default)]
pub struct IntNode;

impl NodeDescriptor for IntNode {
    fn meta() -> NodeMetadata {
        literal_meta("Int", "int")
    }
}

impl DataNode for IntNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, inputs: ValueMap) -> NodeResult<ValueMap> {
        pass_through(inputs)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "IntNode",
    construct: new_node::<IntNode>,
    meta: Some(IntNode::meta),
});

#[derive(Clone, Default)]
pub struct FloatNode;

impl NodeDescriptor for FloatNode {
    fn meta() -> NodeMetadata {
        literal_meta("Float", "float")
    }
}

impl DataNode for FloatNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, inputs: ValueMap) -> NodeResult<ValueMap> {
        pass_through(inputs)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "FloatNode",
    construct: new_node::<FloatNode>,
    meta: Some(FloatNode::meta),
});

#[derive(Clone, Default)]
pub struct BoolNode;

impl NodeDescriptor for BoolNode {
    fn meta() -> NodeMetadata {
        literal_meta("Bool", "bool")
    }
}

impl DataNode for BoolNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, inputs: ValueMap) -> NodeResult<ValueMap> {
        pass_through(inputs)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "BoolNode",
    construct: new_node::<BoolNode>,
    meta: Some(BoolNode::meta),
});

#[derive(Clone, Default)]
pub struct StringNode;

impl NodeDescriptor for StringNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("String", CATEGORY)
            .execution_hint(ExecutionMode::DataOnce)
            .input(PortMetadata::new("value", "str").widget("str_multiline"))
            .output(PortMetadata::new("value", "str"))
    }
}

impl DataNode for StringNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, inputs: ValueMap) -> NodeResult<ValueMap> {
        pass_through(inputs)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "StringNode",
    construct: new_node::<StringNode>,
    meta: Some(StringNode::meta),
});

/// Produces the null value, for wiring "no value" into optional inputs
#[derive(Clone, Default)]
pub struct NoneNode;

impl NodeDescriptor for NoneNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("None", CATEGORY)
            .execution_hint(ExecutionMode::DataOnce)
            .output(PortMetadata::new("value", "*"))
    }
}

impl DataNode for NoneNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, _inputs: ValueMap) -> NodeResult<ValueMap> {
        let mut out = ValueMap::new();
        out.insert("value".to_string(), PortValue::null());
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "NoneNode",
    construct: new_node::<NoneNode>,
    meta: Some(NoneNode::meta),
});

#[cfg(test)]
mod tests {
    use super::*;
    use skein_engine::ProgressEvent;

    fn eval<T: DataNode>(mut node: T, inputs: ValueMap) -> NodeResult<ValueMap> {
        let mut sink = |_e: ProgressEvent| {};
        let mut ctx = Controller::new("test", &mut sink);
        node.evaluate(&mut ctx, inputs)
    }

    #[test]
    fn test_int_passes_literal_through() {
        let mut inputs = ValueMap::new();
        inputs.insert("value".to_string(), PortValue::from(41i64));
        let out = eval(IntNode, inputs).unwrap();
        assert_eq!(out["value"].as_i64(), Some(41));
    }

    #[test]
    fn test_missing_literal_is_an_error() {
        let err = eval(StringNode, ValueMap::new()).unwrap_err();
        assert!(err.to_string().contains("value"), "got: {err}");
    }

    #[test]
    fn test_none_outputs_null() {
        let out = eval(NoneNode, ValueMap::new()).unwrap();
        assert!(out["value"].is_null());
    }
}
