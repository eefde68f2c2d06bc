//! Type conversion nodes

use skein_engine::{
    new_node, Controller, DataNode, ExecutionMode, NodeDescriptor, NodeError, NodeMetadata,
    NodeRegistration, NodeResult, PortMetadata, PortValue, ValueMap,
};

use crate::helpers;

const CATEGORY: &str = "Basic/Convert";

fn convert_meta(title: &str, to: &str) -> NodeMetadata {
    NodeMetadata::new(title, CATEGORY)
        .execution_hint(ExecutionMode::Data)
        .input(PortMetadata::new("value", "*"))
        .output(PortMetadata::new("value", to))
}

#[derive(Clone, Default)]
pub struct ConvertToIntNode;

impl NodeDescriptor for ConvertToIntNode {
    fn meta() -> NodeMetadata {
        convert_meta("Convert To Int", "int")
    }
}

impl DataNode for ConvertToIntNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let value = helpers::take(&mut inputs, "value")?;
        let converted = match value.to_json() {
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| NodeError::invalid_input("value", "convertible to int"))?,
            serde_json::Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| NodeError::new(format!("cannot convert '{s}' to int")))?,
            serde_json::Value::Bool(b) => i64::from(b),
            _ => return Err(NodeError::invalid_input("value", "convertible to int")),
        };
        let mut out = ValueMap::new();
        out.insert("value".to_string(), PortValue::from(converted));
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "ConvertToIntNode",
    construct: new_node::<ConvertToIntNode>,
    meta: Some(ConvertToIntNode::meta),
});

#[derive(Clone, Default)]
pub struct ConvertToFloatNode;

impl NodeDescriptor for ConvertToFloatNode {
    fn meta() -> NodeMetadata {
        convert_meta("Convert To Float", "float")
    }
}

impl DataNode for ConvertToFloatNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let value = helpers::take(&mut inputs, "value")?;
        let converted = match value.to_json() {
            serde_json::Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| NodeError::invalid_input("value", "convertible to float"))?,
            serde_json::Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| NodeError::new(format!("cannot convert '{s}' to float")))?,
            serde_json::Value::Bool(b) => f64::from(u8::from(b)),
            _ => return Err(NodeError::invalid_input("value", "convertible to float")),
        };
        let mut out = ValueMap::new();
        out.insert("value".to_string(), PortValue::from(converted));
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "ConvertToFloatNode",
    construct: new_node::<ConvertToFloatNode>,
    meta: Some(ConvertToFloatNode::meta),
});

#[derive(Clone, Default)]
pub struct ConvertToStringNode;

impl NodeDescriptor for ConvertToStringNode {
    fn meta() -> NodeMetadata {
        convert_meta("Convert To String", "str")
    }
}

impl DataNode for ConvertToStringNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let value = helpers::take(&mut inputs, "value")?;
        let converted = match value.to_json() {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        let mut out = ValueMap::new();
        out.insert("value".to_string(), PortValue::from(converted));
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "ConvertToStringNode",
    construct: new_node::<ConvertToStringNode>,
    meta: Some(ConvertToStringNode::meta),
});

#[cfg(test)]
mod tests {
    use super::*;
    use skein_engine::ProgressEvent;

    fn eval<T: DataNode>(mut node: T, value: PortValue) -> NodeResult<PortValue> {
        let mut sink = |_e: ProgressEvent| {};
        let mut ctx = Controller::new("test", &mut sink);
        let mut inputs = ValueMap::new();
        inputs.insert("value".to_string(), value);
        let mut out = node.evaluate(&mut ctx, inputs)?;
        helpers::take(&mut out, "value")
    }

    #[test]
    fn test_to_int() {
        assert_eq!(eval(ConvertToIntNode, PortValue::from("12")).unwrap().as_i64(), Some(12));
        assert_eq!(eval(ConvertToIntNode, PortValue::from(3.0f64)).unwrap().as_i64(), Some(3));
        assert_eq!(eval(ConvertToIntNode, PortValue::from(true)).unwrap().as_i64(), Some(1));
        assert!(eval(ConvertToIntNode, PortValue::from("twelve")).is_err());
    }

    #[test]
    fn test_to_float() {
        assert_eq!(eval(ConvertToFloatNode, PortValue::from("2.5")).unwrap().as_f64(), Some(2.5));
        assert_eq!(eval(ConvertToFloatNode, PortValue::from(4i64)).unwrap().as_f64(), Some(4.0));
    }

    #[test]
    fn test_to_string() {
        assert_eq!(
            eval(ConvertToStringNode, PortValue::from(7i64)).unwrap().as_string().as_deref(),
            Some("7")
        );
        assert_eq!(
            eval(ConvertToStringNode, PortValue::from("as-is")).unwrap().as_string().as_deref(),
            Some("as-is")
        );
    }
}
