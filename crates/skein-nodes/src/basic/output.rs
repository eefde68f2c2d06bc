//! Output nodes

use skein_engine::{
    new_node, Controller, DataNode, DisplayMetadata, NodeDescriptor, NodeMetadata,
    NodeRegistration, NodeResult, PortMetadata, PortValue, ValueMap,
};

use crate::helpers;

const CATEGORY: &str = "Basic/Output";

/// Render a value the way a user expects to read it: strings bare,
/// everything else as JSON
fn render(value: &PortValue) -> String {
    match value.to_json() {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Writes the value to stdout and passes it through
#[derive(Clone, Default)]
pub struct PrintNode;

impl NodeDescriptor for PrintNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Print", CATEGORY)
            .input(PortMetadata::new("value", "*"))
            .output(PortMetadata::new("value", "*"))
    }
}

impl DataNode for PrintNode {
    fn evaluate(&mut self, _ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let value = helpers::take(&mut inputs, "value")?;
        println!("{}", render(&value));
        let mut out = ValueMap::new();
        out.insert("value".to_string(), value);
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "PrintNode",
    construct: new_node::<PrintNode>,
    meta: Some(PrintNode::meta),
});

/// Shows the value on the node's display surface via a progress event,
/// replacing (`display`) or extending (`append`) the current text
#[derive(Clone, Default)]
pub struct DisplayAsTextNode;

impl NodeDescriptor for DisplayAsTextNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("Display As Text", CATEGORY)
            .input(PortMetadata::new("value", "*"))
            .input(PortMetadata::new("append", "bool").options(serde_json::json!({"default": false})))
            .output(PortMetadata::new("value", "*"))
            .display(DisplayMetadata::text("value"))
    }
}

impl DataNode for DisplayAsTextNode {
    fn evaluate(&mut self, ctx: &mut Controller<'_>, mut inputs: ValueMap) -> NodeResult<ValueMap> {
        let value = helpers::take(&mut inputs, "value")?;
        let append = helpers::opt(&mut inputs, "append").is_some_and(|v| v.truthy());
        let event = if append { "append" } else { "display" };
        ctx.send_event(event, serde_json::json!({"value": render(&value)}));
        let mut out = ValueMap::new();
        out.insert("value".to_string(), value);
        Ok(out)
    }
}

inventory::submit!(NodeRegistration {
    node_type: "DisplayAsTextNode",
    construct: new_node::<DisplayAsTextNode>,
    meta: Some(DisplayAsTextNode::meta),
});

#[cfg(test)]
mod tests {
    use super::*;
    use skein_engine::ProgressEvent;

    #[test]
    fn test_display_emits_display_event() {
        let mut events = Vec::new();
        let mut sink = |e: ProgressEvent| events.push(e);
        let mut ctx = Controller::new("display1", &mut sink);

        let mut inputs = ValueMap::new();
        inputs.insert("value".to_string(), PortValue::from(15i64));
        let out = DisplayAsTextNode.evaluate(&mut ctx, inputs).unwrap();

        assert_eq!(out["value"].as_i64(), Some(15));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "display");
        assert_eq!(events[0].data.as_ref().unwrap()["value"], "15");
    }

    #[test]
    fn test_append_flag_switches_the_event() {
        let mut events = Vec::new();
        let mut sink = |e: ProgressEvent| events.push(e);
        let mut ctx = Controller::new("display1", &mut sink);

        let mut inputs = ValueMap::new();
        inputs.insert("value".to_string(), PortValue::from("more"));
        inputs.insert("append".to_string(), PortValue::from(true));
        DisplayAsTextNode.evaluate(&mut ctx, inputs).unwrap();

        assert_eq!(events[0].event, "append");
    }

    #[test]
    fn test_render_strings_bare() {
        assert_eq!(render(&PortValue::from("plain")), "plain");
        assert_eq!(render(&PortValue::from(serde_json::json!([1, 2]))), "[1,2]");
    }
}
