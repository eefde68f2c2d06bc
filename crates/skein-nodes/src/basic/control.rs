//! Control-flow nodes
//!
//! These are producer-form nodes: they yield through named route pins and
//! are resumed by the executor after each routed subtree completes. The
//! while loop additionally pauses on a lazy input so its condition is
//! re-evaluated on every pass.

use skein_engine::{
    new_node, Controller, Node, NodeDescriptor, NodeError, NodeMetadata, NodeOutput, NodeProducer,
    NodeRegistration, NodeResult, PortMetadata, PortValue, ProducerStep, ValueMap,
};

use crate::helpers;

const CATEGORY: &str = "Basic/Control Flow";

/// Iterates over an integer range, routing through `body` once per item
#[derive(Clone, Default)]
pub struct ForLoopNode;

impl NodeDescriptor for ForLoopNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("For Loop", CATEGORY)
            .input(PortMetadata::new("start", "int").options(serde_json::json!({"default": 0})))
            .input(PortMetadata::new("end", "int").options(serde_json::json!({"default": 3})))
            .input(PortMetadata::new("step", "int").options(serde_json::json!({"default": 1})))
            .output(PortMetadata::new("item", "int"))
            .output(PortMetadata::route("body"))
    }
}

impl Node for ForLoopNode {
    fn execute(
        &mut self,
        _ctx: &mut Controller<'_>,
        mut inputs: ValueMap,
    ) -> NodeResult<Box<dyn NodeProducer>> {
        let start = helpers::take_i64(&mut inputs, "start")?;
        let end = helpers::take_i64(&mut inputs, "end")?;
        let step = helpers::take_i64(&mut inputs, "step")?;
        if step == 0 {
            return Err(NodeError::new("step must not be zero"));
        }
        Ok(Box::new(ForLoopProducer {
            current: start,
            end,
            step,
        }))
    }
}

#[derive(Debug)]
struct ForLoopProducer {
    current: i64,
    end: i64,
    step: i64,
}

impl NodeProducer for ForLoopProducer {
    fn step(
        &mut self,
        _ctx: &mut Controller<'_>,
        _resume: Option<Vec<PortValue>>,
    ) -> NodeResult<ProducerStep> {
        let in_range = if self.step > 0 {
            self.current < self.end
        } else {
            self.current > self.end
        };
        if !in_range {
            return Ok(ProducerStep::Done);
        }
        let item = self.current;
        self.current += self.step;
        let mut data = ValueMap::new();
        data.insert("item".to_string(), PortValue::from(item));
        Ok(ProducerStep::Yield(NodeOutput::routed("body", data)))
    }
}

inventory::submit!(NodeRegistration {
    node_type: "ForLoopNode",
    construct: new_node::<ForLoopNode>,
    meta: Some(ForLoopNode::meta),
});

/// Iterates over a list, routing through `body` once per item
#[derive(Clone, Default)]
pub struct ForEachNode;

impl NodeDescriptor for ForEachNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("For Each", CATEGORY)
            .input(PortMetadata::new("items", "list<T>"))
            .output(PortMetadata::new("item", "T"))
            .output(PortMetadata::route("body"))
            .generic("T")
    }
}

impl Node for ForEachNode {
    fn execute(
        &mut self,
        _ctx: &mut Controller<'_>,
        mut inputs: ValueMap,
    ) -> NodeResult<Box<dyn NodeProducer>> {
        let items = helpers::take_array(&mut inputs, "items")?;
        Ok(Box::new(ForEachProducer {
            items: items.into_iter(),
        }))
    }
}

#[derive(Debug)]
struct ForEachProducer {
    items: std::vec::IntoIter<serde_json::Value>,
}

impl NodeProducer for ForEachProducer {
    fn step(
        &mut self,
        _ctx: &mut Controller<'_>,
        _resume: Option<Vec<PortValue>>,
    ) -> NodeResult<ProducerStep> {
        match self.items.next() {
            Some(item) => {
                let mut data = ValueMap::new();
                data.insert("item".to_string(), PortValue::from(item));
                Ok(ProducerStep::Yield(NodeOutput::routed("body", data)))
            }
            None => Ok(ProducerStep::Done),
        }
    }
}

inventory::submit!(NodeRegistration {
    node_type: "ForEachNode",
    construct: new_node::<ForEachNode>,
    meta: Some(ForEachNode::meta),
});

/// Routes through `body` while its lazy `condition` input evaluates truthy
///
/// The condition is declared lazy, so its upstream chain is re-expanded on
/// every fetch rather than once before the loop starts.
#[derive(Clone, Default)]
pub struct WhileLoopNode;

impl NodeDescriptor for WhileLoopNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("While Loop", CATEGORY)
            .input(PortMetadata::new("condition", "bool").lazy())
            .output(PortMetadata::route("body"))
    }
}

impl Node for WhileLoopNode {
    fn execute(
        &mut self,
        _ctx: &mut Controller<'_>,
        _inputs: ValueMap,
    ) -> NodeResult<Box<dyn NodeProducer>> {
        Ok(Box::new(WhileLoopProducer {
            awaiting_condition: false,
        }))
    }
}

#[derive(Debug)]
struct WhileLoopProducer {
    awaiting_condition: bool,
}

impl NodeProducer for WhileLoopProducer {
    fn step(
        &mut self,
        _ctx: &mut Controller<'_>,
        resume: Option<Vec<PortValue>>,
    ) -> NodeResult<ProducerStep> {
        if !self.awaiting_condition {
            self.awaiting_condition = true;
            return Ok(ProducerStep::Fetch {
                ports: vec!["condition".to_string()],
            });
        }
        self.awaiting_condition = false;
        let values = resume.ok_or_else(|| NodeError::new("expected a re-collected condition"))?;
        let condition = values.first().is_some_and(PortValue::truthy);
        if condition {
            Ok(ProducerStep::Yield(NodeOutput::routed("body", ValueMap::new())))
        } else {
            Ok(ProducerStep::Done)
        }
    }
}

inventory::submit!(NodeRegistration {
    node_type: "WhileLoopNode",
    construct: new_node::<WhileLoopNode>,
    meta: Some(WhileLoopNode::meta),
});

/// Routes through `if` or `else` depending on its condition
#[derive(Clone, Default)]
pub struct IfNode;

impl NodeDescriptor for IfNode {
    fn meta() -> NodeMetadata {
        NodeMetadata::new("If", CATEGORY)
            .input(PortMetadata::new("condition", "bool"))
            .output(PortMetadata::route("if"))
            .output(PortMetadata::route("else"))
    }
}

impl Node for IfNode {
    fn execute(
        &mut self,
        _ctx: &mut Controller<'_>,
        mut inputs: ValueMap,
    ) -> NodeResult<Box<dyn NodeProducer>> {
        let condition = helpers::take(&mut inputs, "condition")?.truthy();
        Ok(Box::new(IfProducer {
            pin: Some(if condition { "if" } else { "else" }),
        }))
    }
}

#[derive(Debug)]
struct IfProducer {
    pin: Option<&'static str>,
}

impl NodeProducer for IfProducer {
    fn step(
        &mut self,
        _ctx: &mut Controller<'_>,
        _resume: Option<Vec<PortValue>>,
    ) -> NodeResult<ProducerStep> {
        match self.pin.take() {
            Some(pin) => Ok(ProducerStep::Yield(NodeOutput::routed(pin, ValueMap::new()))),
            None => Ok(ProducerStep::Done),
        }
    }
}

inventory::submit!(NodeRegistration {
    node_type: "IfNode",
    construct: new_node::<IfNode>,
    meta: Some(IfNode::meta),
});
