//! Node driver protocol
//!
//! A node is invoked once per execution and hands back a lazy producer: a
//! resumable state machine that the executor steps cooperatively. Each step
//! either yields an output (optionally selecting a route pin), pauses to
//! request fresh values for a set of input pins, or finishes.
//!
//! Nodes that are a single pure computation implement [`DataNode`] instead
//! and get the producer plumbing for free.

use crate::events::ProgressEvent;
use crate::value::{PortValue, ValueMap};

/// The reserved fall-through route pin, selected when a node completes
/// naturally without picking a branch.
pub const FALLTHROUGH_PIN: &str = "_";

/// Errors raised by node implementations
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct NodeError(String);

impl NodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// A required input pin had no value
    pub fn missing_input(pin: &str) -> Self {
        Self(format!("missing required input '{pin}'"))
    }

    /// An input pin carried a value of the wrong shape
    pub fn invalid_input(pin: &str, expected: &str) -> Self {
        Self(format!("input '{pin}' is not {expected}"))
    }
}

impl From<String> for NodeError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for NodeError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Result type for node implementations
pub type NodeResult<T> = std::result::Result<T, NodeError>;

/// Handle given to a node for talking back to the run's progress sink
///
/// `send_event` is fire-and-forget from the node's point of view; the
/// record is forwarded synchronously to the caller-supplied sink.
pub struct Controller<'a> {
    node_id: &'a str,
    sink: &'a mut dyn FnMut(ProgressEvent),
}

impl<'a> Controller<'a> {
    pub fn new(node_id: &'a str, sink: &'a mut dyn FnMut(ProgressEvent)) -> Self {
        Self { node_id, sink }
    }

    /// Id of the graph node currently executing
    pub fn node_id(&self) -> &str {
        self.node_id
    }

    /// Forward a node-defined event (`display`, `append`, ...) with a payload
    pub fn send_event(&mut self, event: impl Into<String>, data: serde_json::Value) {
        (self.sink)(ProgressEvent::node_event(event, self.node_id, data));
    }
}

/// One output produced by a node
#[derive(Debug)]
pub struct NodeOutput {
    /// Route pin selected for this output; `None` means fall through
    pub execution_pin: Option<String>,
    /// Output pin values, written to the node's output cache
    pub data: ValueMap,
}

impl NodeOutput {
    /// A plain data output with no route selection
    pub fn data(data: ValueMap) -> Self {
        Self {
            execution_pin: None,
            data,
        }
    }

    /// An output that routes execution through a named pin
    pub fn routed(pin: impl Into<String>, data: ValueMap) -> Self {
        Self {
            execution_pin: Some(pin.into()),
            data,
        }
    }
}

/// What a producer did when stepped
pub enum ProducerStep {
    /// The node produced an output
    Yield(NodeOutput),
    /// The node paused and wants fresh values for these input pins; they are
    /// handed back as the resumption value of the next step, in pin order
    Fetch { ports: Vec<String> },
    /// The sequence is exhausted
    Done,
}

/// A node's resumable computation
pub trait NodeProducer: std::fmt::Debug {
    /// Advance the sequence one step. `resume` carries the re-collected
    /// input values requested by a preceding `Fetch`, in request order.
    fn step(
        &mut self,
        ctx: &mut Controller<'_>,
        resume: Option<Vec<PortValue>>,
    ) -> NodeResult<ProducerStep>;
}

/// A node implementation
///
/// The executor owns one instance per graph node for the duration of a run
/// and calls `execute` each time the node is scheduled; the returned
/// producer carries all per-execution state.
pub trait Node {
    fn execute(
        &mut self,
        ctx: &mut Controller<'_>,
        inputs: ValueMap,
    ) -> NodeResult<Box<dyn NodeProducer>>;
}

/// A node that is a single pure computation over its inputs
///
/// The blanket [`Node`] impl wraps `evaluate` in a one-shot producer that
/// yields once with no route pin and is then exhausted, so downstream
/// fall-through routing behaves exactly like a hand-written producer.
pub trait DataNode: Clone + 'static {
    fn evaluate(&mut self, ctx: &mut Controller<'_>, inputs: ValueMap) -> NodeResult<ValueMap>;
}

impl<T: DataNode> Node for T {
    fn execute(
        &mut self,
        _ctx: &mut Controller<'_>,
        inputs: ValueMap,
    ) -> NodeResult<Box<dyn NodeProducer>> {
        Ok(Box::new(OneShotProducer {
            node: self.clone(),
            inputs: Some(inputs),
        }))
    }
}

/// Producer adapter for [`DataNode`]: evaluation is deferred to the first
/// step so events and errors surface inside the iteration phase.
struct OneShotProducer<T: DataNode> {
    node: T,
    inputs: Option<ValueMap>,
}

impl<T: DataNode> std::fmt::Debug for OneShotProducer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneShotProducer")
            .field("inputs", &self.inputs.is_some())
            .finish()
    }
}

impl<T: DataNode> NodeProducer for OneShotProducer<T> {
    fn step(
        &mut self,
        ctx: &mut Controller<'_>,
        _resume: Option<Vec<PortValue>>,
    ) -> NodeResult<ProducerStep> {
        match self.inputs.take() {
            Some(inputs) => {
                let data = self.node.evaluate(ctx, inputs)?;
                Ok(ProducerStep::Yield(NodeOutput::data(data)))
            }
            None => Ok(ProducerStep::Done),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Echo;

    impl DataNode for Echo {
        fn evaluate(
            &mut self,
            ctx: &mut Controller<'_>,
            inputs: ValueMap,
        ) -> NodeResult<ValueMap> {
            ctx.send_event("display", serde_json::json!({"seen": inputs.len()}));
            Ok(inputs)
        }
    }

    #[test]
    fn test_data_node_yields_once_then_done() {
        let mut events = Vec::new();
        let mut sink = |e: ProgressEvent| events.push(e);
        let mut ctx = Controller::new("echo1", &mut sink);

        let mut inputs = ValueMap::new();
        inputs.insert("value".to_string(), PortValue::from(5i64));

        let mut producer = Echo.execute(&mut ctx, inputs).unwrap();

        match producer.step(&mut ctx, None).unwrap() {
            ProducerStep::Yield(out) => {
                assert!(out.execution_pin.is_none());
                assert_eq!(out.data["value"].as_i64(), Some(5));
            }
            _ => panic!("expected a yield"),
        }
        assert!(matches!(
            producer.step(&mut ctx, None).unwrap(),
            ProducerStep::Done
        ));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "display");
        assert_eq!(events[0].node_id.as_deref(), Some("echo1"));
    }

    #[test]
    fn test_controller_reports_node_id() {
        let mut sink = |_e: ProgressEvent| {};
        let ctx = Controller::new("n42", &mut sink);
        assert_eq!(ctx.node_id(), "n42");
    }
}
