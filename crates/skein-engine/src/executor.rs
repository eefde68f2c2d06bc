//! Graph executor
//!
//! Drives a graph to completion with an explicit LIFO task stack. Three
//! task kinds cover the three phases of a node's life:
//!
//! - `Expand` resolves a node's non-lazy data dependencies into an
//!   execution order (depth-first, leaves first) and schedules them.
//! - `Execute` collects the node's inputs and starts it, obtaining a lazy
//!   producer.
//! - `IterateNext` advances the producer one step and reacts to what it
//!   yielded: caching outputs, following route edges, or re-expanding a
//!   subset of inputs the node asked to fetch.
//!
//! There is no recursion through nodes and no thread pool; a single run is
//! strictly cooperative and single-threaded.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::analysis::DependencyTables;
use crate::error::{EngineError, Result};
use crate::events::ProgressEvent;
use crate::graph::{ExecutionMode, GraphData, GraphNode};
use crate::node::{Controller, Node, NodeOutput, NodeProducer, ProducerStep, FALLTHROUGH_PIN};
use crate::registry::NodeRegistry;
use crate::value::{PortValue, ValueMap};

/// Reserved id of the entry node
pub const START_NODE_ID: &str = "start";

/// Cooperative cancellation flag, checked at the top of every task-loop
/// iteration. Cancelling an already-finished run has no effect.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runtime state kept per graph node, created on first reference
struct NodeState {
    node: Box<dyn Node>,
    output_cache: Option<ValueMap>,
    output_version: u64,
}

/// A unit of work on the executor's stack
enum Task {
    /// Ensure dependencies of `id` (or of the given input pins) have run,
    /// then schedule the node itself
    Expand {
        id: String,
        ports: Option<Vec<String>>,
    },
    /// Collect inputs and start the node
    Execute { id: String },
    /// Advance the node's producer, optionally handing it re-collected
    /// input values first
    IterateNext {
        id: String,
        producer: Box<dyn NodeProducer>,
        recollect: Option<Vec<String>>,
    },
}

/// Single-run graph executor
///
/// Owns the node instances and their output caches for the duration of one
/// run. Construction builds the dependency tables and validates the graph;
/// nothing executes until [`execute`](GraphExecutor::execute) is called.
pub struct GraphExecutor {
    registry: Arc<NodeRegistry>,
    graph: GraphData,
    tables: DependencyTables,
    states: HashMap<String, NodeState>,
    cancel: CancelToken,
}

impl std::fmt::Debug for GraphExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphExecutor")
            .field("graph", &self.graph)
            .field("tables", &self.tables)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl GraphExecutor {
    /// Build an executor for one run of `graph`
    pub fn new(registry: Arc<NodeRegistry>, graph: GraphData) -> Result<Self> {
        let tables = DependencyTables::build(&graph, &registry)?;
        if graph.node(START_NODE_ID).is_none() {
            return Err(EngineError::invalid_graph(format!(
                "graph has no '{START_NODE_ID}' node"
            )));
        }
        Ok(Self {
            registry,
            graph,
            tables,
            states: HashMap::new(),
            cancel: CancelToken::new(),
        })
    }

    /// A handle that cancels this run when triggered
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The last output map a node produced, if it has run
    pub fn output_of(&self, node_id: &str) -> Option<&ValueMap> {
        self.states.get(node_id)?.output_cache.as_ref()
    }

    /// How many times a node has produced output this run
    pub fn output_version(&self, node_id: &str) -> u64 {
        self.states.get(node_id).map_or(0, |s| s.output_version)
    }

    /// Run the graph to completion, reporting progress to `progress`
    ///
    /// Emits a single `finish` event after the task stack drains. Any error
    /// aborts the run; there is no in-engine retry.
    pub fn execute(&mut self, progress: &mut dyn FnMut(ProgressEvent)) -> Result<()> {
        let mut stack = vec![Task::Expand {
            id: START_NODE_ID.to_string(),
            ports: None,
        }];

        loop {
            if self.cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let Some(task) = stack.pop() else { break };
            match task {
                Task::Expand { id, ports } => self.expand(&id, ports, &mut stack)?,
                Task::Execute { id } => self.start_node(id, &mut stack, progress)?,
                Task::IterateNext {
                    id,
                    producer,
                    recollect,
                } => self.iterate_next(id, producer, recollect, &mut stack, progress)?,
            }
        }

        progress(ProgressEvent::finish());
        Ok(())
    }

    fn expand(
        &mut self,
        id: &str,
        ports: Option<Vec<String>>,
        stack: &mut Vec<Task>,
    ) -> Result<()> {
        let mut order = self.execution_order(id, ports.as_deref())?;
        if ports.is_some() {
            // Partial expand: the node itself is mid-execution and must not
            // be restarted, only its requested upstreams.
            order.pop();
        }
        log::debug!("expand '{id}': execution order {order:?}");
        for node_id in order.into_iter().rev() {
            stack.push(Task::Execute { id: node_id });
        }
        Ok(())
    }

    /// Depth-first topological walk over non-lazy data dependencies
    fn execution_order(&self, target: &str, ports: Option<&[String]>) -> Result<Vec<String>> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut processing = HashSet::new();
        self.visit(target, ports, &mut visited, &mut processing, &mut order)?;
        Ok(order)
    }

    fn visit(
        &self,
        id: &str,
        ports: Option<&[String]>,
        visited: &mut HashSet<String>,
        processing: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        if processing.contains(id) {
            return Err(EngineError::CircularDependency(id.to_string()));
        }
        if visited.contains(id) {
            return Ok(());
        }
        let node = self.node(id)?;
        if node.execution_type == ExecutionMode::DataOnce && self.cache_is_set(id) {
            return Ok(());
        }

        processing.insert(id.to_string());
        let dependencies: BTreeSet<String> = match ports {
            None => self
                .tables
                .data_dependencies
                .get(id)
                .cloned()
                .unwrap_or_default(),
            Some(ports) => {
                let mut dependencies = BTreeSet::new();
                if let Some(inputs) = self.tables.data_inputs.get(id) {
                    for port in ports {
                        if let Some((source_id, _)) = inputs.get(port) {
                            dependencies.insert(source_id.clone());
                        }
                    }
                }
                dependencies
            }
        };
        for dep in &dependencies {
            // Triggered nodes are never prerequisites; they must have run
            // earlier via routing.
            if self.node(dep)?.execution_type == ExecutionMode::Triggered {
                continue;
            }
            self.visit(dep, None, visited, processing, order)?;
        }
        processing.remove(id);
        visited.insert(id.to_string());
        order.push(id.to_string());
        Ok(())
    }

    fn start_node(
        &mut self,
        id: String,
        stack: &mut Vec<Task>,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<()> {
        let inputs = self.collect_inputs(&id)?;
        log::debug!("execute '{id}' with {} inputs", inputs.len());

        let result = {
            let state = self.state_mut(&id)?;
            let mut ctx = Controller::new(&id, progress);
            state.node.execute(&mut ctx, inputs)
        };
        let producer = match result {
            Ok(producer) => producer,
            Err(err) => {
                progress(ProgressEvent::execute_node_error(&id, &err.to_string()));
                return Err(EngineError::Node {
                    node_id: id,
                    message: err.to_string(),
                });
            }
        };
        stack.push(Task::IterateNext {
            id,
            producer,
            recollect: None,
        });
        Ok(())
    }

    fn iterate_next(
        &mut self,
        id: String,
        mut producer: Box<dyn NodeProducer>,
        recollect: Option<Vec<String>>,
        stack: &mut Vec<Task>,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<()> {
        progress(ProgressEvent::execute_node(&id));

        let resume = match &recollect {
            Some(pins) => Some(self.recollect_values(&id, pins)?),
            None => None,
        };
        let step = {
            let mut ctx = Controller::new(&id, progress);
            producer.step(&mut ctx, resume)
        };
        let step = match step {
            Ok(step) => step,
            Err(err) => {
                progress(ProgressEvent::execute_node_error(&id, &err.to_string()));
                return Err(EngineError::Node {
                    node_id: id,
                    message: err.to_string(),
                });
            }
        };

        match step {
            ProducerStep::Yield(NodeOutput {
                execution_pin,
                data,
            }) => {
                {
                    let state = self.state_mut(&id)?;
                    state.output_cache = Some(data);
                    state.output_version += 1;
                }
                let pin = execution_pin.unwrap_or_else(|| FALLTHROUGH_PIN.to_string());
                if pin != FALLTHROUGH_PIN {
                    // The node chose a branch; resume it after the routed
                    // subtree completes.
                    stack.push(Task::IterateNext {
                        id: id.clone(),
                        producer,
                        recollect: None,
                    });
                }
                self.follow_route(&id, &pin, stack);
            }
            ProducerStep::Fetch { ports } => {
                log::debug!("'{id}' requests fresh inputs on {ports:?}");
                stack.push(Task::IterateNext {
                    id: id.clone(),
                    producer,
                    recollect: Some(ports.clone()),
                });
                stack.push(Task::Expand {
                    id,
                    ports: Some(ports),
                });
            }
            ProducerStep::Done => {
                self.follow_route(&id, FALLTHROUGH_PIN, stack);
            }
        }
        Ok(())
    }

    fn follow_route(&self, id: &str, pin: &str, stack: &mut Vec<Task>) {
        let target = self
            .tables
            .routes
            .get(id)
            .and_then(|routes| routes.get(pin));
        if let Some(target) = target {
            log::debug!("route '{id}'.{pin} -> '{target}'");
            stack.push(Task::Expand {
                id: target.clone(),
                ports: None,
            });
        }
    }

    /// Collect values for every non-lazy input pin in the node's metadata
    fn collect_inputs(&self, id: &str) -> Result<ValueMap> {
        let node = self.node(id)?;
        let meta = self.registry.metadata(&node.node_type).ok_or_else(|| {
            EngineError::invalid_graph(format!("unknown node type '{}'", node.node_type))
        })?;
        let pins = meta.non_lazy_input_names();
        self.collect_inputs_on_pins(id, &pins)
    }

    /// Collect values for the given pins: literal inputs first, then
    /// connected upstream caches (which win on conflict)
    fn collect_inputs_on_pins(&self, id: &str, pins: &[String]) -> Result<ValueMap> {
        let pin_set: HashSet<&str> = pins.iter().map(String::as_str).collect();
        let node = self.node(id)?;

        let mut result = ValueMap::new();
        for (pin, value) in &node.inputs {
            if pin_set.contains(pin.as_str()) {
                result.insert(pin.clone(), PortValue::from(value.clone()));
            }
        }
        if let Some(inputs) = self.tables.data_inputs.get(id) {
            for (target_pin, (source_id, source_pin)) in inputs {
                if !pin_set.contains(target_pin.as_str()) {
                    continue;
                }
                let cache = self
                    .states
                    .get(source_id)
                    .and_then(|s| s.output_cache.as_ref())
                    .ok_or_else(|| {
                        EngineError::UnresolvedDependency(format!(
                            "node '{id}' reads '{target_pin}' from node '{source_id}', \
                             which has not produced output yet"
                        ))
                    })?;
                let value = cache.get(source_pin).ok_or_else(|| {
                    EngineError::UnresolvedDependency(format!(
                        "node '{source_id}' has no cached value on output pin '{source_pin}'"
                    ))
                })?;
                result.insert(target_pin.clone(), value.clone());
            }
        }
        Ok(result)
    }

    /// Values for a fetch resumption, in the order the node requested them
    fn recollect_values(&self, id: &str, pins: &[String]) -> Result<Vec<PortValue>> {
        let collected = self.collect_inputs_on_pins(id, pins)?;
        pins.iter()
            .map(|pin| {
                collected.get(pin).cloned().ok_or_else(|| {
                    EngineError::UnresolvedDependency(format!(
                        "node '{id}' requested input '{pin}', but no value is available"
                    ))
                })
            })
            .collect()
    }

    fn node(&self, id: &str) -> Result<&GraphNode> {
        self.graph
            .node(id)
            .ok_or_else(|| EngineError::invalid_graph(format!("unknown node id '{id}'")))
    }

    fn cache_is_set(&self, id: &str) -> bool {
        self.states
            .get(id)
            .is_some_and(|s| s.output_cache.is_some())
    }

    fn state_mut(&mut self, id: &str) -> Result<&mut NodeState> {
        if !self.states.contains_key(id) {
            let node_type = self.node(id)?.node_type.clone();
            let def = self.registry.get(&node_type).ok_or_else(|| {
                EngineError::invalid_graph(format!("unknown node type '{node_type}'"))
            })?;
            log::debug!("instantiating node '{id}' (type '{node_type}')");
            self.states.insert(
                id.to_string(),
                NodeState {
                    node: (def.construct)(),
                    output_cache: None,
                    output_version: 0,
                },
            );
        }
        match self.states.get_mut(id) {
            Some(state) => Ok(state),
            None => Err(EngineError::invalid_graph(format!("unknown node id '{id}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{NodeMetadata, PortMetadata};
    use crate::node::{DataNode, NodeError, NodeResult};
    use crate::registry::new_node;
    use serde_json::json;
    use std::cell::RefCell;

    thread_local! {
        static EXEC_LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
        static COUNTER: RefCell<i64> = const { RefCell::new(0) };
    }

    fn reset_thread_state() {
        EXEC_LOG.with(|l| l.borrow_mut().clear());
        COUNTER.with(|c| *c.borrow_mut() = 0);
    }

    fn exec_log() -> Vec<String> {
        EXEC_LOG.with(|l| l.borrow().clone())
    }

    /// Logs its own id and passes all inputs through as outputs
    #[derive(Clone, Default)]
    struct Probe;

    impl DataNode for Probe {
        fn evaluate(
            &mut self,
            ctx: &mut Controller<'_>,
            inputs: ValueMap,
        ) -> NodeResult<ValueMap> {
            EXEC_LOG.with(|l| l.borrow_mut().push(ctx.node_id().to_string()));
            Ok(inputs)
        }
    }

    /// Emits a fresh value from a shared counter on every evaluation
    #[derive(Clone, Default)]
    struct CounterSource;

    impl DataNode for CounterSource {
        fn evaluate(
            &mut self,
            ctx: &mut Controller<'_>,
            _inputs: ValueMap,
        ) -> NodeResult<ValueMap> {
            EXEC_LOG.with(|l| l.borrow_mut().push(ctx.node_id().to_string()));
            let n = COUNTER.with(|c| {
                *c.borrow_mut() += 1;
                *c.borrow()
            });
            let mut out = ValueMap::new();
            out.insert("value".to_string(), PortValue::from(n));
            Ok(out)
        }
    }

    #[derive(Clone, Default)]
    struct Broken;

    impl DataNode for Broken {
        fn evaluate(
            &mut self,
            _ctx: &mut Controller<'_>,
            _inputs: ValueMap,
        ) -> NodeResult<ValueMap> {
            Err(NodeError::new("deliberately broken"))
        }
    }

    /// Fetches its lazy input twice, then reports both observed values
    #[derive(Clone, Default)]
    struct DoubleFetch;

    struct DoubleFetchProducer {
        fetches: u8,
        first: Option<PortValue>,
        second: Option<PortValue>,
    }

    impl std::fmt::Debug for DoubleFetchProducer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("DoubleFetchProducer")
                .field("fetches", &self.fetches)
                .finish_non_exhaustive()
        }
    }

    impl Node for DoubleFetch {
        fn execute(
            &mut self,
            _ctx: &mut Controller<'_>,
            _inputs: ValueMap,
        ) -> NodeResult<Box<dyn NodeProducer>> {
            Ok(Box::new(DoubleFetchProducer {
                fetches: 0,
                first: None,
                second: None,
            }))
        }
    }

    impl NodeProducer for DoubleFetchProducer {
        fn step(
            &mut self,
            _ctx: &mut Controller<'_>,
            resume: Option<Vec<PortValue>>,
        ) -> NodeResult<ProducerStep> {
            if let Some(mut values) = resume {
                let value = values.pop().ok_or_else(|| NodeError::new("empty resume"))?;
                if self.first.is_none() {
                    self.first = Some(value);
                } else {
                    self.second = Some(value);
                }
            }
            if self.fetches < 2 {
                self.fetches += 1;
                return Ok(ProducerStep::Fetch {
                    ports: vec!["lazy_in".to_string()],
                });
            }
            let mut out = ValueMap::new();
            out.insert(
                "first".to_string(),
                self.first.take().ok_or_else(|| NodeError::new("no first"))?,
            );
            out.insert(
                "second".to_string(),
                self.second.take().ok_or_else(|| NodeError::new("no second"))?,
            );
            Ok(ProducerStep::Yield(NodeOutput::data(out)))
        }
    }

    fn test_registry() -> Arc<NodeRegistry> {
        let mut registry = NodeRegistry::new();
        registry
            .register(
                "Probe",
                new_node::<Probe>,
                Some(
                    NodeMetadata::new("Probe", "Test")
                        .input(PortMetadata::new("value", "*"))
                        .input(PortMetadata::new("other", "*"))
                        .output(PortMetadata::new("value", "*")),
                ),
            )
            .unwrap();
        registry
            .register(
                "Counter",
                new_node::<CounterSource>,
                Some(NodeMetadata::new("Counter", "Test").output(PortMetadata::new("value", "int"))),
            )
            .unwrap();
        registry
            .register(
                "Broken",
                new_node::<Broken>,
                Some(NodeMetadata::new("Broken", "Test")),
            )
            .unwrap();
        registry
            .register(
                "DoubleFetch",
                new_node::<DoubleFetch>,
                Some(
                    NodeMetadata::new("DoubleFetch", "Test")
                        .input(PortMetadata::new("lazy_in", "*").lazy())
                        .output(PortMetadata::new("first", "*"))
                        .output(PortMetadata::new("second", "*")),
                ),
            )
            .unwrap();
        Arc::new(registry)
    }

    fn executor(graph: serde_json::Value) -> GraphExecutor {
        GraphExecutor::new(test_registry(), GraphData::from_value(graph).unwrap()).unwrap()
    }

    fn run(executor: &mut GraphExecutor) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        executor.execute(&mut |e| events.push(e)).unwrap();
        events
    }

    #[test]
    fn test_route_chain_and_finish_event() {
        reset_thread_state();
        let mut executor = executor(json!({
            "nodes": [
                {"id": "start", "node_type": "Probe", "execution_type": "triggered"},
                {"id": "next", "node_type": "Probe", "execution_type": "triggered"}
            ],
            "edges": [],
            "route_edges": [
                {"source_id": "start", "source_pin": "_", "target_id": "next"}
            ]
        }));
        let events = run(&mut executor);

        assert_eq!(exec_log(), vec!["start", "next"]);
        let finishes: Vec<_> = events
            .iter()
            .filter(|e| e.event == ProgressEvent::FINISH)
            .collect();
        assert_eq!(finishes.len(), 1);
        assert_eq!(events.last().unwrap().event, ProgressEvent::FINISH);
    }

    #[test]
    fn test_dependencies_run_leaves_first() {
        reset_thread_state();
        // start -> sink, sink reads c <- b <- a
        let mut executor = executor(json!({
            "nodes": [
                {"id": "start", "node_type": "Probe", "execution_type": "triggered"},
                {"id": "a", "node_type": "Probe", "execution_type": "data", "inputs": {"value": 7}},
                {"id": "b", "node_type": "Probe", "execution_type": "data"},
                {"id": "c", "node_type": "Probe", "execution_type": "data"},
                {"id": "sink", "node_type": "Probe", "execution_type": "triggered"}
            ],
            "edges": [
                {"source_id": "a", "source_pin": "value", "target_id": "b", "target_pin": "value"},
                {"source_id": "b", "source_pin": "value", "target_id": "c", "target_pin": "value"},
                {"source_id": "c", "source_pin": "value", "target_id": "sink", "target_pin": "value"}
            ],
            "route_edges": [
                {"source_id": "start", "source_pin": "_", "target_id": "sink"}
            ]
        }));
        run(&mut executor);

        assert_eq!(exec_log(), vec!["start", "a", "b", "c", "sink"]);
        // the literal flowed through the whole chain
        assert_eq!(executor.output_of("sink").unwrap()["value"].as_i64(), Some(7));
    }

    #[test]
    fn test_data_once_runs_at_most_once() {
        reset_thread_state();
        // two data consumers both demand the same data_once source, twice
        let mut executor = executor(json!({
            "nodes": [
                {"id": "start", "node_type": "Probe", "execution_type": "triggered"},
                {"id": "once", "node_type": "Counter", "execution_type": "data_once"},
                {"id": "c1", "node_type": "Probe", "execution_type": "data"},
                {"id": "c2", "node_type": "Probe", "execution_type": "data"},
                {"id": "sink", "node_type": "Probe", "execution_type": "triggered"},
                {"id": "sink2", "node_type": "Probe", "execution_type": "triggered"}
            ],
            "edges": [
                {"source_id": "once", "source_pin": "value", "target_id": "c1", "target_pin": "value"},
                {"source_id": "once", "source_pin": "value", "target_id": "c2", "target_pin": "value"},
                {"source_id": "c1", "source_pin": "value", "target_id": "sink", "target_pin": "value"},
                {"source_id": "c2", "source_pin": "value", "target_id": "sink", "target_pin": "other"},
                {"source_id": "c1", "source_pin": "value", "target_id": "sink2", "target_pin": "value"}
            ],
            "route_edges": [
                {"source_id": "start", "source_pin": "_", "target_id": "sink"},
                {"source_id": "sink", "source_pin": "_", "target_id": "sink2"}
            ]
        }));
        run(&mut executor);

        assert_eq!(executor.output_version("once"), 1);
        // both consumers saw the same (first) counter value
        assert_eq!(executor.output_of("sink").unwrap()["value"].as_i64(), Some(1));
        assert_eq!(executor.output_of("sink").unwrap()["other"].as_i64(), Some(1));
        // the plain data node was re-executed for the second demand chain
        assert_eq!(executor.output_version("c1"), 2);
    }

    #[test]
    fn test_circular_dependency_is_detected() {
        reset_thread_state();
        let mut executor = executor(json!({
            "nodes": [
                {"id": "start", "node_type": "Probe", "execution_type": "triggered"},
                {"id": "a", "node_type": "Probe", "execution_type": "data"},
                {"id": "b", "node_type": "Probe", "execution_type": "data"},
                {"id": "sink", "node_type": "Probe", "execution_type": "triggered"}
            ],
            "edges": [
                {"source_id": "a", "source_pin": "value", "target_id": "b", "target_pin": "value"},
                {"source_id": "b", "source_pin": "value", "target_id": "a", "target_pin": "value"},
                {"source_id": "a", "source_pin": "value", "target_id": "sink", "target_pin": "value"}
            ],
            "route_edges": [
                {"source_id": "start", "source_pin": "_", "target_id": "sink"}
            ]
        }));
        let err = executor.execute(&mut |_| {}).unwrap_err();
        assert!(matches!(err, EngineError::CircularDependency(_)), "got {err:?}");
        // nothing in the cycle ever executed
        assert_eq!(executor.output_version("a"), 0);
        assert_eq!(executor.output_version("b"), 0);
    }

    #[test]
    fn test_missing_start_node_is_rejected() {
        let graph = GraphData::from_value(json!({
            "nodes": [{"id": "a", "node_type": "Probe", "execution_type": "data"}],
            "edges": [],
            "route_edges": []
        }))
        .unwrap();
        let err = GraphExecutor::new(test_registry(), graph).unwrap_err();
        assert!(err.to_string().contains("start"), "got {err}");
    }

    #[test]
    fn test_lazy_fetch_sees_fresh_values() {
        reset_thread_state();
        let mut executor = executor(json!({
            "nodes": [
                {"id": "start", "node_type": "Probe", "execution_type": "triggered"},
                {"id": "counter", "node_type": "Counter", "execution_type": "data"},
                {"id": "fetcher", "node_type": "DoubleFetch", "execution_type": "triggered"}
            ],
            "edges": [
                {"source_id": "counter", "source_pin": "value", "target_id": "fetcher", "target_pin": "lazy_in"}
            ],
            "route_edges": [
                {"source_id": "start", "source_pin": "_", "target_id": "fetcher"}
            ]
        }));
        run(&mut executor);

        // the lazy upstream was re-expanded for each fetch
        let out = executor.output_of("fetcher").unwrap();
        assert_eq!(out["first"].as_i64(), Some(1));
        assert_eq!(out["second"].as_i64(), Some(2));
        assert_eq!(executor.output_version("counter"), 2);
    }

    #[test]
    fn test_triggered_upstream_is_not_expanded() {
        reset_thread_state();
        // `tick` is triggered but never routed to, so its cache is unset
        // when `sink` tries to read it
        let mut executor = executor(json!({
            "nodes": [
                {"id": "start", "node_type": "Probe", "execution_type": "triggered"},
                {"id": "tick", "node_type": "Counter", "execution_type": "triggered"},
                {"id": "sink", "node_type": "Probe", "execution_type": "triggered"}
            ],
            "edges": [
                {"source_id": "tick", "source_pin": "value", "target_id": "sink", "target_pin": "value"}
            ],
            "route_edges": [
                {"source_id": "start", "source_pin": "_", "target_id": "sink"}
            ]
        }));
        let err = executor.execute(&mut |_| {}).unwrap_err();
        assert!(matches!(err, EngineError::UnresolvedDependency(_)), "got {err:?}");
    }

    #[test]
    fn test_node_error_emits_event_and_aborts() {
        reset_thread_state();
        let mut executor = executor(json!({
            "nodes": [
                {"id": "start", "node_type": "Probe", "execution_type": "triggered"},
                {"id": "boom", "node_type": "Broken", "execution_type": "triggered"}
            ],
            "edges": [],
            "route_edges": [
                {"source_id": "start", "source_pin": "_", "target_id": "boom"}
            ]
        }));
        let mut events = Vec::new();
        let err = executor.execute(&mut |e| events.push(e)).unwrap_err();

        match err {
            EngineError::Node { node_id, message } => {
                assert_eq!(node_id, "boom");
                assert!(message.contains("deliberately broken"));
            }
            other => panic!("expected node error, got {other:?}"),
        }
        let error_event = events
            .iter()
            .find(|e| e.event == ProgressEvent::EXECUTE_NODE_ERROR)
            .expect("error event emitted");
        assert_eq!(error_event.node_id.as_deref(), Some("boom"));
        // aborted runs emit no finish event
        assert!(events.iter().all(|e| e.event != ProgressEvent::FINISH));
    }

    #[test]
    fn test_connected_input_wins_over_literal() {
        reset_thread_state();
        let mut executor = executor(json!({
            "nodes": [
                {"id": "start", "node_type": "Probe", "execution_type": "triggered"},
                {"id": "up", "node_type": "Counter", "execution_type": "data"},
                {"id": "sink", "node_type": "Probe", "execution_type": "triggered",
                 "inputs": {"value": 99, "other": "kept"}}
            ],
            "edges": [
                {"source_id": "up", "source_pin": "value", "target_id": "sink", "target_pin": "value"}
            ],
            "route_edges": [
                {"source_id": "start", "source_pin": "_", "target_id": "sink"}
            ]
        }));
        run(&mut executor);

        let out = executor.output_of("sink").unwrap();
        assert_eq!(out["value"].as_i64(), Some(1));
        assert_eq!(out["other"].as_string().as_deref(), Some("kept"));
    }

    #[test]
    fn test_cancellation_stops_the_run() {
        reset_thread_state();
        let mut executor = executor(json!({
            "nodes": [
                {"id": "start", "node_type": "Probe", "execution_type": "triggered"}
            ],
            "edges": [],
            "route_edges": []
        }));
        executor.cancel_token().cancel();

        let mut events = Vec::new();
        let err = executor.execute(&mut |e| events.push(e)).unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        assert!(events.is_empty());
        assert!(exec_log().is_empty());
    }
}
