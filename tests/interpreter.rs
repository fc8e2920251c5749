//! End-to-end executions over graphs built through the store API

use ignis_blueprint::config::EngineConfig;
use ignis_blueprint::error::{ExecutionError, GraphError};
use ignis_blueprint::graph::types::{Node, NodeKind, Position, Socket, SocketType, ValueMap};
use ignis_blueprint::graph::GraphStore;
use ignis_blueprint::registry::library::{register_builtins, PrintLog};
use std::sync::Mutex;
use ignis_blueprint::registry::{HandlerResult, Inputs, NodeOutput, NodeRegistry, NodeTemplate};
use ignis_blueprint::runtime::Interpreter;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Harness {
    store: Arc<GraphStore>,
    interpreter: Interpreter,
    log: PrintLog,
}

fn engine_config(max_steps: usize) -> EngineConfig {
    EngineConfig {
        max_steps,
        max_data_depth: 64,
        allow_self_loops: false,
    }
}

fn harness_with(registry: NodeRegistry, max_steps: usize) -> Harness {
    let log = register_builtins(&registry).unwrap();
    let config = engine_config(max_steps);
    let store = Arc::new(GraphStore::new(Arc::new(registry), &config));
    store.create_graph("test");
    let interpreter = Interpreter::new(store.clone(), &config);
    Harness {
        store,
        interpreter,
        log,
    }
}

fn harness() -> Harness {
    harness_with(NodeRegistry::new(), 1_000)
}

fn literals(pairs: &[(&str, Value)]) -> Option<ValueMap> {
    Some(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
}

impl Harness {
    fn add(&self, node_type: &str, data: &[(&str, Value)]) -> Node {
        self.store
            .add_node(node_type, Position::default(), literals(data))
            .unwrap()
    }

    fn print(&self, message: &str) -> Node {
        self.add("Print", &[("message_in", json!(message))])
    }

    fn connect(&self, from: &Node, from_socket: &str, to: &Node, to_socket: &str) {
        self.store
            .add_connection(&from.id, from_socket, &to.id, to_socket)
            .unwrap();
    }
}

#[tokio::test]
async fn test_hello_world_fires_in_order() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let hello = h.print("Hello");
    let world = h.print("World");
    h.connect(&start, "exec_out", &hello, "exec_in");
    h.connect(&hello, "exec_out", &world, "exec_in");

    let result = h.interpreter.execute(&start.id, "exec_out").await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.fired_ids(), vec![hello.id.as_str(), world.id.as_str()]);
    assert_eq!(result.nodes_fired, 2);
    assert_eq!(h.log.lines(), vec!["Hello".to_string(), "World".to_string()]);
}

#[tokio::test]
async fn test_branch_true_with_only_false_wired_stops() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let branch = h.add("Branch", &[("condition_in", json!(true))]);
    let never = h.print("unreachable");
    h.connect(&start, "exec_out", &branch, "exec_in");
    h.connect(&branch, "false_out", &never, "exec_in");

    let result = h.interpreter.execute(&start.id, "exec_out").await;

    assert!(result.success);
    assert_eq!(result.fired_ids(), vec![branch.id.as_str()]);
    assert_eq!(result.fired[0].continued_with, vec!["true_out".to_string()]);
    assert!(h.log.lines().is_empty());
}

#[tokio::test]
async fn test_branch_follows_data_condition() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let equal = h.add("Equal", &[("a_in", json!(2.0)), ("b_in", json!(3.0))]);
    let branch = h.add("Branch", &[]);
    let yes = h.print("equal");
    let no = h.print("different");
    h.connect(&start, "exec_out", &branch, "exec_in");
    h.connect(&equal, "result_out", &branch, "condition_in");
    h.connect(&branch, "true_out", &yes, "exec_in");
    h.connect(&branch, "false_out", &no, "exec_in");

    let result = h.interpreter.execute(&start.id, "exec_out").await;

    assert!(result.success);
    assert_eq!(h.log.lines(), vec!["different".to_string()]);
}

#[tokio::test]
async fn test_data_cycle_reported_without_hanging() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let a = h.add("Add", &[]);
    let b = h.add("Add", &[]);
    let print = h.add("Print", &[]);
    h.connect(&a, "result_out", &b, "a_in");
    h.connect(&b, "result_out", &a, "a_in");
    h.connect(&start, "exec_out", &print, "exec_in");
    h.connect(&a, "result_out", &print, "message_in");

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        h.interpreter.execute(&start.id, "exec_out"),
    )
    .await
    .expect("execution hung");

    assert!(!result.success);
    assert!(result.fired.is_empty());
    assert_eq!(
        result.errors,
        vec![ExecutionError::DataCycle {
            path: vec![a.id.clone(), b.id.clone(), a.id.clone()]
        }]
    );

    let graph_id = h.store.active_graph_id().unwrap();
    assert!(matches!(
        h.interpreter.evaluate(&graph_id, &b.id, "result_out").await,
        Err(ExecutionError::DataCycle { .. })
    ));
}

#[tokio::test]
async fn test_data_values_flow_and_coerce() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let add = h.add("Add", &[("a_in", json!(2.0)), ("b_in", json!(3.0))]);
    let multiply = h.add("Multiply", &[("b_in", json!(4.0))]);
    let print = h.add("Print", &[]);
    h.connect(&add, "result_out", &multiply, "a_in");
    h.connect(&multiply, "result_out", &print, "message_in");
    h.connect(&start, "exec_out", &print, "exec_in");

    let result = h.interpreter.execute(&start.id, "exec_out").await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(h.log.lines(), vec!["20.0".to_string()]);

    let graph_id = h.store.active_graph_id().unwrap();
    assert_eq!(
        h.interpreter.evaluate(&graph_id, &multiply.id, "result_out").await,
        Ok(json!(20.0))
    );
}

#[tokio::test]
async fn test_exec_to_float_rejected() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let add = h.add("Add", &[]);
    let before = h.store.get_active_graph().unwrap();

    let err = h
        .store
        .add_connection(&start.id, "exec_out", &add.id, "a_in")
        .unwrap_err();

    assert!(matches!(err, GraphError::SocketKindMismatch { .. }));
    assert_eq!(*before, *h.store.get_active_graph().unwrap());
}

#[tokio::test]
async fn test_fan_out_is_breadth_first() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let first = h.print("first");
    let second = h.print("second");
    let after_first = h.print("after first");
    h.connect(&start, "exec_out", &first, "exec_in");
    h.connect(&start, "exec_out", &second, "exec_in");
    h.connect(&first, "exec_out", &after_first, "exec_in");

    let result = h.interpreter.execute(&start.id, "exec_out").await;

    assert!(result.success);
    assert_eq!(
        result.fired_ids(),
        vec![first.id.as_str(), second.id.as_str(), after_first.id.as_str()]
    );
    assert_eq!(
        h.log.lines(),
        vec!["first".to_string(), "second".to_string(), "after first".to_string()]
    );
    let steps: Vec<usize> = result.fired.iter().map(|f| f.step).collect();
    assert_eq!(steps, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_missing_required_input_stops_only_that_chain() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let broken = h.add("Print", &[]);
    let fine = h.print("still runs");
    h.connect(&start, "exec_out", &broken, "exec_in");
    h.connect(&start, "exec_out", &fine, "exec_in");

    let result = h.interpreter.execute(&start.id, "exec_out").await;

    assert!(!result.success);
    assert_eq!(
        result.errors,
        vec![ExecutionError::MissingRequiredInput {
            node: broken.id.clone(),
            socket: "message_in".into()
        }]
    );
    assert_eq!(result.fired_ids(), vec![fine.id.as_str()]);
    assert_eq!(h.log.lines(), vec!["still runs".to_string()]);
}

/// Exec node with two exec inputs so a loop can be entered from outside
fn register_gate(registry: &NodeRegistry) {
    registry
        .register(
            NodeTemplate::new("Gate", NodeKind::Exec)
                .input(Socket::input("entry_in", "Entry", SocketType::Exec))
                .input(Socket::input("loop_in", "Loop", SocketType::Exec))
                .output(Socket::output("exec_out", "Exec", SocketType::Exec)),
            |_: &Node, _: Inputs| HandlerResult::ready(NodeOutput::continue_with("exec_out")),
        )
        .unwrap();
}

#[tokio::test]
async fn test_exec_loop_hits_step_bound() {
    let registry = NodeRegistry::new();
    register_gate(&registry);
    let h = harness_with(registry, 10);

    let start = h.add("OnStart", &[]);
    let gate = h.add("Gate", &[]);
    let tick = h.print("tick");
    h.connect(&start, "exec_out", &gate, "entry_in");
    h.connect(&gate, "exec_out", &tick, "exec_in");
    h.connect(&tick, "exec_out", &gate, "loop_in");

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        h.interpreter.execute(&start.id, "exec_out"),
    )
    .await
    .expect("execution hung");

    assert!(!result.success);
    assert_eq!(result.errors, vec![ExecutionError::StepBoundExceeded(10)]);
    assert_eq!(result.nodes_fired, 10);
    assert_eq!(h.log.lines().len(), 5);
}

#[tokio::test]
async fn test_cancelled_before_start_fires_nothing() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let print = h.print("never");
    h.connect(&start, "exec_out", &print, "exec_in");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = h
        .interpreter
        .execute_with_cancel(&start.id, "exec_out", cancel)
        .await;

    assert!(result.cancelled);
    assert!(!result.success);
    assert!(result.fired.is_empty());
    assert!(h.log.lines().is_empty());
}

#[tokio::test]
async fn test_cancel_between_firings() {
    let cancel = CancellationToken::new();
    let registry = NodeRegistry::new();
    let trigger = cancel.clone();
    registry
        .register(
            NodeTemplate::new("Abort", NodeKind::Exec)
                .input(Socket::input("exec_in", "Exec", SocketType::Exec))
                .output(Socket::output("exec_out", "Exec", SocketType::Exec)),
            move |_: &Node, _: Inputs| {
                trigger.cancel();
                HandlerResult::ready(NodeOutput::continue_with("exec_out"))
            },
        )
        .unwrap();
    let h = harness_with(registry, 1_000);

    let start = h.add("OnStart", &[]);
    let abort = h.add("Abort", &[]);
    let after = h.print("after");
    h.connect(&start, "exec_out", &abort, "exec_in");
    h.connect(&abort, "exec_out", &after, "exec_in");

    let result = h
        .interpreter
        .execute_with_cancel(&start.id, "exec_out", cancel)
        .await;

    assert!(result.cancelled);
    assert_eq!(result.fired_ids(), vec![abort.id.as_str()]);
    assert!(h.log.lines().is_empty());
}

#[tokio::test]
async fn test_pending_handler_does_not_block_siblings() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let delay = h.add("Delay", &[("duration_in", json!(0.05))]);
    let slow = h.print("slow");
    let fast = h.print("fast");
    h.connect(&start, "exec_out", &delay, "exec_in");
    h.connect(&delay, "completed_out", &slow, "exec_in");
    h.connect(&start, "exec_out", &fast, "exec_in");

    let result = h.interpreter.execute(&start.id, "exec_out").await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(h.log.lines(), vec!["fast".to_string(), "slow".to_string()]);
    assert_eq!(
        result.fired_ids(),
        vec![fast.id.as_str(), delay.id.as_str(), slow.id.as_str()]
    );
    let delay_step = result.fired.iter().find(|f| f.node_id == delay.id).map(|f| f.step);
    assert_eq!(delay_step, Some(1));
    assert!(result.elapsed >= Duration::from_millis(50));
}

#[tokio::test]
async fn test_invalid_start_socket() {
    let h = harness();
    let print = h.print("x");

    let result = h.interpreter.execute(&print.id, "message_in").await;
    assert!(matches!(
        result.errors.as_slice(),
        [ExecutionError::InvalidSocketReference { .. }]
    ));

    let result = h.interpreter.execute("node_missing", "exec_out").await;
    assert!(!result.success);
    assert!(result.fired.is_empty());
}

#[tokio::test]
async fn test_unknown_type_in_imported_graph() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let print = h.print("x");
    h.connect(&start, "exec_out", &print, "exec_in");

    let mut graph = (*h.store.get_active_graph().unwrap()).clone();
    graph.id = "imported".into();
    if let Some(node) = graph.nodes.get_mut(&print.id) {
        node.node_type = "Vanished".into();
    }
    let graph_id = h.store.import_graph(graph).unwrap();

    let result = h
        .interpreter
        .execute_graph(&graph_id, &start.id, "exec_out", CancellationToken::new())
        .await;
    assert_eq!(
        result.errors,
        vec![ExecutionError::UnknownNodeType("Vanished".into())]
    );
}

#[tokio::test]
async fn test_entry_points_run_each_event() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let update = h.add("OnUpdate", &[]);
    let a = h.print("from start");
    let b = h.print("from update");
    h.connect(&start, "exec_out", &a, "exec_in");
    h.connect(&update, "exec_out", &b, "exec_in");

    let graph_id = h.store.active_graph_id().unwrap();
    let results = h
        .interpreter
        .execute_entry_points(&graph_id, CancellationToken::new())
        .await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success && r.nodes_fired == 1));
    let mut lines = h.log.lines();
    lines.sort();
    assert_eq!(lines, vec!["from start".to_string(), "from update".to_string()]);
}

#[tokio::test]
async fn test_run_reads_snapshot_taken_at_start() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let delay = h.add("Delay", &[("duration_in", json!(0.05))]);
    let print = h.print("original");
    h.connect(&start, "exec_out", &delay, "exec_in");
    h.connect(&delay, "completed_out", &print, "exec_in");

    let store = h.store.clone();
    let print_id = print.id.clone();
    let edit = async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.remove_node(&print_id).unwrap();
    };

    let (result, _) = tokio::join!(h.interpreter.execute(&start.id, "exec_out"), edit);

    assert!(result.success);
    assert_eq!(h.log.lines(), vec!["original".to_string()]);
    assert!(h.store.get_node(&print.id).is_none());
}

#[tokio::test]
async fn test_fast_chain_finishes_before_sibling_delay() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let delay = h.add("Delay", &[("duration_in", json!(0.2))]);
    let slow = h.print("slow");
    let a = h.print("a");
    let b = h.print("b");
    h.connect(&start, "exec_out", &delay, "exec_in");
    h.connect(&delay, "completed_out", &slow, "exec_in");
    h.connect(&start, "exec_out", &a, "exec_in");
    h.connect(&a, "exec_out", &b, "exec_in");

    let result = h.interpreter.execute(&start.id, "exec_out").await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(
        h.log.lines(),
        vec!["a".to_string(), "b".to_string(), "slow".to_string()]
    );
    assert_eq!(
        result.fired_ids(),
        vec![a.id.as_str(), b.id.as_str(), delay.id.as_str(), slow.id.as_str()]
    );
}

#[tokio::test]
async fn test_step_bound_fires_prefix_within_bound() {
    let h = harness_with(NodeRegistry::new(), 2);
    let start = h.add("OnStart", &[]);
    let prints: Vec<Node> = ["one", "two", "three"].iter().map(|m| h.print(m)).collect();
    for print in &prints {
        h.connect(&start, "exec_out", print, "exec_in");
    }

    let result = h.interpreter.execute(&start.id, "exec_out").await;

    assert!(!result.success);
    assert_eq!(result.errors, vec![ExecutionError::StepBoundExceeded(2)]);
    assert_eq!(result.nodes_fired, 2);
    assert_eq!(
        result.fired_ids(),
        vec![prints[0].id.as_str(), prints[1].id.as_str()]
    );
    assert_eq!(h.log.lines(), vec!["one".to_string(), "two".to_string()]);
}

#[tokio::test]
async fn test_exact_step_budget_succeeds() {
    let h = harness_with(NodeRegistry::new(), 2);
    let start = h.add("OnStart", &[]);
    let hello = h.print("Hello");
    let world = h.print("World");
    h.connect(&start, "exec_out", &hello, "exec_in");
    h.connect(&hello, "exec_out", &world, "exec_in");

    let result = h.interpreter.execute(&start.id, "exec_out").await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.nodes_fired, 2);
}

/// Event `Start` plus two printers whose messages come only from socket defaults
fn register_default_printers(registry: &NodeRegistry, sink: &PrintLog) {
    registry
        .register(
            NodeTemplate::new("Start", NodeKind::Event)
                .output(Socket::output("o", "Out", SocketType::Exec)),
            |_: &Node, _: Inputs| HandlerResult::ready(NodeOutput::continue_with("o")),
        )
        .unwrap();

    let log = sink.clone();
    registry
        .register(
            NodeTemplate::new("PrintA", NodeKind::Exec)
                .input(Socket::input("i", "In", SocketType::Exec))
                .input(
                    Socket::input("message", "Message", SocketType::String)
                        .required()
                        .with_default(json!("Hello")),
                )
                .output(Socket::output("o2", "Out", SocketType::Exec)),
            move |_: &Node, inputs: Inputs| {
                log.push(inputs.text("message").unwrap_or_default());
                HandlerResult::ready(NodeOutput::continue_with("o2"))
            },
        )
        .unwrap();

    let log = sink.clone();
    registry
        .register(
            NodeTemplate::new("PrintB", NodeKind::Exec)
                .input(Socket::input("i2", "In", SocketType::Exec))
                .input(
                    Socket::input("message", "Message", SocketType::String)
                        .required()
                        .with_default(json!("World")),
                ),
            move |_: &Node, inputs: Inputs| {
                log.push(inputs.text("message").unwrap_or_default());
                HandlerResult::ready(NodeOutput::stop())
            },
        )
        .unwrap();

    registry
        .register(
            NodeTemplate::new("DefaultBranch", NodeKind::Branch)
                .input(Socket::input("i", "In", SocketType::Exec))
                .input(Socket::input("condition", "Condition", SocketType::Bool).with_default(json!(true)))
                .output(Socket::output("trueOut", "True", SocketType::Exec))
                .output(Socket::output("falseOut", "False", SocketType::Exec)),
            |_: &Node, inputs: Inputs| {
                HandlerResult::ready(NodeOutput::branch(inputs.bool("condition").unwrap_or(false)))
            },
        )
        .unwrap();
}

#[tokio::test]
async fn test_socket_defaults_feed_hello_world() {
    let registry = NodeRegistry::new();
    let sink = PrintLog::default();
    register_default_printers(&registry, &sink);
    let h = harness_with(registry, 1_000);

    let start = h.add("Start", &[]);
    let print_a = h.add("PrintA", &[]);
    let print_b = h.add("PrintB", &[]);
    assert!(print_a.data.is_empty());
    h.connect(&start, "o", &print_a, "i");
    h.connect(&print_a, "o2", &print_b, "i2");

    let result = h.interpreter.execute(&start.id, "o").await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.fired_ids(), vec![print_a.id.as_str(), print_b.id.as_str()]);
    assert!(result.fired[1].continued_with.is_empty());
    assert_eq!(sink.lines(), vec!["Hello".to_string(), "World".to_string()]);
}

#[tokio::test]
async fn test_branch_condition_default_true_skips_false_chain() {
    let registry = NodeRegistry::new();
    let sink = PrintLog::default();
    register_default_printers(&registry, &sink);
    let h = harness_with(registry, 1_000);

    let start = h.add("Start", &[]);
    let branch = h.add("DefaultBranch", &[]);
    let print_b = h.add("PrintB", &[]);
    h.connect(&start, "o", &branch, "i");
    h.connect(&branch, "falseOut", &print_b, "i2");

    let result = h.interpreter.execute(&start.id, "o").await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.fired_ids(), vec![branch.id.as_str()]);
    assert_eq!(result.fired[0].continued_with, vec!["trueOut".to_string()]);
    assert!(sink.lines().is_empty());
}

#[tokio::test]
async fn test_sequence_runs_outputs_in_order() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let sequence = h.add("Sequence", &[]);
    let first = h.print("then 0");
    let third = h.print("then 2");
    h.connect(&start, "exec_out", &sequence, "exec_in");
    h.connect(&sequence, "then2_out", &third, "exec_in");
    h.connect(&sequence, "then0_out", &first, "exec_in");

    let result = h.interpreter.execute(&start.id, "exec_out").await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(
        result.fired[0].continued_with,
        vec!["then0_out".to_string(), "then1_out".to_string(), "then2_out".to_string()]
    );
    assert_eq!(h.log.lines(), vec!["then 0".to_string(), "then 2".to_string()]);
}

/// Exec node recording the raw values reaching its Float and Object inputs
fn register_capture(registry: &NodeRegistry, seen: Arc<Mutex<Vec<Value>>>) {
    registry
        .register(
            NodeTemplate::new("Capture", NodeKind::Exec)
                .input(Socket::input("exec_in", "Exec", SocketType::Exec))
                .input(Socket::input("float_in", "Float", SocketType::Float))
                .input(Socket::input("object_in", "Object", SocketType::Object)),
            move |_: &Node, inputs: Inputs| {
                let mut seen = seen.lock().unwrap();
                seen.push(inputs.get("float_in").cloned().unwrap_or(Value::Null));
                seen.push(inputs.get("object_in").cloned().unwrap_or(Value::Null));
                HandlerResult::ready(NodeOutput::stop())
            },
        )
        .unwrap();
}

#[tokio::test]
async fn test_constants_coerce_across_connections() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = NodeRegistry::new();
    register_capture(&registry, seen.clone());
    let h = harness_with(registry, 1_000);

    let start = h.add("OnStart", &[]);
    let int = h.add("IntConstant", &[("value", json!(7))]);
    let vector = h.add("Vector3Constant", &[("value", json!({ "x": 1.0, "y": 2.0, "z": 3.0 }))]);
    let scale = h.add("VectorScale", &[("scale_in", json!(2.0))]);
    let capture = h.add("Capture", &[]);
    h.connect(&start, "exec_out", &capture, "exec_in");
    h.connect(&int, "value_out", &capture, "float_in");
    h.connect(&vector, "value_out", &scale, "vector_in");
    h.connect(&scale, "result_out", &capture, "object_in");

    let result = h.interpreter.execute(&start.id, "exec_out").await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![json!(7.0), json!({ "x": 2.0, "y": 4.0, "z": 6.0 })]
    );
}

#[tokio::test]
async fn test_int_constant_feeds_float_math() {
    let h = harness();
    let start = h.add("OnStart", &[]);
    let int = h.add("IntConstant", &[("value", json!(7))]);
    let add = h.add("Add", &[("b_in", json!(0.5))]);
    let print = h.add("Print", &[]);
    h.connect(&int, "value_out", &add, "a_in");
    h.connect(&add, "result_out", &print, "message_in");
    h.connect(&start, "exec_out", &print, "exec_in");

    let result = h.interpreter.execute(&start.id, "exec_out").await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(h.log.lines(), vec!["7.5".to_string()]);
}
