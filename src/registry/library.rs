/// Built-in node library
///
/// Flow control, printing, constant, math, and logic nodes an embedding application can
/// register instead of (or next to) its own behaviors. Socket ids follow the
/// `<name>_in` / `<name>_out` convention used by the editor palette.

use super::{HandlerResult, Inputs, NodeOutput, NodeRegistry, NodeTemplate};
use crate::error::Result;
use crate::graph::types::{Node, NodeKind, Socket, SocketType};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared sink collecting every message a `Print` node emits
#[derive(Debug, Clone, Default)]
pub struct PrintLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl PrintLog {
    pub fn push(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        lines.push(line.into());
    }

    /// Snapshot of the messages printed so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

fn exec_in() -> Socket {
    Socket::input("exec_in", "Exec", SocketType::Exec)
}

fn exec_out(id: &str, name: &str) -> Socket {
    Socket::output(id, name, SocketType::Exec)
}

fn float_in(id: &str, name: &str, default: f64) -> Socket {
    Socket::input(id, name, SocketType::Float)
        .required()
        .with_default(json!(default))
}

fn float_value(result: f64) -> std::result::Result<Value, String> {
    serde_json::Number::from_f64(result)
        .map(Value::Number)
        .ok_or_else(|| format!("non-finite result: {}", result))
}

fn vec3(value: Option<&Value>) -> [f64; 3] {
    let axis = |name: &str| {
        value
            .and_then(|v| v.get(name))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    };
    [axis("x"), axis("y"), axis("z")]
}

fn vec3_value([x, y, z]: [f64; 3]) -> Value {
    json!({ "x": x, "y": y, "z": z })
}

fn zero_vec3() -> Value {
    vec3_value([0.0, 0.0, 0.0])
}

/// Register a Data node with no inputs that emits its `value` literal
fn register_constant<F>(
    registry: &NodeRegistry,
    node_type: &str,
    title: &str,
    socket_type: SocketType,
    default: Value,
    normalize: F,
) -> Result<()>
where
    F: Fn(&Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
{
    registry.register(
        NodeTemplate::new(node_type, NodeKind::Data)
            .title(title)
            .category("Constants")
            .description(format!("{} constant value", title))
            .output(Socket::output("value_out", "Value", socket_type))
            .default_data("value", default.clone()),
        move |node: &Node, _: Inputs| {
            let raw = node.data.get("value").unwrap_or(&default);
            match normalize(raw) {
                Ok(value) => HandlerResult::ready(NodeOutput::stop().with_value("value_out", value)),
                Err(e) => HandlerResult::failed(format!("{}: {}", node.id, e)),
            }
        },
    )
}

/// Register a binary Float -> Float math node
fn register_math<F>(
    registry: &NodeRegistry,
    node_type: &str,
    description: &str,
    identity: f64,
    op: F,
) -> Result<()>
where
    F: Fn(f64, f64) -> std::result::Result<f64, String> + Send + Sync + 'static,
{
    registry.register(
        NodeTemplate::new(node_type, NodeKind::Data)
            .category("Math")
            .description(description)
            .input(float_in("a_in", "A", identity))
            .input(float_in("b_in", "B", identity))
            .output(Socket::output("result_out", "Result", SocketType::Float)),
        move |_: &Node, inputs: Inputs| {
            let a = inputs.f64("a_in").unwrap_or(identity);
            let b = inputs.f64("b_in").unwrap_or(identity);
            match op(a, b).and_then(float_value) {
                Ok(value) => HandlerResult::ready(NodeOutput::stop().with_value("result_out", value)),
                Err(e) => HandlerResult::failed(e),
            }
        },
    )
}

/// Register every built-in node and return the sink `Print` nodes write to
pub fn register_builtins(registry: &NodeRegistry) -> Result<PrintLog> {
    let log = PrintLog::default();

    // Events
    for (node_type, title, description) in [
        ("OnStart", "On Start", "Called once when the graph starts"),
        ("OnUpdate", "On Update", "Called every frame"),
    ] {
        registry.register(
            NodeTemplate::new(node_type, NodeKind::Event)
                .title(title)
                .category("Events")
                .description(description)
                .output(exec_out("exec_out", "Exec")),
            |_: &Node, _: Inputs| HandlerResult::ready(NodeOutput::continue_with("exec_out")),
        )?;
    }

    // Flow control
    registry.register(
        NodeTemplate::new("Branch", NodeKind::Branch)
            .category("Flow")
            .description("Conditional execution based on boolean value")
            .input(exec_in())
            .input(Socket::input("condition_in", "Condition", SocketType::Bool).required())
            .output(exec_out("true_out", "True"))
            .output(exec_out("false_out", "False")),
        |_: &Node, inputs: Inputs| {
            HandlerResult::ready(NodeOutput::branch(inputs.bool("condition_in").unwrap_or(false)))
        },
    )?;

    registry.register(
        NodeTemplate::new("Delay", NodeKind::Exec)
            .category("Flow")
            .description("Wait for specified seconds")
            .input(exec_in())
            .input(float_in("duration_in", "Duration", 1.0))
            .output(exec_out("completed_out", "Completed")),
        |node: &Node, inputs: Inputs| {
            let seconds = inputs.f64("duration_in").unwrap_or(1.0).max(0.0);
            let node_id = node.id.clone();
            HandlerResult::pending(async move {
                tracing::debug!("⏳ Delay node {} sleeping {}s", node_id, seconds);
                tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
                Ok(NodeOutput::continue_with("completed_out"))
            })
        },
    )?;

    registry.register(
        NodeTemplate::new("Sequence", NodeKind::Exec)
            .category("Flow")
            .description("Execute multiple outputs in sequence")
            .input(exec_in())
            .output(exec_out("then0_out", "Then 0"))
            .output(exec_out("then1_out", "Then 1"))
            .output(exec_out("then2_out", "Then 2")),
        |_: &Node, _: Inputs| HandlerResult::ready(NodeOutput::sequence()),
    )?;

    // Debug
    let sink = log.clone();
    registry.register(
        NodeTemplate::new("Print", NodeKind::Exec)
            .title("Print String")
            .category("Debug")
            .description("Print a message to the log")
            .input(exec_in())
            .input(Socket::input("message_in", "Message", SocketType::String).required())
            .output(exec_out("exec_out", "Exec")),
        move |node: &Node, inputs: Inputs| {
            let message = inputs.text("message_in").unwrap_or_default();
            tracing::info!("🖨️ [{}] {}", node.id, message);
            sink.push(message);
            HandlerResult::ready(NodeOutput::continue_with("exec_out"))
        },
    )?;

    // Math
    register_math(registry, "Add", "Add two numbers", 0.0, |a, b| Ok(a + b))?;
    register_math(registry, "Subtract", "Subtract B from A", 0.0, |a, b| Ok(a - b))?;
    register_math(registry, "Multiply", "Multiply two numbers", 1.0, |a, b| Ok(a * b))?;
    register_math(registry, "Divide", "Divide A by B", 1.0, |a, b| {
        if b == 0.0 {
            Err("division by zero".to_string())
        } else {
            Ok(a / b)
        }
    })?;

    register_math(registry, "Modulo", "Calculate remainder after division", 1.0, |a, b| {
        if b == 0.0 {
            Err("modulo by zero".to_string())
        } else {
            Ok(a % b)
        }
    })?;

    registry.register(
        NodeTemplate::new("Lerp", NodeKind::Data)
            .category("Math")
            .description("Linear interpolation between two values")
            .input(float_in("a_in", "A", 0.0))
            .input(float_in("b_in", "B", 1.0))
            .input(float_in("t_in", "Alpha", 0.5))
            .output(Socket::output("result_out", "Result", SocketType::Float)),
        |_: &Node, inputs: Inputs| {
            let a = inputs.f64("a_in").unwrap_or(0.0);
            let b = inputs.f64("b_in").unwrap_or(1.0);
            let t = inputs.f64("t_in").unwrap_or(0.5);
            match float_value(a + (b - a) * t) {
                Ok(value) => HandlerResult::ready(NodeOutput::stop().with_value("result_out", value)),
                Err(e) => HandlerResult::failed(e),
            }
        },
    )?;

    // Vector math
    registry.register(
        NodeTemplate::new("VectorAdd", NodeKind::Data)
            .title("Vector Add")
            .category("Vector")
            .description("Add two Vector3 values")
            .input(Socket::input("a_in", "A", SocketType::Vector3).with_default(zero_vec3()))
            .input(Socket::input("b_in", "B", SocketType::Vector3).with_default(zero_vec3()))
            .output(Socket::output("result_out", "Result", SocketType::Vector3)),
        |_: &Node, inputs: Inputs| {
            let [ax, ay, az] = vec3(inputs.get("a_in"));
            let [bx, by, bz] = vec3(inputs.get("b_in"));
            let sum = vec3_value([ax + bx, ay + by, az + bz]);
            HandlerResult::ready(NodeOutput::stop().with_value("result_out", sum))
        },
    )?;

    registry.register(
        NodeTemplate::new("VectorScale", NodeKind::Data)
            .title("Vector Scale")
            .category("Vector")
            .description("Multiply vector by scalar")
            .input(Socket::input("vector_in", "Vector", SocketType::Vector3).with_default(zero_vec3()))
            .input(float_in("scale_in", "Scale", 1.0))
            .output(Socket::output("result_out", "Result", SocketType::Vector3)),
        |_: &Node, inputs: Inputs| {
            let [x, y, z] = vec3(inputs.get("vector_in"));
            let k = inputs.f64("scale_in").unwrap_or(1.0);
            HandlerResult::ready(NodeOutput::stop().with_value("result_out", vec3_value([x * k, y * k, z * k])))
        },
    )?;

    // Constants
    register_constant(registry, "FloatConstant", "Float", SocketType::Float, json!(0.0), |v| {
        v.as_f64().ok_or_else(|| format!("not a number: {}", v)).and_then(float_value)
    })?;
    register_constant(registry, "IntConstant", "Int", SocketType::Int, json!(0), |v| {
        v.as_i64()
            .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .map(|i| json!(i))
            .ok_or_else(|| format!("not an integer: {}", v))
    })?;
    register_constant(registry, "StringConstant", "String", SocketType::String, json!(""), |v| {
        Ok(match v {
            Value::String(_) => v.clone(),
            other => Value::String(other.to_string()),
        })
    })?;
    register_constant(registry, "BoolConstant", "Bool", SocketType::Bool, json!(false), |v| {
        v.as_bool().map(Value::Bool).ok_or_else(|| format!("not a bool: {}", v))
    })?;
    register_constant(registry, "Vector3Constant", "Vector3", SocketType::Vector3, zero_vec3(), |v| {
        Ok(vec3_value(vec3(Some(v))))
    })?;

    // Logic
    registry.register(
        NodeTemplate::new("Equal", NodeKind::Data)
            .category("Logic")
            .description("True when A equals B")
            .input(float_in("a_in", "A", 0.0))
            .input(float_in("b_in", "B", 0.0))
            .output(Socket::output("result_out", "Result", SocketType::Bool)),
        |_: &Node, inputs: Inputs| {
            let equal = inputs.get("a_in") == inputs.get("b_in");
            HandlerResult::ready(NodeOutput::stop().with_value("result_out", json!(equal)))
        },
    )?;

    registry.register(
        NodeTemplate::new("Compare", NodeKind::Data)
            .category("Logic")
            .description("Compare two values (greater than, less than, equal)")
            .input(float_in("a_in", "A", 0.0))
            .input(float_in("b_in", "B", 0.0))
            .input(
                Socket::input("op_in", "Operation", SocketType::String)
                    .required()
                    .with_default(json!("Equal")),
            )
            .output(Socket::output("result_out", "Result", SocketType::Bool)),
        |_: &Node, inputs: Inputs| {
            let a = inputs.f64("a_in").unwrap_or(0.0);
            let b = inputs.f64("b_in").unwrap_or(0.0);
            let op = inputs.text("op_in").unwrap_or_else(|| "Equal".to_string());
            let result = match op.as_str() {
                "Equal" => a == b,
                "NotEqual" => a != b,
                "Greater" => a > b,
                "GreaterEqual" => a >= b,
                "Less" => a < b,
                "LessEqual" => a <= b,
                other => return HandlerResult::failed(format!("unknown comparison '{}'", other)),
            };
            HandlerResult::ready(NodeOutput::stop().with_value("result_out", json!(result)))
        },
    )?;

    registry.register(
        NodeTemplate::new("Clamp", NodeKind::Data)
            .category("Logic")
            .description("Clamp value between min and max")
            .input(Socket::input("value_in", "Value", SocketType::Float).required())
            .input(float_in("min_in", "Min", 0.0))
            .input(float_in("max_in", "Max", 1.0))
            .output(Socket::output("result_out", "Result", SocketType::Float)),
        |_: &Node, inputs: Inputs| {
            let value = inputs.f64("value_in").unwrap_or(0.0);
            let min = inputs.f64("min_in").unwrap_or(0.0);
            let max = inputs.f64("max_in").unwrap_or(1.0);
            if min > max {
                return HandlerResult::failed(format!("clamp range is empty: {} > {}", min, max));
            }
            match float_value(value.max(min).min(max)) {
                Ok(v) => HandlerResult::ready(NodeOutput::stop().with_value("result_out", v)),
                Err(e) => HandlerResult::failed(e),
            }
        },
    )?;

    tracing::info!("📚 Registered {} built-in node types", registry.len());
    Ok(log)
}
