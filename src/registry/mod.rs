/// Hot-reload node registry using ArcSwap
///
/// Maps a node `type` string to its behavior descriptor: the socket template used by
/// `GraphStore::add_node` and the execution handler the interpreter calls. Every
/// registration swaps the whole map atomically, so in-flight executions keep the
/// definitions they started with.

use crate::error::{GraphError, Result};
use crate::graph::types::{new_id, Node, NodeKind, Position, Socket, SocketId, SocketType, ValueMap};
use arc_swap::ArcSwap;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

// Built-in node behaviors (Branch, Print, Add, ...)
pub mod library;

/// Where execution continues after an exec-capable node fires
#[derive(Debug, Clone, PartialEq)]
pub enum Next {
    /// Continue from the named exec output
    Continue(SocketId),
    /// Branch nodes: first exec output when true, second when false
    Branch(bool),
    /// Continue from every exec output, in declaration order
    All,
    /// Terminate this chain
    Stop,
}

/// Values and continuation produced by one handler call
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutput {
    /// Output values keyed by output socket id
    pub values: ValueMap,
    pub next: Next,
}

impl NodeOutput {
    /// Pure data result with no continuation
    pub fn data(values: ValueMap) -> Self {
        Self {
            values,
            next: Next::Stop,
        }
    }

    pub fn continue_with(socket: impl Into<String>) -> Self {
        Self {
            values: ValueMap::new(),
            next: Next::Continue(socket.into()),
        }
    }

    pub fn branch(condition: bool) -> Self {
        Self {
            values: ValueMap::new(),
            next: Next::Branch(condition),
        }
    }

    pub fn stop() -> Self {
        Self::data(ValueMap::new())
    }

    /// Fire every exec output, as a Sequence node does
    pub fn sequence() -> Self {
        Self {
            values: ValueMap::new(),
            next: Next::All,
        }
    }

    pub fn with_value(mut self, socket: impl Into<String>, value: Value) -> Self {
        self.values.insert(socket.into(), value);
        self
    }
}

pub type HandlerFuture = BoxFuture<'static, std::result::Result<NodeOutput, String>>;

/// Either an immediate outcome or a computation the interpreter must await
pub enum HandlerResult {
    Ready(std::result::Result<NodeOutput, String>),
    Pending(HandlerFuture),
}

impl HandlerResult {
    pub fn ready(output: NodeOutput) -> Self {
        HandlerResult::Ready(Ok(output))
    }

    pub fn failed(message: impl Into<String>) -> Self {
        HandlerResult::Ready(Err(message.into()))
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = std::result::Result<NodeOutput, String>> + Send + 'static,
    {
        HandlerResult::Pending(Box::pin(future))
    }

    /// Drive the result to completion, suspending only when it is pending
    pub async fn resolve(self) -> std::result::Result<NodeOutput, String> {
        match self {
            HandlerResult::Ready(result) => result,
            HandlerResult::Pending(future) => future.await,
        }
    }
}

/// Resolved input values handed to a handler, keyed by input socket id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs(ValueMap);

impl Inputs {
    pub fn new(values: ValueMap) -> Self {
        Self(values)
    }

    pub fn get(&self, socket: &str) -> Option<&Value> {
        self.0.get(socket).filter(|v| !v.is_null())
    }

    pub fn f64(&self, socket: &str) -> Option<f64> {
        self.get(socket).and_then(Value::as_f64)
    }

    pub fn bool(&self, socket: &str) -> Option<bool> {
        self.get(socket).and_then(Value::as_bool)
    }

    /// String view; non-string scalars are rendered as text
    pub fn text(&self, socket: &str) -> Option<String> {
        self.get(socket).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn into_inner(self) -> ValueMap {
        self.0
    }
}

/// Execution contract every node behavior satisfies
///
/// Event handlers are never invoked by the walk. Exec handlers return
/// `Next::Continue`, `Next::All` or `Next::Stop`, Branch handlers `Next::Branch`
/// or `Next::Stop`, and Data handlers only `values`. The interpreter rejects any
/// other pairing.
pub trait NodeHandler: Send + Sync {
    fn call(&self, node: &Node, inputs: Inputs) -> HandlerResult;
}

impl<F> NodeHandler for F
where
    F: Fn(&Node, Inputs) -> HandlerResult + Send + Sync,
{
    fn call(&self, node: &Node, inputs: Inputs) -> HandlerResult {
        self(node, inputs)
    }
}

/// Socket layout and palette metadata for one node type
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTemplate {
    pub node_type: String,
    pub kind: NodeKind,
    pub title: String,
    pub category: String,
    pub description: String,
    pub inputs: Vec<Socket>,
    pub outputs: Vec<Socket>,
    /// Literals copied into `node.data` when the node is created
    pub default_data: ValueMap,
}

impl NodeTemplate {
    pub fn new(node_type: impl Into<String>, kind: NodeKind) -> Self {
        let node_type = node_type.into();
        Self {
            title: node_type.clone(),
            node_type,
            kind,
            category: "General".to_string(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            default_data: ValueMap::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn input(mut self, socket: Socket) -> Self {
        self.inputs.push(socket);
        self
    }

    pub fn output(mut self, socket: Socket) -> Self {
        self.outputs.push(socket);
        self
    }

    pub fn default_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.default_data.insert(key.into(), value);
        self
    }

    /// Check the socket layout against what the node kind allows
    pub fn validate(&self) -> Result<()> {
        check_layout(&self.node_type, self.kind, &self.inputs, &self.outputs)
    }

    /// Create a node with a fresh id from this template
    ///
    /// `data` entries override the template's default literals.
    pub fn instantiate(&self, position: Position, data: Option<ValueMap>) -> Node {
        let mut literals = self.default_data.clone();
        if let Some(data) = data {
            literals.extend(data);
        }

        Node {
            id: new_id("node"),
            node_type: self.node_type.clone(),
            kind: self.kind,
            title: self.title.clone(),
            position,
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            data: literals,
        }
    }
}

/// Socket layout rules shared by template registration and graph import
///
/// Socket ids are unique per direction. Event nodes take no inputs, Data nodes
/// carry no exec sockets, and Branch nodes have exactly two exec outputs plus a
/// Bool condition input.
pub(crate) fn check_layout(
    node_type: &str,
    kind: NodeKind,
    inputs: &[Socket],
    outputs: &[Socket],
) -> Result<()> {
    let invalid = |reason: &str| GraphError::InvalidTemplate {
        node_type: node_type.to_string(),
        reason: reason.to_string(),
    };

    for (label, sockets) in [("input", inputs), ("output", outputs)] {
        let mut seen = HashSet::new();
        for socket in sockets {
            if !seen.insert(socket.id.as_str()) {
                return Err(invalid(&format!("duplicate {} socket id '{}'", label, socket.id)));
            }
        }
    }

    let exec_inputs = inputs.iter().filter(|s| s.socket_type.is_exec()).count();
    let exec_outputs = outputs.iter().filter(|s| s.socket_type.is_exec()).count();

    match kind {
        NodeKind::Event if !inputs.is_empty() => Err(invalid("event nodes take no inputs")),
        NodeKind::Data if exec_inputs + exec_outputs > 0 => {
            Err(invalid("data nodes cannot carry exec sockets"))
        }
        NodeKind::Branch if exec_outputs != 2 => {
            Err(invalid("branch nodes need exactly two exec outputs (true, false)"))
        }
        NodeKind::Branch if !inputs.iter().any(|s| s.socket_type == SocketType::Bool) => {
            Err(invalid("branch nodes need a bool condition input"))
        }
        _ => Ok(()),
    }
}

/// Registered behavior for one node type
pub struct NodeDefinition {
    pub template: NodeTemplate,
    pub handler: Arc<dyn NodeHandler>,
}

impl std::fmt::Debug for NodeDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeDefinition")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

/// Lock-free registry of node behaviors
///
/// Uses ArcSwap to provide atomic pointer swapping for the definition map.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    /// Key: node type string, Value: definition
    definitions: ArcSwap<HashMap<String, Arc<NodeDefinition>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in node library
    pub fn with_builtins() -> Result<(Self, library::PrintLog)> {
        let registry = Self::new();
        let log = library::register_builtins(&registry)?;
        Ok((registry, log))
    }

    /// Register or replace a node type
    pub fn register<H>(&self, template: NodeTemplate, handler: H) -> Result<()>
    where
        H: NodeHandler + 'static,
    {
        template.validate()?;

        let node_type = template.node_type.clone();
        let definition = Arc::new(NodeDefinition {
            template,
            handler: Arc::new(handler),
        });

        // Clone current map and update it, then swap atomically
        self.definitions.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(node_type.clone(), Arc::clone(&definition));
            next
        });

        tracing::debug!("🧩 Registered node type: {}", node_type);
        Ok(())
    }

    pub fn unregister(&self, node_type: &str) -> bool {
        let mut removed = false;
        self.definitions.rcu(|current| {
            let mut next = (**current).clone();
            removed = next.remove(node_type).is_some();
            next
        });
        if removed {
            tracing::debug!("🗑️ Unregistered node type: {}", node_type);
        }
        removed
    }

    pub fn get(&self, node_type: &str) -> Option<Arc<NodeDefinition>> {
        self.definitions.load().get(node_type).cloned()
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.definitions.load().contains_key(node_type)
    }

    /// All definitions sorted by type name
    pub fn all(&self) -> Vec<Arc<NodeDefinition>> {
        let mut all: Vec<_> = self.definitions.load().values().cloned().collect();
        all.sort_by(|a, b| a.template.node_type.cmp(&b.template.node_type));
        all
    }

    pub fn by_category(&self, category: &str) -> Vec<Arc<NodeDefinition>> {
        self.all()
            .into_iter()
            .filter(|d| d.template.category == category)
            .collect()
    }

    /// Case-insensitive search over type, title, description, and category
    pub fn search(&self, query: &str) -> Vec<Arc<NodeDefinition>> {
        let query = query.to_lowercase();
        self.all()
            .into_iter()
            .filter(|d| {
                let t = &d.template;
                [&t.node_type, &t.title, &t.description, &t.category]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&query))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
