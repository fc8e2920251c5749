/// Node execution and on-demand data resolution
///
/// Resolves a node's data inputs by pulling values through incoming connections,
/// then dispatches to the registered handler for the node's type. Data nodes are
/// evaluated each time a consumer asks for one of their outputs; nothing is cached
/// across asks. Resolution tracks the chain of data nodes currently being evaluated
/// so circular dependencies fail with `DataCycle` instead of recursing forever.

use crate::error::ExecutionError;
use crate::graph::types::{Graph, Node, NodeId, NodeKind, Socket, ValueMap};
use crate::registry::{Inputs, NodeOutput, NodeRegistry};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

type ExecResult<T> = std::result::Result<T, ExecutionError>;

/// State shared by every chain of one `execute` call
#[derive(Debug)]
pub struct RunContext {
    /// Immutable snapshot the whole run reads from
    pub graph: Arc<Graph>,
    pub cancel: CancellationToken,
    /// Output values of exec nodes from their latest firing in this run
    recorded: Mutex<HashMap<NodeId, ValueMap>>,
}

impl RunContext {
    pub fn new(graph: Arc<Graph>, cancel: CancellationToken) -> Self {
        Self {
            graph,
            cancel,
            recorded: Mutex::new(HashMap::new()),
        }
    }

    fn record(&self, node_id: &str, values: ValueMap) {
        let mut recorded = self.recorded.lock().unwrap_or_else(|p| p.into_inner());
        recorded.insert(node_id.to_string(), values);
    }

    fn recorded_value(&self, node_id: &str, socket_id: &str) -> Option<Value> {
        let recorded = self.recorded.lock().unwrap_or_else(|p| p.into_inner());
        recorded.get(node_id).and_then(|values| values.get(socket_id)).cloned()
    }
}

/// Executes single nodes against the handlers in a `NodeRegistry`
#[derive(Debug)]
pub struct NodeExecutor {
    registry: Arc<NodeRegistry>,
    /// Upper bound on nested data evaluations below one consumer
    max_data_depth: usize,
}

impl NodeExecutor {
    pub fn new(registry: Arc<NodeRegistry>, max_data_depth: usize) -> Self {
        Self {
            registry,
            max_data_depth,
        }
    }

    /// Resolve inputs, invoke the handler, and record the outputs of an exec-capable node
    pub async fn fire(&self, ctx: &RunContext, node: &Node) -> ExecResult<NodeOutput> {
        let inputs = self.resolve_inputs(ctx, node, Vec::new()).await?;
        tracing::debug!("📥 Inputs for '{}': {:?}", node.id, inputs);

        let output = self.invoke(node, inputs).await?;
        ctx.record(&node.id, output.values.clone());
        Ok(output)
    }

    /// Pull the value of one output socket of a data node
    pub async fn resolve_output(
        &self,
        ctx: &RunContext,
        node: &Node,
        socket_id: &str,
    ) -> ExecResult<Value> {
        if node.output(socket_id).is_none() {
            return Err(ExecutionError::InvalidSocketReference {
                node: node.id.clone(),
                socket: socket_id.to_string(),
            });
        }
        self.evaluate_data(ctx, node, socket_id, Vec::new()).await
    }

    async fn invoke(&self, node: &Node, inputs: ValueMap) -> ExecResult<NodeOutput> {
        let definition = self
            .registry
            .get(&node.node_type)
            .ok_or_else(|| ExecutionError::UnknownNodeType(node.node_type.clone()))?;

        definition
            .handler
            .call(node, Inputs::new(inputs))
            .resolve()
            .await
            .map_err(|message| ExecutionError::HandlerFailed {
                node: node.id.clone(),
                message,
            })
    }

    /// Resolve every data input of `node`; `stack` holds the data nodes being evaluated
    fn resolve_inputs<'a>(
        &'a self,
        ctx: &'a RunContext,
        node: &'a Node,
        stack: Vec<NodeId>,
    ) -> BoxFuture<'a, ExecResult<ValueMap>> {
        async move {
            let mut values = ValueMap::new();
            for socket in node.data_inputs() {
                let value = self.resolve_input(ctx, node, socket, stack.clone()).await?;
                values.insert(socket.id.clone(), value);
            }
            Ok(values)
        }
        .boxed()
    }

    async fn resolve_input(
        &self,
        ctx: &RunContext,
        node: &Node,
        socket: &Socket,
        stack: Vec<NodeId>,
    ) -> ExecResult<Value> {
        let Some(link) = ctx.graph.incoming(&node.id, &socket.id) else {
            return literal_or_default(node, socket);
        };

        let dangling = || ExecutionError::InvalidSocketReference {
            node: link.from_node.clone(),
            socket: link.from_socket.clone(),
        };
        let producer = ctx.graph.node(&link.from_node).ok_or_else(dangling)?;
        let produced_as = producer.output(&link.from_socket).ok_or_else(dangling)?.socket_type;

        let value = match producer.kind {
            NodeKind::Data => self.evaluate_data(ctx, producer, &link.from_socket, stack).await?,
            _ => match ctx.recorded_value(&producer.id, &link.from_socket) {
                Some(value) => value,
                // Producer has not fired yet in this run
                None => return literal_or_default(node, socket),
            },
        };

        Ok(produced_as.coerce(socket.socket_type, value))
    }

    fn evaluate_data<'a>(
        &'a self,
        ctx: &'a RunContext,
        node: &'a Node,
        socket_id: &'a str,
        mut stack: Vec<NodeId>,
    ) -> BoxFuture<'a, ExecResult<Value>> {
        async move {
            if let Some(pos) = stack.iter().position(|id| *id == node.id) {
                let mut path = stack.split_off(pos);
                path.push(node.id.clone());
                return Err(ExecutionError::DataCycle { path });
            }
            if stack.len() >= self.max_data_depth {
                return Err(ExecutionError::DataDepthExceeded(self.max_data_depth));
            }
            if ctx.cancel.is_cancelled() {
                return Err(ExecutionError::Cancelled);
            }

            stack.push(node.id.clone());
            let inputs = self.resolve_inputs(ctx, node, stack).await?;
            let mut output = self.invoke(node, inputs).await?;

            let value = output
                .values
                .remove(socket_id)
                .or_else(|| node.output(socket_id).and_then(|s| s.default_value.clone()))
                .unwrap_or(Value::Null);

            tracing::debug!("🧮 Data node '{}'.{} = {}", node.id, socket_id, value);
            Ok(value)
        }
        .boxed()
    }
}

/// Value for an unconnected input: authored literal, then socket default
fn literal_or_default(node: &Node, socket: &Socket) -> ExecResult<Value> {
    if let Some(value) = node.data.get(&socket.id) {
        return Ok(value.clone());
    }
    if let Some(value) = &socket.default_value {
        return Ok(value.clone());
    }
    if socket.required {
        return Err(ExecutionError::MissingRequiredInput {
            node: node.id.clone(),
            socket: socket.id.clone(),
        });
    }
    Ok(Value::Null)
}
