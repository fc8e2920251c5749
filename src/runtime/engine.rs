/// Blueprint interpreter
///
/// Walks exec connections outward from a start socket, firing each reached node
/// through the `NodeExecutor`. Every fan-out chain advances on its own: a firing's
/// continuations are queued the moment it completes, so a suspended handler holds
/// back only its own chain. Firings that are ready together complete in the order
/// they were queued, which for synchronous handlers is breadth-first in connection
/// order. Each call reads a single immutable snapshot of the graph, so edits made
/// while a run is in flight only affect later runs.

use crate::config::EngineConfig;
use crate::error::ExecutionError;
use crate::graph::store::GraphStore;
use crate::graph::types::{GraphId, Node, NodeId, NodeKind, SocketId};
use crate::registry::Next;
use crate::runtime::analysis;
use crate::runtime::executor::{NodeExecutor, RunContext};
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// One node firing, in completion order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiredNode {
    pub node_id: NodeId,
    pub node_type: String,
    /// 1-based position in the run's step count
    pub step: usize,
    /// Exec outputs the node continued through, in declaration order
    pub continued_with: Vec<SocketId>,
}

/// Outcome of one `execute` call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub graph_id: GraphId,
    pub success: bool,
    pub errors: Vec<ExecutionError>,
    pub nodes_fired: usize,
    pub fired: Vec<FiredNode>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl ExecutionResult {
    fn new(graph_id: &str) -> Self {
        Self {
            graph_id: graph_id.to_string(),
            success: true,
            errors: Vec::new(),
            nodes_fired: 0,
            fired: Vec::new(),
            cancelled: false,
            elapsed: Duration::ZERO,
        }
    }

    fn fail(mut self, error: ExecutionError) -> Self {
        self.errors.push(error);
        self
    }

    fn finish(mut self, started: Instant) -> Self {
        self.nodes_fired = self.fired.len();
        self.cancelled = self.errors.iter().any(|e| *e == ExecutionError::Cancelled);
        self.success = self.errors.is_empty();
        self.elapsed = started.elapsed();
        self
    }

    /// Node ids in firing order
    pub fn fired_ids(&self) -> Vec<&str> {
        self.fired.iter().map(|f| f.node_id.as_str()).collect()
    }
}

/// A node firing waiting to run
struct Firing {
    node_id: NodeId,
    step: usize,
}

/// Executes graphs held by a `GraphStore`
#[derive(Debug)]
pub struct Interpreter {
    store: Arc<GraphStore>,
    executor: NodeExecutor,
    max_steps: usize,
}

impl Interpreter {
    pub fn new(store: Arc<GraphStore>, config: &EngineConfig) -> Self {
        let executor = NodeExecutor::new(store.registry().clone(), config.max_data_depth);
        Self {
            store,
            executor,
            max_steps: config.max_steps,
        }
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    /// Run the active graph from `start_node`'s exec output `start_socket`
    pub async fn execute(&self, start_node: &str, start_socket: &str) -> ExecutionResult {
        self.execute_with_cancel(start_node, start_socket, CancellationToken::new())
            .await
    }

    pub async fn execute_with_cancel(
        &self,
        start_node: &str,
        start_socket: &str,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        match self.store.active_graph_id() {
            Some(graph_id) => {
                self.execute_graph(&graph_id, start_node, start_socket, cancel)
                    .await
            }
            None => {
                tracing::warn!("⚠️ Execute called with no active graph");
                ExecutionResult::new("")
                    .fail(ExecutionError::GraphNotFound("<active>".into()))
                    .finish(Instant::now())
            }
        }
    }

    /// Run a specific graph; the snapshot is taken once, at the start of the call
    pub async fn execute_graph(
        &self,
        graph_id: &str,
        start_node: &str,
        start_socket: &str,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        let started = Instant::now();
        let result = ExecutionResult::new(graph_id);

        let Some(graph) = self.store.get_graph(graph_id) else {
            return result
                .fail(ExecutionError::GraphNotFound(graph_id.to_string()))
                .finish(started);
        };

        let start_is_exec_output = graph
            .node(start_node)
            .and_then(|node| node.output(start_socket))
            .is_some_and(|socket| socket.socket_type.is_exec());
        if !start_is_exec_output {
            tracing::warn!("⚠️ Invalid start socket {}.{}", start_node, start_socket);
            return result
                .fail(ExecutionError::InvalidSocketReference {
                    node: start_node.to_string(),
                    socket: start_socket.to_string(),
                })
                .finish(started);
        }

        tracing::info!(
            "🚀 Starting execution of '{}' from {}.{} ({} nodes reachable)",
            graph_id,
            start_node,
            start_socket,
            analysis::reachable_nodes(&graph, start_node).len()
        );

        let ctx = RunContext::new(graph, cancel);
        let result = self.walk(&ctx, start_node, start_socket, result).await.finish(started);

        if result.success {
            tracing::info!(
                "🎉 Execution of '{}' completed: {} nodes fired in {:?}",
                graph_id,
                result.nodes_fired,
                result.elapsed
            );
        } else {
            tracing::warn!(
                "⚠️ Execution of '{}' finished with {} error(s) after {} nodes",
                graph_id,
                result.errors.len(),
                result.nodes_fired
            );
        }
        result
    }

    /// Run every Event node of a graph from its first exec output
    pub async fn execute_entry_points(
        &self,
        graph_id: &str,
        cancel: CancellationToken,
    ) -> Vec<ExecutionResult> {
        let Some(graph) = self.store.get_graph(graph_id) else {
            return vec![ExecutionResult::new(graph_id)
                .fail(ExecutionError::GraphNotFound(graph_id.to_string()))
                .finish(Instant::now())];
        };

        let entries: Vec<(NodeId, SocketId)> = graph
            .nodes
            .values()
            .filter(|node| node.kind == NodeKind::Event)
            .filter_map(|node| {
                node.exec_outputs()
                    .next()
                    .map(|socket| (node.id.clone(), socket.id.clone()))
            })
            .collect();

        tracing::info!("🎯 Running {} entry point(s) of '{}'", entries.len(), graph_id);

        join_all(entries.iter().map(|(node_id, socket_id)| {
            self.execute_graph(graph_id, node_id, socket_id, cancel.clone())
        }))
        .await
    }

    /// Evaluate one output of a data node in a graph, outside any exec run
    pub async fn evaluate(
        &self,
        graph_id: &str,
        node_id: &str,
        socket_id: &str,
    ) -> Result<Value, ExecutionError> {
        let graph = self
            .store
            .get_graph(graph_id)
            .ok_or_else(|| ExecutionError::GraphNotFound(graph_id.to_string()))?;
        let ctx = RunContext::new(graph, CancellationToken::new());
        let node = ctx
            .graph
            .node(node_id)
            .ok_or_else(|| ExecutionError::InvalidSocketReference {
                node: node_id.to_string(),
                socket: socket_id.to_string(),
            })?;
        self.executor.resolve_output(&ctx, node, socket_id).await
    }

    async fn walk(
        &self,
        ctx: &RunContext,
        start_node: &str,
        start_socket: &str,
        mut result: ExecutionResult,
    ) -> ExecutionResult {
        if ctx.cancel.is_cancelled() {
            tracing::warn!("🛑 Execution cancelled before the first firing");
            return result.fail(ExecutionError::Cancelled);
        }

        let mut steps = 0usize;
        let mut aborted = false;
        let mut in_flight = FuturesUnordered::new();

        let (queued, overflow) = self.queue(ctx, start_node, &[start_socket.to_string()], &mut steps);
        in_flight.extend(queued.into_iter().map(|firing| self.fire(ctx, firing)));
        if overflow {
            aborted = true;
            result.errors.push(self.step_bound_exceeded());
        }

        // Each completion immediately queues its own continuations, so a pending
        // handler only holds back the chain it belongs to
        while let Some((firing, outcome)) = in_flight.next().await {
            match outcome {
                Ok(fired) => {
                    if !aborted {
                        let (queued, overflow) =
                            self.queue(ctx, &fired.node_id, &fired.continued_with, &mut steps);
                        in_flight.extend(queued.into_iter().map(|next| self.fire(ctx, next)));
                        if overflow {
                            aborted = true;
                            result.errors.push(self.step_bound_exceeded());
                        }
                    }
                    result.fired.push(fired);
                }
                Err(e) => {
                    tracing::warn!("⚠️ Chain through '{}' stopped: {}", firing.node_id, e);
                    if e.is_fatal() {
                        aborted = true;
                        if result.errors.contains(&e) {
                            continue;
                        }
                    }
                    result.errors.push(e);
                }
            }
        }

        result
    }

    /// Queue a firing for every connection leaving `node_id` through `sockets`
    ///
    /// Firings are numbered in `seq` order. Returns `true` as the second value when
    /// the step bound cut the list short; the firings within the bound are kept.
    fn queue(
        &self,
        ctx: &RunContext,
        node_id: &str,
        sockets: &[SocketId],
        steps: &mut usize,
    ) -> (Vec<Firing>, bool) {
        let mut queued = Vec::new();
        for socket_id in sockets {
            for connection in ctx.graph.outgoing(node_id, socket_id) {
                if *steps >= self.max_steps {
                    return (queued, true);
                }
                *steps += 1;
                queued.push(Firing {
                    node_id: connection.to_node.clone(),
                    step: *steps,
                });
            }
        }
        (queued, false)
    }

    fn step_bound_exceeded(&self) -> ExecutionError {
        tracing::error!("❌ Step bound of {} exceeded, aborting", self.max_steps);
        ExecutionError::StepBoundExceeded(self.max_steps)
    }

    async fn fire(
        &self,
        ctx: &RunContext,
        firing: Firing,
    ) -> (Firing, Result<FiredNode, ExecutionError>) {
        let outcome = self.fire_node(ctx, &firing).await;
        (firing, outcome)
    }

    async fn fire_node(&self, ctx: &RunContext, firing: &Firing) -> Result<FiredNode, ExecutionError> {
        if ctx.cancel.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }

        let node = ctx
            .graph
            .node(&firing.node_id)
            .ok_or_else(|| ExecutionError::InvalidSocketReference {
                node: firing.node_id.clone(),
                socket: String::new(),
            })?;

        tracing::debug!(
            "📍 Step {}: firing '{}' (type: {})",
            firing.step,
            node.id,
            node.node_type
        );

        let output = self.executor.fire(ctx, node).await?;
        let continued_with = continuation(node, output.next)?;

        Ok(FiredNode {
            node_id: node.id.clone(),
            node_type: node.node_type.clone(),
            step: firing.step,
            continued_with,
        })
    }
}

/// Map a handler's `Next` onto the node's exec outputs
///
/// Branch nodes must answer with `Next::Branch` (or stop); other nodes may not.
fn continuation(node: &Node, next: Next) -> Result<Vec<SocketId>, ExecutionError> {
    let mismatch = |returned: &str| ExecutionError::HandlerFailed {
        node: node.id.clone(),
        message: format!("{:?} node returned {}", node.kind, returned),
    };
    let invalid = |socket: String| ExecutionError::InvalidSocketReference {
        node: node.id.clone(),
        socket,
    };

    match (node.kind, next) {
        (_, Next::Stop) => Ok(Vec::new()),
        (NodeKind::Branch, Next::Branch(condition)) => {
            let index = if condition { 0 } else { 1 };
            node.exec_outputs()
                .nth(index)
                .map(|s| vec![s.id.clone()])
                .ok_or_else(|| invalid(format!("exec output #{}", index)))
        }
        (NodeKind::Branch, _) => Err(mismatch("a non-branch continuation")),
        (_, Next::Branch(_)) => Err(mismatch("a branch decision")),
        (_, Next::Continue(socket)) => match node.output(&socket) {
            Some(s) if s.socket_type.is_exec() => Ok(vec![socket]),
            _ => Err(invalid(socket)),
        },
        (_, Next::All) => Ok(node.exec_outputs().map(|s| s.id.clone()).collect()),
    }
}
