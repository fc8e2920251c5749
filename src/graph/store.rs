/// Graph store with copy-on-write mutation and lock-free snapshots
///
/// Every mutation clones the target graph, applies the change to the clone, and
/// publishes it with an atomic pointer swap only if the whole change succeeded.
/// Readers (the UI, in-flight executions) hold `Arc<Graph>` snapshots and never
/// observe a half-applied mutation. Writers are serialized by a single mutex that
/// also guards the editor state (active graph, selection, clipboard).

use crate::config::EngineConfig;
use crate::error::{GraphError, Result};
use crate::graph::types::{
    new_id, Connection, ConnectionId, Graph, GraphId, Node, NodeId, Position, ValueMap,
};
use crate::registry::{check_layout, NodeRegistry};
use arc_swap::ArcSwap;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// Nodes and internal connections captured by `copy_selection`
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
}

/// Editor-side state owned by the store
#[derive(Debug, Clone, Default)]
struct EditorState {
    active: Option<GraphId>,
    /// Ordered sets; insertion order is selection order
    selected_nodes: Vec<NodeId>,
    selected_connections: Vec<ConnectionId>,
    clipboard: Option<Clipboard>,
}

fn insert_unique(set: &mut Vec<String>, id: &str) {
    if !set.iter().any(|existing| existing == id) {
        set.push(id.to_string());
    }
}

/// In-memory owner of every Blueprint graph
#[derive(Debug)]
pub struct GraphStore {
    /// Thread-safe atomic pointer to the graph map
    /// Key: graph_id, Value: immutable graph snapshot
    graphs: ArcSwap<HashMap<GraphId, Arc<Graph>>>,

    /// Writer lock plus active graph / selection / clipboard
    state: Mutex<EditorState>,

    /// Socket templates for `add_node`
    registry: Arc<NodeRegistry>,

    allow_self_loops: bool,
}

impl GraphStore {
    pub fn new(registry: Arc<NodeRegistry>, config: &EngineConfig) -> Self {
        Self {
            graphs: ArcSwap::new(Arc::new(HashMap::new())),
            state: Mutex::new(EditorState::default()),
            registry,
            allow_self_loops: config.allow_self_loops,
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    fn lock(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish a new version of one graph (caller holds the writer lock)
    fn publish(&self, graph: Graph) {
        let current = self.graphs.load();
        let mut next = (**current).clone();
        next.insert(graph.id.clone(), Arc::new(graph));
        self.graphs.store(Arc::new(next));
    }

    /// Snapshot of the active graph named by `state`
    fn active_snapshot(&self, state: &EditorState) -> Result<Arc<Graph>> {
        let active = state.active.as_ref().ok_or(GraphError::NoActiveGraph)?;
        self.graphs
            .load()
            .get(active)
            .cloned()
            .ok_or(GraphError::NoActiveGraph)
    }

    /// Apply `op` to a private copy of the active graph and editor state
    ///
    /// Both copies are committed together on success; on error nothing changes.
    /// A new graph version is published only when the edit changed the graph.
    fn mutate_active<T>(
        &self,
        op: &str,
        f: impl FnOnce(&mut Graph, &mut EditorState) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.lock();

        let result: Result<(Arc<Graph>, Graph, EditorState, T)> = (|| {
            let snapshot = self.active_snapshot(&state)?;
            let mut graph = (*snapshot).clone();
            let mut next_state = state.clone();
            let value = f(&mut graph, &mut next_state)?;
            Ok((snapshot, graph, next_state, value))
        })();

        match result {
            Ok((snapshot, mut graph, next_state, value)) => {
                if graph != *snapshot {
                    graph.touch();
                    self.publish(graph);
                }
                *state = next_state;
                Ok(value)
            }
            Err(e) => {
                tracing::warn!("🚫 {} rejected: {}", op, e);
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Graph lifecycle
    // ------------------------------------------------------------------

    /// Allocate a new empty graph and make it the active one
    pub fn create_graph(&self, name: &str) -> GraphId {
        let mut state = self.lock();
        let graph = Graph::new(new_id("graph"), name);
        let id = graph.id.clone();
        self.publish(graph);

        state.active = Some(id.clone());
        state.selected_nodes.clear();
        state.selected_connections.clear();

        tracing::info!("📊 Created graph '{}' ({})", name, id);
        id
    }

    pub fn delete_graph(&self, graph_id: &str) -> Result<()> {
        let mut state = self.lock();
        let current = self.graphs.load();
        if !current.contains_key(graph_id) {
            return Err(GraphError::GraphNotFound(graph_id.to_string()));
        }

        let mut next = (**current).clone();
        next.remove(graph_id);
        self.graphs.store(Arc::new(next));

        if state.active.as_deref() == Some(graph_id) {
            state.active = None;
            state.selected_nodes.clear();
            state.selected_connections.clear();
        }

        tracing::info!("🗑️ Deleted graph {}", graph_id);
        Ok(())
    }

    /// Make an existing graph active and clear the selection
    pub fn set_active_graph(&self, graph_id: &str) -> Result<()> {
        let mut state = self.lock();
        if !self.graphs.load().contains_key(graph_id) {
            return Err(GraphError::GraphNotFound(graph_id.to_string()));
        }
        state.active = Some(graph_id.to_string());
        state.selected_nodes.clear();
        state.selected_connections.clear();
        Ok(())
    }

    /// Validate a deserialized graph and adopt it under its own id
    ///
    /// Connections are re-checked in sequence order against every connection
    /// invariant; the first violation rejects the whole import.
    pub fn import_graph(&self, graph: Graph) -> Result<GraphId> {
        let mut state = self.lock();

        for node in graph.nodes.values() {
            if let Err(e) = check_layout(&node.node_type, node.kind, &node.inputs, &node.outputs) {
                tracing::warn!("🚫 Import of graph {} rejected at node {}: {}", graph.id, node.id, e);
                return Err(e);
            }
        }

        let mut connections: Vec<Connection> = graph.connections.values().cloned().collect();
        connections.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.id.cmp(&b.id)));

        let mut rebuilt = Graph {
            nodes: graph.nodes.into_values().map(|n| (n.id.clone(), n)).collect(),
            connections: BTreeMap::new(),
            ..graph
        };

        for connection in connections {
            if let Err(e) = rebuilt.validate_connection(
                &connection.from_node,
                &connection.from_socket,
                &connection.to_node,
                &connection.to_socket,
                self.allow_self_loops,
            ) {
                tracing::warn!("🚫 Import of graph {} rejected: {}", rebuilt.id, e);
                return Err(e);
            }
            rebuilt.connections.insert(connection.id.clone(), connection);
        }
        rebuilt.resync_sequence();

        let id = rebuilt.id.clone();
        tracing::info!(
            "📥 Imported graph '{}' ({}) with {} nodes and {} connections",
            rebuilt.name,
            id,
            rebuilt.nodes.len(),
            rebuilt.connections.len()
        );
        self.publish(rebuilt);

        state.active = Some(id.clone());
        state.selected_nodes.clear();
        state.selected_connections.clear();
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn get_graph(&self, graph_id: &str) -> Option<Arc<Graph>> {
        self.graphs.load().get(graph_id).cloned()
    }

    pub fn get_active_graph(&self) -> Option<Arc<Graph>> {
        let active = self.lock().active.clone()?;
        self.get_graph(&active)
    }

    pub fn active_graph_id(&self) -> Option<GraphId> {
        self.lock().active.clone()
    }

    /// (id, name) of every graph, sorted by name
    pub fn list_graphs(&self) -> Vec<(GraphId, String)> {
        let mut graphs: Vec<_> = self
            .graphs
            .load()
            .values()
            .map(|g| (g.id.clone(), g.name.clone()))
            .collect();
        graphs.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        graphs
    }

    pub fn get_node(&self, node_id: &str) -> Option<Node> {
        self.get_active_graph()?.node(node_id).cloned()
    }

    pub fn selected_nodes(&self) -> Vec<NodeId> {
        self.lock().selected_nodes.clone()
    }

    pub fn selected_connections(&self) -> Vec<ConnectionId> {
        self.lock().selected_connections.clone()
    }

    pub fn clipboard(&self) -> Option<Clipboard> {
        self.lock().clipboard.clone()
    }

    // ------------------------------------------------------------------
    // Node mutations
    // ------------------------------------------------------------------

    /// Instantiate a registered node type in the active graph
    pub fn add_node(
        &self,
        node_type: &str,
        position: Position,
        initial_data: Option<ValueMap>,
    ) -> Result<Node> {
        self.mutate_active("add_node", |graph, _| {
            let definition = self
                .registry
                .get(node_type)
                .ok_or_else(|| GraphError::UnknownNodeType(node_type.to_string()))?;

            let node = definition.template.instantiate(position, initial_data);
            graph.nodes.insert(node.id.clone(), node.clone());

            tracing::debug!("➕ Added node '{}' (type: {}) to {}", node.id, node_type, graph.id);
            Ok(node)
        })
    }

    /// Delete a node together with every connection touching it
    pub fn remove_node(&self, node_id: &str) -> Result<Node> {
        self.mutate_active("remove_node", |graph, state| {
            let (node, cascaded) = graph
                .remove_node_cascade(node_id)
                .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;

            state.selected_nodes.retain(|id| id != node_id);
            state.selected_connections.retain(|id| !cascaded.contains(id));

            tracing::debug!(
                "➖ Removed node '{}' and {} connections from {}",
                node_id,
                cascaded.len(),
                graph.id
            );
            Ok(node)
        })
    }

    pub fn update_node_position(&self, node_id: &str, x: f64, y: f64) -> Result<()> {
        self.mutate_active("update_node_position", |graph, _| {
            let node = graph
                .nodes
                .get_mut(node_id)
                .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
            node.position = Position::new(x, y);
            Ok(())
        })
    }

    /// Set one literal in a node's `data` map
    pub fn update_node_data(&self, node_id: &str, key: &str, value: Value) -> Result<()> {
        self.mutate_active("update_node_data", |graph, _| {
            let node = graph
                .nodes
                .get_mut(node_id)
                .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
            node.data.insert(key.to_string(), value);
            Ok(())
        })
    }

    /// Copy a node with a fresh id at +50,+50 and select the copy
    ///
    /// Connections are not duplicated.
    pub fn duplicate_node(&self, node_id: &str) -> Result<Node> {
        self.mutate_active("duplicate_node", |graph, state| {
            let original = graph
                .node(node_id)
                .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;

            let mut copy = original.clone();
            copy.id = new_id("node");
            copy.position = Position::new(original.position.x + 50.0, original.position.y + 50.0);
            graph.nodes.insert(copy.id.clone(), copy.clone());

            state.selected_nodes = vec![copy.id.clone()];
            state.selected_connections.clear();
            Ok(copy)
        })
    }

    // ------------------------------------------------------------------
    // Connection mutations
    // ------------------------------------------------------------------

    /// Connect an output socket to an input socket after checking every invariant
    pub fn add_connection(
        &self,
        from_node: &str,
        from_socket: &str,
        to_node: &str,
        to_socket: &str,
    ) -> Result<Connection> {
        self.mutate_active("add_connection", |graph, _| {
            graph.validate_connection(from_node, from_socket, to_node, to_socket, self.allow_self_loops)?;
            let connection = graph.push_connection(from_node, from_socket, to_node, to_socket);

            tracing::debug!(
                "🔗 Connected {}.{} → {}.{} ({})",
                from_node,
                from_socket,
                to_node,
                to_socket,
                connection.id
            );
            Ok(connection)
        })
    }

    /// Delete a connection by id; absent ids are a no-op returning `None`
    pub fn remove_connection(&self, connection_id: &str) -> Option<Connection> {
        self.mutate_active("remove_connection", |graph, state| {
            let removed = graph.connections.remove(connection_id);
            if removed.is_some() {
                state.selected_connections.retain(|id| id != connection_id);
            }
            Ok(removed)
        })
        .ok()
        .flatten()
    }

    // ------------------------------------------------------------------
    // Selection and clipboard
    // ------------------------------------------------------------------

    /// Replace (or with `multi`, extend) the node selection
    ///
    /// Selecting a node clears the connection selection. Selection is editor
    /// state only; the graph itself is not republished.
    pub fn select_node(&self, node_id: &str, multi: bool) -> Result<()> {
        let mut state = self.lock();
        let graph = self.active_snapshot(&state)?;
        if graph.node(node_id).is_none() {
            tracing::warn!("🚫 select_node rejected: unknown node {}", node_id);
            return Err(GraphError::NodeNotFound(node_id.to_string()));
        }

        if !multi {
            state.selected_nodes.clear();
        }
        insert_unique(&mut state.selected_nodes, node_id);
        state.selected_connections.clear();
        Ok(())
    }

    pub fn select_connection(&self, connection_id: &str, multi: bool) -> Result<()> {
        let mut state = self.lock();
        let graph = self.active_snapshot(&state)?;
        if graph.connection(connection_id).is_none() {
            tracing::warn!("🚫 select_connection rejected: unknown connection {}", connection_id);
            return Err(GraphError::InvalidSocketReference {
                node: String::new(),
                socket: connection_id.to_string(),
            });
        }

        if !multi {
            state.selected_connections.clear();
        }
        insert_unique(&mut state.selected_connections, connection_id);
        state.selected_nodes.clear();
        Ok(())
    }

    pub fn clear_selection(&self) {
        let mut state = self.lock();
        state.selected_nodes.clear();
        state.selected_connections.clear();
    }

    /// Copy the selected nodes and the connections running between them
    ///
    /// Returns the number of nodes placed on the clipboard.
    pub fn copy_selection(&self) -> Result<usize> {
        let mut state = self.lock();
        let graph = self.active_snapshot(&state)?;

        let nodes: Vec<Node> = state
            .selected_nodes
            .iter()
            .filter_map(|id| graph.node(id).cloned())
            .collect();
        let connections: Vec<Connection> = graph
            .connections
            .values()
            .filter(|c| {
                state.selected_nodes.contains(&c.from_node) && state.selected_nodes.contains(&c.to_node)
            })
            .cloned()
            .collect();

        let count = nodes.len();
        state.clipboard = Some(Clipboard { nodes, connections });
        Ok(count)
    }

    /// Insert fresh copies of the clipboard so its first node lands at `position`
    ///
    /// Internal connections are re-created between the copies and the pasted
    /// nodes become the selection.
    pub fn paste(&self, position: Position) -> Result<Vec<Node>> {
        self.mutate_active("paste", |graph, state| {
            let clipboard = match state.clipboard.clone() {
                Some(clipboard) if !clipboard.nodes.is_empty() => clipboard,
                _ => return Ok(Vec::new()),
            };

            let anchor = clipboard.nodes[0].position;
            let (dx, dy) = (position.x - anchor.x, position.y - anchor.y);

            let mut id_map: HashMap<NodeId, NodeId> = HashMap::new();
            let mut pasted = Vec::with_capacity(clipboard.nodes.len());
            for node in &clipboard.nodes {
                let mut copy = node.clone();
                copy.id = new_id("node");
                copy.position = Position::new(node.position.x + dx, node.position.y + dy);
                id_map.insert(node.id.clone(), copy.id.clone());
                graph.nodes.insert(copy.id.clone(), copy.clone());
                pasted.push(copy);
            }

            let mut links = clipboard.connections.clone();
            links.sort_by_key(|c| c.seq);
            for link in links {
                if let (Some(from), Some(to)) = (id_map.get(&link.from_node), id_map.get(&link.to_node)) {
                    graph.validate_connection(from, &link.from_socket, to, &link.to_socket, self.allow_self_loops)?;
                    graph.push_connection(from, &link.from_socket, to, &link.to_socket);
                }
            }

            state.selected_nodes = pasted.iter().map(|n| n.id.clone()).collect();
            state.selected_connections.clear();

            tracing::debug!("📋 Pasted {} nodes into {}", pasted.len(), graph.id);
            Ok(pasted)
        })
    }
}
