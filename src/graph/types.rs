/// Core Blueprint type definitions
///
/// Defines graphs, nodes, sockets, and connections. Nodes and connections live in
/// id-keyed maps inside their owning `Graph`; every reference between them is an id
/// resolved through the graph, so removing a node is a filtered scan over connections.
/// These types are serialized/deserialized from JSON by the persistence layer.

use crate::error::GraphError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

pub type GraphId = String;
pub type NodeId = String;
pub type ConnectionId = String;
pub type SocketId = String;

/// Socket-id keyed values flowing into or out of a node
pub type ValueMap = BTreeMap<String, Value>;

/// Generate a fresh prefixed id (e.g. "node_9f1c…")
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Closed set of node kinds that govern traversal
///
/// The open-ended `type` string picks the handler; the kind decides how the
/// interpreter treats the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Entry point with no inputs, never invoked by the walk itself
    Event,
    /// Side-effecting node with a single continuation
    Exec,
    /// Pure node evaluated on demand
    Data,
    /// Exec node that picks its "true" or "false" exec output from a boolean
    Branch,
}

/// Declared type of a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketType {
    Exec,
    Float,
    String,
    Bool,
    Vector3,
    Object,
    Int,
}

impl SocketType {
    pub fn is_exec(self) -> bool {
        self == SocketType::Exec
    }

    /// Whether an output of this type may feed an input of type `target`
    ///
    /// Coercion table: Int -> Float | String, Float -> String, Bool -> String,
    /// Vector3 -> Object. Exec only ever connects to Exec.
    pub fn connects_to(self, target: SocketType) -> bool {
        use SocketType::*;
        if self == target {
            return true;
        }
        matches!(
            (self, target),
            (Int, Float) | (Int, String) | (Float, String) | (Bool, String) | (Vector3, Object)
        )
    }

    /// Convert a value produced as `self` into the representation `target` expects
    pub fn coerce(self, target: SocketType, value: Value) -> Value {
        use SocketType::*;
        match (self, target) {
            (Int, Float) => match value.as_i64() {
                Some(i) => serde_json::Number::from_f64(i as f64)
                    .map(Value::Number)
                    .unwrap_or(value),
                None => value,
            },
            (Int, String) | (Float, String) | (Bool, String) => match value {
                Value::String(_) | Value::Null => value,
                other => Value::String(other.to_string()),
            },
            _ => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketDirection {
    Input,
    Output,
}

/// Canvas position; layout metadata only
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A typed connector on a node. Ids are unique within the owning node only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Socket {
    pub id: SocketId,
    pub name: String,
    #[serde(rename = "type")]
    pub socket_type: SocketType,
    pub direction: SocketDirection,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl Socket {
    pub fn input(id: impl Into<String>, name: impl Into<String>, socket_type: SocketType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            socket_type,
            direction: SocketDirection::Input,
            required: false,
            default_value: None,
        }
    }

    pub fn output(id: impl Into<String>, name: impl Into<String>, socket_type: SocketType) -> Self {
        Self {
            direction: SocketDirection::Output,
            ..Self::input(id, name, socket_type)
        }
    }

    /// Mark the socket as required at resolution time
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// A single node in a Blueprint graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    /// Registry key selecting the behavior (e.g. "Print", "Branch")
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(rename = "nodeType")]
    pub kind: NodeKind,
    pub title: String,
    pub position: Position,
    pub inputs: Vec<Socket>,
    pub outputs: Vec<Socket>,
    /// Literal values authored in the editor, keyed by input socket id
    #[serde(default)]
    pub data: ValueMap,
}

impl Node {
    pub fn input(&self, socket_id: &str) -> Option<&Socket> {
        self.inputs.iter().find(|s| s.id == socket_id)
    }

    pub fn output(&self, socket_id: &str) -> Option<&Socket> {
        self.outputs.iter().find(|s| s.id == socket_id)
    }

    /// Exec outputs in declaration order
    pub fn exec_outputs(&self) -> impl Iterator<Item = &Socket> {
        self.outputs.iter().filter(|s| s.socket_type.is_exec())
    }

    pub fn data_inputs(&self) -> impl Iterator<Item = &Socket> {
        self.inputs.iter().filter(|s| !s.socket_type.is_exec())
    }
}

/// Directed link from an output socket to an input socket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub from_node: NodeId,
    pub from_socket: SocketId,
    pub to_node: NodeId,
    pub to_socket: SocketId,
    /// Per-graph insertion sequence; fixes the order fan-out targets are visited in
    #[serde(default)]
    pub seq: u64,
}

impl Connection {
    pub fn touches(&self, node_id: &str) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for GraphMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }
}

/// A complete Blueprint graph
///
/// Owned by the `GraphStore`; consumers only ever see immutable snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    pub id: GraphId,
    pub name: String,
    #[serde(default)]
    pub nodes: BTreeMap<NodeId, Node>,
    #[serde(default)]
    pub connections: BTreeMap<ConnectionId, Connection>,
    #[serde(default)]
    pub metadata: GraphMetadata,
    #[serde(default)]
    pub(crate) next_seq: u64,
}

impl Graph {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: BTreeMap::new(),
            connections: BTreeMap::new(),
            metadata: GraphMetadata::default(),
            next_seq: 0,
        }
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub fn connection(&self, connection_id: &str) -> Option<&Connection> {
        self.connections.get(connection_id)
    }

    /// Connections leaving `node.socket`, in insertion order
    pub fn outgoing(&self, node_id: &str, socket_id: &str) -> Vec<&Connection> {
        let mut out: Vec<&Connection> = self
            .connections
            .values()
            .filter(|c| c.from_node == node_id && c.from_socket == socket_id)
            .collect();
        out.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// The single connection feeding `node.socket`, if any
    pub fn incoming(&self, node_id: &str, socket_id: &str) -> Option<&Connection> {
        self.connections
            .values()
            .find(|c| c.to_node == node_id && c.to_socket == socket_id)
    }

    /// Check a prospective connection against every connection invariant
    ///
    /// Reference existence first, then direction and kind, then fan-in.
    pub fn validate_connection(
        &self,
        from_node: &str,
        from_socket: &str,
        to_node: &str,
        to_socket: &str,
        allow_self_loops: bool,
    ) -> Result<(), GraphError> {
        let source = self.nodes.get(from_node).ok_or_else(|| GraphError::InvalidSocketReference {
            node: from_node.to_string(),
            socket: from_socket.to_string(),
        })?;
        let target = self.nodes.get(to_node).ok_or_else(|| GraphError::InvalidSocketReference {
            node: to_node.to_string(),
            socket: to_socket.to_string(),
        })?;

        if !allow_self_loops && from_node == to_node {
            return Err(GraphError::SelfLoop(from_node.to_string()));
        }

        let mismatch = |reason: &str| GraphError::SocketKindMismatch {
            from: format!("{}.{}", from_node, from_socket),
            to: format!("{}.{}", to_node, to_socket),
            reason: reason.to_string(),
        };

        let out_socket = match source.output(from_socket) {
            Some(socket) => socket,
            None if source.input(from_socket).is_some() => {
                return Err(mismatch("source socket is an input"))
            }
            None => {
                return Err(GraphError::InvalidSocketReference {
                    node: from_node.to_string(),
                    socket: from_socket.to_string(),
                })
            }
        };
        let in_socket = match target.input(to_socket) {
            Some(socket) => socket,
            None if target.output(to_socket).is_some() => {
                return Err(mismatch("target socket is an output"))
            }
            None => {
                return Err(GraphError::InvalidSocketReference {
                    node: to_node.to_string(),
                    socket: to_socket.to_string(),
                })
            }
        };

        if out_socket.socket_type.is_exec() != in_socket.socket_type.is_exec() {
            return Err(mismatch("exec and data sockets cannot be connected"));
        }
        if !out_socket.socket_type.connects_to(in_socket.socket_type) {
            return Err(mismatch(&format!(
                "{:?} is not coercible to {:?}",
                out_socket.socket_type, in_socket.socket_type
            )));
        }

        if let Some(existing) = self.incoming(to_node, to_socket) {
            return Err(GraphError::FanInViolation {
                node: to_node.to_string(),
                socket: to_socket.to_string(),
                existing: existing.id.clone(),
            });
        }

        Ok(())
    }

    /// Insert an already-validated connection, assigning it a fresh id and sequence
    pub(crate) fn push_connection(
        &mut self,
        from_node: &str,
        from_socket: &str,
        to_node: &str,
        to_socket: &str,
    ) -> Connection {
        self.next_seq += 1;
        let connection = Connection {
            id: new_id("conn"),
            from_node: from_node.to_string(),
            from_socket: from_socket.to_string(),
            to_node: to_node.to_string(),
            to_socket: to_socket.to_string(),
            seq: self.next_seq,
        };
        self.connections.insert(connection.id.clone(), connection.clone());
        connection
    }

    /// Remove a node and every connection touching it
    ///
    /// Returns the removed node and the ids of the cascaded connections.
    pub(crate) fn remove_node_cascade(&mut self, node_id: &str) -> Option<(Node, Vec<ConnectionId>)> {
        let node = self.nodes.remove(node_id)?;
        let dangling: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.touches(node_id))
            .map(|c| c.id.clone())
            .collect();
        for id in &dangling {
            self.connections.remove(id);
        }
        Some((node, dangling))
    }

    /// Re-seat the sequence counter after deserialization
    pub(crate) fn resync_sequence(&mut self) {
        let max_seq = self.connections.values().map(|c| c.seq).max().unwrap_or(0);
        self.next_seq = self.next_seq.max(max_seq);
    }

    pub(crate) fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }
}
