/// Typed errors for the graph store and the interpreter
///
/// Store mutations reject with a `GraphError` and leave the graph untouched.
/// Interpreter failures are `ExecutionError`s collected into the run's
/// `ExecutionResult` instead of being returned from `execute`.

use serde::Serialize;
use thiserror::Error;

/// Reasons a store operation or registry registration was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("No active graph")]
    NoActiveGraph,

    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A connection names a node or socket that does not exist
    #[error("Invalid socket reference: {node}.{socket}")]
    InvalidSocketReference { node: String, socket: String },

    /// Wrong direction, exec/data mix, or incompatible value types
    #[error("Socket kind mismatch: {from} -> {to} ({reason})")]
    SocketKindMismatch {
        from: String,
        to: String,
        reason: String,
    },

    /// The target input already has an incoming connection
    #[error("Input {node}.{socket} already connected by {existing}")]
    FanInViolation {
        node: String,
        socket: String,
        existing: String,
    },

    #[error("Self-loop rejected on node {0}")]
    SelfLoop(String),

    #[error("Invalid template for node type {node_type}: {reason}")]
    InvalidTemplate { node_type: String, reason: String },
}

/// Failures raised while walking a graph
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum ExecutionError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    #[error("Invalid socket reference: {node}.{socket}")]
    InvalidSocketReference { node: String, socket: String },

    #[error("Missing required input: {node}.{socket}")]
    MissingRequiredInput { node: String, socket: String },

    /// Circular data dependency; `path` lists the nodes on the cycle
    #[error("Data cycle detected: {}", path.join(" -> "))]
    DataCycle { path: Vec<String> },

    #[error("Data resolution exceeded depth {0}")]
    DataDepthExceeded(usize),

    #[error("Step bound exceeded after {0} node firings")]
    StepBoundExceeded(usize),

    #[error("Handler for node {node} failed: {message}")]
    HandlerFailed { node: String, message: String },

    #[error("Execution cancelled")]
    Cancelled,
}

impl ExecutionError {
    /// Whether this error aborts the whole `execute` call rather than one chain
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExecutionError::StepBoundExceeded(_)
                | ExecutionError::Cancelled
                | ExecutionError::GraphNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
