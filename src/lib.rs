/// Ignis Blueprint: visual scripting graph engine
///
/// This library provides the node-graph data store, the registry of node
/// behaviors, and the interpreter that executes blueprint graphs.

// Core configuration and tracing setup
pub mod config;

// Typed errors for store mutations and executions
pub mod error;

// Graph data model and editing store
pub mod graph;

// Node templates, handlers, and the built-in library
pub mod registry;

// Interpreter, node executor, and graph diagnostics
pub mod runtime;

// Re-export commonly used types for external consumers
pub use config::{Config, EngineConfig};
pub use error::{ExecutionError, GraphError};
pub use graph::{Graph, GraphStore, Node, NodeKind, Position, Socket, SocketType};
pub use registry::{HandlerResult, Inputs, NodeOutput, NodeRegistry, NodeTemplate};
pub use runtime::{ExecutionResult, Interpreter};
