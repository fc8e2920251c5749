/// Runtime Execution Engine
///
/// This module provides the interpreter that walks blueprint graphs.
/// It handles:
/// - Breadth-first traversal of exec connections
/// - On-demand resolution of data inputs
/// - Async handler orchestration with tokio
/// - Structural diagnostics using petgraph

// Traversal loop and execution results
pub mod engine;

// Single-node firing and data pull resolution
pub mod executor;

// Petgraph views for reachability and cycle diagnostics
pub mod analysis;

// Re-export main types
pub use engine::{ExecutionResult, FiredNode, Interpreter};
pub use executor::NodeExecutor;
