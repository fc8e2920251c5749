/// Graph Management Layer
///
/// This module holds the blueprint data model and its editing store:
/// - Type definitions (Graph, Node, Socket, Connection)
/// - Connection validation against the graph invariants
/// - Copy-on-write store with lock-free snapshots using ArcSwap

// Core graph type definitions
pub mod types;

// Mutable store of graphs plus editor selection and clipboard
pub mod store;

// Re-export commonly used types
pub use store::{Clipboard, GraphStore};
pub use types::{Connection, Graph, Node, NodeKind, Position, Socket, SocketType};
