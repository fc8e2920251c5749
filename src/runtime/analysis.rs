/// Petgraph-based structural analysis of blueprint graphs
///
/// Projects a graph's exec or data connections onto a petgraph `DiGraph` so the
/// interpreter and tooling can ask which nodes a run may reach and which
/// connections form loops, without walking the graph by hand.

use crate::graph::types::{Connection, Graph, NodeId};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};

/// Which connections to project onto the petgraph view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Exec,
    Data,
}

/// A graph's connections of one flow as a petgraph DiGraph
#[derive(Debug)]
pub struct FlowGraph {
    graph: DiGraph<NodeId, ()>,
    /// Mapping from node ID to graph node index
    node_id_to_index: HashMap<NodeId, NodeIndex>,
}

impl FlowGraph {
    pub fn build(source: &Graph, flow: Flow) -> Self {
        let mut graph = DiGraph::new();
        let mut node_id_to_index = HashMap::new();

        for node_id in source.nodes.keys() {
            let index = graph.add_node(node_id.clone());
            node_id_to_index.insert(node_id.clone(), index);
        }

        let mut edges: Vec<&Connection> = source
            .connections
            .values()
            .filter(|c| connection_flow(source, c) == Some(flow))
            .collect();
        edges.sort_by_key(|c| c.seq);

        for connection in edges {
            if let (Some(&from), Some(&to)) = (
                node_id_to_index.get(&connection.from_node),
                node_id_to_index.get(&connection.to_node),
            ) {
                graph.add_edge(from, to, ());
            }
        }

        tracing::debug!(
            "🏗️ Built {:?} view of '{}': {} nodes, {} edges",
            flow,
            source.id,
            graph.node_count(),
            graph.edge_count()
        );

        Self {
            graph,
            node_id_to_index,
        }
    }

    /// Nodes reachable from `start` following edges forward, excluding `start`
    /// unless a loop leads back to it
    pub fn reachable_from(&self, start: &str) -> BTreeSet<NodeId> {
        let mut reachable = BTreeSet::new();
        let Some(&start_index) = self.node_id_to_index.get(start) else {
            return reachable;
        };

        let mut bfs = Bfs::new(&self.graph, start_index);
        while let Some(index) = bfs.next(&self.graph) {
            if index != start_index {
                reachable.insert(self.graph[index].clone());
            }
        }

        let loops_back = self
            .graph
            .neighbors_directed(start_index, Direction::Incoming)
            .any(|pred| pred == start_index || reachable.contains(&self.graph[pred]));
        if loops_back {
            reachable.insert(start.to_string());
        }
        reachable
    }

    /// Strongly connected components that form loops, each sorted by node id
    pub fn cycles(&self) -> Vec<Vec<NodeId>> {
        let mut cycles: Vec<Vec<NodeId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || self.graph.contains_edge(component[0], component[0])
            })
            .map(|component| {
                let mut ids: Vec<NodeId> = component
                    .into_iter()
                    .map(|index| self.graph[index].clone())
                    .collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }
}

fn connection_flow(graph: &Graph, connection: &Connection) -> Option<Flow> {
    let socket = graph
        .node(&connection.from_node)?
        .output(&connection.from_socket)?;
    Some(if socket.socket_type.is_exec() {
        Flow::Exec
    } else {
        Flow::Data
    })
}

/// Nodes an execution starting at `start` may fire
pub fn reachable_nodes(graph: &Graph, start: &str) -> BTreeSet<NodeId> {
    FlowGraph::build(graph, Flow::Exec).reachable_from(start)
}

/// Groups of data nodes whose values depend on each other
pub fn data_cycles(graph: &Graph) -> Vec<Vec<NodeId>> {
    FlowGraph::build(graph, Flow::Data).cycles()
}

/// Groups of nodes whose exec flow loops; executions through them end at the step bound
pub fn exec_cycles(graph: &Graph) -> Vec<Vec<NodeId>> {
    FlowGraph::build(graph, Flow::Exec).cycles()
}
