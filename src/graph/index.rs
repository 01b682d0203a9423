//! petgraph-based adjacency index over a `WorkflowGraph`.
//!
//! Edges whose endpoints are not node ids are left out; validation reports
//! them separately.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use super::types::{EdgeKind, WorkflowGraph};

pub struct GraphIndex<'a> {
    pub graph: DiGraph<&'a str, EdgeKind>,
    pub node_indices: HashMap<&'a str, NodeIndex>,
}

impl<'a> GraphIndex<'a> {
    pub fn build(workflow: &'a WorkflowGraph) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for node in &workflow.nodes {
            let idx = graph.add_node(node.id.as_str());
            node_indices.entry(node.id.as_str()).or_insert(idx);
        }

        for edge in &workflow.edges {
            let source = node_indices.get(edge.source.as_str());
            let target = node_indices.get(edge.target.as_str());
            if let (Some(&s), Some(&t)) = (source, target) {
                graph.add_edge(s, t, edge.kind);
            }
        }

        GraphIndex {
            graph,
            node_indices,
        }
    }

    /// Distinct successors in edge insertion order.
    pub fn successors(&self, node_id: &str) -> Vec<&'a str> {
        let Some(&idx) = self.node_indices.get(node_id) else {
            return vec![];
        };
        // petgraph walks adjacency newest-first.
        let mut ids: Vec<&'a str> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n])
            .collect();
        ids.reverse();
        let mut seen = HashSet::new();
        ids.retain(|id| seen.insert(*id));
        ids
    }

    /// Nodes without incoming edges, in node order.
    pub fn roots(&self) -> Vec<&'a str> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx])
            .collect()
    }
}
