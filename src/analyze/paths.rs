//! Execution path enumeration.
//!
//! Lists every simple path from the entry node to the exit node. The count
//! grows exponentially with branching; workflow graphs are expected to be
//! small and mostly linear, so there is no cap.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::graph::{GraphIndex, NodeKind, WorkflowGraph};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPath {
    pub nodes: Vec<String>,
    /// Nodes of type `step` on this path.
    pub step_count: usize,
}

pub fn find_execution_paths(graph: &WorkflowGraph) -> Vec<ExecutionPath> {
    let (Some(entry), Some(exit)) = (graph.entry_node(), graph.exit_node()) else {
        return Vec::new();
    };
    let index = GraphIndex::build(graph);
    let steps: HashSet<&str> = graph
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Step)
        .map(|n| n.id.as_str())
        .collect();

    let exit = exit.id.as_str();
    let mut paths = Vec::new();
    let mut current = vec![entry.id.as_str()];
    let mut on_path: HashSet<&str> = HashSet::from([entry.id.as_str()]);
    let mut pending = vec![successors_of(&index, entry.id.as_str(), exit)];

    while let Some(next) = pending.last_mut().map(Iterator::next) {
        match next {
            Some(next) if on_path.insert(next) => {
                current.push(next);
                if next == exit {
                    paths.push(ExecutionPath {
                        nodes: current.iter().map(|s| s.to_string()).collect(),
                        step_count: current.iter().filter(|id| steps.contains(*id)).count(),
                    });
                }
                pending.push(successors_of(&index, next, exit));
            }
            Some(_) => {}
            None => {
                pending.pop();
                if let Some(done) = current.pop() {
                    on_path.remove(done);
                }
            }
        }
    }
    paths
}

/// Successors still to try from `node`; the exit node ends a path.
fn successors_of<'a>(
    index: &GraphIndex<'a>,
    node: &str,
    exit: &str,
) -> std::vec::IntoIter<&'a str> {
    if node == exit {
        Vec::new().into_iter()
    } else {
        index.successors(node).into_iter()
    }
}
