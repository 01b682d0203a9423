//! Structural graph metrics and complexity scoring.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::graph::{GraphIndex, NodeKind, WorkflowGraph};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    /// `2 * edges / nodes`, two decimals.
    pub avg_degree: f64,
    pub max_path_length: usize,
    /// `max(0, edges - nodes + 2)`
    pub cyclomatic_complexity: usize,
    pub bottleneck_nodes: Vec<String>,
    pub isolated_nodes: Vec<String>,
}

pub fn calculate_metrics(graph: &WorkflowGraph) -> GraphMetrics {
    let nodes = graph.nodes.len();
    let edges = graph.edges.len();

    let avg_degree = if nodes == 0 {
        0.0
    } else {
        round2(2.0 * edges as f64 / nodes as f64)
    };

    let degrees = graph.degrees();
    let connected: Vec<usize> = graph
        .nodes
        .iter()
        .map(|n| degrees[n.id.as_str()])
        .filter(|&d| d > 0)
        .collect();
    let mean = if connected.is_empty() {
        0.0
    } else {
        connected.iter().sum::<usize>() as f64 / connected.len() as f64
    };

    let bottleneck_nodes = graph
        .nodes
        .iter()
        .filter(|n| !connected.is_empty() && degrees[n.id.as_str()] as f64 > mean)
        .map(|n| n.id.clone())
        .collect();
    let isolated_nodes = graph
        .nodes
        .iter()
        .filter(|n| degrees[n.id.as_str()] == 0)
        .map(|n| n.id.clone())
        .collect();

    GraphMetrics {
        node_count: nodes,
        edge_count: edges,
        avg_degree,
        max_path_length: max_path_length(graph),
        cyclomatic_complexity: (edges + 2).saturating_sub(nodes),
        bottleneck_nodes,
        isolated_nodes,
    }
}

/// Longest hop count discovered by a BFS started from every node without
/// incoming edges (or from the first node when every node has one).
pub fn max_path_length(graph: &WorkflowGraph) -> usize {
    let index = GraphIndex::build(graph);
    let mut sources = index.roots();
    if sources.is_empty() {
        sources.extend(graph.nodes.first().map(|n| n.id.as_str()));
    }

    let mut distance: HashMap<&str, usize> = HashMap::new();
    let mut queue = VecDeque::new();
    for source in sources {
        if distance.insert(source, 0).is_none() {
            queue.push_back(source);
        }
    }

    let mut longest = 0;
    while let Some(current) = queue.pop_front() {
        let hops = distance[current];
        longest = longest.max(hops);
        for next in index.successors(current) {
            if !distance.contains_key(next) {
                distance.insert(next, hops + 1);
                queue.push_back(next);
            }
        }
    }
    longest
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// COMPLEXITY CLASSIFICATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

impl ComplexityLevel {
    pub fn classify(score: u32) -> Self {
        match score {
            0..25 => ComplexityLevel::Simple,
            25..50 => ComplexityLevel::Moderate,
            50..75 => ComplexityLevel::Complex,
            _ => ComplexityLevel::VeryComplex,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityReport {
    /// `max(1, edges - nodes + 2)`
    pub cyclomatic_complexity: u32,
    pub nesting_depth: u32,
    /// Edges terminating at `end`.
    pub fan_in: u32,
    /// Edges leaving `start`.
    pub fan_out: u32,
    pub overall_complexity: u32,
    pub complexity_level: ComplexityLevel,
}

pub fn calculate_complexity(graph: &WorkflowGraph) -> ComplexityReport {
    let nodes = graph.nodes.len() as i64;
    let edges = graph.edges.len() as i64;
    let cyclomatic = (edges - nodes + 2).max(1) as u32;

    let steps = graph.count_nodes(NodeKind::Step) as f64;
    let nesting_depth = ((steps + 1.0).log2().ceil() as u32).max(1);

    let ends: HashSet<&str> = graph
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::End)
        .map(|n| n.id.as_str())
        .collect();
    let starts: HashSet<&str> = graph
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Start)
        .map(|n| n.id.as_str())
        .collect();
    let fan_in = graph
        .edges
        .iter()
        .filter(|e| ends.contains(e.target.as_str()))
        .count() as u32;
    let fan_out = graph
        .edges
        .iter()
        .filter(|e| starts.contains(e.source.as_str()))
        .count() as u32;

    let raw = cyclomatic as f64 * 10.0
        + nesting_depth as f64 * 15.0
        + fan_in as f64 * 5.0
        + fan_out as f64 * 5.0;
    let overall_complexity = (raw.round() as u32).min(100);

    ComplexityReport {
        cyclomatic_complexity: cyclomatic,
        nesting_depth,
        fan_in,
        fan_out,
        overall_complexity,
        complexity_level: ComplexityLevel::classify(overall_complexity),
    }
}
