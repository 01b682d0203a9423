//! `ParsedWorkflow` → `WorkflowGraph`.
//!
//! Node order is start, steps (document order), end, then one node per
//! declared dependency. Construction never fails; dangling `next` targets
//! become edges that validation later rejects.

use std::collections::HashSet;

use serde_json::Value;

use super::cycles::find_cycles;
use super::index::GraphIndex;
use super::types::*;
use crate::parse::{ParsedWorkflow, WorkflowDependency, WorkflowStep};

const TRACING_TARGET: &str = "flowgraph::graph";

pub const START_NODE_ID: &str = "start";
pub const END_NODE_ID: &str = "end";

/// Horizontal distance between consecutive nodes in the layout hint.
pub const LAYOUT_SPACING: f64 = 200.0;
const STEP_ROW: f64 = 100.0;
const DEPENDENCY_ROW: f64 = 300.0;

pub fn build_from_parsed(parsed: &ParsedWorkflow, workflow_spec_id: &str) -> WorkflowGraph {
    let mut nodes = Vec::with_capacity(parsed.steps.len() + parsed.dependencies.len() + 2);
    let mut edges = Vec::new();

    // 1-2. start, steps, end
    nodes.push(WorkflowNode::new(START_NODE_ID, NodeKind::Start, "Start").at(0.0, STEP_ROW));
    for (i, step) in parsed.steps.iter().enumerate() {
        nodes.push(step_node(step, (i + 1) as f64 * LAYOUT_SPACING));
    }
    let end_x = (parsed.steps.len() + 1) as f64 * LAYOUT_SPACING;
    nodes.push(WorkflowNode::new(END_NODE_ID, NodeKind::End, "End").at(end_x, STEP_ROW));

    // 3. sequence edges, plus condition edges for explicit branches
    if !parsed.steps.is_empty() {
        let mut chain = Vec::with_capacity(parsed.steps.len() + 2);
        chain.push(START_NODE_ID);
        chain.extend(parsed.steps.iter().map(|s| s.id.as_str()));
        chain.push(END_NODE_ID);
        for pair in chain.windows(2) {
            edges.push(sequence_edge(pair[0], pair[1]));
        }
        edges.extend(branch_edges(parsed));
    }

    // 4. dependency nodes and the steps that use them
    let mut taken: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
    for (i, dep) in parsed.dependencies.iter().enumerate() {
        let node = dependency_node(dep, i, &mut taken);
        for step in parsed.steps.iter().filter(|s| s.references(dep)) {
            edges.push(WorkflowEdge::new(
                format!("dep-{}-{}", step.id, node.id),
                step.id.clone(),
                node.id.clone(),
                EdgeKind::Dependency,
            ));
        }
        nodes.push(node);
    }

    let mut graph = WorkflowGraph {
        id: format!("graph-{}", workflow_spec_id),
        workflow_spec_id: workflow_spec_id.to_string(),
        name: parsed.name.clone(),
        nodes,
        edges,
        metadata: GraphMetadata {
            complexity: 0,
            total_steps: parsed.steps.len(),
            dependency_count: parsed.dependencies.len(),
            validation_status: ValidationStatus::Invalid,
            last_validated: None,
            circular_dependencies: Vec::new(),
        },
    };

    // 5-6.
    graph.metadata.complexity = initial_complexity(&graph);
    graph.metadata.circular_dependencies = detect_cycles(&graph);

    tracing::debug!(
        target: TRACING_TARGET,
        graph_id = %graph.id,
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        cycles = graph.metadata.circular_dependencies.len(),
        "Built workflow graph"
    );

    graph
}

/// `min(100, round(avgDegree*20 + cyclomatic*10 + conditions*15))` with
/// `avgDegree = edges/nodes` and the raw (possibly negative) cyclomatic
/// number. Negative totals clamp to 0.
pub fn initial_complexity(graph: &WorkflowGraph) -> u32 {
    let nodes = graph.nodes.len() as f64;
    if nodes == 0.0 {
        return 0;
    }
    let edges = graph.edges.len() as f64;
    let avg_degree = edges / nodes;
    let cyclomatic = edges - nodes + 2.0;
    let conditions = graph.count_nodes(NodeKind::Condition) as f64;

    let score = (avg_degree * 20.0 + cyclomatic * 10.0 + conditions * 15.0).round();
    score.clamp(0.0, 100.0) as u32
}

/// All cycles reachable from the graph's nodes, walked in node order.
pub fn detect_cycles(graph: &WorkflowGraph) -> Vec<Vec<String>> {
    let index = GraphIndex::build(graph);
    let roots: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    find_cycles(roots, |id| index.successors(id))
        .into_iter()
        .map(|cycle| cycle.into_iter().map(str::to_string).collect())
        .collect()
}

fn step_node(step: &WorkflowStep, x: f64) -> WorkflowNode {
    let kind = if step.is_condition() {
        NodeKind::Condition
    } else {
        NodeKind::Step
    };
    let mut node = WorkflowNode::new(step.id.clone(), kind, step.name.clone()).at(x, STEP_ROW);
    node.description = step.description.clone();
    node.metadata.category = Some(step.step_type.clone());
    node.metadata.inputs = step.resources.clone().unwrap_or_default();
    node.metadata.outputs = step.next_targets().to_vec();
    node.metadata.execution_time = ["executionTime", "timeout"]
        .iter()
        .find_map(|key| step.metadata.get(*key).and_then(Value::as_u64));
    node.metadata.complexity = step
        .metadata
        .get("complexity")
        .and_then(Value::as_u64)
        .map(|c| c.min(u32::MAX as u64) as u32);
    node
}

fn dependency_node(
    dep: &WorkflowDependency,
    index: usize,
    taken: &mut HashSet<String>,
) -> WorkflowNode {
    let base = format!("{}-{}", dep.kind, dep.name);
    let id = if taken.contains(&base) {
        format!("{}-{}", base, index + 1)
    } else {
        base
    };
    taken.insert(id.clone());

    let mut node = WorkflowNode::new(id, NodeKind::from(dep.kind), dep.name.clone())
        .at(index as f64 * LAYOUT_SPACING, DEPENDENCY_ROW);
    node.description = Some(format!(
        "{} {} dependency",
        if dep.required { "Required" } else { "Optional" },
        dep.kind
    ));
    node.cc_path = dep.path.clone();
    node.metadata.category = Some(dep.kind.to_string());
    node
}

fn sequence_edge(source: &str, target: &str) -> WorkflowEdge {
    WorkflowEdge::new(
        format!("seq-{}-{}", source, target),
        source,
        target,
        EdgeKind::Sequence,
    )
}

/// `next` targets other than the immediate successor.
fn branch_edges(parsed: &ParsedWorkflow) -> Vec<WorkflowEdge> {
    let mut edges = Vec::new();
    for (i, step) in parsed.steps.iter().enumerate() {
        let following = parsed.steps.get(i + 1).map(|s| s.id.as_str());
        let branching = step.next.as_ref().is_some_and(|n| n.is_branching());
        for target in step.next_targets() {
            if Some(target.as_str()) == following {
                continue;
            }
            let mut edge = WorkflowEdge::new(
                format!("cond-{}-{}", step.id, target),
                step.id.clone(),
                target.clone(),
                EdgeKind::Condition,
            );
            edge.label = Some(target.clone());
            edge.condition = step.conditions.as_ref().and_then(|c| c.as_str()).map(str::to_string);
            edge.metadata.parallel = branching;
            edges.push(edge);
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{DependencyKind, StepNext};

    fn workflow(steps: &[&str]) -> ParsedWorkflow {
        ParsedWorkflow {
            name: "t".into(),
            description: None,
            version: None,
            author: None,
            steps: steps
                .iter()
                .enumerate()
                .map(|(i, name)| WorkflowStep::action(format!("step-{}", i + 1), *name))
                .collect(),
            dependencies: vec![],
            metadata: Default::default(),
        }
    }

    #[test]
    fn duplicate_dependency_ids_get_suffixed() {
        let mut wf = workflow(&["a"]);
        wf.dependencies = vec![
            WorkflowDependency::new(DependencyKind::Agent, "helper"),
            WorkflowDependency::new(DependencyKind::Agent, "helper"),
        ];
        let graph = build_from_parsed(&wf, "spec");
        let ids: Vec<&str> = graph.nodes.iter().skip(3).map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["agent-helper", "agent-helper-2"]);
    }

    #[test]
    fn back_reference_creates_condition_edge_and_cycle() {
        let mut wf = workflow(&["a", "b"]);
        wf.steps[1].next = Some(StepNext::One("step-1".into()));
        let graph = build_from_parsed(&wf, "spec");
        assert_eq!(graph.count_edges(EdgeKind::Sequence), 3);
        assert_eq!(graph.count_edges(EdgeKind::Condition), 1);
        assert_eq!(
            graph.metadata.circular_dependencies,
            vec![vec!["step-1".to_string(), "step-2".into(), "step-1".into()]]
        );
    }

    #[test]
    fn layout_hint_increases_along_the_chain() {
        let graph = build_from_parsed(&workflow(&["a", "b", "c"]), "spec");
        let xs: Vec<f64> = graph
            .nodes
            .iter()
            .filter_map(|n| n.metadata.position.map(|p| p.x))
            .collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
    }
}
