//! Integration tests for filesystem-free structural analysis.

mod helpers;

use flowgraph::analyze::*;
use flowgraph::graph::{self, WorkflowGraph};
use helpers::*;

fn review_graph() -> WorkflowGraph {
    let mut wf = with_deps(workflow("Review", &["A", "B", "C"]), vec![agent("reviewer")]);
    wf.steps[1].agent = Some("reviewer".into());
    graph::build_from_parsed(&wf, "review")
}

#[test]
fn metrics_for_chain_with_dependency() {
    let metrics = calculate_metrics(&review_graph());

    assert_eq!(metrics.node_count, 6);
    assert_eq!(metrics.edge_count, 5);
    assert_eq!(metrics.avg_degree, 1.67);
    assert_eq!(metrics.cyclomatic_complexity, 1);
    assert_eq!(metrics.max_path_length, 4);
    assert_eq!(metrics.bottleneck_nodes, ["step-1", "step-2", "step-3"]);
    assert!(metrics.isolated_nodes.is_empty());
}

#[test]
fn metrics_report_isolated_nodes() {
    let wf = with_deps(workflow("Loose", &["A"]), vec![resource("assets")]);
    let metrics = calculate_metrics(&graph::build_from_parsed(&wf, "loose"));

    assert_eq!(metrics.isolated_nodes, ["resource-assets"]);
    assert!(!metrics.bottleneck_nodes.contains(&"resource-assets".to_string()));
}

#[test]
fn cyclomatic_variants_are_bounded() {
    let empty = graph::build_from_parsed(&workflow("Empty", &[]), "empty");
    assert_eq!(calculate_metrics(&empty).cyclomatic_complexity, 0);
    assert_eq!(calculate_complexity(&empty).cyclomatic_complexity, 1);

    let sparse = graph::build_from_parsed(
        &with_deps(workflow("Sparse", &[]), vec![agent("a"), agent("b"), agent("c")]),
        "sparse",
    );
    assert_eq!(calculate_metrics(&sparse).cyclomatic_complexity, 0);
    assert_eq!(calculate_complexity(&sparse).cyclomatic_complexity, 1);
}

#[test]
fn complexity_for_linear_chain() {
    let graph = graph::build_from_parsed(&workflow("Linear", &["A", "B", "C"]), "linear");
    let report = calculate_complexity(&graph);

    assert_eq!(report.cyclomatic_complexity, 1);
    assert_eq!(report.nesting_depth, 2);
    assert_eq!(report.fan_in, 1);
    assert_eq!(report.fan_out, 1);
    // 1*10 + 2*15 + 1*5 + 1*5
    insta::assert_json_snapshot!(report, @r#"
    {
      "cyclomaticComplexity": 1,
      "nestingDepth": 2,
      "fanIn": 1,
      "fanOut": 1,
      "overallComplexity": 50,
      "complexityLevel": "complex"
    }
    "#);
}

#[test]
fn complexity_level_thresholds() {
    assert_eq!(ComplexityLevel::classify(80), ComplexityLevel::VeryComplex);
    assert_eq!(
        serde_json::to_value(ComplexityLevel::VeryComplex).unwrap(),
        serde_json::json!("very-complex")
    );
}

#[test]
fn complexity_is_capped_at_100() {
    let names: Vec<String> = (0..40).map(|i| format!("S{}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let mut wf = workflow("Wide", &refs);
    for i in 0..38 {
        let target = format!("step-{}", i + 3);
        wf = branch(wf, &format!("step-{}", i + 1), &[target.as_str()]);
    }
    let report = calculate_complexity(&graph::build_from_parsed(&wf, "wide"));
    assert_eq!(report.overall_complexity, 100);
    assert_eq!(report.complexity_level, ComplexityLevel::VeryComplex);
}

#[test]
fn execution_paths_follow_branches() {
    let wf = branch(workflow("Fork", &["A", "B", "C"]), "step-1", &["step-2", "step-3"]);
    let paths = find_execution_paths(&graph::build_from_parsed(&wf, "fork"));

    let sequences: Vec<Vec<&str>> = paths
        .iter()
        .map(|p| p.nodes.iter().map(String::as_str).collect())
        .collect();
    assert_eq!(
        sequences,
        [
            vec!["start", "step-1", "step-2", "step-3", "end"],
            vec!["start", "step-1", "step-3", "end"],
        ]
    );
    let counts: Vec<usize> = paths.iter().map(|p| p.step_count).collect();
    assert_eq!(counts, [3, 2]);
}

#[test]
fn execution_paths_skip_cycles() {
    let wf = branch(workflow("Loop", &["A", "B"]), "step-2", &["step-1"]);
    let paths = find_execution_paths(&graph::build_from_parsed(&wf, "loop"));
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].nodes, ["start", "step-1", "step-2", "end"]);
}

#[test]
fn execution_paths_count_only_step_nodes() {
    let mut wf = workflow("Gate", &["Check", "Act"]);
    wf.steps[0].step_type = "condition".into();
    let paths = find_execution_paths(&graph::build_from_parsed(&wf, "gate"));
    assert_eq!(paths[0].step_count, 1);
}

#[test]
fn zero_step_graph_has_no_path() {
    let paths = find_execution_paths(&graph::build_from_parsed(&workflow("Empty", &[]), "empty"));
    assert!(paths.is_empty());
}

#[test]
fn long_prose_document_is_walked_without_recursion() {
    let body: String = (1..=5_000).map(|i| format!("- Item {}\n", i)).collect();
    let parsed = flowgraph::parse::parse(&format!("# Long\n\n{}", body), None).expect("parse");
    let graph = graph::build_from_parsed(&parsed, "long");

    assert_eq!(graph.metadata.total_steps, 5_000);
    assert!(graph.metadata.circular_dependencies.is_empty());

    let paths = find_execution_paths(&graph);
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].step_count, 5_000);
    assert_eq!(paths[0].nodes.last().map(String::as_str), Some("end"));
    assert_eq!(calculate_metrics(&graph).max_path_length, 5_001);
}
