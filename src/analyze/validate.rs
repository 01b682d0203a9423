//! Filesystem-backed graph validation.
//!
//! Produces a new graph with refreshed `validated` flags instead of mutating
//! the caller's graph, so concurrent validations of one graph cannot
//! interfere.

use std::path::Path;

use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};

use crate::fs;
use crate::graph::{
    NodeKind, Severity, ValidationIssue, ValidationStatus, WorkflowGraph, WorkflowNode,
};

const TRACING_TARGET: &str = "flowgraph::analyze";

pub const PATH_NOT_FOUND: &str = "PATH_NOT_FOUND";
pub const PATH_NOT_ACCESSIBLE: &str = "PATH_NOT_ACCESSIBLE";
pub const PATH_CHECK_FAILED: &str = "PATH_CHECK_FAILED";
pub const MISSING_CC_PATH: &str = "MISSING_CC_PATH";
pub const CIRCULAR_DEPENDENCY: &str = "CIRCULAR_DEPENDENCY";
pub const EDGE_ENDPOINT_MISSING: &str = "EDGE_ENDPOINT_MISSING";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub status: ValidationStatus,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn from_issues(issues: impl IntoIterator<Item = ValidationIssue>) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) = issues
            .into_iter()
            .filter(|i| i.severity != Severity::Info)
            .partition(|i| i.severity == Severity::Error);
        let status = if !errors.is_empty() {
            ValidationStatus::Invalid
        } else if !warnings.is_empty() {
            ValidationStatus::Warning
        } else {
            ValidationStatus::Valid
        };
        ValidationResult {
            valid: errors.is_empty(),
            status,
            errors,
            warnings,
        }
    }

    /// Errors followed by warnings.
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().chain(&self.warnings)
    }
}

/// A validated copy of a graph alongside the aggregated result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedGraph {
    pub graph: WorkflowGraph,
    pub result: ValidationResult,
}

/// Check every node (concurrently, at most `concurrency` at a time) and
/// edge of `graph` against the filesystem under `base_path`.
pub async fn validate_graph(
    graph: &WorkflowGraph,
    base_path: &Path,
    concurrency: usize,
) -> ValidatedGraph {
    let mut validated = graph.clone();

    let node_issues: Vec<Vec<ValidationIssue>> = stream::iter(&graph.nodes)
        .map(|node| validate_node(node, base_path))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut issues = Vec::new();
    for (node, found) in validated.nodes.iter_mut().zip(node_issues) {
        node.validated = !found.iter().any(|i| i.severity == Severity::Error);
        node.validation_errors = found.clone();
        issues.extend(found);
    }

    for edge in validated.edges.iter_mut() {
        let source = graph.contains_node(&edge.source);
        let target = graph.contains_node(&edge.target);
        edge.validated = source && target;
        if !edge.validated {
            let missing = if source { &edge.target } else { &edge.source };
            issues.push(
                ValidationIssue::error(
                    EDGE_ENDPOINT_MISSING,
                    format!("Edge '{}' references unknown node '{}'", edge.id, missing),
                )
                .at(edge.id.clone()),
            );
        }
        edge.cc_path_resolved = match (
            validated_node(&validated.nodes, &edge.source),
            validated_node(&validated.nodes, &edge.target),
        ) {
            (Some(s), Some(t)) if s.cc_path.is_some() || t.cc_path.is_some() => {
                Some(s.validated && t.validated)
            }
            _ => None,
        };
    }

    for cycle in &graph.metadata.circular_dependencies {
        issues.push(
            ValidationIssue::warning(
                CIRCULAR_DEPENDENCY,
                format!("Circular dependency detected: {}", cycle.join(" -> ")),
            )
            .at(cycle.first().cloned().unwrap_or_default()),
        );
    }

    let result = ValidationResult::from_issues(issues);
    validated.metadata.validation_status = result.status;
    validated.metadata.last_validated = Some(jiff::Timestamp::now().to_string());

    tracing::info!(
        target: TRACING_TARGET,
        graph_id = %graph.id,
        status = %result.status,
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "Validated workflow graph"
    );

    ValidatedGraph {
        graph: validated,
        result,
    }
}

fn validated_node<'a>(nodes: &'a [WorkflowNode], id: &str) -> Option<&'a WorkflowNode> {
    nodes.iter().find(|n| n.id == id)
}

async fn validate_node(node: &WorkflowNode, base_path: &Path) -> Vec<ValidationIssue> {
    match (&node.cc_path, node.kind) {
        (Some(cc_path), _) => match fs::validate_path(base_path, cc_path).await {
            Ok(check) if !check.exists => vec![
                ValidationIssue::error(
                    PATH_NOT_FOUND,
                    format!("{} '{}' not found at {}", node.kind, node.name, check.path),
                )
                .at(cc_path.clone()),
            ],
            Ok(check) if !check.accessible => vec![
                ValidationIssue::error(
                    PATH_NOT_ACCESSIBLE,
                    format!("{} '{}' is not accessible at {}", node.kind, node.name, check.path),
                )
                .at(cc_path.clone()),
            ],
            Ok(_) => vec![],
            Err(e) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    node = %node.id,
                    error = %e,
                    "Path check failed"
                );
                vec![ValidationIssue::error(PATH_CHECK_FAILED, e.to_string()).at(cc_path.clone())]
            }
        },
        (None, NodeKind::Agent | NodeKind::Workflow | NodeKind::Resource) => vec![
            ValidationIssue::warning(
                MISSING_CC_PATH,
                format!("{} '{}' has no resolved path", node.kind, node.name),
            )
            .at(node.id.clone()),
        ],
        (None, NodeKind::Start | NodeKind::End | NodeKind::Step | NodeKind::Condition) => vec![],
    }
}
