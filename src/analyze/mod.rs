//! Analysis phase: filesystem validation, structural metrics, complexity
//! classification and execution-path enumeration.
//!
//! `metrics` and `paths` are pure and available everywhere; validation and
//! the `GraphAnalyzer` facade need the filesystem and are native-only.

pub mod metrics;
pub mod paths;
#[cfg(not(target_arch = "wasm32"))]
pub mod validate;

pub use metrics::{
    ComplexityLevel, ComplexityReport, GraphMetrics, calculate_complexity, calculate_metrics,
};
pub use paths::{ExecutionPath, find_execution_paths};
#[cfg(not(target_arch = "wasm32"))]
pub use validate::{ValidatedGraph, ValidationResult, validate_graph};

#[cfg(not(target_arch = "wasm32"))]
pub use analyzer::{GraphAnalysisReport, GraphAnalyzer};

#[cfg(not(target_arch = "wasm32"))]
mod analyzer {
    use futures::{StreamExt, TryStreamExt, stream};
    use serde::{Deserialize, Serialize};

    use super::validate::{
        self, CIRCULAR_DEPENDENCY, PATH_NOT_FOUND, ValidatedGraph, ValidationResult,
    };
    use super::{
        ComplexityLevel, ComplexityReport, ExecutionPath, GraphMetrics, calculate_complexity,
        calculate_metrics, find_execution_paths,
    };
    use crate::config::EngineConfig;
    use crate::error::ResolveError;
    use crate::graph::{ValidationIssue, WorkflowGraph, WorkflowNode};
    use crate::resolve::DependencyResolver;

    const TRACING_TARGET: &str = "flowgraph::analyze";

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GraphAnalysisReport {
        pub validation: ValidationResult,
        pub metrics: GraphMetrics,
        pub complexity: ComplexityReport,
        pub execution_paths: Vec<ExecutionPath>,
        pub recommendations: Vec<String>,
        /// Errors followed by warnings.
        pub issues: Vec<ValidationIssue>,
    }

    /// Validates and analyzes graphs against one base directory, resolving
    /// dependency nodes through a shared `DependencyResolver`.
    pub struct GraphAnalyzer {
        resolver: DependencyResolver,
    }

    impl GraphAnalyzer {
        pub fn new(config: EngineConfig) -> Self {
            Self::with_resolver(DependencyResolver::new(config))
        }

        pub fn with_resolver(resolver: DependencyResolver) -> Self {
            Self { resolver }
        }

        pub fn resolver(&self) -> &DependencyResolver {
            &self.resolver
        }

        /// Copy of `graph` with `ccPath` set on every agent, workflow and
        /// resource node that lacks one. Attached paths are relative to the
        /// base, like paths declared in the document, which are kept.
        pub async fn attach_paths(
            &self,
            graph: &WorkflowGraph,
        ) -> Result<WorkflowGraph, ResolveError> {
            let nodes: Vec<WorkflowNode> = stream::iter(&graph.nodes)
                .map(|node| self.attach_path(node))
                .buffered(self.resolver.config().effective_concurrency())
                .try_collect()
                .await?;
            Ok(WorkflowGraph {
                nodes,
                ..graph.clone()
            })
        }

        async fn attach_path(&self, node: &WorkflowNode) -> Result<WorkflowNode, ResolveError> {
            let mut node = node.clone();
            if let (None, Some(kind)) = (&node.cc_path, node.kind.dependency_kind()) {
                let resolved = self.resolver.map_dependency_to_path(kind, &node.name, None).await?;
                node.cc_path = Some(self.resolver.base_relative_path(&resolved));
            }
            Ok(node)
        }

        pub async fn validate(&self, graph: &WorkflowGraph) -> ValidatedGraph {
            let config = self.resolver.config();
            validate::validate_graph(graph, config.base_path(), config.effective_concurrency())
                .await
        }

        /// Attach paths, validate and compute every structural measure. The
        /// returned graph carries the refreshed validation state.
        pub async fn analyze(
            &self,
            graph: &WorkflowGraph,
        ) -> Result<(WorkflowGraph, GraphAnalysisReport), ResolveError> {
            let attached = self.attach_paths(graph).await?;
            let ValidatedGraph { graph, result } = self.validate(&attached).await;

            let metrics = calculate_metrics(&graph);
            let complexity = calculate_complexity(&graph);
            let execution_paths = find_execution_paths(&graph);
            let recommendations = recommend(&result, &metrics, &complexity);
            let issues = result.issues().cloned().collect();

            tracing::info!(
                target: TRACING_TARGET,
                graph_id = %graph.id,
                nodes = metrics.node_count,
                edges = metrics.edge_count,
                paths = execution_paths.len(),
                "Analyzed workflow graph"
            );

            let report = GraphAnalysisReport {
                validation: result,
                metrics,
                complexity,
                execution_paths,
                recommendations,
                issues,
            };
            Ok((graph, report))
        }
    }

    fn recommend(
        result: &ValidationResult,
        metrics: &GraphMetrics,
        complexity: &ComplexityReport,
    ) -> Vec<String> {
        let mut out = Vec::new();
        if !result.errors.is_empty() {
            out.push(format!(
                "Fix {} validation error(s) before running this workflow.",
                result.errors.len()
            ));
        }
        let missing = count_code(&result.errors, PATH_NOT_FOUND);
        if missing > 0 {
            out.push(format!("Create or re-point {} missing dependency file(s).", missing));
        }
        let cycles = count_code(&result.warnings, CIRCULAR_DEPENDENCY);
        if cycles > 0 {
            out.push(format!("Break {} circular dependency chain(s).", cycles));
        }
        if !metrics.isolated_nodes.is_empty() {
            out.push(format!(
                "Connect or remove isolated nodes: {}.",
                metrics.isolated_nodes.join(", ")
            ));
        }
        if complexity.complexity_level == ComplexityLevel::VeryComplex {
            out.push(format!(
                "Consider splitting this workflow into sub-workflows (complexity {}).",
                complexity.overall_complexity
            ));
        }
        if out.is_empty() {
            out.push("Workflow graph is ready to run.".to_string());
        }
        out
    }

    fn count_code(issues: &[ValidationIssue], code: &str) -> usize {
        issues.iter().filter(|i| i.code == code).count()
    }
}
