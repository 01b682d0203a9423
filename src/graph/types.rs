//! Workflow graph data model.
//!
//! Built once by `graph::build_from_parsed`; validation produces a new graph
//! with refreshed flags rather than mutating a shared one.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parse::DependencyKind;

// =============================================================================
// NODES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    End,
    Step,
    Agent,
    Workflow,
    Resource,
    Condition,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::Step => "step",
            NodeKind::Agent => "agent",
            NodeKind::Workflow => "workflow",
            NodeKind::Resource => "resource",
            NodeKind::Condition => "condition",
        }
    }

    /// Agent, workflow and resource nodes point at something on disk.
    pub fn dependency_kind(&self) -> Option<DependencyKind> {
        match self {
            NodeKind::Agent => Some(DependencyKind::Agent),
            NodeKind::Workflow => Some(DependencyKind::Workflow),
            NodeKind::Resource => Some(DependencyKind::Resource),
            NodeKind::Start | NodeKind::End | NodeKind::Step | NodeKind::Condition => None,
        }
    }
}

impl From<DependencyKind> for NodeKind {
    fn from(kind: DependencyKind) -> Self {
        match kind {
            DependencyKind::Agent => NodeKind::Agent,
            DependencyKind::Workflow => NodeKind::Workflow,
            DependencyKind::Resource => NodeKind::Resource,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    /// Layout hint for renderers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u32>,
    /// Expected execution time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Filesystem path backing this node, relative to the base path or absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc_path: Option<String>,
    pub validated: bool,
    #[serde(default)]
    pub validation_errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub metadata: NodeMetadata,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, kind: NodeKind, name: impl Into<String>) -> Self {
        WorkflowNode {
            id: id.into(),
            kind,
            name: name.into(),
            description: None,
            cc_path: None,
            validated: false,
            validation_errors: Vec::new(),
            metadata: NodeMetadata::default(),
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.metadata.position = Some(Position { x, y });
        self
    }

    /// A node that failed validation with at least one error.
    pub fn is_invalid(&self) -> bool {
        self.validation_errors
            .iter()
            .any(|e| e.severity == Severity::Error)
    }
}

// =============================================================================
// EDGES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Sequence,
    Dependency,
    Condition,
    DataFlow,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Sequence => "sequence",
            EdgeKind::Dependency => "dependency",
            EdgeKind::Condition => "condition",
            EdgeKind::DataFlow => "data_flow",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMetadata {
    #[serde(rename = "async")]
    pub is_async: bool,
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub validated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc_path_resolved: Option<bool>,
    #[serde(default)]
    pub metadata: EdgeMetadata,
}

impl WorkflowEdge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        kind: EdgeKind,
    ) -> Self {
        WorkflowEdge {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind,
            label: None,
            condition: None,
            validated: false,
            cc_path_resolved: None,
            metadata: EdgeMetadata::default(),
        }
    }
}

// =============================================================================
// GRAPH
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    Warning,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStatus::Valid => write!(f, "valid"),
            ValidationStatus::Invalid => write!(f, "invalid"),
            ValidationStatus::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    pub complexity: u32,
    pub total_steps: usize,
    pub dependency_count: usize,
    pub validation_status: ValidationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_validated: Option<String>,
    /// Each cycle lists node ids and ends where it started.
    pub circular_dependencies: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowGraph {
    pub id: String,
    pub workflow_spec_id: String,
    pub name: String,
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
    pub metadata: GraphMetadata,
}

impl WorkflowGraph {
    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// The `start` node, or the first node when there is none.
    pub fn entry_node(&self) -> Option<&WorkflowNode> {
        self.nodes
            .iter()
            .find(|n| n.kind == NodeKind::Start)
            .or_else(|| self.nodes.first())
    }

    /// The `end` node, or the last node when there is none.
    pub fn exit_node(&self) -> Option<&WorkflowNode> {
        self.nodes
            .iter()
            .find(|n| n.kind == NodeKind::End)
            .or_else(|| self.nodes.last())
    }

    pub fn count_nodes(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    pub fn count_edges(&self, kind: EdgeKind) -> usize {
        self.edges.iter().filter(|e| e.kind == kind).count()
    }

    /// Total (in + out) degree per node id. Edges to unknown ids still count
    /// for the endpoint that exists.
    pub fn degrees(&self) -> HashMap<&str, usize> {
        let mut degrees: HashMap<&str, usize> =
            self.nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
        for edge in &self.edges {
            if let Some(d) = degrees.get_mut(edge.source.as_str()) {
                *d += 1;
            }
            if let Some(d) = degrees.get_mut(edge.target.as_str()) {
                *d += 1;
            }
        }
        degrees
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A structured, non-fatal validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ValidationIssue {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::with_severity(code, message, Severity::Error)
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self::with_severity(code, message, Severity::Warning)
    }

    pub fn info(code: &str, message: impl Into<String>) -> Self {
        Self::with_severity(code, message, Severity::Info)
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    fn with_severity(code: &str, message: impl Into<String>, severity: Severity) -> Self {
        ValidationIssue {
            code: code.into(),
            message: message.into(),
            severity,
            path: None,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{}] {} (at '{}')", self.code, self.message, path),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}
