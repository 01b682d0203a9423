//! Parsed workflow document types.
//!
//! These are the serde target consumed by the presentation layer, so field
//! names are camelCase on the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// DOCUMENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedWorkflow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub steps: Vec<WorkflowStep>,
    /// Declaration order, duplicates kept.
    pub dependencies: Vec<WorkflowDependency>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ParsedWorkflow {
    pub fn step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }
}

// =============================================================================
// STEPS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<StepNext>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl WorkflowStep {
    /// A bare step of type `action`, as produced by prose scanning.
    pub fn action(id: impl Into<String>, name: impl Into<String>) -> Self {
        WorkflowStep {
            id: id.into(),
            name: name.into(),
            description: None,
            step_type: "action".into(),
            action: None,
            agent: None,
            workflow: None,
            resources: None,
            conditions: None,
            next: None,
            metadata: Map::new(),
        }
    }

    pub fn is_condition(&self) -> bool {
        matches!(self.step_type.as_str(), "condition" | "decision")
    }

    /// Whether this step names `dep` in the field matching its type.
    pub fn references(&self, dep: &WorkflowDependency) -> bool {
        match dep.kind {
            DependencyKind::Agent => self.agent.as_deref() == Some(dep.name.as_str()),
            DependencyKind::Workflow => self.workflow.as_deref() == Some(dep.name.as_str()),
            DependencyKind::Resource => self
                .resources
                .as_ref()
                .is_some_and(|r| r.iter().any(|name| name == &dep.name)),
        }
    }

    pub fn next_targets(&self) -> &[String] {
        match &self.next {
            Some(next) => next.targets(),
            None => &[],
        }
    }
}

/// Successor ids. More than one signals branching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepNext {
    One(String),
    Many(Vec<String>),
}

impl StepNext {
    pub fn targets(&self) -> &[String] {
        match self {
            StepNext::One(id) => std::slice::from_ref(id),
            StepNext::Many(ids) => ids,
        }
    }

    pub fn is_branching(&self) -> bool {
        self.targets().len() > 1
    }

    pub fn targets_mut(&mut self) -> &mut [String] {
        match self {
            StepNext::One(id) => std::slice::from_mut(id),
            StepNext::Many(ids) => ids,
        }
    }
}

// =============================================================================
// DEPENDENCIES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Agent,
    Workflow,
    Resource,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Agent => "agent",
            DependencyKind::Workflow => "workflow",
            DependencyKind::Resource => "resource",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "agent" | "agents" => Ok(DependencyKind::Agent),
            "workflow" | "workflows" => Ok(DependencyKind::Workflow),
            "resource" | "resources" => Ok(DependencyKind::Resource),
            other => Err(format!("unknown dependency type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDependency {
    #[serde(rename = "type")]
    pub kind: DependencyKind,
    pub name: String,
    /// Explicit path override, used verbatim by the resolver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub required: bool,
}

impl WorkflowDependency {
    pub fn new(kind: DependencyKind, name: impl Into<String>) -> Self {
        WorkflowDependency {
            kind,
            name: name.into(),
            path: None,
            required: true,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// `type:name`
    pub fn logical_key(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }
}

/// Splits a `type:name` reference.
pub fn parse_logical_reference(reference: &str) -> Option<(DependencyKind, &str)> {
    let (kind, name) = reference.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((kind.parse().ok()?, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_reference_round_trip() {
        let dep = WorkflowDependency::new(DependencyKind::Agent, "helper");
        assert_eq!(dep.logical_key(), "agent:helper");
        assert_eq!(
            parse_logical_reference("agent:helper"),
            Some((DependencyKind::Agent, "helper"))
        );
    }

    #[test]
    fn logical_reference_rejects_unknown_or_empty() {
        assert_eq!(parse_logical_reference("tool:grep"), None);
        assert_eq!(parse_logical_reference("agent:"), None);
        assert_eq!(parse_logical_reference("helper"), None);
    }

    #[test]
    fn step_next_accepts_one_or_many() {
        let one: StepNext = serde_json::from_str(r#""step-2""#).unwrap();
        let many: StepNext = serde_json::from_str(r#"["step-2", "step-3"]"#).unwrap();
        assert!(!one.is_branching());
        assert!(many.is_branching());
        assert_eq!(many.targets(), ["step-2", "step-3"]);
    }
}
