#![allow(dead_code)]

use std::path::{Path, PathBuf};

use flowgraph::EngineConfig;
use flowgraph::parse::{DependencyKind, ParsedWorkflow, StepNext, WorkflowDependency, WorkflowStep};
use serde_json::Map;
use tempfile::TempDir;

// =============================================================================
// ParsedWorkflow builders
// =============================================================================

/// Workflow with one action step per name (`step-1`, `step-2`, ...).
pub fn workflow(name: &str, steps: &[&str]) -> ParsedWorkflow {
    ParsedWorkflow {
        name: name.into(),
        description: None,
        version: None,
        author: None,
        steps: steps
            .iter()
            .enumerate()
            .map(|(i, s)| WorkflowStep::action(format!("step-{}", i + 1), *s))
            .collect(),
        dependencies: vec![],
        metadata: Map::new(),
    }
}

pub fn with_deps(mut wf: ParsedWorkflow, deps: Vec<WorkflowDependency>) -> ParsedWorkflow {
    wf.dependencies = deps;
    wf
}

pub fn agent(name: &str) -> WorkflowDependency {
    WorkflowDependency::new(DependencyKind::Agent, name)
}

pub fn sub_workflow(name: &str) -> WorkflowDependency {
    WorkflowDependency::new(DependencyKind::Workflow, name)
}

pub fn resource(name: &str) -> WorkflowDependency {
    WorkflowDependency::new(DependencyKind::Resource, name)
}

/// Point `step_id` at `targets` through its `next` field.
pub fn branch(mut wf: ParsedWorkflow, step_id: &str, targets: &[&str]) -> ParsedWorkflow {
    if let Some(step) = wf.steps.iter_mut().find(|s| s.id == step_id) {
        step.next = Some(match targets {
            [one] => StepNext::One(one.to_string()),
            many => StepNext::Many(many.iter().map(|t| t.to_string()).collect()),
        });
    }
    wf
}

// =============================================================================
// Filesystem registry
// =============================================================================

/// A temporary base directory laid out with the default conventions.
pub struct Registry {
    _dir: TempDir,
    base: PathBuf,
}

impl Registry {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        Self {
            base: dir.path().to_path_buf(),
            _dir: dir,
        }
    }

    /// A registry under the working directory, addressed by a relative base.
    pub fn relative() -> Self {
        let cwd = std::env::current_dir().expect("working directory");
        let dir = TempDir::new_in(&cwd).expect("create temp dir");
        let base = dir
            .path()
            .strip_prefix(&cwd)
            .expect("temp dir under working directory")
            .to_path_buf();
        Self { _dir: dir, base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig::new(self.base())
    }

    pub fn agent(&self, name: &str, body: &str) -> &Self {
        self.write(&format!("extensions/agents/{}.md", name), body)
    }

    pub fn workflow(&self, name: &str, body: &str) -> &Self {
        self.write(&format!("extensions/workflows/{}/README.md", name), body)
    }

    pub fn resource(&self, name: &str) -> &Self {
        std::fs::create_dir_all(self.base().join("extensions/workflows").join(name))
            .expect("create resource dir");
        self
    }

    pub fn write(&self, rel: &str, body: &str) -> &Self {
        let path = self.base().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(path, body).expect("write file");
        self
    }

    pub fn path(&self, rel: &str) -> String {
        self.base().join(rel).to_string_lossy().into_owned()
    }
}

/// Markdown workflow document depending on the given `type:name` references.
pub fn workflow_doc(name: &str, requires: &[&str]) -> String {
    let mut doc = format!("---\nname: {}\n", name);
    if !requires.is_empty() {
        doc.push_str("requires:\n");
        for r in requires {
            doc.push_str(&format!("  - {}\n", r));
        }
    }
    doc.push_str("---\n\n1. Run\n");
    doc
}
