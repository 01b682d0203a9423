//! Engine configuration: where the logical-reference namespace lives and how
//! much filesystem work may run at once.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::parse::DependencyKind;

pub const DEFAULT_CONCURRENCY: usize = 8;
pub const MAX_CONCURRENCY: usize = 64;
pub const DEFAULT_MAX_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Root of the logical-reference namespace.
    pub base_path: PathBuf,
    /// Upper bound on concurrent filesystem checks per operation.
    pub concurrency: usize,
    /// How many workflow documents deep the transitive cycle walk may go.
    pub max_depth: usize,
    pub agents_dir: String,
    pub workflows_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            concurrency: DEFAULT_CONCURRENCY,
            max_depth: DEFAULT_MAX_DEPTH,
            agents_dir: "extensions/agents".into(),
            workflows_dir: "extensions/workflows".into(),
        }
    }
}

impl EngineConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Concurrency clamped to `1..=MAX_CONCURRENCY`.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }

    /// Where `kind:name` lives relative to the base path.
    pub fn conventional_path(&self, kind: DependencyKind, name: &str) -> PathBuf {
        match kind {
            DependencyKind::Agent => Path::new(&self.agents_dir).join(format!("{}.md", name)),
            DependencyKind::Workflow => Path::new(&self.workflows_dir).join(name).join("README.md"),
            DependencyKind::Resource => Path::new(&self.workflows_dir).join(name),
        }
    }

    /// `<base>/<agentsDir>/<name>.md`
    pub fn agent_path(&self, name: &str) -> PathBuf {
        self.base_path.join(self.conventional_path(DependencyKind::Agent, name))
    }

    /// `<base>/<workflowsDir>/<name>/README.md`
    pub fn workflow_path(&self, name: &str) -> PathBuf {
        self.base_path.join(self.conventional_path(DependencyKind::Workflow, name))
    }

    /// `<base>/<workflowsDir>/<name>`
    pub fn resource_path(&self, name: &str) -> PathBuf {
        self.base_path.join(self.conventional_path(DependencyKind::Resource, name))
    }
}
