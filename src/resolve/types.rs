//! Resolution result types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::parse::DependencyKind;

pub const DEPENDENCY_NOT_FOUND: &str = "DEPENDENCY_NOT_FOUND";
pub const DEPENDENCY_NOT_ACCESSIBLE: &str = "DEPENDENCY_NOT_ACCESSIBLE";
pub const DEPENDENCY_SKIPPED: &str = "DEPENDENCY_SKIPPED";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyMetadata {
    pub exists: bool,
    pub accessible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDependency {
    /// `type:name`
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DependencyKind,
    pub name: String,
    pub logical_reference: String,
    pub physical_path: String,
    /// `exists && accessible`
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub metadata: DependencyMetadata,
}

impl ResolvedDependency {
    pub fn fail(&mut self, code: &str, message: impl Into<String>) {
        self.error_code = Some(code.into());
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
        self.error_code = None;
    }
}

// =============================================================================
// CONFLICTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    PathConflict,
    Circular,
    /// A referenced workflow document exists but cannot be parsed.
    InvalidDocument,
}

impl ConflictKind {
    pub fn code(&self) -> &'static str {
        match self {
            ConflictKind::PathConflict => "PATH_CONFLICT",
            ConflictKind::Circular => "CIRCULAR_DEPENDENCY",
            ConflictKind::InvalidDocument => "INVALID_DOCUMENT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyConflict {
    pub dependency_id: String,
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub code: String,
    pub message: String,
    pub details: Vec<String>,
}

impl DependencyConflict {
    pub fn new(
        dependency_id: impl Into<String>,
        kind: ConflictKind,
        message: impl Into<String>,
        details: Vec<String>,
    ) -> Self {
        DependencyConflict {
            dependency_id: dependency_id.into(),
            kind,
            code: kind.code().into(),
            message: message.into(),
            details,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyResolutionResult {
    pub success: bool,
    /// Input order.
    pub dependencies: Vec<ResolvedDependency>,
    pub conflicts: Vec<DependencyConflict>,
    pub missing_dependencies: Vec<ResolvedDependency>,
    /// Workflow-level cycles as logical references, e.g.
    /// `[workflow:a, workflow:b, workflow:a]`.
    pub circular_dependencies: Vec<Vec<String>>,
    /// One level of nested dependencies, keyed by the parent reference.
    pub nested_dependencies: BTreeMap<String, Vec<ResolvedDependency>>,
    pub recommendations: Vec<String>,
}

impl DependencyResolutionResult {
    pub fn conflicts_of(&self, kind: ConflictKind) -> impl Iterator<Item = &DependencyConflict> {
        self.conflicts.iter().filter(move |c| c.kind == kind)
    }
}

// =============================================================================
// RESOLUTION ACTIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionAction {
    UseExisting,
    CreatePlaceholder,
    Skip,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolution {
    pub dependency_id: String,
    pub resolution: ResolutionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_path: Option<String>,
}

impl ConflictResolution {
    pub fn new(dependency_id: impl Into<String>, resolution: ResolutionAction) -> Self {
        ConflictResolution {
            dependency_id: dependency_id.into(),
            resolution,
            new_version: None,
            replacement_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}
