//! Logical reference → physical path resolution.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use futures::{StreamExt, TryStreamExt, stream};

use super::cache::{CacheKey, ResolutionCache};
use super::types::*;
use crate::config::EngineConfig;
use crate::error::ResolveError;
use crate::fs::{self, PathType, Placeholder};
use crate::graph::cycles::find_cycles;
use crate::parse::{self, DependencyKind, ParsedWorkflow, WorkflowDependency};

const TRACING_TARGET: &str = "flowgraph::resolve";

type NestedDependencies = BTreeMap<String, Vec<ResolvedDependency>>;

pub struct DependencyResolver {
    config: EngineConfig,
    cache: ResolutionCache,
}

impl DependencyResolver {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            cache: ResolutionCache::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Forget every cached resolution. The filesystem is re-checked on the
    /// next request.
    pub fn clear_cache(&self) {
        tracing::debug!(target: TRACING_TARGET, "Clearing resolution cache");
        self.cache.clear();
    }

    /// Resolve `type:name`, using `custom_path` verbatim when given and the
    /// configured conventions otherwise.
    pub async fn map_dependency_to_path(
        &self,
        kind: DependencyKind,
        name: &str,
        custom_path: Option<&str>,
    ) -> Result<ResolvedDependency, ResolveError> {
        let id = format!("{}:{}", kind, name);
        let key = CacheKey {
            id: id.clone(),
            custom_path: custom_path.map(str::to_string),
        };
        self.cache
            .get_or_resolve(key, || self.resolve_uncached(id, kind, name, custom_path))
            .await
    }

    async fn resolve_uncached(
        &self,
        id: String,
        kind: DependencyKind,
        name: &str,
        custom_path: Option<&str>,
    ) -> Result<ResolvedDependency, ResolveError> {
        let base = self.config.base_path();
        let (physical_path, location) = match custom_path {
            Some(path) => (path.to_string(), base.join(path)),
            None => {
                let location = base.join(self.config.conventional_path(kind, name));
                (location.to_string_lossy().into_owned(), location)
            }
        };

        let validation = fs::inspect_path(&location).await?;
        let mut resolved = ResolvedDependency {
            id: id.clone(),
            kind,
            name: name.to_string(),
            logical_reference: id,
            physical_path,
            resolved: validation.is_usable(),
            error: None,
            error_code: None,
            metadata: DependencyMetadata {
                exists: validation.exists,
                accessible: validation.accessible,
                version: None,
            },
        };

        if !validation.exists {
            resolved.fail(
                DEPENDENCY_NOT_FOUND,
                format!("{} '{}' not found at {}", kind, name, validation.path),
            );
        } else if !validation.accessible {
            resolved.fail(
                DEPENDENCY_NOT_ACCESSIBLE,
                format!("{} '{}' is not accessible at {}", kind, name, validation.path),
            );
        } else if validation.path_type == PathType::File {
            resolved.metadata.version = self.document_version(Path::new(&validation.path)).await;
        }

        tracing::debug!(
            target: TRACING_TARGET,
            id = %resolved.id,
            path = %resolved.physical_path,
            resolved = resolved.resolved,
            "Resolved dependency"
        );
        Ok(resolved)
    }

    /// Conventional location of `dep`, or `None` when its path was given
    /// explicitly.
    fn conventional_location(&self, dep: &ResolvedDependency) -> Option<PathBuf> {
        let location = self
            .config
            .base_path()
            .join(self.config.conventional_path(dep.kind, &dep.name));
        (Path::new(&dep.physical_path) == location).then_some(location)
    }

    /// Filesystem location of `dep`. Conventional paths already include the
    /// base; explicit ones are relative to it.
    pub fn locate(&self, dep: &ResolvedDependency) -> PathBuf {
        self.conventional_location(dep)
            .unwrap_or_else(|| self.config.base_path().join(&dep.physical_path))
    }

    /// `dep`'s path relative to the base, as stored in a node's `ccPath`.
    pub fn base_relative_path(&self, dep: &ResolvedDependency) -> String {
        match self.conventional_location(dep) {
            Some(_) => self
                .config
                .conventional_path(dep.kind, &dep.name)
                .to_string_lossy()
                .into_owned(),
            None => dep.physical_path.clone(),
        }
    }

    /// Front-matter `version` of a markdown document, if any.
    async fn document_version(&self, path: &Path) -> Option<String> {
        if path.extension().is_none_or(|ext| ext != "md") {
            return None;
        }
        let text = fs::read_document(path)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %e,
                    "Cannot read dependency document"
                )
            })
            .ok()?;
        parse::parse(&text, Some(parse::DocumentFormat::Markdown))
            .ok()?
            .version
    }

    /// Resolve `deps` concurrently; the output keeps input order.
    pub async fn resolve_all(
        &self,
        deps: &[WorkflowDependency],
    ) -> Result<Vec<ResolvedDependency>, ResolveError> {
        stream::iter(deps)
            .map(|dep| self.map_dependency_to_path(dep.kind, &dep.name, dep.path.as_deref()))
            .buffered(self.config.effective_concurrency())
            .try_collect()
            .await
    }

    /// Resolve every dependency of `workflow`, then classify path conflicts,
    /// missing dependencies and circular workflow references, and materialize
    /// one level of nested dependencies for each resolved workflow.
    pub async fn resolve_workflow_dependencies(
        &self,
        workflow: &ParsedWorkflow,
    ) -> Result<DependencyResolutionResult, ResolveError> {
        let dependencies = self.resolve_all(&workflow.dependencies).await?;

        let mut conflicts = detect_path_conflicts(&dependencies);
        let missing_dependencies: Vec<ResolvedDependency> =
            dependencies.iter().filter(|d| !d.resolved).cloned().collect();

        let (nested_dependencies, invalid) = self.nested_dependencies(&dependencies).await?;
        conflicts.extend(invalid);

        let circular_dependencies = self.find_workflow_cycles(workflow).await?;
        for cycle in &circular_dependencies {
            let id = cycle.get(1).or(cycle.first()).cloned().unwrap_or_default();
            conflicts.push(DependencyConflict::new(
                id,
                ConflictKind::Circular,
                format!("Circular workflow reference: {}", cycle.join(" -> ")),
                cycle.clone(),
            ));
        }

        let recommendations =
            recommendations(&missing_dependencies, &conflicts, &circular_dependencies);

        tracing::info!(
            target: TRACING_TARGET,
            workflow = %workflow.name,
            dependencies = dependencies.len(),
            missing = missing_dependencies.len(),
            conflicts = conflicts.len(),
            "Resolved workflow dependencies"
        );

        Ok(DependencyResolutionResult {
            success: missing_dependencies.is_empty() && conflicts.is_empty(),
            dependencies,
            conflicts,
            missing_dependencies,
            circular_dependencies,
            nested_dependencies,
            recommendations,
        })
    }

    /// Parse each resolved workflow dependency and resolve its own
    /// dependencies. Only one level deep.
    async fn nested_dependencies(
        &self,
        dependencies: &[ResolvedDependency],
    ) -> Result<(NestedDependencies, Vec<DependencyConflict>), ResolveError> {
        let mut seen = HashSet::new();
        let workflows: Vec<&ResolvedDependency> = dependencies
            .iter()
            .filter(|d| d.kind == DependencyKind::Workflow && d.resolved)
            .filter(|d| seen.insert(d.logical_reference.clone()))
            .collect();

        let loaded: Vec<(&ResolvedDependency, Result<ParsedWorkflow, String>)> =
            stream::iter(workflows)
                .map(|dep| async move {
                    let doc = self.load_document(dep).await?;
                    Ok::<_, ResolveError>((dep, doc))
                })
                .buffered(self.config.effective_concurrency())
                .try_collect()
                .await?;

        let mut nested = BTreeMap::new();
        let mut invalid = Vec::new();
        for (dep, doc) in loaded {
            match doc {
                Ok(child) => {
                    let resolved = self.resolve_all(&child.dependencies).await?;
                    nested.insert(dep.logical_reference.clone(), resolved);
                }
                Err(message) => invalid.push(DependencyConflict::new(
                    dep.id.clone(),
                    ConflictKind::InvalidDocument,
                    message,
                    vec![dep.physical_path.clone()],
                )),
            }
        }
        Ok((nested, invalid))
    }

    /// Read and parse the document behind a resolved workflow dependency.
    /// Parse failures come back as `Err(message)`; I/O failures propagate.
    async fn load_document(
        &self,
        dep: &ResolvedDependency,
    ) -> Result<Result<ParsedWorkflow, String>, ResolveError> {
        let validation = fs::inspect_path(&self.locate(dep)).await?;
        if validation.path_type != PathType::File || !validation.accessible {
            return Ok(Err(format!(
                "Workflow reference '{}' does not point to a readable document",
                dep.id
            )));
        }
        let text = fs::read_document(Path::new(&validation.path)).await?;
        Ok(parse::parse(&text, None).map_err(|e| {
            tracing::warn!(
                target: TRACING_TARGET,
                id = %dep.id,
                error = %e,
                "Unparseable workflow document"
            );
            format!("Workflow document for '{}' cannot be parsed: {}", dep.id, e)
        }))
    }

    /// Walk workflow references across documents (up to `max_depth` levels)
    /// and report every cycle, starting from `workflow` itself.
    pub async fn find_workflow_cycles(
        &self,
        workflow: &ParsedWorkflow,
    ) -> Result<Vec<Vec<String>>, ResolveError> {
        let root = format!("{}:{}", DependencyKind::Workflow, workflow.name);
        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        adjacency.insert(root.clone(), workflow_references(workflow));

        let mut expanded: HashSet<String> = HashSet::from([root.clone()]);
        let mut frontier: Vec<WorkflowDependency> = workflow_dependencies(workflow);
        let mut depth = 0;

        while !frontier.is_empty() && depth < self.config.max_depth {
            depth += 1;
            let pending: Vec<WorkflowDependency> = frontier
                .into_iter()
                .filter(|d| expanded.insert(d.logical_key()))
                .collect();

            let loaded: Vec<(String, Option<ParsedWorkflow>)> = stream::iter(pending)
                .map(|dep| async move {
                    let resolved = self
                        .map_dependency_to_path(dep.kind, &dep.name, dep.path.as_deref())
                        .await?;
                    let doc = if resolved.resolved {
                        self.load_document(&resolved).await?.ok()
                    } else {
                        None
                    };
                    Ok::<_, ResolveError>((dep.logical_key(), doc))
                })
                .buffered(self.config.effective_concurrency())
                .try_collect()
                .await?;

            frontier = Vec::new();
            for (key, doc) in loaded {
                let Some(doc) = doc else { continue };
                adjacency.insert(key, workflow_references(&doc));
                frontier.extend(workflow_dependencies(&doc));
            }
        }

        let cycles = find_cycles([root], |key| adjacency.get(key).cloned().unwrap_or_default());
        if !cycles.is_empty() {
            tracing::warn!(
                target: TRACING_TARGET,
                cycles = cycles.len(),
                "Circular workflow references"
            );
        }
        Ok(cycles)
    }

    /// Current cached state of `id` (first entry when several path overrides
    /// exist).
    pub async fn cached(&self, id: &str) -> Option<ResolvedDependency> {
        for slot in self.cache.slots_for(id) {
            if let Some(dep) = slot.lock().await.clone() {
                return Some(dep);
            }
        }
        None
    }

    /// Apply a user decision to every cached entry for the dependency and
    /// return the updated entries. The cache is authoritative afterwards.
    pub async fn apply_resolution(
        &self,
        resolution: &ConflictResolution,
    ) -> Result<Vec<ResolvedDependency>, ResolveError> {
        let id = &resolution.dependency_id;
        let slots = self.cache.slots_for(id);
        let mut updated = Vec::new();

        for slot in slots {
            let mut guard = slot.lock().await;
            let Some(dep) = guard.as_mut() else { continue };

            match resolution.resolution {
                ResolutionAction::UseExisting => {}
                ResolutionAction::CreatePlaceholder => {
                    let path = self.locate(dep);
                    let placeholder = match dep.kind {
                        DependencyKind::Resource => Placeholder::Directory,
                        DependencyKind::Agent | DependencyKind::Workflow => Placeholder::Document {
                            name: &dep.name,
                            kind: dep.kind.as_str(),
                        },
                    };
                    fs::write_placeholder(&path, placeholder).await?;
                    dep.resolved = true;
                    dep.metadata.exists = true;
                    dep.metadata.accessible = true;
                    dep.metadata.version = resolution
                        .new_version
                        .clone()
                        .or_else(|| dep.metadata.version.clone());
                    dep.clear_error();
                }
                ResolutionAction::Skip => {
                    let message = format!("Dependency '{}' was skipped", dep.id);
                    dep.fail(DEPENDENCY_SKIPPED, message);
                }
                ResolutionAction::Replace => {
                    let replacement = resolution
                        .replacement_path
                        .as_deref()
                        .ok_or_else(|| ResolveError::MissingReplacementPath(id.clone()))?;
                    let validation = fs::validate_path(self.config.base_path(), replacement).await?;
                    dep.physical_path = replacement.to_string();
                    dep.resolved = validation.is_usable();
                    dep.metadata.exists = validation.exists;
                    dep.metadata.accessible = validation.accessible;
                    if let Some(version) = &resolution.new_version {
                        dep.metadata.version = Some(version.clone());
                    }
                    match validation.error {
                        Some(error) if !validation.exists => dep.fail(DEPENDENCY_NOT_FOUND, error),
                        Some(error) => dep.fail(DEPENDENCY_NOT_ACCESSIBLE, error),
                        None => dep.clear_error(),
                    }
                }
            }

            tracing::info!(
                target: TRACING_TARGET,
                id = %dep.id,
                action = ?resolution.resolution,
                resolved = dep.resolved,
                "Applied resolution"
            );
            updated.push(dep.clone());
        }

        if updated.is_empty() {
            return Err(ResolveError::UnknownDependency(id.clone()));
        }
        Ok(updated)
    }
}

fn workflow_dependencies(workflow: &ParsedWorkflow) -> Vec<WorkflowDependency> {
    workflow
        .dependencies
        .iter()
        .filter(|d| d.kind == DependencyKind::Workflow)
        .cloned()
        .collect()
}

fn workflow_references(workflow: &ParsedWorkflow) -> Vec<String> {
    workflow_dependencies(workflow)
        .iter()
        .map(WorkflowDependency::logical_key)
        .collect()
}

/// Entries sharing a logical key but resolving to different physical paths.
/// Every such entry gets its own conflict listing all divergent paths.
pub fn detect_path_conflicts(dependencies: &[ResolvedDependency]) -> Vec<DependencyConflict> {
    let mut groups: Vec<(&str, Vec<&ResolvedDependency>)> = Vec::new();
    for dep in dependencies {
        match groups.iter_mut().find(|(id, _)| *id == dep.id) {
            Some((_, members)) => members.push(dep),
            None => groups.push((dep.id.as_str(), vec![dep])),
        }
    }

    let mut conflicts = Vec::new();
    for (id, members) in groups {
        let mut paths: Vec<String> = Vec::new();
        for dep in &members {
            if !paths.contains(&dep.physical_path) {
                paths.push(dep.physical_path.clone());
            }
        }
        if paths.len() < 2 {
            continue;
        }
        for _ in &members {
            conflicts.push(DependencyConflict::new(
                id,
                ConflictKind::PathConflict,
                format!("'{}' resolves to {} different paths", id, paths.len()),
                paths.clone(),
            ));
        }
    }
    conflicts
}

/// One sentence per non-empty bucket, or a single affirmative sentence when
/// nothing is missing, conflicting or circular.
pub fn recommendations(
    missing: &[ResolvedDependency],
    conflicts: &[DependencyConflict],
    cycles: &[Vec<String>],
) -> Vec<String> {
    let mut out = Vec::new();

    if !missing.is_empty() {
        let ids: Vec<&str> = missing.iter().map(|d| d.id.as_str()).collect();
        out.push(format!(
            "Create or install {} missing {}: {}.",
            missing.len(),
            plural(missing.len(), "dependency", "dependencies"),
            ids.join(", ")
        ));
    }

    let mut conflicted: Vec<&str> = conflicts
        .iter()
        .filter(|c| c.kind == ConflictKind::PathConflict)
        .map(|c| c.dependency_id.as_str())
        .collect();
    conflicted.dedup();
    if !conflicted.is_empty() {
        out.push(format!(
            "Give each logical reference a single path to resolve {} path {}: {}.",
            conflicted.len(),
            plural(conflicted.len(), "conflict", "conflicts"),
            conflicted.join(", ")
        ));
    }

    let invalid: Vec<&str> = conflicts
        .iter()
        .filter(|c| c.kind == ConflictKind::InvalidDocument)
        .map(|c| c.dependency_id.as_str())
        .collect();
    if !invalid.is_empty() {
        out.push(format!(
            "Fix {} unreadable workflow {}: {}.",
            invalid.len(),
            plural(invalid.len(), "document", "documents"),
            invalid.join(", ")
        ));
    }

    if !cycles.is_empty() {
        let rendered: Vec<String> = cycles.iter().map(|c| c.join(" -> ")).collect();
        out.push(format!(
            "Break {} circular workflow {}: {}.",
            cycles.len(),
            plural(cycles.len(), "reference", "references"),
            rendered.join("; ")
        ));
    }

    if missing.is_empty() && conflicts.is_empty() && cycles.is_empty() {
        out.push("All dependencies resolved successfully.".to_string());
    }
    out
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}
