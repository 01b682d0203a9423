//! Integration tests for dependency resolution against a temporary registry.

mod helpers;

use flowgraph::EngineConfig;
use flowgraph::ResolveError;
use flowgraph::parse::DependencyKind;
use flowgraph::resolve::*;
use helpers::*;

#[tokio::test]
async fn conventional_agent_path_under_base() {
    let resolver = DependencyResolver::new(EngineConfig::new("/base"));
    let dep = resolver
        .map_dependency_to_path(DependencyKind::Agent, "X", None)
        .await
        .expect("resolve");

    assert_eq!(dep.id, "agent:X");
    assert_eq!(dep.logical_reference, "agent:X");
    assert_eq!(dep.physical_path, "/base/extensions/agents/X.md");
    assert!(!dep.resolved);
    assert!(!dep.metadata.exists);
    assert_eq!(dep.error_code.as_deref(), Some(DEPENDENCY_NOT_FOUND));
}

#[tokio::test]
async fn conventional_workflow_and_resource_paths() {
    let registry = Registry::new();
    registry
        .workflow("publish", &workflow_doc("publish", &[]))
        .resource("templates");
    let resolver = DependencyResolver::new(registry.config());

    let publish = resolver
        .map_dependency_to_path(DependencyKind::Workflow, "publish", None)
        .await
        .unwrap();
    assert_eq!(publish.physical_path, registry.path("extensions/workflows/publish/README.md"));
    assert!(publish.resolved);

    let templates = resolver
        .map_dependency_to_path(DependencyKind::Resource, "templates", None)
        .await
        .unwrap();
    assert_eq!(templates.physical_path, registry.path("extensions/workflows/templates"));
    assert!(templates.resolved);
    assert!(templates.error.is_none());
}

#[tokio::test]
async fn relative_base_is_applied_once() {
    let registry = Registry::relative();
    registry
        .agent("helper", "---\nname: helper\nversion: 1.0.0\n---\n")
        .workflow("publish", &workflow_doc("publish", &["agent:helper"]));
    assert!(registry.base().is_relative());
    let wf = with_deps(
        workflow("Release", &["Ship"]),
        vec![agent("helper"), sub_workflow("publish")],
    );
    let resolver = DependencyResolver::new(registry.config());

    let result = resolver.resolve_workflow_dependencies(&wf).await.unwrap();
    assert!(result.success, "{:?}", result.dependencies);
    let helper = &result.dependencies[0];
    assert_eq!(helper.physical_path, registry.path("extensions/agents/helper.md"));
    assert_eq!(helper.metadata.version.as_deref(), Some("1.0.0"));
    assert_eq!(resolver.locate(helper), registry.base().join("extensions/agents/helper.md"));
    assert_eq!(resolver.base_relative_path(helper), "extensions/agents/helper.md");

    let nested = &result.nested_dependencies["workflow:publish"];
    assert!(nested.iter().all(|d| d.resolved));
}

#[tokio::test]
async fn placeholder_lands_under_relative_base() {
    let registry = Registry::relative();
    let resolver = DependencyResolver::new(registry.config());
    resolver
        .map_dependency_to_path(DependencyKind::Agent, "ghost", None)
        .await
        .unwrap();

    let decision = ConflictResolution::new("agent:ghost", ResolutionAction::CreatePlaceholder);
    resolver.apply_resolution(&decision).await.unwrap();
    assert!(registry.base().join("extensions/agents/ghost.md").is_file());
    assert!(!registry.base().join(registry.base()).exists());
}

#[tokio::test]
async fn custom_path_is_used_verbatim() {
    let registry = Registry::new();
    registry.write("tools/lint.md", "# Lint\n");
    let resolver = DependencyResolver::new(registry.config());

    let dep = resolver
        .map_dependency_to_path(DependencyKind::Agent, "linter", Some("tools/lint.md"))
        .await
        .unwrap();
    assert_eq!(dep.physical_path, "tools/lint.md");
    assert!(dep.resolved);
}

#[tokio::test]
async fn version_is_read_from_front_matter() {
    let registry = Registry::new();
    registry.agent("reviewer", "---\nname: reviewer\nversion: 2.1.0\n---\n\nReviews code.\n");
    let resolver = DependencyResolver::new(registry.config());

    let dep = resolver
        .map_dependency_to_path(DependencyKind::Agent, "reviewer", None)
        .await
        .unwrap();
    assert_eq!(dep.metadata.version.as_deref(), Some("2.1.0"));
}

#[tokio::test]
async fn repeated_resolution_is_cached_and_equal() {
    let registry = Registry::new();
    registry.agent("helper", "# Helper\n");
    let resolver = DependencyResolver::new(registry.config());

    let first = resolver
        .map_dependency_to_path(DependencyKind::Agent, "helper", None)
        .await
        .unwrap();
    // Filesystem changes are not observed until the cache is cleared.
    std::fs::remove_file(registry.base().join("extensions/agents/helper.md")).unwrap();
    let second = resolver
        .map_dependency_to_path(DependencyKind::Agent, "helper", None)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(second.resolved);
    assert_eq!(resolver.stats(), CacheStats { entries: 1, hits: 1, misses: 1 });

    resolver.clear_cache();
    let third = resolver
        .map_dependency_to_path(DependencyKind::Agent, "helper", None)
        .await
        .unwrap();
    assert!(!third.resolved);
}

#[tokio::test]
async fn concurrent_requests_share_one_lookup() {
    let registry = Registry::new();
    registry.agent("shared", "# Shared\n");
    let resolver = DependencyResolver::new(registry.config());

    let requests =
        (0..16).map(|_| resolver.map_dependency_to_path(DependencyKind::Agent, "shared", None));
    let results = futures::future::join_all(requests).await;

    assert!(results.iter().all(|r| r.as_ref().is_ok_and(|d| d.resolved)));
    let stats = resolver.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 15);
}

#[tokio::test]
async fn resolve_all_keeps_input_order() {
    let registry = Registry::new();
    let deps: Vec<_> = (0..20).map(|i| agent(&format!("agent{:02}", i))).collect();
    for i in (0..20).step_by(2) {
        registry.agent(&format!("agent{:02}", i), "# Agent\n");
    }
    let resolver = DependencyResolver::new(registry.config().with_concurrency(4));

    let resolved = resolver.resolve_all(&deps).await.unwrap();
    let ids: Vec<String> = resolved.iter().map(|d| d.id.clone()).collect();
    let expected: Vec<String> = deps.iter().map(|d| d.logical_key()).collect();
    assert_eq!(ids, expected);
    assert!(resolved.iter().enumerate().all(|(i, d)| d.resolved == (i % 2 == 0)));
}

// =============================================================================
// resolve_workflow_dependencies
// =============================================================================

#[tokio::test]
async fn all_dependencies_present() {
    let registry = Registry::new();
    registry.agent("reviewer", "# Reviewer\n").resource("templates");
    let wf = with_deps(
        workflow("Review", &["Run"]),
        vec![agent("reviewer"), resource("templates")],
    );
    let resolver = DependencyResolver::new(registry.config());

    let result = resolver.resolve_workflow_dependencies(&wf).await.unwrap();
    assert!(result.success);
    assert!(result.conflicts.is_empty());
    assert!(result.missing_dependencies.is_empty());
    assert_eq!(result.recommendations, ["All dependencies resolved successfully."]);
}

#[tokio::test]
async fn missing_dependencies_are_collected() {
    let registry = Registry::new();
    let wf = with_deps(
        workflow("Review", &["Run"]),
        vec![agent("ghost"), resource("nothing")],
    );
    let resolver = DependencyResolver::new(registry.config());

    let result = resolver.resolve_workflow_dependencies(&wf).await.unwrap();
    assert!(!result.success);
    let missing: Vec<&str> = result.missing_dependencies.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(missing, ["agent:ghost", "resource:nothing"]);
    assert_eq!(
        result.recommendations,
        ["Create or install 2 missing dependencies: agent:ghost, resource:nothing."]
    );
}

#[tokio::test]
async fn divergent_custom_paths_conflict() {
    let registry = Registry::new();
    registry.write("a/helper.md", "# A\n").write("b/helper.md", "# B\n");
    let wf = with_deps(
        workflow("Conflict", &["Run"]),
        vec![
            agent("helper").with_path("a/helper.md"),
            agent("helper").with_path("b/helper.md"),
        ],
    );
    let resolver = DependencyResolver::new(registry.config());

    let result = resolver.resolve_workflow_dependencies(&wf).await.unwrap();
    let conflicts: Vec<&DependencyConflict> =
        result.conflicts_of(ConflictKind::PathConflict).collect();
    assert_eq!(conflicts.len(), 2);
    for conflict in conflicts {
        assert_eq!(conflict.dependency_id, "agent:helper");
        assert_eq!(conflict.code, "PATH_CONFLICT");
        assert_eq!(conflict.kind, ConflictKind::PathConflict);
        assert_eq!(conflict.details, ["a/helper.md", "b/helper.md"]);
    }
    assert!(!result.success);
    assert!(result.missing_dependencies.is_empty());
}

#[tokio::test]
async fn nested_workflow_dependencies_one_level() {
    let registry = Registry::new();
    registry
        .workflow("publish", &workflow_doc("publish", &["agent:packager", "workflow:notify"]))
        .workflow("notify", &workflow_doc("notify", &["agent:mailer"]))
        .agent("packager", "# Packager\n");
    let wf = with_deps(workflow("Release", &["Ship"]), vec![sub_workflow("publish")]);
    let resolver = DependencyResolver::new(registry.config());

    let result = resolver.resolve_workflow_dependencies(&wf).await.unwrap();
    assert_eq!(result.nested_dependencies.len(), 1);
    let nested = &result.nested_dependencies["workflow:publish"];
    let ids: Vec<&str> = nested.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["agent:packager", "workflow:notify"]);
    assert!(nested.iter().all(|d| d.resolved));
    assert!(result.circular_dependencies.is_empty());
}

#[tokio::test]
async fn unparseable_nested_workflow_is_reported() {
    let registry = Registry::new();
    registry.workflow("broken", "---\nname: broken\n\nno closing delimiter\n");
    let wf = with_deps(workflow("Outer", &["Run"]), vec![sub_workflow("broken")]);
    let resolver = DependencyResolver::new(registry.config());

    let result = resolver.resolve_workflow_dependencies(&wf).await.unwrap();
    let invalid: Vec<&DependencyConflict> =
        result.conflicts_of(ConflictKind::InvalidDocument).collect();
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].dependency_id, "workflow:broken");
    assert!(result.nested_dependencies.is_empty());
    assert!(!result.success);
    assert_eq!(
        result.recommendations,
        ["Fix 1 unreadable workflow document: workflow:broken."]
    );
}

#[tokio::test]
async fn transitive_workflow_cycle_is_found() {
    let registry = Registry::new();
    registry
        .workflow("beta", &workflow_doc("beta", &["workflow:gamma"]))
        .workflow("gamma", &workflow_doc("gamma", &["workflow:alpha"]))
        .workflow("alpha", &workflow_doc("alpha", &["workflow:beta"]));
    let wf = with_deps(workflow("alpha", &["Start"]), vec![sub_workflow("beta")]);
    let resolver = DependencyResolver::new(registry.config());

    let result = resolver.resolve_workflow_dependencies(&wf).await.unwrap();
    assert_eq!(
        result.circular_dependencies,
        vec![vec![
            "workflow:alpha".to_string(),
            "workflow:beta".into(),
            "workflow:gamma".into(),
            "workflow:alpha".into(),
        ]]
    );
    assert_eq!(result.conflicts_of(ConflictKind::Circular).count(), 1);
    assert!(!result.success);
    assert!(result.recommendations[0].starts_with("Break 1 circular workflow reference:"));
}

#[tokio::test]
async fn cycle_walk_respects_max_depth() {
    let registry = Registry::new();
    registry
        .workflow("beta", &workflow_doc("beta", &["workflow:gamma"]))
        .workflow("gamma", &workflow_doc("gamma", &["workflow:alpha"]));
    let wf = with_deps(workflow("alpha", &["Start"]), vec![sub_workflow("beta")]);
    let resolver = DependencyResolver::new(registry.config().with_max_depth(1));

    let cycles = resolver.find_workflow_cycles(&wf).await.unwrap();
    assert!(cycles.is_empty());
}

// =============================================================================
// apply_resolution
// =============================================================================

#[tokio::test]
async fn create_placeholder_makes_dependency_resolvable() {
    let registry = Registry::new();
    let resolver = DependencyResolver::new(registry.config());
    let missing = resolver
        .map_dependency_to_path(DependencyKind::Agent, "ghost", None)
        .await
        .unwrap();
    assert!(!missing.resolved);

    let mut decision = ConflictResolution::new("agent:ghost", ResolutionAction::CreatePlaceholder);
    decision.new_version = Some("0.1.0".into());
    let updated = resolver.apply_resolution(&decision).await.unwrap();

    assert_eq!(updated.len(), 1);
    assert!(updated[0].resolved);
    assert!(updated[0].error.is_none());
    assert_eq!(updated[0].metadata.version.as_deref(), Some("0.1.0"));
    assert!(registry.base().join("extensions/agents/ghost.md").is_file());
    assert_eq!(resolver.cached("agent:ghost").await, Some(updated[0].clone()));
}

#[tokio::test]
async fn skip_marks_dependency() {
    let registry = Registry::new();
    let resolver = DependencyResolver::new(registry.config());
    resolver
        .map_dependency_to_path(DependencyKind::Resource, "assets", None)
        .await
        .unwrap();

    let updated = resolver
        .apply_resolution(&ConflictResolution::new("resource:assets", ResolutionAction::Skip))
        .await
        .unwrap();
    assert_eq!(updated[0].error_code.as_deref(), Some(DEPENDENCY_SKIPPED));
    assert!(!updated[0].resolved);
}

#[tokio::test]
async fn replace_points_at_new_path() {
    let registry = Registry::new();
    registry.write("vendor/helper.md", "# Helper\n");
    let resolver = DependencyResolver::new(registry.config());
    resolver
        .map_dependency_to_path(DependencyKind::Agent, "helper", None)
        .await
        .unwrap();

    let mut decision = ConflictResolution::new("agent:helper", ResolutionAction::Replace);
    let err = resolver.apply_resolution(&decision).await.unwrap_err();
    assert!(matches!(err, ResolveError::MissingReplacementPath(_)));

    decision.replacement_path = Some("vendor/helper.md".into());
    let updated = resolver.apply_resolution(&decision).await.unwrap();
    assert_eq!(updated[0].physical_path, "vendor/helper.md");
    assert!(updated[0].resolved);
    assert!(updated[0].error_code.is_none());
}

#[tokio::test]
async fn unknown_dependency_cannot_be_resolved() {
    let registry = Registry::new();
    let resolver = DependencyResolver::new(registry.config());
    let decision = ConflictResolution::new("agent:never-seen", ResolutionAction::UseExisting);
    let err = resolver.apply_resolution(&decision).await.unwrap_err();
    assert_eq!(err.code(), "R002");
}
