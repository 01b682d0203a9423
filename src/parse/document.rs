//! Document → `ParsedWorkflow` for both supported formats.
//!
//! Markdown documents carry an optional `---` front-matter block followed by
//! prose; structured documents are a single YAML (or JSON) mapping. Both end
//! up as a key/value mapping that `from_mapping` turns into a workflow.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::workflow::{
    DependencyKind, ParsedWorkflow, StepNext, WorkflowDependency, WorkflowStep,
    parse_logical_reference,
};
use crate::error::ParseError;

pub const UNTITLED: &str = "Untitled Workflow";

const FRONT_MATTER_DELIMITER: &str = "---";

/// Step metadata key holding the id the author wrote.
pub const DECLARED_ID: &str = "declaredId";

/// Keys with a meaning of their own; everything else lands in `metadata`.
const RESERVED_KEYS: &[&str] = &[
    "name",
    "title",
    "description",
    "version",
    "author",
    "steps",
    "agents",
    "workflows",
    "resources",
    "requires",
];

static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[.)]\s+(.+?)\s*$").unwrap());
static UNCHECKED_TASK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+\[ \]\s+(.+?)\s*$").unwrap());
static CHECKED_TASK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+\[[xX]\]\s+").unwrap());
static BULLET_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+(.+?)\s*$").unwrap());

// =============================================================================
// MARKDOWN
// =============================================================================

/// True if the first non-blank line is a `---` delimiter.
pub fn has_front_matter(text: &str) -> bool {
    text.trim_start_matches('\u{feff}')
        .lines()
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| l.trim_end() == FRONT_MATTER_DELIMITER)
}

/// Split a markdown document into its front-matter YAML (if any) and body.
pub fn split_front_matter(text: &str) -> Result<(Option<String>, String), ParseError> {
    if !has_front_matter(text) {
        return Ok((None, text.to_string()));
    }

    let mut lines = text
        .trim_start_matches('\u{feff}')
        .lines()
        .skip_while(|l| l.trim().is_empty());
    // Opening delimiter.
    lines.next();

    let mut front = Vec::new();
    let mut closed = false;
    for line in lines.by_ref() {
        let trimmed = line.trim_end();
        if trimmed == FRONT_MATTER_DELIMITER || trimmed == "..." {
            closed = true;
            break;
        }
        front.push(line);
    }

    if !closed {
        return Err(ParseError::UnterminatedFrontMatter);
    }

    let body: Vec<&str> = lines.collect();
    Ok((Some(front.join("\n")), body.join("\n")))
}

pub fn parse_markdown(text: &str) -> Result<ParsedWorkflow, ParseError> {
    let (front, body) = split_front_matter(text)?;

    let mapping = match front {
        Some(yaml) if !yaml.trim().is_empty() => {
            let value: Value = serde_yaml::from_str(&yaml).map_err(ParseError::FrontMatter)?;
            match value {
                Value::Object(map) => map,
                Value::Null => Map::new(),
                _ => return Err(ParseError::NotAMapping),
            }
        }
        _ => Map::new(),
    };

    Ok(from_mapping(mapping, Some(&body)))
}

// =============================================================================
// STRUCTURED
// =============================================================================

pub fn parse_structured(text: &str) -> Result<ParsedWorkflow, ParseError> {
    let value: Value = serde_yaml::from_str(text).map_err(ParseError::Structured)?;
    match value {
        Value::Object(map) => Ok(from_mapping(map, None)),
        _ => Err(ParseError::NotAMapping),
    }
}

/// Whether `text` reads as a top-level mapping with at least one workflow
/// key. Prose like `Summary: deploy the app` is also valid YAML.
pub fn looks_structured(text: &str) -> bool {
    match serde_yaml::from_str::<Value>(text) {
        Ok(Value::Object(map)) => RESERVED_KEYS.iter().any(|key| map.contains_key(*key)),
        _ => false,
    }
}

// =============================================================================
// MAPPING → WORKFLOW
// =============================================================================

/// Build a workflow from a document mapping plus optional prose body.
pub fn from_mapping(mut map: Map<String, Value>, prose: Option<&str>) -> ParsedWorkflow {
    let name = take_string(&mut map, "name")
        .or_else(|| take_string(&mut map, "title"))
        .or_else(|| prose.and_then(first_heading))
        .unwrap_or_else(|| UNTITLED.to_string());
    let description = take_string(&mut map, "description");
    let version = take_string(&mut map, "version");
    let author = take_string(&mut map, "author");

    let mut steps = match map.remove("steps") {
        Some(Value::Array(entries)) if !entries.is_empty() => explicit_steps(&entries),
        _ => Vec::new(),
    };
    if steps.is_empty() {
        if let Some(prose) = prose {
            steps = scan_prose_steps(prose);
        }
    }

    let mut dependencies = Vec::new();
    for (key, kind) in [
        ("agents", DependencyKind::Agent),
        ("workflows", DependencyKind::Workflow),
        ("resources", DependencyKind::Resource),
    ] {
        if let Some(Value::Array(entries)) = map.remove(key) {
            dependencies.extend(entries.iter().filter_map(|e| declared_dependency(kind, e)));
        }
    }
    if let Some(Value::Array(entries)) = map.remove("requires") {
        dependencies.extend(entries.iter().filter_map(required_dependency));
    }

    for key in RESERVED_KEYS {
        map.remove(*key);
    }

    ParsedWorkflow {
        name,
        description,
        version,
        author,
        steps,
        dependencies,
        metadata: map,
    }
}

fn explicit_steps(entries: &[Value]) -> Vec<WorkflowStep> {
    let mut steps: Vec<WorkflowStep> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let id = format!("step-{}", i + 1);
            match entry {
                Value::Object(fields) => step_from_fields(id, i, fields.clone()),
                other => WorkflowStep::action(id, scalar_to_string(other).unwrap_or_default()),
            }
        })
        .collect();

    // `next` may name the author's ids; point those at the generated ones.
    let declared: HashMap<String, String> = steps
        .iter()
        .filter_map(|s| {
            let declared = s.metadata.get(DECLARED_ID).and_then(scalar_to_string)?;
            Some((declared, s.id.clone()))
        })
        .collect();
    if !declared.is_empty() {
        for target in steps
            .iter_mut()
            .filter_map(|s| s.next.as_mut())
            .flat_map(StepNext::targets_mut)
        {
            if let Some(generated) = declared.get(target.as_str()) {
                *target = generated.clone();
            }
        }
    }
    steps
}

fn step_from_fields(id: String, index: usize, mut fields: Map<String, Value>) -> WorkflowStep {
    let name = take_string(&mut fields, "name")
        .or_else(|| take_string(&mut fields, "title"))
        .unwrap_or_else(|| format!("Step {}", index + 1));
    let step_type = take_string(&mut fields, "type").unwrap_or_else(|| "action".into());
    let resources = match fields.remove("resources") {
        Some(Value::Array(items)) => Some(items.iter().filter_map(scalar_to_string).collect()),
        Some(other) => scalar_to_string(&other).map(|r| vec![r]),
        None => None,
    };
    let next = match fields.remove("next") {
        Some(Value::Array(items)) => Some(StepNext::Many(
            items.iter().filter_map(scalar_to_string).collect(),
        )),
        Some(other) => scalar_to_string(&other).map(StepNext::One),
        None => None,
    };
    // Preserve the author's own id for reference; `id` is always generated.
    if let Some(declared) = fields.remove("id") {
        fields.insert(DECLARED_ID.into(), declared);
    }

    WorkflowStep {
        id,
        name,
        description: take_string(&mut fields, "description"),
        step_type,
        action: take_string(&mut fields, "action"),
        agent: take_string(&mut fields, "agent"),
        workflow: take_string(&mut fields, "workflow"),
        resources,
        conditions: fields.remove("conditions"),
        next,
        metadata: fields,
    }
}

/// Numbered items, unchecked task items and bullets become `action` steps.
pub fn scan_prose_steps(prose: &str) -> Vec<WorkflowStep> {
    let mut steps = Vec::new();
    let mut in_fence = false;

    for line in prose.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || CHECKED_TASK.is_match(line) {
            continue;
        }

        let captured = NUMBERED_ITEM
            .captures(line)
            .or_else(|| UNCHECKED_TASK.captures(line))
            .or_else(|| BULLET_ITEM.captures(line));
        if let Some(text) = captured.and_then(|c| c.get(1)) {
            let id = format!("step-{}", steps.len() + 1);
            steps.push(WorkflowStep::action(id, text.as_str()));
        }
    }

    steps
}

fn first_heading(prose: &str) -> Option<String> {
    prose
        .lines()
        .find_map(|l| l.trim().strip_prefix("# "))
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}

fn declared_dependency(kind: DependencyKind, entry: &Value) -> Option<WorkflowDependency> {
    match entry {
        Value::Object(fields) => {
            let name = fields.get("name").and_then(scalar_to_string)?;
            Some(WorkflowDependency {
                kind,
                name,
                path: fields.get("path").and_then(scalar_to_string),
                required: fields
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(true),
            })
        }
        other => scalar_to_string(other).map(|name| WorkflowDependency::new(kind, name)),
    }
}

fn required_dependency(entry: &Value) -> Option<WorkflowDependency> {
    let reference = entry.as_str()?;
    let (kind, name) = parse_logical_reference(reference)?;
    Some(WorkflowDependency::new(kind, name))
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    map.remove(key).as_ref().and_then(scalar_to_string)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
