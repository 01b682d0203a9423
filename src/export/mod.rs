//! Graph export: JSON dump, Graphviz DOT, Mermaid flowchart and an SVG
//! summary card.

pub mod style;
pub mod writer;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::{WorkflowEdge, WorkflowGraph, WorkflowNode};
use writer::DiagramWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Dot,
    Mermaid,
    Svg,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Dot => write!(f, "dot"),
            ExportFormat::Mermaid => write!(f, "mermaid"),
            ExportFormat::Svg => write!(f, "svg"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "dot" | "graphviz" => Ok(ExportFormat::Dot),
            "mermaid" | "mmd" => Ok(ExportFormat::Mermaid),
            "svg" => Ok(ExportFormat::Svg),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub include_metadata: bool,
    pub pretty: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            include_metadata: true,
            pretty: false,
        }
    }
}

impl ExportOptions {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }
}

pub fn export_graph(
    graph: &WorkflowGraph,
    options: &ExportOptions,
) -> Result<String, serde_json::Error> {
    match options.format {
        ExportFormat::Json => to_json(graph, options),
        ExportFormat::Dot => Ok(to_dot(graph, options.include_metadata)),
        ExportFormat::Mermaid => Ok(to_mermaid(graph, options.include_metadata)),
        ExportFormat::Svg => Ok(to_svg(graph)),
    }
}

// =============================================================================
// JSON
// =============================================================================

fn to_json(graph: &WorkflowGraph, options: &ExportOptions) -> Result<String, serde_json::Error> {
    if options.include_metadata {
        return write_json(graph, options.pretty);
    }
    // Going through `Value` sorts keys, so only do it when stripping.
    let mut value = serde_json::to_value(graph)?;
    strip_metadata(&mut value);
    write_json(&value, options.pretty)
}

fn write_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

/// Drop `metadata` from the graph, every node and every edge.
fn strip_metadata(value: &mut Value) {
    let Some(graph) = value.as_object_mut() else { return };
    graph.remove("metadata");
    for key in ["nodes", "edges"] {
        if let Some(Value::Array(items)) = graph.get_mut(key) {
            for item in items.iter_mut().filter_map(Value::as_object_mut) {
                item.remove("metadata");
            }
        }
    }
}

// =============================================================================
// DOT
// =============================================================================

fn to_dot(graph: &WorkflowGraph, include_metadata: bool) -> String {
    let mut w = DiagramWriter::new();
    w.block_open(&format!("digraph {}", dot_quote(&graph.name)));
    if include_metadata {
        w.line(&format!(
            "// complexity: {}, steps: {}, dependencies: {}, status: {}",
            graph.metadata.complexity,
            graph.metadata.total_steps,
            graph.metadata.dependency_count,
            graph.metadata.validation_status
        ));
    }
    w.line("rankdir=TB;");
    w.line("node [fontname=\"Helvetica\", style=filled];");
    for node in &graph.nodes {
        w.line(&dot_node(node));
    }
    for edge in &graph.edges {
        w.line(&dot_edge(edge));
    }
    w.block_close();
    w.finish()
}

fn dot_node(node: &WorkflowNode) -> String {
    format!(
        "{} [label={}, shape={}, fillcolor=\"{}\"];",
        dot_quote(&node.id),
        dot_quote(&node.name),
        style::dot_shape(node.kind),
        style::fill_color(node)
    )
}

fn dot_edge(edge: &WorkflowEdge) -> String {
    let mut attrs = format!("style={}", style::dot_edge_style(edge.kind));
    if let Some(label) = &edge.label {
        attrs.push_str(&format!(", label={}", dot_quote(label)));
    }
    format!("{} -> {} [{}];", dot_quote(&edge.source), dot_quote(&edge.target), attrs)
}

fn dot_quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

// =============================================================================
// MERMAID
// =============================================================================

fn to_mermaid(graph: &WorkflowGraph, include_metadata: bool) -> String {
    let mut w = DiagramWriter::new();
    w.line("flowchart TD");
    w.indent();
    if include_metadata {
        w.line(&format!(
            "%% {}: complexity {}, status {}",
            graph.name, graph.metadata.complexity, graph.metadata.validation_status
        ));
    }
    for node in &graph.nodes {
        let (open, close) = style::mermaid_brackets(node.kind);
        w.line(&format!(
            "{}{}\"{}\"{}",
            mermaid_id(&node.id),
            open,
            mermaid_label(&node.name),
            close
        ));
    }
    for edge in &graph.edges {
        let arrow = style::mermaid_arrow(edge.kind);
        let line = match &edge.label {
            Some(label) => format!(
                "{} {}|\"{}\"| {}",
                mermaid_id(&edge.source),
                arrow,
                mermaid_label(label),
                mermaid_id(&edge.target)
            ),
            None => format!("{} {} {}", mermaid_id(&edge.source), arrow, mermaid_id(&edge.target)),
        };
        w.line(&line);
    }
    for node in &graph.nodes {
        w.line(&format!("style {} fill:{}", mermaid_id(&node.id), style::fill_color(node)));
    }
    w.dedent();
    w.finish()
}

/// Mermaid ids must be bare words and `end` is reserved, so every id is
/// prefixed and non-alphanumerics become `_`.
fn mermaid_id(id: &str) -> String {
    let body: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("n_{}", body)
}

fn mermaid_label(text: &str) -> String {
    text.replace('"', "#quot;")
}

// =============================================================================
// SVG
// =============================================================================

fn to_svg(graph: &WorkflowGraph) -> String {
    let mut w = DiagramWriter::new();
    w.line(r#"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="120" viewBox="0 0 400 120">"#);
    w.indent();
    w.line(r##"<rect width="400" height="120" fill="#FFFFFF" stroke="#CCCCCC"/>"##);
    w.line(&format!(
        r#"<text x="20" y="45" font-family="sans-serif" font-size="16">{}</text>"#,
        xml_escape(&graph.name)
    ));
    w.line(&format!(
        r#"<text x="20" y="80" font-family="sans-serif" font-size="12">{} nodes, {} edges</text>"#,
        graph.nodes.len(),
        graph.edges.len()
    ));
    w.dedent();
    w.line("</svg>");
    w.finish()
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
