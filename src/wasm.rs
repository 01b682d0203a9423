//! WASM entry points for browser use.
//!
//! Only the filesystem-free parts of the engine are exposed: parsing, graph
//! building, structural analysis and export.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::analyze::{self, ComplexityReport, ExecutionPath, GraphMetrics};
use crate::error::EngineError;
use crate::export::{self, ExportOptions};
use crate::graph::{self, WorkflowGraph};
use crate::parse::{self, DocumentFormat, ParsedWorkflow};

/// Parse a workflow document. `format` is `markdown` or `structured`;
/// detected from the text when omitted.
#[wasm_bindgen]
pub fn parse_workflow(text: &str, format: Option<String>) -> JsValue {
    to_js(&parse_workflow_inner(text, format.as_deref()))
}

fn parse_workflow_inner(text: &str, format: Option<&str>) -> Outcome<ParsedWorkflow> {
    let format = match format.map(str::parse::<DocumentFormat>).transpose() {
        Ok(f) => f,
        Err(message) => return Outcome::input_error(message),
    };
    match parse::parse(text, format) {
        Ok(workflow) => Outcome::Success { value: workflow },
        Err(e) => Outcome::from(EngineError::from(e)),
    }
}

/// Parse a document and build its graph in one call.
#[wasm_bindgen]
pub fn build_graph(text: &str, workflow_spec_id: &str) -> JsValue {
    to_js(&build_graph_inner(text, workflow_spec_id))
}

fn build_graph_inner(text: &str, workflow_spec_id: &str) -> Outcome<WorkflowGraph> {
    match parse::parse(text, None) {
        Ok(workflow) => Outcome::Success {
            value: graph::build_from_parsed(&workflow, workflow_spec_id),
        },
        Err(e) => Outcome::from(EngineError::from(e)),
    }
}

/// Metrics, complexity and execution paths for a graph given as JSON.
#[wasm_bindgen]
pub fn analyze_structure(graph_json: &str) -> JsValue {
    to_js(&analyze_structure_inner(graph_json))
}

fn analyze_structure_inner(graph_json: &str) -> Outcome<StructureDto> {
    let graph = match serde_json::from_str::<WorkflowGraph>(graph_json) {
        Ok(g) => g,
        Err(e) => return Outcome::input_error(format!("Failed to parse graph JSON: {}", e)),
    };
    Outcome::Success {
        value: StructureDto {
            metrics: analyze::calculate_metrics(&graph),
            complexity: analyze::calculate_complexity(&graph),
            execution_paths: analyze::find_execution_paths(&graph),
        },
    }
}

/// Render a graph given as JSON. `options_json` follows `ExportOptions`
/// (`{"format": "mermaid", "includeMetadata": false}`); empty means defaults.
#[wasm_bindgen]
pub fn export_workflow_graph(graph_json: &str, options_json: &str) -> JsValue {
    to_js(&export_workflow_graph_inner(graph_json, options_json))
}

fn export_workflow_graph_inner(graph_json: &str, options_json: &str) -> Outcome<String> {
    let graph = match serde_json::from_str::<WorkflowGraph>(graph_json) {
        Ok(g) => g,
        Err(e) => return Outcome::input_error(format!("Failed to parse graph JSON: {}", e)),
    };
    let options = if options_json.trim().is_empty() {
        ExportOptions::default()
    } else {
        match serde_json::from_str::<ExportOptions>(options_json) {
            Ok(o) => o,
            Err(e) => return Outcome::input_error(format!("Failed to parse export options: {}", e)),
        }
    };
    match export::export_graph(&graph, &options) {
        Ok(text) => Outcome::Success { value: text },
        Err(e) => Outcome::from(EngineError::from(e)),
    }
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct ErrorDto {
    code: String,
    phase: String,
    message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructureDto {
    metrics: GraphMetrics,
    complexity: ComplexityReport,
    execution_paths: Vec<ExecutionPath>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Outcome<T> {
    Success { value: T },
    Error { error: ErrorDto },
}

impl<T> Outcome<T> {
    fn input_error(message: impl Into<String>) -> Self {
        Outcome::Error {
            error: ErrorDto {
                code: "I001".into(),
                phase: "Input".into(),
                message: message.into(),
            },
        }
    }
}

impl<T> From<EngineError> for Outcome<T> {
    fn from(e: EngineError) -> Self {
        Outcome::Error {
            error: ErrorDto {
                code: e.code().into(),
                phase: e.phase().to_string(),
                message: e.to_string(),
            },
        }
    }
}
