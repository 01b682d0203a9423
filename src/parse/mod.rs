//! Parse phase: workflow document text → `ParsedWorkflow`.
//!
//! Never touches the filesystem. Fails only when the document structure is
//! unusable (for example an unterminated front-matter block); malformed or
//! missing step lists simply produce fewer steps.

pub mod document;
pub mod workflow;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use workflow::*;

use crate::error::ParseError;

const TRACING_TARGET: &str = "flowgraph::parse";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// `---` front-matter followed by prose.
    Markdown,
    /// A single YAML or JSON key/value mapping.
    Structured,
}

impl DocumentFormat {
    /// Front-matter implies markdown; a mapping with workflow keys implies
    /// structured; anything else is treated as markdown prose.
    pub fn detect(text: &str) -> Self {
        if document::has_front_matter(text) {
            DocumentFormat::Markdown
        } else if document::looks_structured(text) {
            DocumentFormat::Structured
        } else {
            DocumentFormat::Markdown
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Markdown => write!(f, "markdown"),
            DocumentFormat::Structured => write!(f, "structured"),
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(DocumentFormat::Markdown),
            "structured" | "yaml" | "yml" | "json" => Ok(DocumentFormat::Structured),
            other => Err(format!("unknown document format '{}'", other)),
        }
    }
}

/// Parse a workflow document, auto-detecting the format when no hint is given.
pub fn parse(text: &str, format: Option<DocumentFormat>) -> Result<ParsedWorkflow, ParseError> {
    let format = format.unwrap_or_else(|| DocumentFormat::detect(text));
    let workflow = match format {
        DocumentFormat::Markdown => document::parse_markdown(text)?,
        DocumentFormat::Structured => document::parse_structured(text)?,
    };

    tracing::debug!(
        target: TRACING_TARGET,
        %format,
        name = %workflow.name,
        steps = workflow.steps.len(),
        dependencies = workflow.dependencies.len(),
        "Parsed workflow document"
    );

    Ok(workflow)
}
