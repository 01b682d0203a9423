//! Error types shared across the engine phases.
//!
//! Only parse failures and unexpected I/O are real errors. Validation and
//! resolution problems are reported as data (see `analyze::ValidationIssue`
//! and `resolve::ResolvedDependency`).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Resolve,
    Export,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Parse => write!(f, "Parse"),
            Phase::Resolve => write!(f, "Resolve"),
            Phase::Export => write!(f, "Export"),
        }
    }
}

/// A workflow document whose structure cannot be parsed at all.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("front-matter block opened with '---' is never closed")]
    UnterminatedFrontMatter,

    #[error("invalid front-matter: {0}")]
    FrontMatter(#[source] serde_yaml::Error),

    #[error("invalid structured workflow document: {0}")]
    Structured(#[source] serde_yaml::Error),

    #[error("workflow document must be a key/value mapping at the top level")]
    NotAMapping,
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::UnterminatedFrontMatter => "P001",
            ParseError::FrontMatter(_) => "P002",
            ParseError::Structured(_) => "P003",
            ParseError::NotAMapping => "P004",
        }
    }
}

/// Unexpected failures while resolving dependencies. Not-found and
/// permission-denied are data, never one of these.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no cached resolution for dependency '{0}'")]
    UnknownDependency(String),

    #[error("resolution 'replace' for '{0}' requires a replacement path")]
    MissingReplacementPath(String),
}

impl ResolveError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ResolveError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::Io { .. } => "R001",
            ResolveError::UnknownDependency(_) => "R002",
            ResolveError::MissingReplacementPath(_) => "R003",
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("cannot serialize graph: {0}")]
    Export(#[from] serde_json::Error),
}

impl EngineError {
    pub fn phase(&self) -> Phase {
        match self {
            EngineError::Parse(_) => Phase::Parse,
            EngineError::Resolve(_) => Phase::Resolve,
            EngineError::Export(_) => Phase::Export,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Parse(e) => e.code(),
            EngineError::Resolve(e) => e.code(),
            EngineError::Export(_) => "X001",
        }
    }

    /// `[Phase:code] message`, the same shape the UI prints for diagnostics.
    pub fn describe(&self) -> String {
        format!("[{}:{}] {}", self.phase(), self.code(), self)
    }
}
