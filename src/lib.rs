//! Workflow graph construction and dependency resolution.
//!
//! Pipeline: document text → [`parse`] → [`graph`] → [`analyze`] /
//! [`export`], with [`resolve`] mapping logical `type:name` references onto
//! files under a base directory. Everything that touches the filesystem goes
//! through [`fs`] and is native-only.

pub mod analyze;
pub mod config;
pub mod error;
pub mod export;
#[cfg(not(target_arch = "wasm32"))]
pub mod fs;
pub mod graph;
pub mod parse;
#[cfg(not(target_arch = "wasm32"))]
pub mod resolve;
pub mod wasm;

pub use config::EngineConfig;
pub use error::{EngineError, ParseError, Phase, ResolveError};
