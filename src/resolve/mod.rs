//! Dependency resolution: logical references (`agent:x`, `workflow:y`,
//! `resource:z`) → physical paths under the configured base directory.
//!
//! Results are cached per reference for the lifetime of a
//! `DependencyResolver`. Cached entries are not refreshed when the
//! filesystem changes; call `clear_cache` to force re-checks.

pub mod cache;
pub mod resolver;
pub mod types;

pub use resolver::{DependencyResolver, detect_path_conflicts, recommendations};
pub use types::*;
