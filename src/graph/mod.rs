//! Graph phase: parsed workflow → node/edge graph with cycle report.

pub mod builder;
pub mod cycles;
pub mod index;
pub mod types;

pub use builder::{END_NODE_ID, START_NODE_ID, build_from_parsed};
pub use index::GraphIndex;
pub use types::*;
