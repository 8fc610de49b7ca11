//! Rulekit Dependency Graph
//!
//! Orders enabled rules by their declared field-path dependencies.
//!
//! Responsibilities:
//! - Build write -> read edges between enabled rules
//! - Detect cycles (reported in cycle order)
//! - Produce a deterministic total order for the executor

mod dependency;
mod error;

pub use dependency::DependencyGraph;
pub use error::{GraphError, GraphResult};
