//! Rulekit Rule Executor
//!
//! Runs enabled rules over a document in dependency order.
//!
//! Responsibilities:
//! - Capture an immutable rule snapshot (registry + graph) per run
//! - Invoke rule bodies sequentially, each on its predecessors' output
//! - Record per-rule mutations, attributed to the rule
//! - Turn body failures into error log lines and keep going
//! - Enforce declared write sets

mod error;
mod executor;
mod log;
mod snapshot;

pub use error::{ExecError, ExecResult};
pub use executor::{RuleExecutor, RunOptions, RunResult};
pub use log::{LogLevel, RunLog};
pub use snapshot::RuleSnapshot;
