//! Rulekit Session
//!
//! The interface the rule kit exposes to its collaborators.
//!
//! Responsibilities:
//! - Pull the current rules and tests from the collaborator sources
//! - Capture one rule snapshot (builtins included) per operation
//! - Run ad-hoc documents, with optional per-run rule overrides
//! - Evaluate tests, compute coverage and suggest new tests
//! - Return records for the collaborator to persist, never persist them

mod error;
mod session;
mod source;

pub use error::{SessionError, SessionResult};
pub use session::Session;
pub use source::{InMemoryRules, InMemoryTests, RuleSource, TestSource};
