//! Test generation errors.

use rulekit_core::RuleId;
use rulekit_registry::RegistryError;
use rulekit_rule::ExecError;
use thiserror::Error;

/// Result type for test generation.
pub type TestGenResult<T> = Result<T, TestGenError>;

/// Errors surfaced to callers. Failed candidates are never reported here;
/// they are discarded.
#[derive(Debug, Error)]
pub enum TestGenError {
    #[error("Unknown rule: {0}")]
    UnknownRule(RuleId),

    #[error("Cannot isolate rule: {0}")]
    Isolation(#[from] RegistryError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}
