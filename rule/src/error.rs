//! Executor error types.

use rulekit_core::{FieldPath, RuleId};
use rulekit_graph::GraphError;
use rulekit_registry::RegistryError;
use thiserror::Error;

/// Result type for rule runs.
pub type ExecResult<T> = Result<T, ExecError>;

/// Errors that abort a whole run.
///
/// Failures inside a single rule body are not errors; they end up in the
/// run log instead.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Cycle(#[from] GraphError),

    #[error("Rule {rule_id} changed {path}, which it does not declare as a write")]
    UndeclaredWrite { rule_id: RuleId, path: FieldPath },

    #[error("Invalid rule override: {0}")]
    Registry(#[from] RegistryError),
}

impl ExecError {
    pub fn undeclared_write(rule_id: &RuleId, path: &FieldPath) -> Self {
        Self::UndeclaredWrite {
            rule_id: rule_id.clone(),
            path: path.clone(),
        }
    }
}
