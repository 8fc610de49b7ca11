//! Session error types.

use rulekit_registry::RegistryError;
use rulekit_rule::ExecError;
use rulekit_testgen::TestGenError;
use thiserror::Error;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The rule set could not be registered.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A fatal run error (cycle, undeclared write).
    #[error("run error: {0}")]
    Exec(#[from] ExecError),

    #[error("test generation error: {0}")]
    TestGen(#[from] TestGenError),

    /// A collaborator could not supply its records.
    #[error("source unavailable: {message}")]
    SourceUnavailable { message: String },
}

impl SessionError {
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            message: message.into(),
        }
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
