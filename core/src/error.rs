//! Common error types for the rule kit.

use thiserror::Error;

/// A textual field path could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed field path '{path}': {reason}")]
pub struct MalformedPathError {
    /// The offending path text.
    pub path: String,
    /// What is wrong with it.
    pub reason: String,
}

impl MalformedPathError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn empty_step(path: impl Into<String>) -> Self {
        Self::new(path, "empty step")
    }

    pub fn unbalanced(path: impl Into<String>) -> Self {
        Self::new(path, "unbalanced index brackets")
    }

    pub fn unterminated_quote(path: impl Into<String>) -> Self {
        Self::new(path, "unterminated quoted key")
    }

    pub fn bad_index(path: impl Into<String>, index: impl Into<String>) -> Self {
        Self::new(path, format!("invalid array index '{}'", index.into()))
    }
}

/// Result type for path parsing.
pub type PathResult<T> = Result<T, MalformedPathError>;
