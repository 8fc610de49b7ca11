//! Executable rule bodies.
//!
//! A body is an opaque unit supplied by the rule author. It receives the
//! current document snapshot and returns a new one; it never mutates its
//! input. Failures are values, collected into the run log by the executor.

use rulekit_core::{FieldPath, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A rule body failed while transforming a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RuleFailure {
    pub message: String,
}

impl RuleFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// An `assert` inside the body did not hold.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::new(format!("Assertion failed: {}", message.into()))
    }
}

/// How a body was authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Compiled into the kit.
    Builtin,
    /// Declarative blocks from the rule builder.
    Blocks,
    /// Native code handed in by an embedding application.
    Native,
}

/// The executable part of a rule.
pub trait RuleBody: Send + Sync + fmt::Debug {
    /// Transform `document` into a new snapshot.
    fn invoke(&self, document: &Value) -> Result<Value, RuleFailure>;

    /// Source text identifying this body (hashed into the rule's code hash).
    fn source(&self) -> String;

    fn kind(&self) -> BodyKind;

    /// Reads implied by the body itself, used when none are declared.
    fn inferred_reads(&self) -> BTreeSet<FieldPath> {
        BTreeSet::new()
    }

    /// Writes implied by the body itself, used when none are declared.
    fn inferred_writes(&self) -> BTreeSet<FieldPath> {
        BTreeSet::new()
    }
}

type BodyFn = dyn Fn(&Value) -> Result<Value, RuleFailure> + Send + Sync;

/// A body backed by a Rust closure.
#[derive(Clone)]
pub struct FnBody {
    source: String,
    kind: BodyKind,
    func: Arc<BodyFn>,
}

impl FnBody {
    /// A native body; `source` names the code for hashing.
    pub fn new<F>(source: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, RuleFailure> + Send + Sync + 'static,
    {
        Self {
            source: source.into(),
            kind: BodyKind::Native,
            func: Arc::new(func),
        }
    }

    pub(crate) fn builtin<F>(source: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, RuleFailure> + Send + Sync + 'static,
    {
        Self {
            kind: BodyKind::Builtin,
            ..Self::new(source, func)
        }
    }
}

impl fmt::Debug for FnBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBody")
            .field("source", &self.source)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl RuleBody for FnBody {
    fn invoke(&self, document: &Value) -> Result<Value, RuleFailure> {
        (self.func)(document)
    }

    fn source(&self) -> String {
        self.source.clone()
    }

    fn kind(&self) -> BodyKind {
        self.kind
    }
}
