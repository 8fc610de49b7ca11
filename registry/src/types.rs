//! Rule definition types.

use chrono::{DateTime, Utc};
use rulekit_core::{FieldPath, RuleId};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::body::RuleBody;

/// Default semantic version for newly authored rules.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// A rule definition.
#[derive(Clone)]
pub struct RuleDef {
    /// Stable identifier.
    pub id: RuleId,
    /// Rule name (unique within a registry).
    pub name: String,
    /// Semantic version text.
    pub version: String,
    /// Compiled into the kit; cannot be replaced.
    pub builtin: bool,
    /// Disabled rules are kept in the registry but never run.
    pub enabled: bool,
    /// Executable body.
    pub body: Arc<dyn RuleBody>,
    /// Field paths the body may read.
    pub reads: BTreeSet<FieldPath>,
    /// Field paths the body may write.
    pub writes: BTreeSet<FieldPath>,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
    /// SHA-256 of the body source, uppercase hex.
    pub code_hash: String,
}

impl RuleDef {
    /// Returns true if some declared write covers `path`.
    pub fn declares_write(&self, path: &FieldPath) -> bool {
        self.writes.iter().any(|w| w.covers(path))
    }

    /// Returns true if some declared read overlaps `path`.
    pub fn declares_read(&self, path: &FieldPath) -> bool {
        self.reads.iter().any(|r| r.overlaps(path))
    }

    /// The first pair of overlapping writes between two rules.
    pub fn conflicting_write<'a>(
        &'a self,
        other: &'a RuleDef,
    ) -> Option<(&'a FieldPath, &'a FieldPath)> {
        self.writes
            .iter()
            .flat_map(|a| other.writes.iter().map(move |b| (a, b)))
            .find(|(a, b)| a.overlaps(b))
    }

    /// Returns true if this rule writes something `reader` reads.
    pub fn feeds(&self, reader: &RuleDef) -> bool {
        self.writes
            .iter()
            .any(|w| reader.reads.iter().any(|r| w.overlaps(r)))
    }
}

impl fmt::Debug for RuleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("builtin", &self.builtin)
            .field("enabled", &self.enabled)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .field("code_hash", &self.code_hash)
            .finish_non_exhaustive()
    }
}

/// Hash rule source text.
pub fn code_hash(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    format!("{:X}", digest)
}
