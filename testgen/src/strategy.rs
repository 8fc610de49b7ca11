//! Candidate generation strategies.

use rulekit_core::{FieldPath, Value};
use rulekit_registry::RuleDef;
use std::fmt;

use crate::config::SuggestConfig;
use crate::values::FieldKind;

/// An unvalidated candidate input.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub input: Value,
    /// Why this input should reach the target.
    pub reason: String,
}

/// Synthesizes candidate inputs for one (rule, declared write) target.
pub trait CandidateStrategy: Send + Sync + fmt::Debug {
    /// Tag recorded on every suggestion this strategy produces.
    fn tag(&self) -> &'static str;

    fn candidates(
        &self,
        rule: &RuleDef,
        target: &FieldPath,
        config: &SuggestConfig,
    ) -> Vec<Candidate>;
}

/// Document with every declared read set to its representative value,
/// except `skip`.
fn representative_document(
    rule: &RuleDef,
    skip: Option<&FieldPath>,
    config: &SuggestConfig,
) -> Value {
    let mut doc = Value::map();
    for read in rule.reads.iter().filter(|r| !r.is_root() && Some(*r) != skip) {
        doc.set_path(read, FieldKind::of(read, &config.hints).representative());
    }
    doc
}

/// Deterministic baseline: all reads present, then each read left out once.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticV1;

impl StaticV1 {
    pub const TAG: &'static str = "static-v1";
}

impl CandidateStrategy for StaticV1 {
    fn tag(&self) -> &'static str {
        Self::TAG
    }

    fn candidates(
        &self,
        rule: &RuleDef,
        target: &FieldPath,
        config: &SuggestConfig,
    ) -> Vec<Candidate> {
        let mut out = vec![Candidate {
            input: representative_document(rule, None, config),
            reason: format!(
                "Rule {} writes {}: every declared read set to a representative value",
                rule.name, target
            ),
        }];
        for read in rule.reads.iter().filter(|r| !r.is_root()) {
            out.push(Candidate {
                input: representative_document(rule, Some(read), config),
                reason: format!(
                    "Rule {} writes {}: declared read {} left missing",
                    rule.name, target, read
                ),
            });
        }
        out
    }
}

/// Numeric boundary probes.
pub const BOUNDARY_VALUES: &[i64] = &[-1, 0, 1, 9, 10, 99, 100, 101, 1000];

/// Probes numeric boundaries on each number-like read, plus a variant
/// with that read missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryV1;

impl BoundaryV1 {
    pub const TAG: &'static str = "boundary-v1";
}

impl CandidateStrategy for BoundaryV1 {
    fn tag(&self) -> &'static str {
        Self::TAG
    }

    fn candidates(
        &self,
        rule: &RuleDef,
        target: &FieldPath,
        config: &SuggestConfig,
    ) -> Vec<Candidate> {
        let mut out = Vec::new();
        let numeric = rule
            .reads
            .iter()
            .filter(|r| !r.is_root() && FieldKind::of(r, &config.hints) == FieldKind::Number);
        for read in numeric {
            for probe in BOUNDARY_VALUES.iter().take(config.boundary_probes) {
                let mut input = representative_document(rule, None, config);
                input.set_path(read, Value::Int(*probe));
                out.push(Candidate {
                    input,
                    reason: format!(
                        "Rule {} writes {}: boundary {} = {}",
                        rule.name, target, read, probe
                    ),
                });
            }
            out.push(Candidate {
                input: representative_document(rule, Some(read), config),
                reason: format!("Rule {} writes {}: {} missing", rule.name, target, read),
            });
        }
        out
    }
}
