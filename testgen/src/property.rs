//! Property checks on single rules.
//!
//! Each trial builds a random document over the rule's declared reads and
//! checks that the rule, run in isolation, is deterministic and idempotent.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rulekit_core::{FieldPath, RuleId, Value};
use rulekit_registry::RegistryBuilder;
use rulekit_rule::{RuleExecutor, RuleSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::error::{TestGenError, TestGenResult};
use crate::values::FieldKind;

/// Which property a trial violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Property {
    /// Two runs on the same input agree.
    Determinism,
    /// Running again on the output changes nothing.
    Idempotence,
    /// The run was aborted.
    Completion,
}

/// A failing trial and its counterexample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFailure {
    pub property: Property,
    pub input: Value,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyReport {
    pub rule_id: RuleId,
    pub seed: u64,
    pub trials: usize,
    pub passed: usize,
    pub failed: usize,
    pub failures: Vec<PropertyFailure>,
}

/// Runs property trials.
#[derive(Debug, Clone, Default)]
pub struct PropertyRunner {
    executor: RuleExecutor,
    hints: BTreeMap<String, FieldKind>,
}

impl PropertyRunner {
    pub fn new(executor: RuleExecutor) -> Self {
        Self {
            executor,
            hints: BTreeMap::new(),
        }
    }

    pub fn with_hints(mut self, hints: BTreeMap<String, FieldKind>) -> Self {
        self.hints = hints;
        self
    }

    /// Check `rule_id` of `snapshot` over `trials` random inputs.
    pub fn run(
        &self,
        snapshot: &RuleSnapshot,
        rule_id: &RuleId,
        trials: usize,
        seed: u64,
    ) -> TestGenResult<PropertyReport> {
        let rule = snapshot
            .registry()
            .get(rule_id)
            .ok_or_else(|| TestGenError::UnknownRule(rule_id.clone()))?;

        let mut builder = RegistryBuilder::new();
        builder.add_def(rule.clone())?;
        let isolated = RuleSnapshot::new(builder.build()?)?;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut failures = Vec::new();
        for _ in 0..trials {
            let input = self.random_input(rule.reads.iter(), &mut rng);
            if let Some(failure) = self.trial(&isolated, input) {
                failures.push(failure);
            }
        }

        let failed = failures.len();
        if failed > 0 {
            warn!(rule_id = %rule_id, failed, "property violations found");
        }
        info!(rule_id = %rule_id, trials, failed, "property run completed");
        Ok(PropertyReport {
            rule_id: rule_id.clone(),
            seed,
            trials,
            passed: trials - failed,
            failed,
            failures,
        })
    }

    fn random_input<'a>(
        &self,
        reads: impl Iterator<Item = &'a FieldPath>,
        rng: &mut StdRng,
    ) -> Value {
        let mut doc = Value::map();
        for read in reads.filter(|r| !r.is_root()) {
            // Missing fields are part of the input space.
            if rng.gen_bool(0.2) {
                continue;
            }
            doc.set_path(read, FieldKind::of(read, &self.hints).random(rng));
        }
        doc
    }

    fn trial(&self, snapshot: &RuleSnapshot, input: Value) -> Option<PropertyFailure> {
        let fail = |property, message: String, input: Value| {
            Some(PropertyFailure {
                property,
                input,
                message,
            })
        };

        let first = match self.executor.run(&input, snapshot) {
            Ok(run) => run,
            Err(err) => return fail(Property::Completion, err.to_string(), input),
        };
        let second = match self.executor.run(&input, snapshot) {
            Ok(run) => run,
            Err(err) => return fail(Property::Completion, err.to_string(), input),
        };
        if !first.same_outcome(&second) {
            return fail(
                Property::Determinism,
                "two runs on the same input disagree".to_string(),
                input,
            );
        }

        // A failing rule leaves its input untouched, which is trivially
        // idempotent; only successful outputs are re-run.
        match self.executor.run(&first.after, snapshot) {
            Ok(again) if again.after == first.after => None,
            Ok(again) => fail(
                Property::Idempotence,
                format!("re-running changed {} path(s)", again.mutations.len()),
                input,
            ),
            Err(err) => fail(Property::Completion, err.to_string(), input),
        }
    }
}
