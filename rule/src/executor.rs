//! The rule executor.

use rulekit_core::Value;
use rulekit_mutation::{diff_by, Mutation};
use rulekit_registry::RuleDef;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ExecError, ExecResult};
use crate::log::RunLog;
use crate::snapshot::RuleSnapshot;

/// Executor options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Emit the start/end info lines for every rule.
    pub rule_logs: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { rule_logs: true }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule_logs(mut self, enabled: bool) -> Self {
        self.rule_logs = enabled;
        self
    }

    /// Only failures are logged.
    pub fn minimal() -> Self {
        Self { rule_logs: false }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub before: Value,
    pub after: Value,
    /// Ordered by rule execution order, then by path.
    pub mutations: Vec<Mutation>,
    pub logs: Vec<RunLog>,
    pub duration_ms: u64,
}

impl RunResult {
    /// Number of rules whose body failed.
    pub fn failures(&self) -> usize {
        self.logs.iter().filter(|l| l.is_error()).count()
    }

    /// Everything but the timing, for comparing two runs.
    pub fn same_outcome(&self, other: &RunResult) -> bool {
        self.before == other.before
            && self.after == other.after
            && self.mutations == other.mutations
            && self.logs == other.logs
    }
}

/// Runs rule snapshots over documents.
///
/// The executor holds no per-run state, so one instance can serve many
/// parallel runs.
#[derive(Debug, Clone, Default)]
pub struct RuleExecutor {
    options: RunOptions,
}

impl RuleExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RunOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run every enabled rule of `snapshot` over `document`.
    ///
    /// Rule failures are logged and skipped. A change outside a rule's
    /// declared writes aborts the run with `ExecError::UndeclaredWrite`.
    pub fn run(&self, document: &Value, snapshot: &RuleSnapshot) -> ExecResult<RunResult> {
        let started = Instant::now();
        let mut current = document.clone();
        let mut mutations = Vec::new();
        let mut logs = Vec::new();

        for rule in snapshot.ordered_rules() {
            if self.options.rule_logs {
                logs.push(RunLog::info(&rule.id, format!("Rule {} started", rule.name)));
            }
            debug!(rule_id = %rule.id, name = %rule.name, "invoking rule");

            let next = match rule.body.invoke(&current) {
                Ok(next) => next,
                Err(failure) => {
                    warn!(rule_id = %rule.id, error = %failure, "rule failed");
                    logs.push(RunLog::error(
                        &rule.id,
                        format!("Rule {} failed: {}", rule.name, failure),
                    ));
                    continue;
                }
            };

            let changes = diff_by(&rule.id, &current, &next);
            check_declared_writes(rule, &changes)?;
            if self.options.rule_logs {
                logs.push(RunLog::info(
                    &rule.id,
                    format!("Rule {} completed with {} mutation(s)", rule.name, changes.len()),
                ));
            }
            mutations.extend(changes);
            current = next;
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            rules = snapshot.graph().len(),
            mutations = mutations.len(),
            duration_ms,
            "run completed"
        );
        Ok(RunResult {
            before: document.clone(),
            after: current,
            mutations,
            logs,
            duration_ms,
        })
    }
}

fn check_declared_writes(rule: &RuleDef, changes: &[Mutation]) -> ExecResult<()> {
    for change in changes {
        if let Some(leaf) = change
            .touched_leaves()
            .into_iter()
            .find(|leaf| !rule.declares_write(leaf))
        {
            warn!(rule_id = %rule.id, path = %leaf, "undeclared write");
            return Err(ExecError::undeclared_write(&rule.id, &leaf));
        }
    }
    Ok(())
}
