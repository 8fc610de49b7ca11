//! Session facade over the rule kit.

use rulekit_catalog::{
    field_report, CoverageSet, CoverageTracker, Evaluator, FieldCoverage, TestCatalog, TestFilter,
    TestOutcome,
};
use rulekit_core::{RuleId, Value};
use rulekit_registry::{register_builtins, RegistryBuilder, RuleDef};
use rulekit_rule::{RuleExecutor, RuleSnapshot, RunOptions, RunResult};
use rulekit_testgen::{
    PropertyReport, PropertyRunner, SuggestConfig, SuggestedTest, SuggestionEngine,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::SessionResult;
use crate::source::{RuleSource, TestSource};

/// A rule kit session.
///
/// Holds no rule or test state of its own: every operation reads the
/// sources afresh and captures its own snapshot, so coverage is never stale
/// and a registry change never reaches an operation already in flight.
#[derive(Clone)]
pub struct Session {
    rules: Arc<dyn RuleSource>,
    tests: Arc<dyn TestSource>,
    options: RunOptions,
    suggest: SuggestConfig,
}

impl Session {
    /// Create a new session.
    pub fn new(rules: impl RuleSource + 'static, tests: impl TestSource + 'static) -> Self {
        Self {
            rules: Arc::new(rules),
            tests: Arc::new(tests),
            options: RunOptions::default(),
            suggest: SuggestConfig::default(),
        }
    }

    pub fn with_run_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_suggest_config(mut self, config: SuggestConfig) -> Self {
        self.suggest = config;
        self
    }

    pub fn suggest_config(&self) -> &SuggestConfig {
        &self.suggest
    }

    /// Builtins plus the current user rules, with the dependency graph built.
    pub fn snapshot(&self) -> SessionResult<RuleSnapshot> {
        let mut builder = RegistryBuilder::new();
        register_builtins(&mut builder)?;
        for rule in self.rules.rules()? {
            builder.add_def(rule)?;
        }
        let snapshot = RuleSnapshot::new(builder.build()?)?;
        debug!(rules = snapshot.registry().len(), "rule snapshot captured");
        Ok(snapshot)
    }

    fn executor(&self) -> RuleExecutor {
        RuleExecutor::with_options(self.options.clone())
    }

    fn catalog(&self) -> SessionResult<TestCatalog> {
        Ok(TestCatalog::from_cases(self.tests.test_cases()?))
    }

    /// Run `document` through the enabled rules.
    ///
    /// `overrides` replace same-id rules (builtins included) or are added,
    /// for this run only.
    pub fn run_rule(&self, document: &Value, overrides: Vec<RuleDef>) -> SessionResult<RunResult> {
        let snapshot = self.snapshot()?.with_overrides(overrides)?;
        let result = self.executor().run(document, &snapshot)?;
        info!(
            mutations = result.mutations.len(),
            failures = result.failures(),
            duration_ms = result.duration_ms,
            "document run"
        );
        Ok(result)
    }

    /// Evaluate the enabled tests matching `filter`, highest priority first.
    pub fn evaluate_tests(&self, filter: &TestFilter) -> SessionResult<Vec<TestOutcome>> {
        let catalog = self.catalog()?;
        let evaluator = Evaluator::new(self.executor(), self.snapshot()?);
        let outcomes = evaluator.evaluate_all(&catalog.select(filter));
        let passed = outcomes.iter().filter(|o| o.passed()).count();
        info!(tests = outcomes.len(), passed, "tests evaluated");
        Ok(outcomes)
    }

    /// The (rule, field-path) pairs exercised by the enabled tests.
    pub fn compute_coverage(&self) -> SessionResult<CoverageSet> {
        let catalog = self.catalog()?;
        let evaluator = Evaluator::new(self.executor(), self.snapshot()?);
        Ok(CoverageTracker::compute(&catalog, &evaluator))
    }

    /// Per-field summary over the enabled tests, optionally for one rule.
    pub fn field_coverage(&self, rule: Option<&RuleId>) -> SessionResult<Vec<FieldCoverage>> {
        let catalog = self.catalog()?;
        let evaluator = Evaluator::new(self.executor(), self.snapshot()?);
        let cases = catalog.enabled();
        let outcomes = evaluator.evaluate_all(&cases);
        Ok(field_report(cases.into_iter().zip(outcomes.iter()), rule))
    }

    /// Ranked suggestions for the currently uncovered declared writes.
    pub fn suggest_tests(&self, limit: usize) -> SessionResult<Vec<SuggestedTest>> {
        let catalog = self.catalog()?;
        let snapshot = self.snapshot()?;
        let evaluator = Evaluator::new(self.executor(), snapshot.clone());
        let coverage = CoverageTracker::compute(&catalog, &evaluator);
        let known = self.tests.suggestion_hashes()?;

        let engine = SuggestionEngine::builder()
            .config(self.suggest.clone())
            .build();
        Ok(engine.suggest(&snapshot, &coverage, &known, limit))
    }

    /// Determinism and idempotence of one rule on random inputs.
    ///
    /// `trials` and `seed` default to the suggestion config.
    pub fn check_properties(
        &self,
        rule_id: &RuleId,
        trials: Option<usize>,
        seed: Option<u64>,
    ) -> SessionResult<PropertyReport> {
        let snapshot = self.snapshot()?;
        let runner = PropertyRunner::new(RuleExecutor::with_options(RunOptions::minimal()))
            .with_hints(self.suggest.hints.clone());
        Ok(runner.run(
            &snapshot,
            rule_id,
            trials.unwrap_or(self.suggest.property_trials),
            seed.unwrap_or(self.suggest.seed),
        )?)
    }
}
