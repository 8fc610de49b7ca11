//! The suggestion engine.
//!
//! For every enabled rule with declared writes that no test has exercised,
//! the strategies propose candidate inputs. Each distinct payload runs once
//! through the executor; it survives only if the run really mutates one of
//! the targets it was proposed for and covers something new.

use chrono::{DateTime, Utc};
use rulekit_catalog::{CoverageFact, CoverageSet, TestCase};
use rulekit_core::{FieldPath, PathStep, RuleId, Value};
use rulekit_rule::{RuleExecutor, RuleSnapshot, RunOptions, RunResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SuggestConfig;
use crate::hash::content_hash;
use crate::score::{DeltaScorer, Scorer};
use crate::strategy::{BoundaryV1, CandidateStrategy, StaticV1};

/// A validated, scored test proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedTest {
    pub id: Uuid,
    pub rule_id: RuleId,
    /// The declared write this suggestion was generated for.
    pub target: FieldPath,
    pub input: Value,
    pub reason: String,
    /// Previously uncovered pairs this input's run covers.
    pub coverage_delta: Vec<CoverageFact>,
    pub score: f64,
    /// Content hash of `input`.
    pub hash: String,
    pub strategy: String,
    pub created_at: DateTime<Utc>,
    /// Observed values at the covered paths.
    pub expected: Value,
}

impl SuggestedTest {
    /// Turn the suggestion into a test case.
    ///
    /// Suite defaults to `ai` and tags to `["ai"]`; priority is 3.
    pub fn promote(&self, suite: Option<&str>, tags: Option<Vec<String>>) -> TestCase {
        let tags = tags.unwrap_or_else(|| vec!["ai".to_string()]);
        TestCase::new(self.reason.clone(), self.input.clone(), self.expected.clone())
            .with_suite(suite.unwrap_or("ai"))
            .with_tags(tags)
            .with_priority(3)
    }
}

/// One candidate payload and every target it was proposed for.
struct Pending {
    input: Value,
    proposals: Vec<Proposal>,
}

struct Proposal {
    rule_id: RuleId,
    target: FieldPath,
    reason: String,
    strategy: &'static str,
}

/// Builder for a SuggestionEngine.
pub struct SuggestionEngineBuilder {
    config: SuggestConfig,
    strategies: Vec<Box<dyn CandidateStrategy>>,
    scorer: Box<dyn Scorer>,
    executor: Option<RuleExecutor>,
}

impl Default for SuggestionEngineBuilder {
    fn default() -> Self {
        Self {
            config: SuggestConfig::default(),
            strategies: Vec::new(),
            scorer: Box::new(DeltaScorer),
            executor: None,
        }
    }
}

impl SuggestionEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SuggestConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a custom strategy next to the configured builtin ones.
    pub fn strategy(mut self, strategy: impl CandidateStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn scorer(mut self, scorer: impl Scorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn executor(mut self, executor: RuleExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn build(self) -> SuggestionEngine {
        // static-v1 always runs first.
        let mut strategies: Vec<Box<dyn CandidateStrategy>> = vec![Box::new(StaticV1)];
        if self.config.strategy_enabled(BoundaryV1::TAG) {
            strategies.push(Box::new(BoundaryV1));
        }
        strategies.extend(self.strategies);

        SuggestionEngine {
            config: self.config,
            strategies,
            scorer: self.scorer,
            executor: self
                .executor
                .unwrap_or_else(|| RuleExecutor::with_options(RunOptions::minimal())),
        }
    }
}

/// Generates ranked test suggestions.
pub struct SuggestionEngine {
    config: SuggestConfig,
    strategies: Vec<Box<dyn CandidateStrategy>>,
    scorer: Box<dyn Scorer>,
    executor: RuleExecutor,
}

impl SuggestionEngine {
    pub fn builder() -> SuggestionEngineBuilder {
        SuggestionEngineBuilder::new()
    }

    pub fn config(&self) -> &SuggestConfig {
        &self.config
    }

    /// Strategy tags in the order they run.
    pub fn strategy_tags(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.tag()).collect()
    }

    /// Ranked suggestions, highest score first, at most `limit`.
    ///
    /// `known_hashes` are hashes of suggestions that already exist; matching
    /// payloads are dropped.
    pub fn suggest(
        &self,
        snapshot: &RuleSnapshot,
        coverage: &CoverageSet,
        known_hashes: &BTreeSet<String>,
        limit: usize,
    ) -> Vec<SuggestedTest> {
        let pending = self.collect_candidates(snapshot, coverage, known_hashes);
        debug!(candidates = pending.len(), "candidate payloads synthesized");

        let mut suggestions = Vec::new();
        for (hash, candidate) in pending {
            if let Some(suggestion) = self.validate(snapshot, coverage, hash, candidate) {
                suggestions.push(suggestion);
            }
        }

        suggestions.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.hash.cmp(&b.hash))
        });
        suggestions.truncate(limit);
        info!(suggestions = suggestions.len(), "suggestions ranked");
        suggestions
    }

    /// Candidates for every uncovered target, grouped by payload hash.
    fn collect_candidates(
        &self,
        snapshot: &RuleSnapshot,
        coverage: &CoverageSet,
        known_hashes: &BTreeSet<String>,
    ) -> BTreeMap<String, Pending> {
        let mut pending: BTreeMap<String, Pending> = BTreeMap::new();
        for rule in snapshot.ordered_rules() {
            for target in coverage.uncovered_writes(rule) {
                for strategy in &self.strategies {
                    for candidate in strategy.candidates(rule, target, &self.config) {
                        let hash = content_hash(&candidate.input);
                        if known_hashes.contains(&hash) {
                            continue;
                        }
                        let proposal = Proposal {
                            rule_id: rule.id.clone(),
                            target: target.clone(),
                            reason: candidate.reason,
                            strategy: strategy.tag(),
                        };
                        pending
                            .entry(hash)
                            .or_insert_with(|| Pending {
                                input: candidate.input,
                                proposals: Vec::new(),
                            })
                            .proposals
                            .push(proposal);
                    }
                }
            }
        }
        pending
    }

    /// Run a candidate and keep it if it reaches one of its targets.
    fn validate(
        &self,
        snapshot: &RuleSnapshot,
        coverage: &CoverageSet,
        hash: String,
        candidate: Pending,
    ) -> Option<SuggestedTest> {
        let run = match self.executor.run(&candidate.input, snapshot) {
            Ok(run) => run,
            Err(err) => {
                warn!(hash = %hash, error = %err, "candidate discarded: run aborted");
                return None;
            }
        };

        let Some(proposal) = candidate.proposals.into_iter().find(|p| {
            run.mutations
                .iter()
                .any(|m| m.rule_id.as_ref() == Some(&p.rule_id) && m.touches(&p.target))
        }) else {
            debug!(hash = %hash, "candidate discarded: target not mutated");
            return None;
        };

        let coverage_delta: Vec<CoverageFact> = covered_by(&run)
            .into_iter()
            .filter(|f| !coverage.contains(&f.rule_id, &f.path))
            .collect();
        if coverage_delta.is_empty() {
            debug!(hash = %hash, "candidate discarded: nothing new covered");
            return None;
        }

        let prior = coverage.for_rule(&proposal.rule_id).count();
        let score = self.scorer.score(coverage_delta.len(), prior);
        let expected = observed_fragment(&run, &coverage_delta);

        Some(SuggestedTest {
            id: Uuid::new_v4(),
            rule_id: proposal.rule_id,
            target: proposal.target,
            input: candidate.input,
            reason: proposal.reason,
            coverage_delta,
            score,
            hash,
            strategy: proposal.strategy.to_string(),
            created_at: Utc::now(),
            expected,
        })
    }
}

fn covered_by(run: &RunResult) -> BTreeSet<CoverageFact> {
    run.mutations
        .iter()
        .flat_map(CoverageFact::of_mutation)
        .collect()
}

/// The output values at the covered paths; removed paths are skipped.
fn observed_fragment(run: &RunResult, delta: &[CoverageFact]) -> Value {
    let mut fragment = Value::map();
    for fact in delta {
        let path = outside_lists(&fact.path);
        if let Some(value) = run.after.get_path(&path) {
            fragment.set_path(&path, value.clone());
        }
    }
    fragment
}

/// Lists compare whole, so a leaf inside a list asserts the entire list.
fn outside_lists(path: &FieldPath) -> FieldPath {
    let steps = path.steps();
    match steps.iter().position(|s| matches!(s, PathStep::Index(_))) {
        Some(i) => FieldPath::from_steps(steps[..i].to_vec()),
        None => path.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rulekit_core::doc;
    use rulekit_registry::{register_builtins, FnBody, RegistryBuilder};

    fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    fn snapshot() -> RuleSnapshot {
        let mut builder = RegistryBuilder::new();
        register_builtins(&mut builder).unwrap();
        builder
            .add_rule(
                "flag",
                "FlagBig",
                FnBody::new("flag", |doc| {
                    let mut out = doc.clone();
                    let amount = doc.get_path(&p("amount")).and_then(Value::as_f64);
                    if amount.is_some_and(|a| a > 100.0) {
                        out.set_path(&p("big"), Value::Bool(true));
                    }
                    Ok(out)
                }),
            )
            .reads(["amount"])
            .writes(["big"])
            .done()
            .unwrap();
        RuleSnapshot::new(builder.build().unwrap()).unwrap()
    }

    fn engine() -> SuggestionEngine {
        SuggestionEngine::builder().config(SuggestConfig::default()).build()
    }

    #[test]
    fn test_static_is_always_present() {
        let engine = SuggestionEngine::builder()
            .config(SuggestConfig::default().with_strategies(Vec::<String>::new()))
            .build();
        assert_eq!(engine.strategy_tags(), vec!["static-v1"]);
        assert_eq!(self::engine().strategy_tags(), vec!["static-v1", "boundary-v1"]);
    }

    #[test]
    fn test_suggestions_are_validated() {
        // GIVEN nothing covered
        let snapshot = snapshot();

        // WHEN
        let suggestions = engine().suggest(&snapshot, &CoverageSet::new(), &BTreeSet::new(), 50);

        // THEN every suggestion really mutates its target
        assert!(!suggestions.is_empty());
        for s in &suggestions {
            assert!(s
                .coverage_delta
                .iter()
                .any(|f| f.rule_id == s.rule_id && s.target.covers(&f.path)));
        }
        let rules: BTreeSet<&str> = suggestions.iter().map(|s| s.rule_id.as_str()).collect();
        assert!(rules.contains("Builtins.Total.FromNetTax"));
        assert!(rules.contains("Builtins.Iban.NormalizeAndValidate"));
        // `amount = 100` is not enough; only the 101 and 1000 probes reach `big`.
        let big: Vec<&SuggestedTest> = suggestions
            .iter()
            .filter(|s| s.rule_id.as_str() == "flag")
            .collect();
        assert_eq!(big.len(), 2);
        assert!(big.iter().all(|s| s.strategy == "boundary-v1"));
    }

    #[test]
    fn test_ranked_and_unique() {
        let suggestions = engine().suggest(&snapshot(), &CoverageSet::new(), &BTreeSet::new(), 50);

        let hashes: BTreeSet<&str> = suggestions.iter().map(|s| s.hash.as_str()).collect();
        assert_eq!(hashes.len(), suggestions.len());
        assert!(suggestions.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_deterministic_hashes_and_known_hashes_dropped() {
        // GIVEN
        let engine = engine();
        let snapshot = snapshot();
        let first = engine.suggest(&snapshot, &CoverageSet::new(), &BTreeSet::new(), 50);

        // WHEN
        let second = engine.suggest(&snapshot, &CoverageSet::new(), &BTreeSet::new(), 50);
        let known: BTreeSet<String> = first.iter().map(|s| s.hash.clone()).collect();
        let third = engine.suggest(&snapshot, &CoverageSet::new(), &known, 50);

        // THEN
        let h1: Vec<&str> = first.iter().map(|s| s.hash.as_str()).collect();
        let h2: Vec<&str> = second.iter().map(|s| s.hash.as_str()).collect();
        assert_eq!(h1, h2);
        assert!(third.is_empty());
    }

    #[test]
    fn test_covered_targets_are_skipped() {
        let mut coverage = CoverageSet::new();
        coverage.insert(CoverageFact::new(RuleId::from("flag"), p("big")));

        let suggestions = engine().suggest(&snapshot(), &coverage, &BTreeSet::new(), 50);

        assert!(suggestions.iter().all(|s| s.rule_id.as_str() != "flag"));
    }

    #[test]
    fn test_limit_and_promotion() {
        // GIVEN
        let suggestions = engine().suggest(&snapshot(), &CoverageSet::new(), &BTreeSet::new(), 1);
        assert_eq!(suggestions.len(), 1);
        let top = &suggestions[0];

        // WHEN
        let case = top.promote(None, None);

        // THEN
        assert_eq!(case.suite.as_deref(), Some("ai"));
        assert!(case.has_tag("ai"));
        assert_eq!(case.priority, 3);
        assert_eq!(case.input, top.input);
        assert_eq!(case.expected, top.expected);
    }

    #[test]
    fn test_total_suggestion_expects_computed_total() {
        let suggestions = engine().suggest(&snapshot(), &CoverageSet::new(), &BTreeSet::new(), 50);
        let total = suggestions
            .iter()
            .find(|s| {
                s.rule_id.as_str() == "Builtins.Total.FromNetTax" && s.strategy == "static-v1"
            })
            .unwrap();
        assert_eq!(total.input, doc! { "fields" => doc! { "net" => 100i64, "tax" => 100i64 } });
        assert_eq!(total.expected, doc! { "fields" => doc! { "total" => 200i64 } });
    }

    #[test]
    fn test_sibling_write_needs_its_own_leaf() {
        // GIVEN a rule declaring out.a and out.b whose runs only ever add
        // `out = {a: 1}`, with out.a already covered
        let mut builder = RegistryBuilder::new();
        builder
            .add_rule(
                "pair",
                "Pair",
                FnBody::new("pair", |doc| {
                    let mut out = doc.clone();
                    let mut object = Value::map();
                    object.set_path(&p("a"), Value::Int(1));
                    if doc.get_path(&p("x")).and_then(Value::as_str) == Some("never") {
                        object.set_path(&p("b"), Value::Int(2));
                    }
                    out.set_path(&p("out"), object);
                    Ok(out)
                }),
            )
            .reads(["x"])
            .writes(["out.a", "out.b"])
            .done()
            .unwrap();
        let snapshot = RuleSnapshot::new(builder.build().unwrap()).unwrap();
        let coverage: CoverageSet = [CoverageFact::new(RuleId::from("pair"), p("out.a"))]
            .into_iter()
            .collect();

        // WHEN
        let suggestions = engine().suggest(&snapshot, &coverage, &BTreeSet::new(), 50);

        // THEN no candidate reaches out.b, so none is suggested
        assert!(suggestions.is_empty());
    }
}
