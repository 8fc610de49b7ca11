//! Coverage tracking.
//!
//! Coverage is always recomputed from scratch against the current catalog
//! and snapshot; nothing is cached between calls.

use rulekit_core::{FieldPath, RuleId};
use rulekit_mutation::Mutation;
use rulekit_registry::RuleDef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

use crate::catalog::TestCatalog;
use crate::evaluate::{Evaluator, TestOutcome};

/// A (rule, leaf field-path) pair exercised by at least one test run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoverageFact {
    pub rule_id: RuleId,
    pub path: FieldPath,
}

impl CoverageFact {
    pub fn new(rule_id: RuleId, path: FieldPath) -> Self {
        Self { rule_id, path }
    }

    /// One fact per leaf the mutation touched; none for unattributed changes.
    ///
    /// Adding `out = {a: 1}` exercises `out.a` only, never a sibling such
    /// as `out.b`.
    pub fn of_mutation(mutation: &Mutation) -> Vec<CoverageFact> {
        let Some(rule_id) = &mutation.rule_id else {
            return Vec::new();
        };
        mutation
            .touched_leaves()
            .into_iter()
            .map(|leaf| CoverageFact::new(rule_id.clone(), leaf))
            .collect()
    }
}

/// The covered set, ordered by rule then path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageSet {
    facts: BTreeSet<CoverageFact>,
}

impl CoverageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fact: CoverageFact) -> bool {
        self.facts.insert(fact)
    }

    pub fn contains(&self, rule_id: &RuleId, path: &FieldPath) -> bool {
        self.facts
            .contains(&CoverageFact::new(rule_id.clone(), path.clone()))
    }

    /// Some leaf written by `rule_id` lies at or below `path`.
    pub fn exercises(&self, rule_id: &RuleId, path: &FieldPath) -> bool {
        self.for_rule(rule_id).any(|f| path.covers(&f.path))
    }

    pub fn for_rule<'a>(
        &'a self,
        rule_id: &'a RuleId,
    ) -> impl Iterator<Item = &'a CoverageFact> + 'a {
        self.facts.iter().filter(move |f| &f.rule_id == rule_id)
    }

    /// Declared writes of `rule` with no covering fact yet.
    pub fn uncovered_writes<'a>(&self, rule: &'a RuleDef) -> Vec<&'a FieldPath> {
        rule.writes
            .iter()
            .filter(|w| !self.exercises(&rule.id, w))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoverageFact> {
        self.facts.iter()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn is_subset(&self, other: &CoverageSet) -> bool {
        self.facts.is_subset(&other.facts)
    }
}

impl FromIterator<CoverageFact> for CoverageSet {
    fn from_iter<I: IntoIterator<Item = CoverageFact>>(iter: I) -> Self {
        Self {
            facts: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CoverageSet {
    type Item = CoverageFact;
    type IntoIter = std::collections::btree_set::IntoIter<CoverageFact>;

    fn into_iter(self) -> Self::IntoIter {
        self.facts.into_iter()
    }
}

/// Derives the covered set from test runs.
pub struct CoverageTracker;

impl CoverageTracker {
    /// Evaluate every enabled case and reduce the mutations to coverage.
    pub fn compute(catalog: &TestCatalog, evaluator: &Evaluator) -> CoverageSet {
        let outcomes = evaluator.evaluate_all(&catalog.enabled());
        let coverage = Self::from_outcomes(&outcomes);
        info!(tests = outcomes.len(), facts = coverage.len(), "coverage computed");
        coverage
    }

    /// Coverage of already evaluated outcomes.
    ///
    /// Every completed run counts, passing or not: a mutation is evidence the
    /// rule reached the path. Aborted runs return no mutations.
    pub fn from_outcomes(outcomes: &[TestOutcome]) -> CoverageSet {
        outcomes
            .iter()
            .filter(|o| o.completed())
            .flat_map(|o| &o.mutations)
            .flat_map(CoverageFact::of_mutation)
            .collect()
    }
}
