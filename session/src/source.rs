//! Collaborator contracts for rule and test persistence.

use rulekit_catalog::TestCase;
use rulekit_registry::{Registry, RuleDef};
use rulekit_testgen::SuggestedTest;
use std::collections::BTreeSet;

use crate::error::SessionResult;

/// Supplies the user-authored rule set on demand.
///
/// Builtin rules are registered by the session and must not be returned here.
pub trait RuleSource: Send + Sync {
    fn rules(&self) -> SessionResult<Vec<RuleDef>>;
}

/// Supplies test cases and the hashes of already known suggestions.
pub trait TestSource: Send + Sync {
    fn test_cases(&self) -> SessionResult<Vec<TestCase>>;

    /// Hashes of every stored suggestion, promoted or not.
    fn suggestion_hashes(&self) -> SessionResult<BTreeSet<String>>;
}

/// A fixed rule set.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRules {
    rules: Vec<RuleDef>,
}

impl InMemoryRules {
    pub fn new(rules: Vec<RuleDef>) -> Self {
        Self { rules }
    }

    /// Every rule of `registry`, builtins excluded.
    pub fn from_registry(registry: &Registry) -> Self {
        Self {
            rules: registry.all_rules().filter(|r| !r.builtin).cloned().collect(),
        }
    }
}

impl RuleSource for InMemoryRules {
    fn rules(&self) -> SessionResult<Vec<RuleDef>> {
        Ok(self.rules.clone())
    }
}

/// A fixed catalog plus known suggestions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTests {
    cases: Vec<TestCase>,
    suggestions: Vec<SuggestedTest>,
}

impl InMemoryTests {
    pub fn new(cases: Vec<TestCase>) -> Self {
        Self {
            cases,
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<SuggestedTest>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_case(mut self, case: TestCase) -> Self {
        self.cases.push(case);
        self
    }
}

impl TestSource for InMemoryTests {
    fn test_cases(&self) -> SessionResult<Vec<TestCase>> {
        Ok(self.cases.clone())
    }

    fn suggestion_hashes(&self) -> SessionResult<BTreeSet<String>> {
        Ok(self.suggestions.iter().map(|s| s.hash.clone()).collect())
    }
}
