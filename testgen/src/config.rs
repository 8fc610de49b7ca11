//! Configuration for test suggestion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::values::FieldKind;

/// Configuration for the suggestion engine and property runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestConfig {
    /// Maximum suggestions returned.
    pub limit: usize,
    /// Enabled strategy tags; `static-v1` always runs.
    pub strategies: Vec<String>,
    /// Boundary values probed per numeric field by `boundary-v1`.
    pub boundary_probes: usize,
    /// Field kinds overriding the name-based guess, keyed by path text.
    pub hints: BTreeMap<String, FieldKind>,
    /// Random seed for the property runner.
    pub seed: u64,
    /// Trials per property run.
    pub property_trials: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            limit: 20,
            strategies: vec!["static-v1".to_string(), "boundary-v1".to_string()],
            boundary_probes: 9,
            hints: BTreeMap::new(),
            seed: 42,
            property_trials: 50,
        }
    }
}

impl SuggestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_strategies<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strategies = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_boundary_probes(mut self, count: usize) -> Self {
        self.boundary_probes = count;
        self
    }

    pub fn with_hint(mut self, path: impl Into<String>, kind: FieldKind) -> Self {
        self.hints.insert(path.into(), kind);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_property_trials(mut self, trials: usize) -> Self {
        self.property_trials = trials;
        self
    }

    /// Baseline strategy only, few probes and trials.
    pub fn minimal() -> Self {
        Self {
            limit: 5,
            strategies: vec!["static-v1".to_string()],
            boundary_probes: 3,
            hints: BTreeMap::new(),
            seed: 42,
            property_trials: 5,
        }
    }

    pub fn strategy_enabled(&self, tag: &str) -> bool {
        self.strategies.iter().any(|s| s == tag)
    }
}
