//! The Registry - immutable rule lookup.

use rulekit_core::RuleId;
use std::collections::HashMap;

use crate::builder::{RegistryBuilder, RegistryResult};
use crate::RuleDef;

/// The Registry provides lookup of rule definitions.
/// It is immutable after construction; runs hold it behind an `Arc` so a
/// registry change never reaches a run already in flight.
#[derive(Debug, Clone)]
pub struct Registry {
    /// Rule definitions, sorted by (name, id).
    rules: Vec<RuleDef>,
    /// Rule index lookup by id.
    by_id: HashMap<RuleId, usize>,
    /// Rule index lookup by name.
    by_name: HashMap<String, usize>,
}

impl Registry {
    pub(crate) fn new(mut rules: Vec<RuleDef>) -> Self {
        rules.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        let by_id = rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        let by_name = rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        Self {
            rules,
            by_id,
            by_name,
        }
    }

    /// An empty registry.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Get a rule by id.
    pub fn get(&self, id: &RuleId) -> Option<&RuleDef> {
        self.by_id.get(id).map(|&i| &self.rules[i])
    }

    /// Get a rule by name.
    pub fn get_by_name(&self, name: &str) -> Option<&RuleDef> {
        self.by_name.get(name).map(|&i| &self.rules[i])
    }

    /// All rules, enabled or not, sorted by (name, id).
    pub fn all_rules(&self) -> impl Iterator<Item = &RuleDef> {
        self.rules.iter()
    }

    /// Enabled rules, sorted by (name, id).
    pub fn enabled_rules(&self) -> impl Iterator<Item = &RuleDef> {
        self.rules.iter().filter(|r| r.enabled)
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// A new snapshot where `overrides` replace same-id rules or are added.
    ///
    /// Overrides go through the same registration checks as ordinary rules,
    /// except that builtins may be overridden for a single run: the snapshot
    /// is transient and never persisted.
    pub fn with_overrides(&self, overrides: Vec<RuleDef>) -> RegistryResult<Registry> {
        let mut builder = RegistryBuilder::new();
        let overridden: Vec<&RuleId> = overrides.iter().map(|r| &r.id).collect();
        for rule in self.rules.iter().filter(|r| !overridden.contains(&&r.id)) {
            builder.add_def(rule.clone())?;
        }
        for rule in overrides {
            builder.add_def(rule)?;
        }
        builder.build()
    }
}
