//! RegistryBuilder for constructing an immutable Registry.

use chrono::{DateTime, Utc};
use rulekit_core::{FieldPath, MalformedPathError, RuleId};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::body::RuleBody;
use crate::types::{code_hash, RuleDef, DEFAULT_VERSION};
use crate::Registry;

/// Errors that can occur during rule registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate rule id: {0}")]
    DuplicateRuleId(RuleId),

    #[error("Duplicate rule name: {0}")]
    DuplicateRuleName(String),

    #[error(transparent)]
    MalformedPath(#[from] MalformedPathError),

    #[error("Rules {first} and {second} both declare writes to {path}")]
    WriteConflict {
        first: RuleId,
        second: RuleId,
        path: FieldPath,
    },

    #[error("Unknown rule: {0}")]
    UnknownRule(RuleId),

    #[error("Builtin rule {0} cannot be replaced")]
    BuiltinImmutable(RuleId),

    #[error("Invalid block in rule: {message}")]
    InvalidBlock { message: String },
}

impl RegistryError {
    pub fn write_conflict(first: &RuleId, second: &RuleId, path: &FieldPath) -> Self {
        Self::WriteConflict {
            first: first.clone(),
            second: second.clone(),
            path: path.clone(),
        }
    }

    pub fn invalid_block(message: impl Into<String>) -> Self {
        Self::InvalidBlock {
            message: message.into(),
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Builder for constructing an immutable Registry.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    /// Rules being built, in registration order.
    rules: Vec<RuleDef>,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a builder from an existing snapshot.
    pub fn from_registry(registry: &Registry) -> Self {
        Self {
            rules: registry.all_rules().cloned().collect(),
        }
    }

    /// Add a rule definition.
    pub fn add_rule(
        &mut self,
        id: impl Into<RuleId>,
        name: impl Into<String>,
        body: impl RuleBody + 'static,
    ) -> RuleBuilder<'_> {
        RuleBuilder {
            builder: self,
            id: id.into(),
            name: name.into(),
            body: Arc::new(body),
            reads: Vec::new(),
            writes: Vec::new(),
            version: DEFAULT_VERSION.to_string(),
            builtin: false,
            enabled: true,
            description: None,
            updated_at: None,
        }
    }

    /// Register a fully formed definition.
    pub fn add_def(&mut self, def: RuleDef) -> RegistryResult<RuleId> {
        if self.rules.iter().any(|r| r.id == def.id) {
            return Err(RegistryError::DuplicateRuleId(def.id));
        }
        if self.rules.iter().any(|r| r.name == def.name) {
            return Err(RegistryError::DuplicateRuleName(def.name));
        }
        check_conflicts_with(&def, &self.rules)?;

        debug!(rule_id = %def.id, name = %def.name, "rule registered");
        let id = def.id.clone();
        self.rules.push(def);
        Ok(id)
    }

    /// Replace a user rule with a new definition of the same id.
    ///
    /// Builtin rules are immutable.
    pub fn replace_rule(&mut self, def: RuleDef) -> RegistryResult<()> {
        let pos = self
            .rules
            .iter()
            .position(|r| r.id == def.id)
            .ok_or_else(|| RegistryError::UnknownRule(def.id.clone()))?;
        if self.rules[pos].builtin {
            return Err(RegistryError::BuiltinImmutable(def.id));
        }
        if self
            .rules
            .iter()
            .any(|r| r.id != def.id && r.name == def.name)
        {
            return Err(RegistryError::DuplicateRuleName(def.name));
        }

        let others: Vec<RuleDef> = self
            .rules
            .iter()
            .filter(|r| r.id != def.id)
            .cloned()
            .collect();
        check_conflicts_with(&def, &others)?;

        debug!(rule_id = %def.id, "rule replaced");
        self.rules[pos] = def;
        Ok(())
    }

    /// Replace a rule if present, otherwise add it. Builtins can be neither.
    pub fn upsert_rule(&mut self, def: RuleDef) -> RegistryResult<()> {
        if self.rules.iter().any(|r| r.id == def.id) {
            self.replace_rule(def)
        } else {
            self.add_def(def).map(|_| ())
        }
    }

    /// Enable or disable a rule.
    pub fn set_enabled(&mut self, id: &RuleId, enabled: bool) -> RegistryResult<()> {
        let pos = self
            .rules
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| RegistryError::UnknownRule(id.clone()))?;
        if enabled && !self.rules[pos].enabled {
            let candidate = RuleDef {
                enabled: true,
                ..self.rules[pos].clone()
            };
            let others: Vec<RuleDef> = self
                .rules
                .iter()
                .filter(|r| &r.id != id)
                .cloned()
                .collect();
            check_conflicts_with(&candidate, &others)?;
        }
        self.rules[pos].enabled = enabled;
        Ok(())
    }

    /// Build the immutable Registry.
    pub fn build(self) -> RegistryResult<Registry> {
        Ok(Registry::new(self.rules))
    }
}

/// Check `def`'s writes against every other enabled rule.
fn check_conflicts_with(def: &RuleDef, others: &[RuleDef]) -> RegistryResult<()> {
    if !def.enabled {
        return Ok(());
    }
    for other in others.iter().filter(|r| r.enabled) {
        if let Some((path, _)) = def.conflicting_write(other) {
            return Err(RegistryError::write_conflict(&other.id, &def.id, path));
        }
    }
    Ok(())
}

/// Builder for a rule definition.
pub struct RuleBuilder<'a> {
    builder: &'a mut RegistryBuilder,
    id: RuleId,
    name: String,
    body: Arc<dyn RuleBody>,
    reads: Vec<String>,
    writes: Vec<String>,
    version: String,
    builtin: bool,
    enabled: bool,
    description: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl<'a> RuleBuilder<'a> {
    /// Declare field paths the body may read.
    pub fn reads<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reads.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Declare field paths the body may write.
    pub fn writes<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.writes.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark as builtin.
    pub fn builtin(mut self) -> Self {
        self.builtin = true;
        self
    }

    /// Register the rule disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    /// Finish building this rule.
    ///
    /// An empty declaration falls back to what the body implies (block rules).
    pub fn done(self) -> RegistryResult<RuleId> {
        let reads = if self.reads.is_empty() {
            self.body.inferred_reads()
        } else {
            parse_paths(&self.reads)?
        };
        let writes = if self.writes.is_empty() {
            self.body.inferred_writes()
        } else {
            parse_paths(&self.writes)?
        };
        let def = RuleDef {
            reads,
            writes,
            code_hash: code_hash(&self.body.source()),
            id: self.id,
            name: self.name,
            version: self.version,
            builtin: self.builtin,
            enabled: self.enabled,
            body: self.body,
            description: self.description,
            updated_at: self.updated_at.unwrap_or_else(Utc::now),
        };
        self.builder.add_def(def)
    }
}

fn parse_paths(paths: &[String]) -> RegistryResult<BTreeSet<FieldPath>> {
    paths
        .iter()
        .map(|p| FieldPath::parse(p).map_err(RegistryError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FnBody;

    fn noop() -> FnBody {
        FnBody::new("noop", |doc| Ok(doc.clone()))
    }

    #[test]
    fn test_add_rule_parses_declarations() {
        // GIVEN
        let mut builder = RegistryBuilder::new();

        // WHEN
        builder
            .add_rule("r1", "UpperName", noop())
            .reads(["name"])
            .writes(["name"])
            .done()
            .unwrap();
        let registry = builder.build().unwrap();

        // THEN
        let rule = registry.get(&RuleId::from("r1")).unwrap();
        assert!(rule.declares_write(&FieldPath::parse("name").unwrap()));
        assert_eq!(rule.version, DEFAULT_VERSION);
        assert!(rule.enabled);
    }

    #[test]
    fn test_malformed_declared_path_is_rejected() {
        let mut builder = RegistryBuilder::new();
        let err = builder
            .add_rule("r1", "Bad", noop())
            .writes(["items[0"])
            .done()
            .unwrap_err();
        assert!(matches!(err, RegistryError::MalformedPath(_)));
    }

    #[test]
    fn test_overlapping_writes_are_rejected_at_registration() {
        // GIVEN
        let mut builder = RegistryBuilder::new();
        builder
            .add_rule("a", "Address", noop())
            .writes(["address"])
            .done()
            .unwrap();

        // WHEN
        let err = builder
            .add_rule("b", "City", noop())
            .writes(["address.city"])
            .done()
            .unwrap_err();

        // THEN
        match err {
            RegistryError::WriteConflict { first, second, .. } => {
                assert_eq!(first, RuleId::from("a"));
                assert_eq!(second, RuleId::from("b"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_disabled_rules_may_share_writes() {
        let mut builder = RegistryBuilder::new();
        builder.add_rule("a", "A", noop()).writes(["x"]).done().unwrap();
        builder
            .add_rule("b", "B", noop())
            .writes(["x"])
            .disabled()
            .done()
            .unwrap();

        // Enabling the second one would create two authorities over `x`.
        let err = builder.set_enabled(&RuleId::from("b"), true).unwrap_err();
        assert!(matches!(err, RegistryError::WriteConflict { .. }));
    }

    #[test]
    fn test_duplicates_are_rejected() {
        let mut builder = RegistryBuilder::new();
        builder.add_rule("a", "A", noop()).done().unwrap();
        assert!(matches!(
            builder.add_rule("a", "Other", noop()).done(),
            Err(RegistryError::DuplicateRuleId(_))
        ));
        assert!(matches!(
            builder.add_rule("b", "A", noop()).done(),
            Err(RegistryError::DuplicateRuleName(_))
        ));
    }

    #[test]
    fn test_builtin_cannot_be_replaced() {
        // GIVEN
        let mut builder = RegistryBuilder::new();
        builder
            .add_rule("core", "Core", noop())
            .builtin()
            .done()
            .unwrap();
        let replacement = builder.build().unwrap().get(&RuleId::from("core")).unwrap().clone();
        let mut builder = RegistryBuilder::new();
        builder.add_def(replacement.clone()).unwrap();

        // WHEN
        let err = builder.replace_rule(replacement).unwrap_err();

        // THEN
        assert!(matches!(err, RegistryError::BuiltinImmutable(_)));
    }
}
