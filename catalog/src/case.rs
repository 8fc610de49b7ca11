//! Test case records.

use chrono::{DateTime, Utc};
use rulekit_core::{TestId, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A regression test: an input document and the fragment its output must
/// contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default = "TestId::generate")]
    pub id: TestId,
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Higher runs first on manual invocation.
    #[serde(default)]
    pub priority: i32,
    pub input: Value,
    /// Partial document; only the fields present here are checked.
    pub expected: Value,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn enabled_by_default() -> bool {
    true
}

impl TestCase {
    pub fn new(name: impl Into<String>, input: Value, expected: Value) -> Self {
        let now = Utc::now();
        Self {
            id: TestId::generate(),
            name: name.into(),
            enabled: true,
            suite: None,
            tags: BTreeSet::new(),
            priority: 0,
            input,
            expected,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<TestId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// A copy under a fresh id named `"<name> (copy)"`.
    pub fn duplicate(&self) -> Self {
        let now = Utc::now();
        Self {
            id: TestId::generate(),
            name: format!("{} (copy)", self.name),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }
}
