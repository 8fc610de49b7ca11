//! JSON workspace files.
//!
//! A workspace carries the user-authored block rules, the test catalog,
//! the suggestions already stored and an optional suggestion config.

use anyhow::{Context, Result};
use rulekit_catalog::TestCase;
use rulekit_core::RuleId;
use rulekit_registry::{Block, BlockRule, RegistryBuilder};
use rulekit_session::{InMemoryRules, InMemoryTests, Session};
use rulekit_testgen::{SuggestConfig, SuggestedTest};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

fn default_enabled() -> bool {
    true
}

/// A block rule as written in the workspace file.
///
/// Empty `reads`/`writes` are derived from the blocks.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleEntry {
    pub id: RuleId,
    pub name: String,
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub reads: Vec<String>,
    #[serde(default)]
    pub writes: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Workspace {
    pub rules: Vec<RuleEntry>,
    pub tests: Vec<TestCase>,
    pub suggestions: Vec<SuggestedTest>,
    pub suggest: Option<SuggestConfig>,
}

impl Workspace {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read workspace {}", path.display()))?;
        let workspace: Workspace = serde_json::from_str(&text)
            .with_context(|| format!("invalid workspace {}", path.display()))?;
        debug!(
            rules = workspace.rules.len(),
            tests = workspace.tests.len(),
            "workspace loaded"
        );
        Ok(workspace)
    }

    /// Compile the rules and open a session over this workspace.
    pub fn into_session(self) -> Result<Session> {
        let mut builder = RegistryBuilder::new();
        for entry in self.rules {
            let body = BlockRule::compile(entry.blocks)
                .with_context(|| format!("rule {} has an invalid block", entry.id))?;
            let mut rule = builder
                .add_rule(entry.id.clone(), entry.name, body)
                .reads(entry.reads)
                .writes(entry.writes)
                .enabled(entry.enabled);
            if let Some(version) = entry.version {
                rule = rule.version(version);
            }
            if let Some(description) = entry.description {
                rule = rule.description(description);
            }
            rule.done()
                .with_context(|| format!("failed to register rule {}", entry.id))?;
        }
        let registry = builder.build()?;

        let tests = InMemoryTests::new(self.tests).with_suggestions(self.suggestions);
        Ok(Session::new(InMemoryRules::from_registry(&registry), tests)
            .with_suggest_config(self.suggest.unwrap_or_default()))
    }
}
