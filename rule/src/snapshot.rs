//! Rule snapshots.

use rulekit_graph::DependencyGraph;
use rulekit_registry::{Registry, RuleDef};
use std::sync::Arc;

use crate::error::ExecResult;

/// An immutable rule set and its dependency order.
///
/// Runs take a snapshot at start; replacing the registry afterwards builds a
/// new snapshot and leaves in-flight runs untouched. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    registry: Arc<Registry>,
    graph: Arc<DependencyGraph>,
}

impl RuleSnapshot {
    /// Build the dependency graph for `registry`. Fails on cycles.
    pub fn new(registry: Registry) -> ExecResult<Self> {
        let graph = DependencyGraph::build(&registry)?;
        Ok(Self {
            registry: Arc::new(registry),
            graph: Arc::new(graph),
        })
    }

    /// A snapshot where `overrides` replace or extend this one's rules.
    pub fn with_overrides(&self, overrides: Vec<RuleDef>) -> ExecResult<Self> {
        if overrides.is_empty() {
            return Ok(self.clone());
        }
        Self::new(self.registry.with_overrides(overrides)?)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Enabled rules in execution order.
    pub fn ordered_rules(&self) -> impl Iterator<Item = &RuleDef> + '_ {
        self.graph.order().filter_map(|id| self.registry.get(id))
    }
}
