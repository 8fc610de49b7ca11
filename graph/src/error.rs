//! Graph error types.

use rulekit_core::RuleId;
use thiserror::Error;

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur while building a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Cyclic dependency between rules: {}", format_cycle(.rule_ids))]
    Cycle { rule_ids: Vec<RuleId> },
}

impl GraphError {
    pub fn cycle(rule_ids: Vec<RuleId>) -> Self {
        Self::Cycle { rule_ids }
    }
}

fn format_cycle(ids: &[RuleId]) -> String {
    let mut parts: Vec<&str> = ids.iter().map(RuleId::as_str).collect();
    if let Some(first) = ids.first() {
        parts.push(first.as_str());
    }
    parts.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_closes_the_loop() {
        let err = GraphError::cycle(vec![RuleId::from("a"), RuleId::from("b")]);
        assert_eq!(err.to_string(), "Cyclic dependency between rules: a -> b -> a");
    }
}
