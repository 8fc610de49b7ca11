//! Mutation records.

use rulekit_core::{FieldPath, RuleId, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationOp {
    Add,
    Replace,
    Remove,
}

impl fmt::Display for MutationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationOp::Add => write!(f, "add"),
            MutationOp::Replace => write!(f, "replace"),
            MutationOp::Remove => write!(f, "remove"),
        }
    }
}

/// One effective change between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub path: FieldPath,
    pub op: MutationOp,
    /// Previous value; absent for `add`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Value>,
    /// New value; absent for `remove`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Value>,
    /// The rule that caused the change.
    #[serde(rename = "rule", default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<RuleId>,
}

impl Mutation {
    pub fn add(path: FieldPath, to: Value) -> Self {
        Self {
            path,
            op: MutationOp::Add,
            from: None,
            to: Some(to),
            rule_id: None,
        }
    }

    pub fn replace(path: FieldPath, from: Value, to: Value) -> Self {
        Self {
            path,
            op: MutationOp::Replace,
            from: Some(from),
            to: Some(to),
            rule_id: None,
        }
    }

    pub fn remove(path: FieldPath, from: Value) -> Self {
        Self {
            path,
            op: MutationOp::Remove,
            from: Some(from),
            to: None,
            rule_id: None,
        }
    }

    /// Attribute this change to a rule.
    pub fn by(mut self, rule_id: RuleId) -> Self {
        self.rule_id = Some(rule_id);
        self
    }

    /// Every leaf path the change touches.
    ///
    /// Adding or removing a whole subtree touches each leaf of it, so a rule
    /// that declares `address.city` may add `{"address": {"city": ..}}` but
    /// not `{"address": {"zip": ..}}`.
    pub fn touched_leaves(&self) -> Vec<FieldPath> {
        let mut leaves: Vec<FieldPath> = self
            .from
            .iter()
            .chain(self.to.iter())
            .flat_map(|v| v.leaf_paths(&self.path))
            .collect();
        leaves.sort();
        leaves.dedup();
        leaves
    }

    /// Returns true if the change writes some leaf at or below `path`.
    pub fn touches(&self, path: &FieldPath) -> bool {
        self.touched_leaves().iter().any(|leaf| path.covers(leaf))
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.path)?;
        match (&self.from, &self.to) {
            (Some(from), Some(to)) => write!(f, ": {} -> {}", from, to),
            (None, Some(to)) => write!(f, ": {}", to),
            (Some(from), None) => write!(f, " (was {})", from),
            (None, None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulekit_core::doc;

    fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn test_serializes_to_wire_form() {
        // GIVEN
        let m = Mutation::replace(p("name"), "ana".into(), "ANA".into())
            .by(RuleId::from("UpperName"));

        // WHEN
        let json = serde_json::to_string(&m).unwrap();

        // THEN
        assert_eq!(
            json,
            r#"{"path":"name","op":"replace","from":"ana","to":"ANA","rule":"UpperName"}"#
        );
        let back: Mutation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_touched_leaves_of_added_subtree() {
        let m = Mutation::add(p("address"), doc! { "city" => "Rome", "zip" => "00100" });
        let leaves: Vec<String> = m.touched_leaves().iter().map(|p| p.to_string()).collect();
        assert_eq!(leaves, vec!["address.city", "address.zip"]);
    }

    #[test]
    fn test_touches_only_written_leaves() {
        let m = Mutation::add(p("out"), doc! { "a" => 1i64 });
        assert!(m.touches(&p("out")));
        assert!(m.touches(&p("out.a")));
        assert!(!m.touches(&p("out.b")));
    }

    #[test]
    fn test_display() {
        let m = Mutation::remove(p("items[1]"), Value::Int(3));
        assert_eq!(m.to_string(), "remove items[1] (was 3)");
    }
}
