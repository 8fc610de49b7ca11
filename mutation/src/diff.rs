//! Structural differencer.
//!
//! Walks both snapshots in parallel. Maps are compared key by key, lists
//! position by position; there is no move detection, so a reordered list
//! shows up as replaces (and adds/removes for a length change) at the
//! differing indexes. Identical subtrees produce nothing.

use rulekit_core::{FieldPath, RuleId, Value};

use crate::mutation::Mutation;

/// Diff two snapshots. Mutations are ordered by path.
pub fn diff(before: &Value, after: &Value) -> Vec<Mutation> {
    let mut out = Vec::new();
    walk(&FieldPath::root(), before, after, &mut out);
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

/// Diff two snapshots and attribute every mutation to `rule_id`.
pub fn diff_by(rule_id: &RuleId, before: &Value, after: &Value) -> Vec<Mutation> {
    diff(before, after)
        .into_iter()
        .map(|m| m.by(rule_id.clone()))
        .collect()
}

fn walk(path: &FieldPath, before: &Value, after: &Value, out: &mut Vec<Mutation>) {
    if before == after {
        return;
    }
    match (before, after) {
        (Value::Map(old), Value::Map(new)) => {
            for (key, old_value) in old {
                let child = path.key(key.as_str());
                match new.get(key) {
                    Some(new_value) => walk(&child, old_value, new_value, out),
                    None => out.push(Mutation::remove(child, old_value.clone())),
                }
            }
            for (key, new_value) in new.iter().filter(|(k, _)| !old.contains_key(*k)) {
                out.push(Mutation::add(path.key(key.as_str()), new_value.clone()));
            }
        }
        (Value::List(old), Value::List(new)) => {
            for i in 0..old.len().max(new.len()) {
                let child = path.index(i);
                match (old.get(i), new.get(i)) {
                    (Some(a), Some(b)) => walk(&child, a, b, out),
                    (Some(a), None) => out.push(Mutation::remove(child, a.clone())),
                    (None, Some(b)) => out.push(Mutation::add(child, b.clone())),
                    (None, None) => {}
                }
            }
        }
        _ => out.push(Mutation::replace(path.clone(), before.clone(), after.clone())),
    }
}
