//! Content hashing of candidate payloads.

use rulekit_core::Value;
use sha2::{Digest, Sha256};

/// SHA-256 over the canonical JSON of `value`, lowercase hex.
///
/// Map keys are already sorted; floats with no fractional part are folded
/// to integers so `100` and `100.0` hash alike.
pub fn content_hash(value: &Value) -> String {
    let canonical = serde_json::Value::from(&normalize(value)).to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{:x}", digest)
}

fn normalize(value: &Value) -> Value {
    match value {
        Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::Int(*f as i64),
        Value::List(items) => Value::List(items.iter().map(normalize).collect()),
        Value::Map(fields) => Value::Map(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), normalize(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulekit_core::doc;

    #[test]
    fn test_hash_ignores_float_spelling() {
        let a = doc! { "net" => 100i64, "tax" => 22.5 };
        let b = doc! { "tax" => 22.5, "net" => 100.0 };
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn test_hash_is_lowercase_sha256() {
        let h = content_hash(&doc! { "a" => "b" });
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(h, content_hash(&doc! { "a" => "c" }));
    }
}
