//! Representative and random field values.
//!
//! Rules only declare paths, not types, so the kind of a field is guessed
//! from its last key unless a hint says otherwise.

use rand::Rng;
use rulekit_core::{FieldPath, PathStep, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coarse value kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Bool,
    Iban,
}

const NUMBER_HINTS: &[&str] = &[
    "total", "net", "tax", "amount", "price", "qty", "quantity", "count", "rate", "vat",
    "number", "sum",
];

/// A valid Italian IBAN used as the representative value.
pub const SAMPLE_IBAN: &str = "IT60X0542811101000000123456";

impl FieldKind {
    /// Guess the kind of `path`, preferring an explicit hint.
    pub fn of(path: &FieldPath, hints: &BTreeMap<String, FieldKind>) -> FieldKind {
        if let Some(kind) = hints.get(&path.to_string()) {
            return *kind;
        }
        let name = match path.steps().iter().rev().find_map(|s| match s {
            PathStep::Key(k) => Some(k.to_lowercase()),
            PathStep::Index(_) => None,
        }) {
            Some(name) => name,
            None => return FieldKind::Text,
        };

        if name.contains("iban") {
            FieldKind::Iban
        } else if name.contains("date") || name.ends_with("_at") {
            FieldKind::Date
        } else if name.starts_with("is") || name.starts_with("has") || name.ends_with("flag") {
            FieldKind::Bool
        } else if NUMBER_HINTS.iter().any(|h| name.contains(h)) {
            FieldKind::Number
        } else {
            FieldKind::Text
        }
    }

    /// The deterministic value `static-v1` writes for this kind.
    pub fn representative(self) -> Value {
        match self {
            FieldKind::Text => Value::from("sample"),
            FieldKind::Number => Value::Int(100),
            FieldKind::Date => Value::from("2024-01-31"),
            FieldKind::Bool => Value::Bool(true),
            FieldKind::Iban => Value::from(SAMPLE_IBAN),
        }
    }

    /// A random value of this kind.
    pub fn random(self, rng: &mut impl Rng) -> Value {
        match self {
            FieldKind::Text => {
                let len = rng.gen_range(1..12);
                let s: String = (0..len)
                    .map(|_| {
                        if rng.gen_bool(0.2) {
                            ' '
                        } else {
                            rng.gen_range(b'a'..=b'z') as char
                        }
                    })
                    .collect();
                Value::String(s)
            }
            FieldKind::Number => {
                if rng.gen_bool(0.5) {
                    Value::Int(rng.gen_range(-1000..=1000))
                } else {
                    let cents: i64 = rng.gen_range(-100_000..=100_000);
                    Value::Float(cents as f64 / 100.0)
                }
            }
            FieldKind::Date => Value::String(format!(
                "{:04}-{:02}-{:02}",
                rng.gen_range(1990..=2030),
                rng.gen_range(1..=12),
                rng.gen_range(1..=28)
            )),
            FieldKind::Bool => Value::Bool(rng.gen_bool(0.5)),
            FieldKind::Iban => {
                if rng.gen_bool(0.5) {
                    Value::from(SAMPLE_IBAN)
                } else {
                    let digits: String = (0..22)
                        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
                        .collect();
                    Value::String(format!("IT{digits}"))
                }
            }
        }
    }
}
