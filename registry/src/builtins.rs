//! Builtin rules shipped with the kit.
//!
//! Builtins are registered into every registry the session creates and are
//! immutable afterwards.

use rulekit_core::{FieldPath, Value};

use crate::body::{FnBody, RuleFailure};
use crate::builder::{RegistryBuilder, RegistryResult};

/// Normalizes `fields.ibanRaw` into `fields.iban` and validates the checksum.
pub const IBAN_RULE: &str = "Builtins.Iban.NormalizeAndValidate";

/// Computes `fields.total` from `fields.net` and `fields.tax` when missing.
pub const TOTAL_RULE: &str = "Builtins.Total.FromNetTax";

const IBAN_RAW: &str = "fields.ibanRaw";
const IBAN: &str = "fields.iban";
const NET: &str = "fields.net";
const TAX: &str = "fields.tax";
const TOTAL: &str = "fields.total";

/// Register all builtin rules.
pub fn register_builtins(builder: &mut RegistryBuilder) -> RegistryResult<()> {
    builder
        .add_rule(IBAN_RULE, IBAN_RULE, FnBody::builtin("builtin:iban", iban_body))
        .reads([IBAN_RAW])
        .writes([IBAN])
        .description("Normalize IBAN from field ibanRaw and validate checksum")
        .builtin()
        .done()?;
    builder
        .add_rule(TOTAL_RULE, TOTAL_RULE, FnBody::builtin("builtin:total", total_body))
        .reads([NET, TAX, TOTAL])
        .writes([TOTAL])
        .description("Compute total = net + tax if missing")
        .builtin()
        .done()?;
    Ok(())
}

fn path(text: &str) -> FieldPath {
    // Constant paths above are well formed.
    FieldPath::parse(text).unwrap_or_else(|_| FieldPath::root())
}

fn iban_body(doc: &Value) -> Result<Value, RuleFailure> {
    let Some(raw) = doc.get_path(&path(IBAN_RAW)).and_then(Value::as_str) else {
        return Ok(doc.clone());
    };
    let normalized = normalize_iban(raw);
    if !iban_is_valid(&normalized) {
        return Err(RuleFailure::assertion("Invalid IBAN"));
    }
    let mut out = doc.clone();
    out.set_path(&path(IBAN), Value::String(normalized));
    Ok(out)
}

fn total_body(doc: &Value) -> Result<Value, RuleFailure> {
    let total = path(TOTAL);
    if doc.get_path(&total).is_some_and(|v| !v.is_null()) {
        return Ok(doc.clone());
    }
    let (Some(net), Some(tax)) = (
        doc.get_path(&path(NET)).and_then(Value::as_f64),
        doc.get_path(&path(TAX)).and_then(Value::as_f64),
    ) else {
        return Ok(doc.clone());
    };
    let mut out = doc.clone();
    out.set_path(&total, money(net + tax));
    Ok(out)
}

/// Round half away from zero to two decimals; whole amounts stay integers.
fn money(amount: f64) -> Value {
    let rounded = (amount * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        Value::Int(rounded as i64)
    } else {
        Value::Float(rounded)
    }
}

fn normalize_iban(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

/// ISO 13616 mod-97 check.
fn iban_is_valid(iban: &str) -> bool {
    if !(15..=34).contains(&iban.len()) || !iban.is_ascii() {
        return false;
    }
    let (head, tail) = iban.split_at(4);
    let mut rem: u32 = 0;
    for ch in tail.chars().chain(head.chars()) {
        let digits = match ch {
            '0'..='9' => ch as u32 - '0' as u32,
            'A'..='Z' => ch as u32 - 'A' as u32 + 10,
            _ => return false,
        };
        rem = if digits >= 10 {
            (rem * 100 + digits) % 97
        } else {
            (rem * 10 + digits) % 97
        };
    }
    rem == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RuleBody;
    use rulekit_core::{doc, RuleId};

    fn registry() -> crate::Registry {
        let mut builder = RegistryBuilder::new();
        register_builtins(&mut builder).unwrap();
        builder.build().unwrap()
    }

    fn fields(v: Value) -> Value {
        doc! { "fields" => v }
    }

    #[test]
    fn test_builtins_are_registered_immutable() {
        let registry = registry();
        let iban = registry.get(&RuleId::from(IBAN_RULE)).unwrap();
        assert!(iban.builtin);
        assert!(registry.get_by_name(TOTAL_RULE).unwrap().builtin);
    }

    #[test]
    fn test_iban_normalized_and_validated() {
        // GIVEN
        let registry = registry();
        let rule = registry.get(&RuleId::from(IBAN_RULE)).unwrap();
        let input = fields(doc! { "ibanRaw" => "it60 x054 2811 1010 0000 0123 456" });

        // WHEN
        let out = rule.body.invoke(&input).unwrap();

        // THEN
        assert_eq!(
            out.get_path(&path(IBAN)),
            Some(&Value::from("IT60X0542811101000000123456"))
        );
    }

    #[test]
    fn test_invalid_iban_fails() {
        let registry = registry();
        let rule = registry.get(&RuleId::from(IBAN_RULE)).unwrap();
        let err = rule
            .body
            .invoke(&fields(doc! { "ibanRaw" => "IT00X0542811101000000123456" }))
            .unwrap_err();
        assert_eq!(err.message, "Assertion failed: Invalid IBAN");
    }

    #[test]
    fn test_total_only_when_missing() {
        // GIVEN
        let registry = registry();
        let rule = registry.get(&RuleId::from(TOTAL_RULE)).unwrap();

        // WHEN
        let computed = rule
            .body
            .invoke(&fields(doc! { "net" => 100i64, "tax" => 22.5 }))
            .unwrap();
        let kept = rule
            .body
            .invoke(&fields(doc! { "net" => 100i64, "tax" => 22i64, "total" => 99i64 }))
            .unwrap();

        // THEN
        assert_eq!(computed.get_path(&path(TOTAL)), Some(&Value::Float(122.5)));
        assert_eq!(kept.get_path(&path(TOTAL)), Some(&Value::Int(99)));
    }

    #[test]
    fn test_money_rounding() {
        assert_eq!(money(10.0), Value::Int(10));
        assert_eq!(money(0.125), Value::Float(0.13));
    }
}
