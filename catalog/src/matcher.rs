//! Field matchers inside expected fragments.
//!
//! An expected value of the form `{"$match": {..}}` is checked by its rules
//! instead of by equality. Every rule present must hold:
//!
//! - `exists`: `true` if the field must be present and not null, `false` if
//!   it must be absent or null
//! - `regex`: the field's text must match the pattern (a missing field reads
//!   as the empty string)
//! - `approx`: a number, or `{"value": n, "tol": t}`; a sibling `tol`
//!   overrides the inner one, and the tolerance defaults to 0
//! - `equals`: the field equals the value, numbers folded; a missing field
//!   reads as null
//!
//! A matcher with no rules never holds.

use regex_lite::Regex;
use rulekit_core::{Map, Value};

/// Reserved key introducing a matcher object.
pub const MATCH_KEY: &str = "$match";

static NO_RULES: Map = Map::new();

/// The rules of one matcher object.
#[derive(Debug, Clone, Copy)]
pub struct FieldMatcher<'a> {
    rules: &'a Map,
}

impl<'a> FieldMatcher<'a> {
    /// The matcher `expected` stands for, if it is a `{"$match": ..}` object.
    pub fn of(expected: &'a Value) -> Option<Self> {
        let map = expected.as_map()?;
        if map.len() != 1 {
            return None;
        }
        let rules = map.get(MATCH_KEY)?.as_map().unwrap_or(&NO_RULES);
        Some(Self { rules })
    }

    /// Check `actual`; the error names the first rule that failed.
    pub fn check(&self, actual: Option<&Value>) -> Result<(), String> {
        if self.rules.is_empty() {
            return Err("matcher has no rules".to_string());
        }
        let present = actual.filter(|v| !v.is_null());

        for (name, rule) in self.rules {
            match name.as_str() {
                "exists" => {
                    let want = rule.as_bool().ok_or("exists expects a boolean")?;
                    if want != present.is_some() {
                        return Err(format!(
                            "exists expected {} but was {}",
                            want,
                            present.is_some()
                        ));
                    }
                }
                "regex" => {
                    let pattern = rule.as_str().ok_or("regex expects a string")?;
                    let re = Regex::new(pattern).map_err(|e| format!("invalid regex: {}", e))?;
                    let text = present.map(text_of).unwrap_or_default();
                    if !re.is_match(&text) {
                        return Err(format!("regex '{}' does not match '{}'", pattern, text));
                    }
                }
                "approx" => self.approx(rule, present)?,
                "tol" => {}
                "equals" => {
                    if !rule.loose_eq(actual.unwrap_or(&Value::Null)) {
                        return Err("equals mismatch".to_string());
                    }
                }
                other => return Err(format!("unknown matcher rule '{}'", other)),
            }
        }
        Ok(())
    }

    fn approx(&self, rule: &Value, actual: Option<&Value>) -> Result<(), String> {
        let (value, inner_tol) = match rule {
            Value::Map(m) => (
                m.get("value").and_then(Value::as_f64),
                m.get("tol").and_then(Value::as_f64),
            ),
            other => (other.as_f64(), None),
        };
        let value = value.ok_or("approx expects a number")?;
        let tol = self
            .rules
            .get("tol")
            .and_then(Value::as_f64)
            .or(inner_tol)
            .unwrap_or(0.0);

        let actual = actual.ok_or("field is missing")?;
        let number = actual
            .as_f64()
            .or_else(|| actual.as_str().and_then(|s| s.trim().parse().ok()))
            .ok_or("field is not numeric")?;
        if (number - value).abs() > tol {
            return Err(format!("|{} - {}| > {}", number, value, tol));
        }
        Ok(())
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulekit_core::doc;

    fn matcher(rules: Value) -> Value {
        doc! { MATCH_KEY => rules }
    }

    fn check(rules: Value, actual: Option<Value>) -> Result<(), String> {
        let expected = matcher(rules);
        FieldMatcher::of(&expected).unwrap().check(actual.as_ref())
    }

    #[test]
    fn test_only_single_key_match_objects_are_matchers() {
        assert!(FieldMatcher::of(&matcher(doc! { "exists" => true })).is_some());
        assert!(FieldMatcher::of(&doc! { "exists" => true }).is_none());
        assert!(FieldMatcher::of(&doc! { MATCH_KEY => doc!(), "x" => 1i64 }).is_none());
        assert!(FieldMatcher::of(&Value::from("$match")).is_none());
    }

    #[test]
    fn test_exists() {
        assert!(check(doc! { "exists" => true }, Some(Value::Int(0))).is_ok());
        assert!(check(doc! { "exists" => true }, Some(Value::Null)).is_err());
        assert!(check(doc! { "exists" => true }, None).is_err());
        assert!(check(doc! { "exists" => false }, None).is_ok());
        assert_eq!(
            check(doc! { "exists" => false }, Some(Value::from("x"))).unwrap_err(),
            "exists expected false but was true"
        );
    }

    #[test]
    fn test_regex() {
        // GIVEN the IBAN shape check
        let rules = doc! { "regex" => "^[A-Z0-9]{15,34}$" };

        // THEN
        assert!(check(rules.clone(), Some(Value::from("IT60X0542811101000000123456"))).is_ok());
        assert!(check(rules.clone(), Some(Value::from("it60 x054"))).is_err());
        assert!(check(rules, None).is_err());
        assert!(check(doc! { "regex" => "^1\\d$" }, Some(Value::Int(12))).is_ok());
        assert!(check(doc! { "regex" => "(" }, Some(Value::from("x")))
            .unwrap_err()
            .starts_with("invalid regex"));
    }

    #[test]
    fn test_approx() {
        let total = Some(Value::Float(100.004));
        assert!(check(doc! { "approx" => 100i64 }, total.clone()).is_err());
        assert!(check(doc! { "approx" => 100i64, "tol" => 0.01 }, total.clone()).is_ok());
        assert!(check(
            doc! { "approx" => doc! { "value" => 100i64, "tol" => 0.01 } },
            total.clone()
        )
        .is_ok());
        assert!(check(
            doc! { "approx" => doc! { "value" => 100i64, "tol" => 1.0 }, "tol" => 0.001 },
            total
        )
        .is_err());
        assert!(check(doc! { "approx" => 5i64 }, Some(Value::from(" 5 "))).is_ok());
        assert_eq!(
            check(doc! { "approx" => 5i64 }, Some(Value::from("five"))).unwrap_err(),
            "field is not numeric"
        );
        assert_eq!(
            check(doc! { "approx" => "x" }, Some(Value::Int(5))).unwrap_err(),
            "approx expects a number"
        );
    }

    #[test]
    fn test_equals() {
        assert!(check(doc! { "equals" => 100.0 }, Some(Value::Int(100))).is_ok());
        assert!(check(doc! { "equals" => "a" }, Some(Value::from("b"))).is_err());
        assert!(check(doc! { "equals" => Value::Null }, None).is_ok());
    }

    #[test]
    fn test_rules_combine() {
        let rules = doc! { "exists" => true, "regex" => "^IT" };
        assert!(check(rules.clone(), Some(Value::from("IT60"))).is_ok());
        assert!(check(rules, Some(Value::from("DE89"))).is_err());
    }

    #[test]
    fn test_empty_and_unknown_rules_never_hold() {
        assert!(check(doc!(), Some(Value::Int(1))).is_err());
        assert!(check(Value::Int(1), Some(Value::Int(1))).is_err());
        assert_eq!(
            check(doc! { "near" => 1i64 }, Some(Value::Int(1))).unwrap_err(),
            "unknown matcher rule 'near'"
        );
    }
}
