//! Test evaluation.

use rulekit_core::{FieldPath, TestId, Value};
use rulekit_mutation::Mutation;
use rulekit_rule::{RuleExecutor, RuleSnapshot, RunLog};
use serde::{Deserialize, Serialize};
use std::thread;
use tracing::{debug, warn};

use crate::case::TestCase;
use crate::matcher::FieldMatcher;

/// An expected field whose actual value differs or is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    pub path: FieldPath,
    pub expected: Value,
    /// `None` when the path does not exist in the result.
    pub actual: Option<Value>,
    /// Why a field matcher rejected the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Pass or fail of one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail { mismatches: Vec<Mismatch> },
    /// The run itself was aborted (cycle, undeclared write).
    Error { message: String },
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// Outcome record of one evaluated test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub id: TestId,
    pub name: String,
    pub verdict: Verdict,
    pub duration_ms: u64,
    /// Output document; absent when the run was aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    #[serde(default)]
    pub mutations: Vec<Mutation>,
    #[serde(default)]
    pub logs: Vec<RunLog>,
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        self.verdict.is_pass()
    }

    /// True if the run completed, whatever the verdict.
    pub fn completed(&self) -> bool {
        !matches!(self.verdict, Verdict::Error { .. })
    }
}

/// Containment check: every leaf of `expected` must exist in `actual` with an
/// equal value. Maps are descended; lists and scalars are compared whole.
///
/// A nested empty map requires a map at that path. A `{"$match": ..}` object
/// is checked by its field matcher instead of by equality.
pub fn compare(expected: &Value, actual: &Value) -> Vec<Mismatch> {
    let mut out = Vec::new();
    contain(&FieldPath::root(), expected, actual, &mut out);
    out
}

fn contain(path: &FieldPath, expected: &Value, actual: &Value, out: &mut Vec<Mismatch>) {
    let found = actual.get_path(path);
    let mismatch = |reason: Option<String>| Mismatch {
        path: path.clone(),
        expected: expected.clone(),
        actual: found.cloned(),
        reason,
    };

    if let Some(matcher) = FieldMatcher::of(expected) {
        if let Err(reason) = matcher.check(found) {
            out.push(mismatch(Some(reason)));
        }
        return;
    }
    match expected {
        Value::Map(fields) if fields.is_empty() => {
            if !path.is_root() && !found.is_some_and(|v| v.as_map().is_some()) {
                out.push(mismatch(None));
            }
        }
        Value::Map(fields) => {
            for (key, value) in fields {
                contain(&path.key(key.as_str()), value, actual, out);
            }
        }
        _ => {
            if !found.is_some_and(|v| v.loose_eq(expected)) {
                out.push(mismatch(None));
            }
        }
    }
}

/// Evaluates test cases against one rule snapshot.
#[derive(Debug, Clone)]
pub struct Evaluator {
    executor: RuleExecutor,
    snapshot: RuleSnapshot,
}

impl Evaluator {
    pub fn new(executor: RuleExecutor, snapshot: RuleSnapshot) -> Self {
        Self { executor, snapshot }
    }

    pub fn snapshot(&self) -> &RuleSnapshot {
        &self.snapshot
    }

    /// Run one case. Never fails: an aborted run becomes `Verdict::Error`.
    pub fn evaluate(&self, case: &TestCase) -> TestOutcome {
        match self.executor.run(&case.input, &self.snapshot) {
            Ok(run) => {
                let mismatches = compare(&case.expected, &run.after);
                let verdict = if mismatches.is_empty() {
                    Verdict::Pass
                } else {
                    Verdict::Fail { mismatches }
                };
                debug!(test = %case.name, pass = verdict.is_pass(), "test evaluated");
                TestOutcome {
                    id: case.id.clone(),
                    name: case.name.clone(),
                    verdict,
                    duration_ms: run.duration_ms,
                    actual: Some(run.after),
                    mutations: run.mutations,
                    logs: run.logs,
                }
            }
            Err(err) => {
                warn!(test = %case.name, error = %err, "test run aborted");
                TestOutcome {
                    id: case.id.clone(),
                    name: case.name.clone(),
                    verdict: Verdict::Error {
                        message: err.to_string(),
                    },
                    duration_ms: 0,
                    actual: None,
                    mutations: Vec::new(),
                    logs: Vec::new(),
                }
            }
        }
    }

    /// Run many cases in parallel; outcomes keep the input order.
    pub fn evaluate_all(&self, cases: &[&TestCase]) -> Vec<TestOutcome> {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(cases.len().max(1));
        if workers <= 1 {
            return cases.iter().map(|c| self.evaluate(c)).collect();
        }

        let chunk = cases.len().div_ceil(workers);
        thread::scope(|scope| {
            let handles: Vec<_> = cases
                .chunks(chunk)
                .map(|part| {
                    scope.spawn(move || part.iter().map(|c| self.evaluate(c)).collect::<Vec<_>>())
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| match h.join() {
                    Ok(outcomes) => outcomes,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulekit_core::doc;
    use rulekit_registry::{FnBody, RegistryBuilder};

    fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn test_total_mismatch_ignores_extra_fields() {
        // GIVEN
        let expected = doc! { "fields" => doc! { "total" => 100i64 } };
        let actual = doc! { "fields" => doc! { "total" => 99i64, "tax" => 5i64 } };

        // WHEN
        let mismatches = compare(&expected, &actual);

        // THEN
        assert_eq!(
            mismatches,
            vec![Mismatch {
                path: p("fields.total"),
                expected: Value::Int(100),
                actual: Some(Value::Int(99)),
                reason: None,
            }]
        );
    }

    #[test]
    fn test_missing_field_and_numeric_folding() {
        let expected = doc! { "a" => 1.0, "b" => "x" };
        let actual = doc! { "a" => 1i64 };

        let mismatches = compare(&expected, &actual);

        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].path, p("b"));
        assert_eq!(mismatches[0].actual, None);
    }

    #[test]
    fn test_empty_map_requires_a_map() {
        // GIVEN
        let expected = doc! { "fields" => doc!() };

        // WHEN / THEN
        let mismatches = compare(&expected, &doc! { "other" => 1i64 });
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].path, p("fields"));
        assert_eq!(mismatches[0].actual, None);
        assert_eq!(compare(&expected, &doc! { "fields" => 1i64 }).len(), 1);
        assert!(compare(&expected, &doc! { "fields" => doc! { "x" => 1i64 } }).is_empty());
        assert!(compare(&doc!(), &doc! { "other" => 1i64 }).is_empty());
    }

    #[test]
    fn test_field_matchers_replace_equality() {
        // GIVEN
        let expected = doc! {
            "fields" => doc! {
                "iban" => doc! { "$match" => doc! { "regex" => "^[A-Z0-9]{15,34}$" } },
                "total" => doc! { "$match" => doc! { "approx" => 100i64, "tol" => 0.5 } },
            },
        };
        let good = doc! {
            "fields" => doc! { "iban" => "IT60X0542811101000000123456", "total" => 99.8 },
        };
        let bad = doc! { "fields" => doc! { "iban" => "it60", "total" => 99.8 } };

        // WHEN
        let mismatches = compare(&expected, &bad);

        // THEN
        assert!(compare(&expected, &good).is_empty());
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].path, p("fields.iban"));
        assert_eq!(mismatches[0].actual, Some(Value::from("it60")));
        assert_eq!(
            mismatches[0].reason.as_deref(),
            Some("regex '^[A-Z0-9]{15,34}$' does not match 'it60'")
        );
    }

    #[test]
    fn test_lists_compare_whole() {
        let expected = doc! { "tags" => vec![Value::from("a")] };
        let actual = doc! { "tags" => vec![Value::from("a"), Value::from("b")] };
        assert_eq!(compare(&expected, &actual).len(), 1);
    }

    fn evaluator() -> Evaluator {
        let mut builder = RegistryBuilder::new();
        builder
            .add_rule(
                "upper",
                "UpperName",
                FnBody::new("upper", |doc| {
                    let mut out = doc.clone();
                    let path = FieldPath::parse("name").unwrap();
                    if let Some(s) = doc.get_path(&path).and_then(Value::as_str) {
                        out.set_path(&path, Value::from(s.to_uppercase()));
                    }
                    Ok(out)
                }),
            )
            .reads(["name"])
            .writes(["name"])
            .done()
            .unwrap();
        builder
            .add_rule("bad", "Sneaky", FnBody::new("sneaky", |doc| {
                let mut out = doc.clone();
                if doc.has_path(&FieldPath::parse("trigger").unwrap()) {
                    out.set_path(&FieldPath::parse("other").unwrap(), Value::Bool(true));
                }
                Ok(out)
            }))
            .writes(["flag"])
            .done()
            .unwrap();
        let snapshot = RuleSnapshot::new(builder.build().unwrap()).unwrap();
        Evaluator::new(RuleExecutor::new(), snapshot)
    }

    #[test]
    fn test_evaluate_pass_and_fail() {
        // GIVEN
        let evaluator = evaluator();
        let pass = TestCase::new("pass", doc! { "name" => "ana" }, doc! { "name" => "ANA" });
        let fail = TestCase::new("fail", doc! { "name" => "ana" }, doc! { "name" => "ana" });

        // WHEN
        let outcomes = evaluator.evaluate_all(&[&pass, &fail]);

        // THEN
        assert!(outcomes[0].passed());
        assert_eq!(outcomes[0].mutations.len(), 1);
        assert!(matches!(
            &outcomes[1].verdict,
            Verdict::Fail { mismatches } if mismatches.len() == 1
        ));
    }

    #[test]
    fn test_aborted_run_fails_only_that_test() {
        let evaluator = evaluator();
        let broken = TestCase::new("broken", doc! { "trigger" => 1i64 }, doc!());
        let fine = TestCase::new("fine", doc!(), doc!());

        let outcomes = evaluator.evaluate_all(&[&broken, &fine]);

        assert!(!outcomes[0].completed());
        assert!(outcomes[0].actual.is_none());
        assert!(outcomes[1].passed());
    }
}
