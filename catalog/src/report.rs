//! Per-field coverage summary.

use rulekit_core::{FieldPath, RuleId, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::case::TestCase;
use crate::evaluate::{TestOutcome, Verdict};
use crate::matcher::FieldMatcher;

/// Counters for one field-path across a set of tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCoverage {
    pub path: FieldPath,
    /// Tests asserting the field.
    pub tested: usize,
    /// Runs that mutated the field.
    pub mutated: usize,
    /// Tests that both assert and mutate it.
    pub hits: usize,
    /// Assertions on the field that held.
    pub pass: usize,
}

/// Summarize evaluated tests per field, sorted by hits descending then path.
///
/// With `rule` set, only that rule's mutations count as "mutated".
pub fn field_report<'a, I>(evaluated: I, rule: Option<&RuleId>) -> Vec<FieldCoverage>
where
    I: IntoIterator<Item = (&'a TestCase, &'a TestOutcome)>,
{
    let mut summary: BTreeMap<FieldPath, FieldCoverage> = BTreeMap::new();

    for (case, outcome) in evaluated {
        let asserted: BTreeSet<FieldPath> = asserted_fields(&case.expected).into_iter().collect();
        let mutated: BTreeSet<&FieldPath> = outcome
            .mutations
            .iter()
            .filter(|m| rule.map_or(true, |r| m.rule_id.as_ref() == Some(r)))
            .map(|m| &m.path)
            .collect();
        let failed: BTreeSet<&FieldPath> = match &outcome.verdict {
            Verdict::Pass => BTreeSet::new(),
            Verdict::Fail { mismatches } => mismatches.iter().map(|m| &m.path).collect(),
            Verdict::Error { .. } => asserted.iter().collect(),
        };

        let fields: BTreeSet<&FieldPath> = asserted.iter().chain(mutated.iter().copied()).collect();
        for field in fields {
            let tested = asserted.contains(field);
            let was_mutated = mutated.iter().any(|m| m.overlaps(field));
            let entry = summary.entry(field.clone()).or_insert_with(|| FieldCoverage {
                path: field.clone(),
                ..FieldCoverage::default()
            });
            entry.tested += usize::from(tested);
            entry.mutated += usize::from(was_mutated);
            entry.hits += usize::from(tested && was_mutated);
            entry.pass += usize::from(tested && !failed.contains(field));
        }
    }

    let mut report: Vec<FieldCoverage> = summary.into_values().collect();
    report.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.path.cmp(&b.path)));
    report
}

/// Paths an expected fragment asserts: maps are descended, while lists,
/// scalars, nested empty maps and field matchers count as one field.
fn asserted_fields(expected: &Value) -> Vec<FieldPath> {
    fn walk(path: FieldPath, value: &Value, out: &mut Vec<FieldPath>) {
        match value {
            Value::Map(fields) if !fields.is_empty() && FieldMatcher::of(value).is_none() => {
                for (key, child) in fields {
                    walk(path.key(key.as_str()), child, out);
                }
            }
            _ => out.push(path),
        }
    }
    let mut out = Vec::new();
    if let Value::Map(fields) = expected {
        for (key, child) in fields {
            walk(FieldPath::root().key(key.as_str()), child, &mut out);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mismatch;
    use rulekit_core::doc;
    use rulekit_mutation::Mutation;

    fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    fn outcome(case: &TestCase, verdict: Verdict, mutations: Vec<Mutation>) -> TestOutcome {
        TestOutcome {
            id: case.id.clone(),
            name: case.name.clone(),
            verdict,
            duration_ms: 0,
            actual: None,
            mutations,
            logs: Vec::new(),
        }
    }

    #[test]
    fn test_report_counts_and_order() {
        // GIVEN one passing test asserting and mutating total, one failing
        // test asserting total and iban, mutating nothing
        let t1 = TestCase::new("t1", doc!(), doc! { "fields" => doc! { "total" => 10i64 } });
        let t2 = TestCase::new(
            "t2",
            doc!(),
            doc! { "fields" => doc! { "total" => 1i64, "iban" => "X" } },
        );
        let o1 = outcome(
            &t1,
            Verdict::Pass,
            vec![Mutation::add(p("fields.total"), Value::Int(10)).by(RuleId::from("r"))],
        );
        let o2 = outcome(
            &t2,
            Verdict::Fail {
                mismatches: vec![Mismatch {
                    path: p("fields.total"),
                    expected: Value::Int(1),
                    actual: None,
                    reason: None,
                }],
            },
            Vec::new(),
        );

        // WHEN
        let report = field_report([(&t1, &o1), (&t2, &o2)], None);

        // THEN
        assert_eq!(
            report,
            vec![
                FieldCoverage {
                    path: p("fields.total"),
                    tested: 2,
                    mutated: 1,
                    hits: 1,
                    pass: 1,
                },
                FieldCoverage {
                    path: p("fields.iban"),
                    tested: 1,
                    mutated: 0,
                    hits: 0,
                    pass: 1,
                },
            ]
        );
    }

    #[test]
    fn test_rule_filter_ignores_other_rules() {
        let t = TestCase::new("t", doc!(), doc!());
        let o = outcome(
            &t,
            Verdict::Pass,
            vec![Mutation::add(p("x"), Value::Int(1)).by(RuleId::from("other"))],
        );
        assert!(field_report([(&t, &o)], Some(&RuleId::from("mine"))).is_empty());
    }
}
