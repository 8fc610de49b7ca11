//! Rulekit Test Catalog
//!
//! Test cases, their evaluation against the executor, and the coverage they
//! provide.
//!
//! Responsibilities:
//! - Hold test cases (suite, tags, priority, input, expected fragment)
//! - Evaluate a case by field-path containment of its expected fragment,
//!   with opt-in field matchers (`exists`, `regex`, `approx`, `equals`)
//! - Reduce the mutations of test runs to (rule, field-path) coverage
//! - Summarize per-field coverage

mod case;
mod catalog;
mod coverage;
mod evaluate;
mod matcher;
mod report;

pub use case::TestCase;
pub use catalog::{TestCatalog, TestFilter};
pub use coverage::{CoverageFact, CoverageSet, CoverageTracker};
pub use evaluate::{compare, Evaluator, Mismatch, TestOutcome, Verdict};
pub use matcher::{FieldMatcher, MATCH_KEY};
pub use report::{field_report, FieldCoverage};
