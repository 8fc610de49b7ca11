//! The test catalog.

use rulekit_core::TestId;
use serde::{Deserialize, Serialize};

use crate::case::TestCase;

/// Which tests to pick. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestFilter {
    pub suite: Option<String>,
    pub tag: Option<String>,
}

impl TestFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn matches(&self, case: &TestCase) -> bool {
        self.suite
            .as_ref()
            .map_or(true, |s| case.suite.as_ref() == Some(s))
            && self.tag.as_ref().map_or(true, |t| case.has_tag(t))
    }
}

/// An in-memory collection of test cases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestCatalog {
    cases: Vec<TestCase>,
}

impl TestCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cases(cases: Vec<TestCase>) -> Self {
        Self { cases }
    }

    /// Add a case, replacing any case with the same id.
    pub fn upsert(&mut self, case: TestCase) {
        match self.cases.iter_mut().find(|c| c.id == case.id) {
            Some(existing) => *existing = case,
            None => self.cases.push(case),
        }
    }

    pub fn remove(&mut self, id: &TestId) -> Option<TestCase> {
        let pos = self.cases.iter().position(|c| &c.id == id)?;
        Some(self.cases.remove(pos))
    }

    pub fn get(&self, id: &TestId) -> Option<&TestCase> {
        self.cases.iter().find(|c| &c.id == id)
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Enabled cases matching `filter`, priority descending then name.
    pub fn select(&self, filter: &TestFilter) -> Vec<&TestCase> {
        let mut picked: Vec<&TestCase> = self
            .cases
            .iter()
            .filter(|c| c.enabled && filter.matches(c))
            .collect();
        picked.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        picked
    }

    /// All enabled cases in invocation order.
    pub fn enabled(&self) -> Vec<&TestCase> {
        self.select(&TestFilter::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulekit_core::doc;

    fn catalog() -> TestCatalog {
        TestCatalog::from_cases(vec![
            TestCase::new("b-low", doc!(), doc!()).with_suite("s1"),
            TestCase::new("a-high", doc!(), doc!())
                .with_suite("s1")
                .with_tags(["smoke"])
                .with_priority(10),
            TestCase::new("c-off", doc!(), doc!()).with_suite("s1").disabled(),
            TestCase::new("a-low", doc!(), doc!()).with_suite("s2").with_tags(["smoke"]),
        ])
    }

    fn names(cases: Vec<&TestCase>) -> Vec<&str> {
        cases.into_iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_select_orders_by_priority_then_name() {
        assert_eq!(names(catalog().enabled()), vec!["a-high", "a-low", "b-low"]);
    }

    #[test]
    fn test_filters_by_suite_and_tag() {
        // GIVEN
        let catalog = catalog();

        // WHEN
        let s1 = catalog.select(&TestFilter::new().with_suite("s1"));
        let smoke = catalog.select(&TestFilter::new().with_tag("smoke"));
        let both = catalog.select(&TestFilter::new().with_suite("s2").with_tag("smoke"));

        // THEN
        assert_eq!(names(s1), vec!["a-high", "b-low"]);
        assert_eq!(names(smoke), vec!["a-high", "a-low"]);
        assert_eq!(names(both), vec!["a-low"]);
    }

    #[test]
    fn test_upsert_and_remove() {
        let mut catalog = catalog();
        let mut first = catalog.cases()[0].clone();
        first.priority = 99;
        catalog.upsert(first.clone());
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.get(&first.id).unwrap().priority, 99);

        assert!(catalog.remove(&first.id).is_some());
        assert_eq!(catalog.len(), 3);
    }
}
