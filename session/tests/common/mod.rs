//! Shared fixtures for the session integration tests.

#![allow(dead_code)]

use rulekit_core::{FieldPath, Value};
use rulekit_registry::{Block, BlockRule, FnBody, RegistryBuilder};
use rulekit_session::{InMemoryRules, InMemoryTests, Session};

pub fn p(s: &str) -> FieldPath {
    FieldPath::parse(s).unwrap()
}

pub fn blocks(list: Vec<Block>) -> BlockRule {
    BlockRule::compile(list).unwrap()
}

/// `UpperName`: reads and writes `name`.
pub fn upper_name(builder: &mut RegistryBuilder) {
    builder
        .add_rule(
            "UpperName",
            "UpperName",
            blocks(vec![Block::Upper { field: p("name") }]),
        )
        .reads(["name"])
        .writes(["name"])
        .done()
        .unwrap();
}

/// Increments `counter` on every run.
pub fn counter_body() -> FnBody {
    FnBody::new("counter", |doc: &Value| {
        let mut out = doc.clone();
        let n = doc.get_path(&p("counter")).and_then(Value::as_int).unwrap_or(0);
        out.set_path(&p("counter"), Value::Int(n + 1));
        Ok(out)
    })
}

pub fn session(builder: RegistryBuilder, tests: InMemoryTests) -> Session {
    Session::new(InMemoryRules::from_registry(&builder.build().unwrap()), tests)
}
