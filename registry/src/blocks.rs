//! Block rules - rules authored as a list of declarative blocks.
//!
//! This is the rule builder's output format: each block is one small
//! transformation on a named field. Transforms on a missing field are no-ops,
//! so a block rule only changes what is actually present.

use chrono::NaiveDate;
use regex_lite::Regex;
use rulekit_core::{FieldPath, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::body::{BodyKind, RuleBody, RuleFailure};
use crate::builder::{RegistryError, RegistryResult};

/// Target representation for `normalize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeKind {
    /// Parse localized number text into a number.
    Number,
    /// Parse common date layouts into ISO `YYYY-MM-DD`.
    Date,
}

fn default_group() -> usize {
    1
}

/// One rule-builder block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Write a literal value.
    Set { field: FieldPath, value: Value },
    /// Copy `field` into `target` when present.
    Copy { field: FieldPath, target: FieldPath },
    Upper { field: FieldPath },
    Lower { field: FieldPath },
    Trim { field: FieldPath },
    Normalize { field: FieldPath, kind: NormalizeKind },
    /// Write a regex capture group of `field` into `target` on match.
    Extract {
        field: FieldPath,
        pattern: String,
        target: FieldPath,
        #[serde(default = "default_group")]
        group: usize,
    },
    /// Fail the rule when `field` is missing.
    Assert {
        field: FieldPath,
        #[serde(default)]
        message: Option<String>,
    },
}

impl Block {
    /// Paths this block reads.
    pub fn reads(&self) -> Vec<&FieldPath> {
        match self {
            Block::Set { .. } => Vec::new(),
            Block::Copy { field, .. }
            | Block::Upper { field }
            | Block::Lower { field }
            | Block::Trim { field }
            | Block::Normalize { field, .. }
            | Block::Extract { field, .. }
            | Block::Assert { field, .. } => vec![field],
        }
    }

    /// Paths this block writes.
    pub fn writes(&self) -> Vec<&FieldPath> {
        match self {
            Block::Set { field, .. }
            | Block::Upper { field }
            | Block::Lower { field }
            | Block::Trim { field }
            | Block::Normalize { field, .. } => vec![field],
            Block::Copy { target, .. } | Block::Extract { target, .. } => vec![target],
            Block::Assert { .. } => Vec::new(),
        }
    }
}

/// A compiled block rule body.
#[derive(Debug, Clone)]
pub struct BlockRule {
    blocks: Vec<Block>,
    /// Compiled patterns, parallel to `blocks`.
    patterns: Vec<Option<Regex>>,
}

impl BlockRule {
    /// Compile a block list; fails on invalid regex patterns.
    pub fn compile(blocks: Vec<Block>) -> RegistryResult<Self> {
        let patterns = blocks
            .iter()
            .map(|b| match b {
                Block::Extract { pattern, .. } => Regex::new(pattern)
                    .map(Some)
                    .map_err(|e| RegistryError::invalid_block(format!("{pattern}: {e}"))),
                _ => Ok(None),
            })
            .collect::<RegistryResult<Vec<_>>>()?;
        Ok(Self { blocks, patterns })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Read set derived from the blocks.
    pub fn derived_reads(&self) -> BTreeSet<FieldPath> {
        self.blocks.iter().flat_map(|b| b.reads()).cloned().collect()
    }

    /// Write set derived from the blocks.
    pub fn derived_writes(&self) -> BTreeSet<FieldPath> {
        self.blocks.iter().flat_map(|b| b.writes()).cloned().collect()
    }

    fn apply(
        &self,
        block: &Block,
        regex: Option<&Regex>,
        doc: &mut Value,
    ) -> Result<(), RuleFailure> {
        match block {
            Block::Set { field, value } => doc.set_path(field, value.clone()),
            Block::Copy { field, target } => {
                if let Some(v) = doc.get_path(field).cloned() {
                    doc.set_path(target, v);
                }
            }
            Block::Upper { field } => map_str(doc, field, |s| s.to_uppercase()),
            Block::Lower { field } => map_str(doc, field, |s| s.to_lowercase()),
            Block::Trim { field } => map_str(doc, field, |s| s.trim().to_string()),
            Block::Normalize { field, kind } => {
                let Some(current) = doc.get_path(field) else {
                    return Ok(());
                };
                let normalized = match kind {
                    NormalizeKind::Number => normalize_number(current)?,
                    NormalizeKind::Date => normalize_date(current)?,
                };
                doc.set_path(field, normalized);
            }
            Block::Extract {
                field,
                target,
                group,
                ..
            } => {
                let (Some(text), Some(regex)) = (doc.get_path(field).and_then(Value::as_str), regex)
                else {
                    return Ok(());
                };
                let captured = regex
                    .captures(text)
                    .and_then(|c| c.get(*group))
                    .map(|m| m.as_str().to_string());
                if let Some(captured) = captured {
                    doc.set_path(target, Value::String(captured));
                }
            }
            Block::Assert { field, message } => {
                if !doc.has_path(field) {
                    let msg = message
                        .clone()
                        .unwrap_or_else(|| format!("missing field {field}"));
                    return Err(RuleFailure::assertion(msg));
                }
            }
        }
        Ok(())
    }
}

impl RuleBody for BlockRule {
    fn invoke(&self, document: &Value) -> Result<Value, RuleFailure> {
        let mut doc = document.clone();
        for (block, regex) in self.blocks.iter().zip(&self.patterns) {
            self.apply(block, regex.as_ref(), &mut doc)?;
        }
        Ok(doc)
    }

    fn source(&self) -> String {
        serde_json::to_string(&self.blocks).unwrap_or_default()
    }

    fn kind(&self) -> BodyKind {
        BodyKind::Blocks
    }

    fn inferred_reads(&self) -> BTreeSet<FieldPath> {
        self.derived_reads()
    }

    fn inferred_writes(&self) -> BTreeSet<FieldPath> {
        self.derived_writes()
    }
}

fn map_str(doc: &mut Value, field: &FieldPath, f: impl Fn(&str) -> String) {
    if let Some(Value::String(s)) = doc.get_path_mut(field) {
        *s = f(s);
    }
}

/// Parse number text such as `1.234,56`, `€ 12`, `1,5` or `99.90`.
fn normalize_number(value: &Value) -> Result<Value, RuleFailure> {
    let text = match value {
        Value::Int(_) | Value::Float(_) => return Ok(value.clone()),
        Value::String(s) => s,
        other => {
            return Err(RuleFailure::new(format!(
                "cannot normalize {} as number",
                other.type_name()
            )))
        }
    };

    let mut cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if cleaned.contains(',') && cleaned.contains('.') {
        // Whichever separator comes last is the decimal one.
        let (thousands, decimal) = if cleaned.rfind(',') > cleaned.rfind('.') {
            (".", ",")
        } else {
            (",", ".")
        };
        cleaned = cleaned.replace(thousands, "").replace(decimal, ".");
    } else {
        cleaned = cleaned.replace(',', ".");
    }

    let number: f64 = cleaned
        .parse()
        .map_err(|_| RuleFailure::new(format!("'{text}' is not a number")))?;
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        Ok(Value::Int(number as i64))
    } else {
        Ok(Value::Float(number))
    }
}

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%d-%m-%Y", "%Y/%m/%d"];

fn normalize_date(value: &Value) -> Result<Value, RuleFailure> {
    let text = value
        .as_str()
        .ok_or_else(|| RuleFailure::new(format!("cannot normalize {} as date", value.type_name())))?
        .trim();
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(text, layout).ok())
        .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
        .ok_or_else(|| RuleFailure::new(format!("'{text}' is not a date")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegistryBuilder;
    use rulekit_core::doc;

    fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn test_blocks_deserialize_from_builder_json() {
        // GIVEN
        let json = r#"[
            {"type":"upper","field":"name"},
            {"type":"copy","field":"name","target":"display"},
            {"type":"extract","field":"code","pattern":"^([A-Z]+)-","target":"prefix"}
        ]"#;

        // WHEN
        let blocks: Vec<Block> = serde_json::from_str(json).unwrap();
        let rule = BlockRule::compile(blocks).unwrap();

        // THEN
        let reads: Vec<String> = rule.derived_reads().iter().map(|p| p.to_string()).collect();
        let writes: Vec<String> = rule.derived_writes().iter().map(|p| p.to_string()).collect();
        assert_eq!(reads, vec!["code", "name"]);
        assert_eq!(writes, vec!["display", "name", "prefix"]);
    }

    #[test]
    fn test_invalid_pattern_fails_compile() {
        let blocks = vec![Block::Extract {
            field: p("a"),
            pattern: "([".into(),
            target: p("b"),
            group: 1,
        }];
        assert!(matches!(
            BlockRule::compile(blocks),
            Err(RegistryError::InvalidBlock { .. })
        ));
    }

    #[test]
    fn test_upper_then_copy() {
        // GIVEN
        let rule = BlockRule::compile(vec![
            Block::Upper { field: p("name") },
            Block::Copy {
                field: p("name"),
                target: p("display"),
            },
        ])
        .unwrap();

        // WHEN
        let out = rule.invoke(&doc! { "name" => "ana" }).unwrap();

        // THEN
        assert_eq!(out, doc! { "display" => "ANA", "name" => "ANA" });
    }

    #[test]
    fn test_builder_infers_declarations_from_blocks() {
        // GIVEN a block rule registered without reads or writes
        let rule = BlockRule::compile(vec![Block::Copy {
            field: p("a"),
            target: p("b"),
        }])
        .unwrap();
        let mut builder = RegistryBuilder::new();

        // WHEN
        builder.add_rule("copy", "CopyAB", rule).done().unwrap();
        let registry = builder.build().unwrap();

        // THEN
        let def = registry.get(&"copy".into()).unwrap();
        assert_eq!(def.reads, BTreeSet::from([p("a")]));
        assert_eq!(def.writes, BTreeSet::from([p("b")]));
    }

    #[test]
    fn test_transforms_skip_missing_fields() {
        let rule = BlockRule::compile(vec![
            Block::Trim { field: p("x") },
            Block::Normalize {
                field: p("y"),
                kind: NormalizeKind::Number,
            },
        ])
        .unwrap();
        let input = doc! { "z" => 1i64 };
        assert_eq!(rule.invoke(&input).unwrap(), input);
    }

    #[test]
    fn test_normalize_number_variants() {
        assert_eq!(normalize_number(&"1.234,56".into()).unwrap(), Value::Float(1234.56));
        assert_eq!(normalize_number(&"1,234.56".into()).unwrap(), Value::Float(1234.56));
        assert_eq!(normalize_number(&"€ 12".into()).unwrap(), Value::Int(12));
        assert_eq!(normalize_number(&"1,5".into()).unwrap(), Value::Float(1.5));
        assert!(normalize_number(&"abc".into()).is_err());
    }

    #[test]
    fn test_normalize_date_variants() {
        assert_eq!(
            normalize_date(&"31/12/2024".into()).unwrap(),
            Value::from("2024-12-31")
        );
        assert_eq!(
            normalize_date(&"2024-01-05".into()).unwrap(),
            Value::from("2024-01-05")
        );
        assert!(normalize_date(&"tomorrow".into()).is_err());
    }

    #[test]
    fn test_extract_and_assert() {
        // GIVEN
        let rule = BlockRule::compile(vec![
            Block::Assert {
                field: p("code"),
                message: None,
            },
            Block::Extract {
                field: p("code"),
                pattern: "^([A-Z]+)-(\\d+)$".into(),
                target: p("number"),
                group: 2,
            },
        ])
        .unwrap();

        // WHEN / THEN
        let out = rule.invoke(&doc! { "code" => "INV-42" }).unwrap();
        assert_eq!(out.get_path(&p("number")), Some(&Value::from("42")));

        let err = rule.invoke(&doc!()).unwrap_err();
        assert_eq!(err.message, "Assertion failed: missing field code");
    }
}
