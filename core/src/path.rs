//! Field paths into structured documents.
//!
//! A path is an ordered sequence of steps, each either a named key or an array
//! index. The textual form is dotted/indexed: `address.city`, `items[2].sku`,
//! `matrix[0][1]`. The root path is written `$`.
//!
//! Keys that cannot be written bare (empty, `$`, or containing `.`, `[`, `]`,
//! `"` or `\`) are bracket-quoted: `meta["a.b"]`, `[""]`, `["$"]`. Inside the
//! quotes `"` and `\` are escaped with a backslash.
//!
//! Paths are ordered step-wise, so a parent always sorts before its children.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

use crate::error::{MalformedPathError, PathResult};

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathStep {
    /// Object member access.
    Key(String),
    /// Array element access (zero-based).
    Index(usize),
}

impl PathStep {
    /// A key that must be bracket-quoted in the text form.
    fn needs_quoting(key: &str) -> bool {
        key.is_empty() || key == "$" || key.contains(['.', '[', ']', '"', '\\'])
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, key: &str) -> fmt::Result {
    f.write_str("[\"")?;
    for c in key.chars() {
        if matches!(c, '"' | '\\') {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    f.write_str("\"]")
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(k) if PathStep::needs_quoting(k) => write_quoted(f, k),
            PathStep::Key(k) => f.write_str(k),
            PathStep::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A canonical path into a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    steps: Vec<PathStep>,
}

impl FieldPath {
    /// The empty path, addressing the whole document.
    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    /// Build a path from explicit steps.
    pub fn from_steps(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    /// Parse the textual representation.
    ///
    /// Fails on empty steps (`a..b`, `.a`, `a.`, `a.[0]`), on unbalanced or
    /// non-numeric index brackets (`a[0`, `a]`, `a[x]`) and on unterminated
    /// quoted keys (`["a`).
    pub fn parse(text: &str) -> PathResult<Self> {
        if text == "$" {
            return Ok(Self::root());
        }
        if text.is_empty() {
            return Err(MalformedPathError::empty_step(text));
        }

        let mut steps = Vec::new();
        let mut key = String::new();
        let mut after_index = false;
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if key.is_empty() {
                        if !after_index {
                            return Err(MalformedPathError::empty_step(text));
                        }
                    } else {
                        steps.push(PathStep::Key(std::mem::take(&mut key)));
                    }
                    after_index = false;
                    // A dot must introduce a key.
                    if matches!(chars.peek(), None | Some('.') | Some('[')) {
                        return Err(MalformedPathError::empty_step(text));
                    }
                }
                '[' => {
                    if !key.is_empty() {
                        steps.push(PathStep::Key(std::mem::take(&mut key)));
                    }
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        steps.push(PathStep::Key(parse_quoted(text, &mut chars)?));
                        after_index = true;
                        if !matches!(chars.peek(), None | Some('.') | Some('[')) {
                            return Err(MalformedPathError::new(
                                text,
                                "expected '.' or '[' after quoted key",
                            ));
                        }
                        continue;
                    }
                    let mut digits = String::new();
                    let mut closed = false;
                    for d in chars.by_ref() {
                        match d {
                            ']' => {
                                closed = true;
                                break;
                            }
                            '[' => return Err(MalformedPathError::unbalanced(text)),
                            _ => digits.push(d),
                        }
                    }
                    if !closed {
                        return Err(MalformedPathError::unbalanced(text));
                    }
                    let index = digits
                        .parse::<usize>()
                        .map_err(|_| MalformedPathError::bad_index(text, digits.as_str()))?;
                    steps.push(PathStep::Index(index));
                    after_index = true;
                    if !matches!(chars.peek(), None | Some('.') | Some('[')) {
                        return Err(MalformedPathError::new(
                            text,
                            "expected '.' or '[' after index",
                        ));
                    }
                }
                ']' => return Err(MalformedPathError::unbalanced(text)),
                other => {
                    key.push(other);
                    after_index = false;
                }
            }
        }

        if !key.is_empty() {
            steps.push(PathStep::Key(key));
        }
        Ok(Self { steps })
    }

    /// The steps of this path.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true for the root path.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns true for the root path.
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Last step, if any.
    pub fn last(&self) -> Option<&PathStep> {
        self.steps.last()
    }

    /// The parent path (None for root).
    pub fn parent(&self) -> Option<FieldPath> {
        if self.steps.is_empty() {
            return None;
        }
        Some(Self {
            steps: self.steps[..self.steps.len() - 1].to_vec(),
        })
    }

    /// A child path one key deeper.
    pub fn key(&self, key: impl Into<String>) -> FieldPath {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Key(key.into()));
        Self { steps }
    }

    /// A child path one index deeper.
    pub fn index(&self, index: usize) -> FieldPath {
        let mut steps = self.steps.clone();
        steps.push(PathStep::Index(index));
        Self { steps }
    }

    /// `self` covers `other` when `self` is a prefix of `other`.
    ///
    /// Every path covers itself; the root covers everything.
    pub fn covers(&self, other: &FieldPath) -> bool {
        other.steps.starts_with(&self.steps)
    }

    /// Either path covers the other.
    pub fn overlaps(&self, other: &FieldPath) -> bool {
        self.covers(other) || other.covers(self)
    }
}

/// Reads the rest of a quoted key up to and including its closing `"]`.
fn parse_quoted(text: &str, chars: &mut Peekable<Chars<'_>>) -> PathResult<String> {
    let mut key = String::new();
    loop {
        match chars.next() {
            Some('"') => break,
            Some('\\') => match chars.next() {
                Some(c) => key.push(c),
                None => return Err(MalformedPathError::unterminated_quote(text)),
            },
            Some(c) => key.push(c),
            None => return Err(MalformedPathError::unterminated_quote(text)),
        }
    }
    match chars.next() {
        Some(']') => Ok(key),
        _ => Err(MalformedPathError::unbalanced(text)),
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("$");
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Key(k) if i > 0 && !PathStep::needs_quoting(k) => {
                    write!(f, ".{}", k)?
                }
                other => write!(f, "{}", other)?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = MalformedPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        FieldPath::parse(&text).map_err(serde::de::Error::custom)
    }
}
