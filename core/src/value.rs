//! Value types for documents.
//!
//! Documents are ordered, arbitrarily nested trees of values. The Value enum
//! is a tagged union over null, bool, integer, float, string, ordered list and
//! key-ordered map, and serializes untagged to plain JSON so documents and
//! mutations interoperate with any generic structured-value format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{FieldPath, PathStep};

/// Key-ordered object storage.
pub type Map = BTreeMap<String, Value>;

/// A structured document value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null/missing value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence of values.
    List(Vec<Value>),
    /// Key-ordered map of values.
    Map(Map),
}

impl Value {
    /// An empty map.
    pub fn map() -> Self {
        Value::Map(Map::new())
    }

    /// Returns true if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for maps and lists.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Map(_) | Value::List(_))
    }

    /// Returns true for numbers (Int or Float).
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Get as boolean if this is a Bool value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer if this is an Int value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get any number as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as string reference if this is a String value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as list if this is a List value.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get as map if this is a Map value.
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
        }
    }

    /// Equality that treats `Int(n)` and `Float(n.0)` as the same number.
    ///
    /// Used when comparing expectations written by hand against rule output;
    /// the differencer stays strict.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.loose_eq(vb))
            }
            (a, b) => a == b,
        }
    }

    // ==================== Path Access ====================

    /// Look up the value at a path.
    pub fn get_path(&self, path: &FieldPath) -> Option<&Value> {
        let mut current = self;
        for step in path.steps() {
            current = match (step, current) {
                (PathStep::Key(k), Value::Map(m)) => m.get(k)?,
                (PathStep::Index(i), Value::List(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Returns true if a value exists at the path.
    pub fn has_path(&self, path: &FieldPath) -> bool {
        self.get_path(path).is_some()
    }

    /// Set the value at a path, creating intermediate containers.
    ///
    /// A step that does not fit the existing value (a key into a list, an
    /// index into a scalar) replaces that value with a fresh container. Lists
    /// are padded with nulls up to the requested index.
    pub fn set_path(&mut self, path: &FieldPath, value: Value) {
        let mut current = self;
        for step in path.steps() {
            current = match step {
                PathStep::Key(k) => {
                    if !matches!(current, Value::Map(_)) {
                        *current = Value::map();
                    }
                    match current {
                        Value::Map(m) => m.entry(k.clone()).or_default(),
                        _ => unreachable!("replaced with a map above"),
                    }
                }
                PathStep::Index(i) => {
                    if !matches!(current, Value::List(_)) {
                        *current = Value::List(Vec::new());
                    }
                    match current {
                        Value::List(items) => {
                            if items.len() <= *i {
                                items.resize(*i + 1, Value::Null);
                            }
                            &mut items[*i]
                        }
                        _ => unreachable!("replaced with a list above"),
                    }
                }
            };
        }
        *current = value;
    }

    /// Remove the value at a path, returning it.
    ///
    /// Removing a list element shifts the following elements down.
    pub fn remove_path(&mut self, path: &FieldPath) -> Option<Value> {
        let (last, parent) = match (path.last(), path.parent()) {
            (Some(last), Some(parent)) => (last, parent),
            _ => return Some(std::mem::take(self)),
        };
        let container = self.get_path_mut(&parent)?;
        match (last, container) {
            (PathStep::Key(k), Value::Map(m)) => m.remove(k),
            (PathStep::Index(i), Value::List(items)) if *i < items.len() => Some(items.remove(*i)),
            _ => None,
        }
    }

    /// Mutable lookup at a path.
    pub fn get_path_mut(&mut self, path: &FieldPath) -> Option<&mut Value> {
        let mut current = self;
        for step in path.steps() {
            current = match (step, current) {
                (PathStep::Key(k), Value::Map(m)) => m.get_mut(k)?,
                (PathStep::Index(i), Value::List(items)) => items.get_mut(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Paths of every leaf below (and including) this value, rooted at `base`.
    ///
    /// Scalars and empty containers are leaves.
    pub fn leaf_paths(&self, base: &FieldPath) -> Vec<FieldPath> {
        let mut out = Vec::new();
        self.collect_leaves(base, &mut out);
        out
    }

    fn collect_leaves(&self, base: &FieldPath, out: &mut Vec<FieldPath>) {
        match self {
            Value::Map(m) if !m.is_empty() => {
                for (k, v) in m {
                    v.collect_leaves(&base.key(k.as_str()), out);
                }
            }
            Value::List(items) if !items.is_empty() => {
                for (i, v) in items.iter().enumerate() {
                    v.collect_leaves(&base.index(i), out);
                }
            }
            _ => out.push(base.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Map(m)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                Value::Map(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Map(m) => serde_json::Value::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Helper macro to create map documents.
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Value::Map($crate::Map::new())
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        {
            let mut map = $crate::Map::new();
            $(
                map.insert($key.to_string(), $crate::Value::from($value));
            )+
            $crate::Value::Map(map)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn test_doc_macro() {
        let empty = doc!();
        assert_eq!(empty, Value::map());

        let d = doc! { "name" => "ana", "age" => 30i64, "vip" => true };
        assert_eq!(d.get_path(&p("name")), Some(&Value::from("ana")));
        assert_eq!(d.get_path(&p("age")), Some(&Value::Int(30)));
    }

    #[test]
    fn test_json_round_trip_preserves_shape() {
        // GIVEN
        let json = r#"{"fields":{"rate":0.5,"tags":["a",null,true],"total":100}}"#;

        // WHEN
        let value: Value = serde_json::from_str(json).unwrap();

        // THEN
        assert_eq!(value.get_path(&p("fields.total")), Some(&Value::Int(100)));
        assert_eq!(value.get_path(&p("fields.rate")), Some(&Value::Float(0.5)));
        assert_eq!(value.get_path(&p("fields.tags[1]")), Some(&Value::Null));
        assert_eq!(serde_json::to_string(&value).unwrap(), json);
    }

    #[test]
    fn test_set_path_creates_intermediates() {
        // GIVEN
        let mut d = doc!();

        // WHEN
        d.set_path(&p("address.city"), "Rome".into());
        d.set_path(&p("items[2].sku"), "X1".into());

        // THEN
        assert_eq!(d.get_path(&p("address.city")), Some(&Value::from("Rome")));
        assert_eq!(d.get_path(&p("items[0]")), Some(&Value::Null));
        assert_eq!(d.get_path(&p("items[2].sku")), Some(&Value::from("X1")));
    }

    #[test]
    fn test_remove_path() {
        let mut d = doc! { "a" => 1i64, "b" => 2i64 };
        assert_eq!(d.remove_path(&p("a")), Some(Value::Int(1)));
        assert_eq!(d.remove_path(&p("missing")), None);
        assert!(!d.has_path(&p("a")));
        assert!(d.has_path(&p("b")));
    }

    #[test]
    fn test_leaf_paths() {
        let d: Value =
            serde_json::from_str(r#"{"a":{"b":1,"c":[true,{}]},"d":"x"}"#).unwrap();
        let leaves: Vec<String> = d
            .leaf_paths(&FieldPath::root())
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(leaves, vec!["a.b", "a.c[0]", "a.c[1]", "d"]);
    }

    #[test]
    fn test_loose_eq_folds_numbers() {
        assert!(Value::Int(100).loose_eq(&Value::Float(100.0)));
        assert!(!Value::Int(100).loose_eq(&Value::Float(99.5)));
        assert_ne!(Value::Int(100), Value::Float(100.0));
    }
}
