//! Rulekit Core Types
//!
//! This crate provides the foundational types used throughout the rule kit:
//! - Identity types (RuleId, TestId)
//! - Field paths (FieldPath, PathStep) with parsing and the "covers" relation
//! - Document values (the Value enum: scalars, ordered lists, key-ordered maps)
//! - Common error types

mod error;
mod id;
mod path;
mod value;

pub use error::*;
pub use id::*;
pub use path::*;
pub use value::*;

/// A document is an immutable snapshot of a structured value.
pub type Document = Value;
