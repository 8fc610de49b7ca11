//! Rulekit Mutation
//!
//! Records effective changes between two document snapshots.
//!
//! Responsibilities:
//! - Model a single change (add/replace/remove) at a field-path
//! - Structurally diff two documents into an ordered change list
//! - Attribute changes to the rule that caused them
//!
//! # Module Structure
//!
//! - `mutation` - The `Mutation` record and its operation kind
//! - `diff` - The differencer (positional for lists)

mod diff;
mod mutation;

pub use diff::{diff, diff_by};
pub use mutation::{Mutation, MutationOp};
