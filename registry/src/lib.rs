//! Rulekit Registry
//!
//! Catalog view of rule definitions. Single source of truth for rule bodies
//! and their declared read/write field-path sets.
//! The registry is immutable after construction via RegistryBuilder; a
//! changed rule set is a new registry snapshot.

mod blocks;
mod body;
mod builder;
mod builtins;
mod registry;
mod types;

pub use blocks::{Block, BlockRule, NormalizeKind};
pub use body::{BodyKind, FnBody, RuleBody, RuleFailure};
pub use builder::{RegistryBuilder, RegistryError, RegistryResult, RuleBuilder};
pub use builtins::{register_builtins, IBAN_RULE, TOTAL_RULE};
pub use registry::Registry;
pub use types::*;
