//! Rulekit Test Generation
//!
//! Coverage-guided synthesis of regression tests:
//! - Finds declared rule writes no test has exercised yet
//! - Synthesizes candidate inputs through pluggable strategies
//!   (`static-v1`, `boundary-v1`)
//! - Keeps only candidates the executor proves to reach their target
//! - Deduplicates by content hash, scores and ranks the survivors
//! - Checks determinism and idempotence of single rules on random inputs

mod config;
mod error;
mod hash;
mod property;
mod score;
mod strategy;
mod suggest;
mod values;

pub use config::SuggestConfig;
pub use error::{TestGenError, TestGenResult};
pub use hash::content_hash;
pub use property::{Property, PropertyFailure, PropertyReport, PropertyRunner};
pub use score::{DeltaScorer, Scorer};
pub use strategy::{BoundaryV1, Candidate, CandidateStrategy, StaticV1, BOUNDARY_VALUES};
pub use suggest::{SuggestedTest, SuggestionEngine, SuggestionEngineBuilder};
pub use values::{FieldKind, SAMPLE_IBAN};
