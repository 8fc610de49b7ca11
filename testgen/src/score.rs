//! Suggestion scoring.

/// Scores a validated candidate.
///
/// Implementations must be monotonically increasing in `delta` and, for
/// equal deltas, rank a rule with no prior coverage above a partially
/// covered one.
pub trait Scorer: Send + Sync {
    fn score(&self, delta: usize, prior_coverage: usize) -> f64;
}

/// `delta + 0.5` for rules nothing covers yet, `delta` otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaScorer;

impl Scorer for DeltaScorer {
    fn score(&self, delta: usize, prior_coverage: usize) -> f64 {
        let gap_bonus = if prior_coverage == 0 { 0.5 } else { 0.0 };
        delta as f64 + gap_bonus
    }
}
