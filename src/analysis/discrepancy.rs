//! Market vs model disagreement scoring.

use serde::Serialize;

use crate::types::{Discrepancy, MatchAnalysis};

/// A match is high-conviction when the model and the market disagree on
/// some outcome by more than this many probability points (0.05 = 5pp).
pub const HIGH_CONVICTION_THRESHOLD: f64 = 0.05;

/// Largest absolute delta across a match's outcomes, 0.0 when there are
/// none.
pub fn max_abs_delta(m: &MatchAnalysis) -> f64 {
    m.discrepancies
        .iter()
        .map(|d| d.delta.abs())
        .fold(0.0, f64::max)
}

/// Strictly greater than the threshold; exactly 5pp does not qualify.
pub fn is_high_conviction(m: &MatchAnalysis) -> bool {
    max_abs_delta(m) > HIGH_CONVICTION_THRESHOLD
}

/// The outcome carrying the largest absolute delta. Ties keep the first
/// one in backend order.
pub fn largest_discrepancy(m: &MatchAnalysis) -> Option<&Discrepancy> {
    m.discrepancies.iter().fold(None, |best: Option<&Discrepancy>, d| match best {
        Some(b) if b.delta.abs() >= d.delta.abs() => Some(b),
        _ => Some(d),
    })
}

/// Per-match summary used for display emphasis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiscrepancySummary {
    pub max_abs_delta: f64,
    pub high_conviction: bool,
}

pub fn summarize(m: &MatchAnalysis) -> DiscrepancySummary {
    let max_abs_delta = max_abs_delta(m);
    DiscrepancySummary {
        max_abs_delta,
        high_conviction: max_abs_delta > HIGH_CONVICTION_THRESHOLD,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Outcome;

    fn with_deltas(deltas: &[(Outcome, f64)]) -> MatchAnalysis {
        let mut m = MatchAnalysis::sample("Arsenal", "Chelsea", "2025-01-04T15:00:00Z");
        m.discrepancies = deltas
            .iter()
            .map(|&(outcome, delta)| Discrepancy {
                outcome,
                market_probability: 0.3,
                model_probability: 0.3 + delta,
                delta,
            })
            .collect();
        m
    }

    #[test]
    fn test_empty_is_zero() {
        let m = with_deltas(&[]);
        assert_eq!(max_abs_delta(&m), 0.0);
        assert!(!is_high_conviction(&m));
        assert!(largest_discrepancy(&m).is_none());
    }

    #[test]
    fn test_mixed_signs_scenario() {
        let m = with_deltas(&[
            (Outcome::Home, 0.07),
            (Outcome::Draw, -0.02),
            (Outcome::Away, -0.05),
        ]);
        assert!((max_abs_delta(&m) - 0.07).abs() < 1e-12);
        assert!(is_high_conviction(&m));
        assert_eq!(largest_discrepancy(&m).unwrap().outcome, Outcome::Home);
    }

    #[test]
    fn test_negative_delta_dominates() {
        let m = with_deltas(&[(Outcome::Home, 0.01), (Outcome::Away, -0.09)]);
        assert!((max_abs_delta(&m) - 0.09).abs() < 1e-12);
        assert_eq!(largest_discrepancy(&m).unwrap().outcome, Outcome::Away);
    }

    #[test]
    fn test_threshold_is_strict() {
        let m = with_deltas(&[(Outcome::Draw, 0.05)]);
        assert!(!is_high_conviction(&m));
        let m = with_deltas(&[(Outcome::Draw, 0.0501)]);
        assert!(is_high_conviction(&m));
    }

    #[test]
    fn test_nonempty_all_zero_deltas() {
        // Zero deltas still count as "has discrepancies" but score 0.
        let m = with_deltas(&[(Outcome::Home, 0.0), (Outcome::Away, -0.0)]);
        assert_eq!(max_abs_delta(&m), 0.0);
        assert!(max_abs_delta(&m) >= 0.0);
    }

    #[test]
    fn test_summarize() {
        let s = summarize(&with_deltas(&[(Outcome::Away, -0.12)]));
        assert!((s.max_abs_delta - 0.12).abs() < 1e-12);
        assert!(s.high_conviction);
    }
}
