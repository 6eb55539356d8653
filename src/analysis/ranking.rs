//! Display ordering and the "biggest disagreements" filter.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::discrepancy::max_abs_delta;
use crate::types::MatchAnalysis;

/// How many matches survive the `biggest_only` filter.
pub const BIGGEST_ONLY_LIMIT: usize = 5;

/// Flat-list ordering chosen by the viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Earliest kickoff first.
    #[default]
    Chronological,
    /// Largest market/model gap first.
    Discrepancy,
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::Chronological => write!(f, "chronological"),
            SortMode::Discrepancy => write!(f, "discrepancy"),
        }
    }
}

impl std::str::FromStr for SortMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chronological" | "time" | "kickoff" => Ok(SortMode::Chronological),
            "discrepancy" | "delta" | "edge" => Ok(SortMode::Discrepancy),
            other => anyhow::bail!("Unknown sort mode: {other}"),
        }
    }
}

/// Viewer-selected board options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardOptions {
    #[serde(default)]
    pub sort: SortMode,
    #[serde(default)]
    pub biggest_only: bool,
}

/// Stable sort by `mode`, then truncate to `BIGGEST_ONLY_LIMIT` when
/// `biggest_only` is set.
///
/// The truncation always applies to the already-sorted list, so in
/// chronological mode `biggest_only` keeps the five earliest kickoffs.
pub fn rank<'a>(matches: &'a [MatchAnalysis], options: BoardOptions) -> Vec<&'a MatchAnalysis> {
    let mut ordered: Vec<&MatchAnalysis> = matches.iter().collect();
    match options.sort {
        SortMode::Chronological => ordered.sort_by_key(|m| m.kickoff),
        SortMode::Discrepancy => {
            ordered.sort_by(|a, b| max_abs_delta(b).total_cmp(&max_abs_delta(a)))
        }
    }
    if options.biggest_only {
        ordered.truncate(BIGGEST_ONLY_LIMIT);
    }
    ordered
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
