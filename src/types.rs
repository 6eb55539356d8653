//! Shared types for the match intelligence view.
//!
//! Two families live here: the records the backend hands us (analyses,
//! predictions, form, lineups, head-to-head) and the small identity types
//! the view uses to refer back to them across reloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// One leg of a 1X2 market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Home => write!(f, "home"),
            Outcome::Draw => write!(f, "draw"),
            Outcome::Away => write!(f, "away"),
        }
    }
}

// ---------------------------------------------------------------------------
// Match analysis
// ---------------------------------------------------------------------------

/// Signed gap between the model and the market for one outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub outcome: Outcome,
    /// Implied probability from bookmaker odds (0.0–1.0).
    pub market_probability: f64,
    /// Adjusted model probability (0.0–1.0).
    pub model_probability: f64,
    /// `model_probability - market_probability`; negative when the model is
    /// less confident than the market.
    pub delta: f64,
}

impl Discrepancy {
    pub fn new(outcome: Outcome, market_probability: f64, model_probability: f64) -> Self {
        Self {
            outcome,
            market_probability,
            model_probability,
            delta: model_probability - market_probability,
        }
    }
}

/// One match's market-vs-model comparison record, as produced by the
/// analysis backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAnalysis {
    pub home_team: String,
    pub away_team: String,
    #[serde(rename = "kickoff_utc")]
    pub kickoff: DateTime<Utc>,
    /// Label of the market's favourite outcome (team name or "Draw").
    pub market_favorite: String,
    pub market_favorite_prob: f64,
    pub model_favorite: String,
    pub model_favorite_prob: f64,
    #[serde(default)]
    pub discrepancies: Vec<Discrepancy>,
    pub conclusion: String,
    /// Present on the enhanced analysis payload, e.g. "Regular Season - 23".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matchweek: Option<String>,
}

impl fmt::Display for MatchAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {} @ {} (market: {} {:.0}% | model: {} {:.0}%)",
            self.home_team,
            self.away_team,
            self.kickoff.format("%Y-%m-%d %H:%M UTC"),
            self.market_favorite,
            self.market_favorite_prob * 100.0,
            self.model_favorite,
            self.model_favorite_prob * 100.0,
        )
    }
}

impl MatchAnalysis {
    /// Composite identity used to re-find this match after a reload.
    pub fn key(&self) -> MatchKey {
        MatchKey {
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            kickoff: self.kickoff,
        }
    }

    /// Whether this record is the match identified by `key`.
    pub fn matches_key(&self, key: &MatchKey) -> bool {
        self.home_team == key.home_team
            && self.away_team == key.away_team
            && self.kickoff == key.kickoff
    }

    /// The discrepancy for a given outcome, if the backend produced one.
    pub fn discrepancy(&self, outcome: Outcome) -> Option<&Discrepancy> {
        self.discrepancies.iter().find(|d| d.outcome == outcome)
    }

    /// Whether the market and the model back different outcomes.
    pub fn favorites_disagree(&self) -> bool {
        self.market_favorite != self.model_favorite
    }

    /// Check the one-discrepancy-per-outcome rule.
    pub fn check_discrepancies(&self) -> Result<(), String> {
        for (i, d) in self.discrepancies.iter().enumerate() {
            if self.discrepancies[..i].iter().any(|p| p.outcome == d.outcome) {
                return Err(format!(
                    "duplicate '{}' discrepancy for {} vs {}",
                    d.outcome, self.home_team, self.away_team
                ));
            }
        }
        Ok(())
    }

    /// Helper to build a test/sample analysis with no discrepancies.
    #[cfg(test)]
    pub fn sample(home: &str, away: &str, kickoff: &str) -> Self {
        MatchAnalysis {
            home_team: home.to_string(),
            away_team: away.to_string(),
            kickoff: kickoff.parse().expect("valid RFC 3339 kickoff"),
            market_favorite: home.to_string(),
            market_favorite_prob: 0.45,
            model_favorite: home.to_string(),
            model_favorite_prob: 0.47,
            discrepancies: Vec::new(),
            conclusion: "No discrepancy items were generated.".to_string(),
            matchweek: None,
        }
    }
}

/// Identity of a match in the view: both team names plus kickoff.
///
/// The backend assigns no stable id to analyses, and every reload produces
/// fresh records, so selections are held by this key rather than by
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchKey {
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Utc>,
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {} ({})",
            self.home_team,
            self.away_team,
            self.kickoff.to_rfc3339()
        )
    }
}

// ---------------------------------------------------------------------------
// Prediction history and validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub predictions_count: u64,
}

/// A stored prediction, optionally validated against the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub match_date: String,
    pub market_favorite: String,
    pub market_favorite_prob: f64,
    pub model_favorite: String,
    pub model_favorite_prob: f64,
    pub home_odds: f64,
    pub draw_odds: f64,
    pub away_odds: f64,
    pub actual_result: Option<String>,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    pub is_validated: bool,
}

/// Filters for the predictions listing. The two flags are independent;
/// the backend gives `validated_only` precedence when both are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionFilter {
    #[serde(default)]
    pub validated_only: bool,
    #[serde(default)]
    pub pending_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub total: u64,
    pub validated: u64,
    pub pending: u64,
    pub market_correct: u64,
    pub model_correct: u64,
    pub market_accuracy: f64,
    pub model_accuracy: f64,
    pub disagreements: u64,
    pub model_wins_when_disagreed: u64,
}

impl fmt::Display for ValidationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "validated {}/{} | market {:.1}% | model {:.1}% | disagreements {} (model won {})",
            self.validated,
            self.total,
            self.market_accuracy * 100.0,
            self.model_accuracy * 100.0,
            self.disagreements,
            self.model_wins_when_disagreed,
        )
    }
}

/// Result of an explicit validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRun {
    pub updated: u64,
    pub still_pending: u64,
    pub metrics: ValidationMetrics,
}

// ---------------------------------------------------------------------------
// Deep-dive payloads
// ---------------------------------------------------------------------------

/// A team's recent results, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamForm {
    pub team_name: String,
    #[serde(default)]
    pub matches: Vec<FormEntry>,
    /// e.g. "W-W-D-L-W"
    #[serde(default)]
    pub form_string: String,
    pub goals_scored: u32,
    pub goals_conceded: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormEntry {
    pub opponent: String,
    /// "W", "D" or "L".
    pub result: String,
    pub score: String,
    pub home: bool,
    #[serde(default)]
    pub date: String,
}

/// Predicted lineup, taken from the team's most recent fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineup {
    pub team_name: String,
    pub formation: String,
    #[serde(default)]
    pub start_xi: Vec<LineupSlot>,
    #[serde(default)]
    pub substitutes: Vec<LineupSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupSlot {
    pub player: LineupPlayer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupPlayer {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub number: Option<u32>,
    /// Position code: "G", "D", "M" or "F".
    #[serde(default)]
    pub pos: Option<String>,
    /// Pitch grid cell, e.g. "2:3".
    #[serde(default)]
    pub grid: Option<String>,
}

/// Recent meetings between two teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub team1: String,
    pub team2: String,
    #[serde(default)]
    pub matches: Vec<H2hMatch>,
    pub team1_wins: u32,
    pub team2_wins: u32,
    pub draws: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct H2hMatch {
    pub home_team: String,
    pub away_team: String,
    pub score: String,
    /// Winning team name, or "Draw".
    pub winner: String,
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamLogo {
    pub team_name: String,
    pub logo_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
