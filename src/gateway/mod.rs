//! Backend gateway.
//!
//! Defines the `IntelGateway` trait (one method per backend capability)
//! and the result types every caller handles: `GatewayError` for failed
//! requests and `Lookup` for resources that may legitimately be absent.
//!
//! Gateways perform exactly one request per call. They never retry, cache
//! or time out on their own; callers that need a deadline wrap the future.

pub mod http;

use async_trait::async_trait;
use serde::Serialize;

use crate::types::{
    HeadToHead, HealthStatus, Lineup, MatchAnalysis, Prediction, PredictionFilter, TeamForm,
    ValidationMetrics, ValidationRun,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a gateway request failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum GatewayError {
    /// No response reached us (connection refused, DNS, reset, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Short machine-readable kind, used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Network(_) => "network",
            GatewayError::Http { .. } => "http",
            GatewayError::Decode(_) => "decode",
        }
    }

    /// A network failure caused by a deadline rather than the connection.
    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Network(msg) if msg.contains("timed out"))
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

// ---------------------------------------------------------------------------
// Lookup results
// ---------------------------------------------------------------------------

/// Outcome of a lookup that reached the backend successfully.
///
/// Absence (unknown team, no logo on file, no fixtures this season) is a
/// normal answer, not a failure, so it lives here rather than in
/// `GatewayError`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(v) => Lookup::Found(f(v)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Abstraction over the match analysis backend.
///
/// `run_validation` is the only operation with a server-side effect and is
/// never called by the view on its own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IntelGateway: Send + Sync {
    /// Backend liveness and stored prediction count.
    async fn health(&self) -> GatewayResult<HealthStatus>;

    /// Analyse every upcoming match.
    async fn analyze_all(&self) -> GatewayResult<Vec<MatchAnalysis>>;

    /// Analyse a single fixture.
    async fn analyze_match(&self, home_team: &str, away_team: &str)
        -> GatewayResult<MatchAnalysis>;

    /// Stored predictions, optionally filtered.
    async fn predictions(&self, filter: PredictionFilter) -> GatewayResult<Vec<Prediction>>;

    /// Accuracy metrics across validated predictions.
    async fn metrics(&self) -> GatewayResult<ValidationMetrics>;

    /// Validate pending predictions against final scores.
    async fn run_validation(&self) -> GatewayResult<ValidationRun>;

    async fn team_form(&self, team: &str) -> GatewayResult<Lookup<TeamForm>>;

    async fn lineup(&self, team: &str) -> GatewayResult<Lookup<Lineup>>;

    async fn head_to_head(&self, team1: &str, team2: &str) -> GatewayResult<Lookup<HeadToHead>>;

    /// Logo URL for a team.
    async fn team_logo(&self, team: &str) -> GatewayResult<Lookup<String>>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
