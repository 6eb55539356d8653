//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::analysis::discrepancy::{largest_discrepancy, summarize};
use crate::analysis::grouping::ViewerClock;
use crate::analysis::ranking::{BoardOptions, SortMode};
use crate::engine::view::{DeepDiveSnapshot, IntelView, ViewStatus};
use crate::gateway::GatewayError;
use crate::teams::{TeamBadge, TeamDirectory};
use crate::types::{
    MatchAnalysis, MatchKey, Outcome, Prediction, PredictionFilter, ValidationMetrics,
    ValidationRun,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub view: IntelView,
    pub directory: TeamDirectory,
    pub clock: ViewerClock,
    /// Board options used when a request doesn't override them.
    pub defaults: BoardOptions,
}

impl DashboardState {
    pub fn new(view: IntelView, clock: ViewerClock, defaults: BoardOptions) -> Self {
        Self {
            view,
            directory: TeamDirectory::new(),
            clock,
            defaults,
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Gateway(GatewayError),
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        ApiError::Gateway(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Gateway(e) => {
                let status = if e.is_timeout() {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::BAD_GATEWAY
                };
                (status, e.kind(), e.to_string())
            }
        };
        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One match as the board shows it.
#[derive(Debug, Clone, Serialize)]
pub struct BoardEntry {
    #[serde(flatten)]
    pub analysis: MatchAnalysis,
    pub home_abbreviation: String,
    pub away_abbreviation: String,
    pub max_abs_delta: f64,
    /// Outcome carrying `max_abs_delta`; absent when there are no deltas.
    pub largest_outcome: Option<Outcome>,
    pub high_conviction: bool,
    pub favorites_disagree: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardGroup {
    pub date: NaiveDate,
    pub label: String,
    pub matches: Vec<BoardEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardResponse {
    pub today: NaiveDate,
    pub options: BoardOptions,
    pub groups: Vec<BoardGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectResponse {
    pub selection: MatchKey,
    /// Deep-dive fetches issued; 0 when the match was already selected.
    pub fetches: usize,
}

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct BoardQuery {
    pub sort: Option<String>,
    pub biggest_only: Option<bool>,
}

impl BoardQuery {
    fn resolve(&self, defaults: BoardOptions) -> ApiResult<BoardOptions> {
        let sort = match &self.sort {
            Some(s) => s
                .parse::<SortMode>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?,
            None => defaults.sort,
        };
        Ok(BoardOptions {
            sort,
            biggest_only: self.biggest_only.unwrap_or(defaults.biggest_only),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub home_team: String,
    pub away_team: String,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<ViewStatus> {
    Json(state.view.status().await)
}

/// GET /api/board
pub async fn get_board(
    State(state): State<AppState>,
    Query(query): Query<BoardQuery>,
) -> ApiResult<Json<BoardResponse>> {
    let options = query.resolve(state.defaults)?;
    let today = state.clock.today();
    let groups = state.view.board(options, today).await;
    let selection = state.view.status().await.selection;

    let groups = groups
        .into_iter()
        .map(|g| BoardGroup {
            date: g.date,
            label: g.label,
            matches: g
                .matches
                .into_iter()
                .map(|m| {
                    let summary = summarize(&m);
                    BoardEntry {
                        home_abbreviation: state.directory.abbreviation(&m.home_team),
                        away_abbreviation: state.directory.abbreviation(&m.away_team),
                        max_abs_delta: summary.max_abs_delta,
                        largest_outcome: largest_discrepancy(&m).map(|d| d.outcome),
                        high_conviction: summary.high_conviction,
                        favorites_disagree: m.favorites_disagree(),
                        selected: selection.as_ref().is_some_and(|k| m.matches_key(k)),
                        analysis: m,
                    }
                })
                .collect(),
        })
        .collect();

    Ok(Json(BoardResponse { today, options, groups }))
}

/// POST /api/reload
pub async fn post_reload(State(state): State<AppState>) -> (StatusCode, Json<ViewStatus>) {
    // The fetch runs on its own task; callers poll /api/status.
    drop(state.view.reload().await);
    (StatusCode::ACCEPTED, Json(state.view.status().await))
}

/// POST /api/select
pub async fn post_select(
    State(state): State<AppState>,
    Json(key): Json<MatchKey>,
) -> ApiResult<(StatusCode, Json<SelectResponse>)> {
    let handles = state
        .view
        .select(&key)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No match {key} in the current list")))?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SelectResponse { selection: key, fetches: handles.len() }),
    ))
}

/// GET /api/deep-dive
pub async fn get_deep_dive(State(state): State<AppState>) -> Json<DeepDiveSnapshot> {
    Json(state.view.deep_dive().await)
}

/// GET /api/teams/:team
pub async fn get_team(
    State(state): State<AppState>,
    Path(team): Path<String>,
) -> ApiResult<Json<TeamBadge>> {
    let gateway = state.view.gateway().clone();
    let badge = state
        .view
        .bounded(state.directory.badge(gateway.as_ref(), &team))
        .await?;
    Ok(Json(badge))
}

/// GET /api/predictions
pub async fn get_predictions(
    State(state): State<AppState>,
    Query(filter): Query<PredictionFilter>,
) -> ApiResult<Json<Vec<Prediction>>> {
    let view = &state.view;
    Ok(Json(view.bounded(view.gateway().predictions(filter)).await?))
}

/// GET /api/metrics
pub async fn get_metrics(State(state): State<AppState>) -> ApiResult<Json<ValidationMetrics>> {
    let view = &state.view;
    Ok(Json(view.bounded(view.gateway().metrics()).await?))
}

/// POST /api/validate
pub async fn post_validate(State(state): State<AppState>) -> ApiResult<Json<ValidationRun>> {
    let view = &state.view;
    Ok(Json(view.bounded(view.gateway().run_validation()).await?))
}

/// POST /api/analyze
pub async fn post_analyze(
    State(state): State<AppState>,
    Query(query): Query<AnalyzeQuery>,
) -> ApiResult<Json<MatchAnalysis>> {
    let (home, away) = (query.home_team.trim(), query.away_team.trim());
    if home.is_empty() || away.is_empty() {
        return Err(ApiError::BadRequest("home_team and away_team are required".into()));
    }
    let view = &state.view;
    Ok(Json(view.bounded(view.gateway().analyze_match(home, away)).await?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_query_resolution() {
        let defaults = BoardOptions { sort: SortMode::Discrepancy, biggest_only: true };
        assert_eq!(BoardQuery::default().resolve(defaults).unwrap(), defaults);

        let q = BoardQuery { sort: Some("chronological".into()), biggest_only: Some(false) };
        assert_eq!(q.resolve(defaults).unwrap(), BoardOptions::default());

        let q = BoardQuery { sort: Some("alphabetical".into()), biggest_only: None };
        assert!(matches!(q.resolve(defaults), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_gateway_error_status_mapping() {
        let resp = ApiError::from(GatewayError::Http { status: 500, message: "boom".into() })
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let resp = ApiError::from(GatewayError::Network("request timed out after 10ms".into()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);

        let resp = ApiError::NotFound("gone".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_board_entry_flattens_analysis() {
        let entry = BoardEntry {
            analysis: MatchAnalysis::sample("Arsenal", "Chelsea", "2025-01-04T15:00:00Z"),
            home_abbreviation: "ARS".into(),
            away_abbreviation: "CHE".into(),
            max_abs_delta: 0.0,
            largest_outcome: None,
            high_conviction: false,
            favorites_disagree: false,
            selected: true,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["home_team"], "Arsenal");
        assert_eq!(json["kickoff_utc"], "2025-01-04T15:00:00Z");
        assert_eq!(json["home_abbreviation"], "ARS");
        assert_eq!(json["selected"], true);
    }
}
