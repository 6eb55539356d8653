//! HTTP gateway to the match analysis backend.
//!
//! Endpoints (all JSON):
//! - `GET  /health`
//! - `POST /analyze-all`, `POST /analyze?home_team=&away_team=`
//! - `GET  /predictions?validated_only=&pending_only=`, `GET /metrics`
//! - `POST /validate`
//! - `GET  /team-form/{team}`, `/lineup/{team}`, `/head-to-head/{t1}/{t2}`,
//!   `/team-logo/{team}`
//!
//! Error bodies follow FastAPI's `{"detail": "..."}` convention.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{GatewayError, GatewayResult, IntelGateway, Lookup};
use crate::types::{
    HeadToHead, HealthStatus, Lineup, MatchAnalysis, Prediction, PredictionFilter, TeamForm,
    TeamLogo, ValidationMetrics, ValidationRun,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Backend address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const USER_AGENT: &str = "matchintel/0.1.0";

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Pull a human-readable message out of an error response body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { detail: serde_json::Value::String(s) }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Whether a failed response actually means "no such team".
///
/// The backend wraps its own 404 for team lookups inside a 503 whose detail
/// reads e.g. "Failed to fetch team form: 404: Team not found: Foo".
fn is_absence(status: u16, message: &str) -> bool {
    if status == StatusCode::NOT_FOUND.as_u16() {
        return true;
    }
    let m = message.to_lowercase();
    status == StatusCode::SERVICE_UNAVAILABLE.as_u16()
        && (m.contains("team not found") || m.contains("teams not found"))
}

fn decode<T: DeserializeOwned>(body: &str, what: &str) -> GatewayResult<T> {
    serde_json::from_str(body).map_err(|e| GatewayError::Decode(format!("{what}: {e}")))
}

fn path_segment(name: &str) -> String {
    urlencoding::encode(name.trim()).into_owned()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// reqwest-backed `IntelGateway`.
#[derive(Clone)]
pub struct HttpGateway {
    http: Client,
    base_url: String,
}

impl HttpGateway {
    /// Create a gateway for the given base URL (trailing slashes ignored).
    pub fn new(base_url: &str) -> GatewayResult<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GatewayError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -- Internal helpers ------------------------------------------------

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "Backend request");
        self.http.request(method, url)
    }

    /// Send and read the body, splitting transport failures from HTTP
    /// failures.
    async fn send(&self, req: RequestBuilder) -> GatewayResult<(StatusCode, String)> {
        let resp: Response = req
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Network(format!("failed to read body: {e}")))?;
        Ok((status, body))
    }

    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> GatewayResult<T> {
        let (status, body) = self.send(req).await?;
        if !status.is_success() {
            let message = error_message(&body);
            warn!(status = status.as_u16(), what, message = %message, "Backend returned error");
            return Err(GatewayError::Http { status: status.as_u16(), message });
        }
        decode(&body, what)
    }

    /// Like `fetch`, but maps "not found" answers to `Lookup::NotFound`.
    async fn lookup<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        what: &str,
    ) -> GatewayResult<Lookup<T>> {
        let (status, body) = self.send(req).await?;
        if !status.is_success() {
            let message = error_message(&body);
            if is_absence(status.as_u16(), &message) {
                debug!(status = status.as_u16(), what, "Lookup target not found");
                return Ok(Lookup::NotFound);
            }
            warn!(status = status.as_u16(), what, message = %message, "Backend returned error");
            return Err(GatewayError::Http { status: status.as_u16(), message });
        }
        decode(&body, what).map(Lookup::Found)
    }
}

#[async_trait]
impl IntelGateway for HttpGateway {
    async fn health(&self) -> GatewayResult<HealthStatus> {
        self.fetch(self.request(Method::GET, "/health"), "health").await
    }

    async fn analyze_all(&self) -> GatewayResult<Vec<MatchAnalysis>> {
        let matches: Vec<MatchAnalysis> = self
            .fetch(self.request(Method::POST, "/analyze-all"), "analyze-all")
            .await?;
        for m in &matches {
            m.check_discrepancies().map_err(GatewayError::Decode)?;
        }
        Ok(matches)
    }

    async fn analyze_match(&self, home_team: &str, away_team: &str) -> GatewayResult<MatchAnalysis> {
        let req = self
            .request(Method::POST, "/analyze")
            .query(&[("home_team", home_team), ("away_team", away_team)]);
        let analysis: MatchAnalysis = self.fetch(req, "analyze").await?;
        analysis.check_discrepancies().map_err(GatewayError::Decode)?;
        Ok(analysis)
    }

    async fn predictions(&self, filter: PredictionFilter) -> GatewayResult<Vec<Prediction>> {
        let mut req = self.request(Method::GET, "/predictions");
        if filter.validated_only {
            req = req.query(&[("validated_only", "true")]);
        }
        if filter.pending_only {
            req = req.query(&[("pending_only", "true")]);
        }
        self.fetch(req, "predictions").await
    }

    async fn metrics(&self) -> GatewayResult<ValidationMetrics> {
        self.fetch(self.request(Method::GET, "/metrics"), "metrics").await
    }

    async fn run_validation(&self) -> GatewayResult<ValidationRun> {
        self.fetch(self.request(Method::POST, "/validate"), "validate").await
    }

    async fn team_form(&self, team: &str) -> GatewayResult<Lookup<TeamForm>> {
        let path = format!("/team-form/{}", path_segment(team));
        let form: Lookup<TeamForm> = self.lookup(self.request(Method::GET, &path), "team-form").await?;
        Ok(match form {
            Lookup::Found(f) if f.matches.is_empty() => Lookup::NotFound,
            other => other,
        })
    }

    async fn lineup(&self, team: &str) -> GatewayResult<Lookup<Lineup>> {
        let path = format!("/lineup/{}", path_segment(team));
        let lineup: Lookup<Lineup> = self.lookup(self.request(Method::GET, &path), "lineup").await?;
        Ok(match lineup {
            Lookup::Found(l) if l.start_xi.is_empty() => Lookup::NotFound,
            other => other,
        })
    }

    async fn head_to_head(&self, team1: &str, team2: &str) -> GatewayResult<Lookup<HeadToHead>> {
        let path = format!("/head-to-head/{}/{}", path_segment(team1), path_segment(team2));
        let h2h: Lookup<HeadToHead> =
            self.lookup(self.request(Method::GET, &path), "head-to-head").await?;
        Ok(match h2h {
            Lookup::Found(h) if h.matches.is_empty() => Lookup::NotFound,
            other => other,
        })
    }

    async fn team_logo(&self, team: &str) -> GatewayResult<Lookup<String>> {
        let path = format!("/team-logo/{}", path_segment(team));
        let logo: Lookup<TeamLogo> = self.lookup(self.request(Method::GET, &path), "team-logo").await?;
        Ok(match logo {
            Lookup::Found(TeamLogo { logo_url: Some(url), .. }) if !url.is_empty() => {
                Lookup::Found(url)
            }
            _ => Lookup::NotFound,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
