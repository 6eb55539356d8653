//! Dashboard: Axum web server exposing the view as JSON.
//!
//! Serves the board, the deep dive and a few backend proxies.
//! CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use routes::AppState;

/// Bind the dashboard port and serve in a background task.
///
/// Binding happens before returning so a taken port is reported to the
/// caller rather than lost inside the task.
pub async fn spawn_dashboard(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;
    info!(port, "Dashboard server starting on http://localhost:{port}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Dashboard server error");
        }
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/status", get(routes::get_status))
        .route("/api/board", get(routes::get_board))
        .route("/api/reload", post(routes::post_reload))
        .route("/api/select", post(routes::post_select))
        .route("/api/deep-dive", get(routes::get_deep_dive))
        .route("/api/teams/:team", get(routes::get_team))
        .route("/api/predictions", get(routes::get_predictions))
        .route("/api/metrics", get(routes::get_metrics))
        .route("/api/validate", post(routes::post_validate))
        .route("/api/analyze", post(routes::post_analyze))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
