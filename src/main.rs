//! matchintel: market vs model discrepancy board
//!
//! Entry point. Loads configuration, initialises structured logging,
//! connects to the analysis backend and keeps the board fresh on an
//! interval, printing it after every reload, until Ctrl+C.

use anyhow::{Context, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{info, warn};

use matchintel::analysis::grouping::ViewerClock;
use matchintel::board::render_text;
use matchintel::config::AppConfig;
use matchintel::dashboard::{self, routes::DashboardState};
use matchintel::engine::orchestrator::ReloadOutcome;
use matchintel::engine::view::IntelView;
use matchintel::gateway::http::HttpGateway;
use matchintel::teams::TeamDirectory;

const BANNER: &str = r#"
  __  __       _       _     ___       _       _
 |  \/  | __ _| |_ ___| |__ |_ _|_ __ | |_ ___| |
 | |\/| |/ _` | __/ __| '_ \ | || '_ \| __/ _ \ |
 | |  | | (_| | || (__| | | || || | | | ||  __/ |
 |_|  |_|\__,_|\__\___|_| |_|___|_| |_|\__\___|_|

  Market vs model discrepancy board
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let mut cfg = AppConfig::load_or_default("config.toml")?;
    cfg.apply_env_overrides();
    let clock = cfg.viewer_clock()?;

    println!("{BANNER}");
    info!(
        base_url = %cfg.api.base_url,
        refresh_interval_secs = cfg.board.refresh_interval_secs,
        sort = %cfg.board.sort,
        biggest_only = cfg.board.biggest_only,
        "matchintel starting up"
    );

    // -- Initialise components -------------------------------------------

    let gateway = HttpGateway::new(&cfg.api.base_url).context("Failed to build HTTP gateway")?;
    let view = IntelView::new(Arc::new(gateway), cfg.request_timeout());
    let directory = TeamDirectory::new();

    match view.bounded(view.gateway().health()).await {
        Ok(h) => info!(status = %h.status, predictions = h.predictions_count, "Backend reachable"),
        Err(e) => warn!(error = %e, "Backend health check failed, continuing"),
    }

    if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(view.clone(), clock, cfg.board_options()));
        dashboard::spawn_dashboard(state, cfg.dashboard.port).await?;
    }

    // -- Main loop -------------------------------------------------------

    let mut interval = tokio::time::interval(cfg.refresh_interval());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.board.refresh_interval_secs,
        "Entering refresh loop. Press Ctrl+C to stop."
    );

    loop {
        if until_shutdown(interval.tick(), shutdown.as_mut()).await.is_none()
            || until_shutdown(refresh(&view, &directory, &cfg, clock), shutdown.as_mut())
                .await
                .is_none()
        {
            info!("Shutdown signal received.");
            break;
        }
    }

    info!("matchintel shut down cleanly.");
    Ok(())
}

/// Run `work` unless `shutdown` fires first. `None` means shut down.
async fn until_shutdown<F, S>(work: F, shutdown: Pin<&mut S>) -> Option<F::Output>
where
    F: Future,
    S: Future,
{
    tokio::select! {
        out = work => Some(out),
        _ = shutdown => None,
    }
}

/// Reload the board and print it.
async fn refresh(view: &IntelView, directory: &TeamDirectory, cfg: &AppConfig, clock: ViewerClock) {
    let outcome = match view.reload().await.await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "Reload task aborted");
            return;
        }
    };
    if outcome == ReloadOutcome::Stale {
        // A dashboard-issued reload superseded this one; it prints nothing.
        return;
    }

    let status = view.status().await;
    if let Some(error) = status.error {
        println!("Failed to load matches: {error}");
        return;
    }

    let groups = view.board(cfg.board_options(), clock.today()).await;
    println!("{}", render_text(&groups, status.selection.as_ref(), directory));
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("matchintel=info"));

    let json_logging = std::env::var("MATCHINTEL_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
