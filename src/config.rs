//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! field has a default, so a partial file (or no file at all) is valid.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::analysis::grouping::ViewerClock;
use crate::analysis::ranking::{BoardOptions, SortMode};
use crate::gateway::http::DEFAULT_BASE_URL;

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "MATCHINTEL_API_URL";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub board: BoardConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Deadline applied by the view to each backend call.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BoardConfig {
    pub sort: SortMode,
    pub biggest_only: bool,
    pub refresh_interval_secs: u64,
    /// Viewer offset from UTC used for "TODAY"/"TOMORROW" labels. Unset
    /// means the system's local zone.
    pub utc_offset_minutes: Option<i32>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            sort: SortMode::Chronological,
            biggest_only: false,
            refresh_interval_secs: 300,
            utc_offset_minutes: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { enabled: true, port: 3001 }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        if config.board.refresh_interval_secs == 0 {
            anyhow::bail!("board.refresh_interval_secs must be positive");
        }
        if config.api.request_timeout_secs == 0 {
            anyhow::bail!("api.request_timeout_secs must be positive");
        }
        Ok(config)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            info!(path, "No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Apply `MATCHINTEL_API_URL` if it is set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        self.apply_api_url(std::env::var(API_URL_ENV).ok());
    }

    fn apply_api_url(&mut self, value: Option<String>) {
        if let Some(url) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            info!(base_url = %url, "API base URL overridden from environment");
            self.api.base_url = url;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.board.refresh_interval_secs)
    }

    pub fn board_options(&self) -> BoardOptions {
        BoardOptions {
            sort: self.board.sort,
            biggest_only: self.board.biggest_only,
        }
    }

    pub fn viewer_clock(&self) -> Result<ViewerClock> {
        ViewerClock::from_offset_minutes(self.board.utc_offset_minutes)
            .context("Invalid board.utc_offset_minutes")
    }
}
