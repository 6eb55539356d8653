//! Top-level match list state machine.
//!
//! `Idle → Loading → Ready | Failed`, with `Ready` and `Failed` (and
//! `Loading` itself) going back to `Loading` on reload. Every reload bumps
//! a monotonic epoch; a result is only applied if it carries the latest
//! epoch, so the most recently *issued* reload always wins.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::gateway::GatewayError;
use crate::types::{MatchAnalysis, MatchKey};

/// Generation counter for top-level reloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ReloadEpoch(pub u64);

impl fmt::Display for ReloadEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reload#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Idle,
    Loading,
    Ready {
        /// In the order the backend returned them.
        matches: Vec<MatchAnalysis>,
        last_updated: DateTime<Utc>,
    },
    Failed {
        error: GatewayError,
    },
}

impl FetchState {
    pub fn name(&self) -> &'static str {
        match self {
            FetchState::Idle => "idle",
            FetchState::Loading => "loading",
            FetchState::Ready { .. } => "ready",
            FetchState::Failed { .. } => "failed",
        }
    }
}

/// What happened to a completed reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The result was current and is now the view state.
    Applied {
        /// Selection after the reload; `changed` when it differs from the
        /// selection held before.
        selection: Option<MatchKey>,
        changed: bool,
    },
    /// The result was for an older reload and was dropped.
    Stale,
}

/// Owner of the match list, the reload epoch and the current selection.
#[derive(Debug, Clone, Default)]
pub struct FetchOrchestrator {
    state: FetchState,
    epoch: ReloadEpoch,
    selection: Option<MatchKey>,
}

impl Default for FetchState {
    fn default() -> Self {
        FetchState::Idle
    }
}

impl FetchOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// The epoch of the most recently issued reload.
    pub fn epoch(&self) -> ReloadEpoch {
        self.epoch
    }

    /// Start a reload. The returned epoch must accompany the result.
    pub fn begin_reload(&mut self) -> ReloadEpoch {
        self.epoch = ReloadEpoch(self.epoch.0 + 1);
        self.state = FetchState::Loading;
        info!(epoch = self.epoch.0, "Reload issued");
        self.epoch
    }

    /// Apply the result of the reload tagged `epoch`.
    pub fn complete_reload(
        &mut self,
        epoch: ReloadEpoch,
        result: Result<Vec<MatchAnalysis>, GatewayError>,
        now: DateTime<Utc>,
    ) -> ReloadOutcome {
        if epoch != self.epoch {
            debug!(
                epoch = epoch.0,
                current = self.epoch.0,
                "Discarding stale reload result"
            );
            return ReloadOutcome::Stale;
        }

        let previous = self.selection.clone();
        match result {
            Ok(matches) => {
                // Keep the viewer's pick if it survived the reload, otherwise
                // fall back to the first match in backend order.
                self.selection = previous
                    .as_ref()
                    .filter(|key| matches.iter().any(|m| m.matches_key(key)))
                    .cloned()
                    .or_else(|| matches.first().map(MatchAnalysis::key));
                info!(epoch = epoch.0, count = matches.len(), "Reload applied");
                self.state = FetchState::Ready { matches, last_updated: now };
            }
            Err(error) => {
                warn!(epoch = epoch.0, error = %error, "Reload failed");
                self.selection = None;
                self.state = FetchState::Failed { error };
            }
        }

        ReloadOutcome::Applied {
            changed: self.selection != previous,
            selection: self.selection.clone(),
        }
    }

    /// Current match list; empty unless `Ready`.
    pub fn matches(&self) -> &[MatchAnalysis] {
        match &self.state {
            FetchState::Ready { matches, .. } => matches,
            _ => &[],
        }
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            FetchState::Ready { last_updated, .. } => Some(*last_updated),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&GatewayError> {
        match &self.state {
            FetchState::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn selection(&self) -> Option<&MatchKey> {
        self.selection.as_ref()
    }

    /// The selected match, resolved against the current list.
    pub fn selected_match(&self) -> Option<&MatchAnalysis> {
        let key = self.selection.as_ref()?;
        self.matches().iter().find(|m| m.matches_key(key))
    }

    /// Select a match by key. Returns the resolved match, or `None` (and
    /// leaves the selection untouched) when the key is not in the list.
    pub fn select(&mut self, key: &MatchKey) -> Option<&MatchAnalysis> {
        let idx = self.matches().iter().position(|m| m.matches_key(key))?;
        self.selection = Some(key.clone());
        self.matches().get(idx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
