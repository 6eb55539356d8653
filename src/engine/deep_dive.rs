//! Per-selection deep-dive panels.
//!
//! Selecting a match opens five independent panels: form and lineup for
//! each side, plus head-to-head. Each panel moves through its own
//! `Loading → Ready | Unavailable | Failed` lifecycle. A selection change
//! bumps the selection epoch, and any panel result carrying an older epoch
//! is dropped without touching state.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::gateway::{GatewayError, GatewayResult, Lookup};
use crate::types::{HeadToHead, Lineup, MatchAnalysis, MatchKey, TeamForm};

/// Generation counter for selections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SelectionEpoch(pub u64);

impl fmt::Display for SelectionEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "selection#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Panel state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum PanelState<T> {
    /// No match selected.
    Idle,
    Loading,
    Ready(T),
    /// The backend answered, but has nothing for this team or pair.
    Unavailable,
    /// The request itself failed.
    Failed(GatewayError),
}

impl<T> PanelState<T> {
    fn from_result(result: GatewayResult<Lookup<T>>) -> Self {
        match result {
            Ok(Lookup::Found(v)) => PanelState::Ready(v),
            Ok(Lookup::NotFound) => PanelState::Unavailable,
            Err(e) => PanelState::Failed(e),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, PanelState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            PanelState::Ready(v) => Some(v),
            _ => None,
        }
    }

    /// Inline text for panels that have no data to show.
    pub fn fallback_text(&self) -> Option<String> {
        match self {
            PanelState::Idle => Some("Select a match".to_string()),
            PanelState::Loading => Some("Loading…".to_string()),
            PanelState::Ready(_) => None,
            PanelState::Unavailable => Some("Data unavailable".to_string()),
            PanelState::Failed(e) => Some(format!("Request failed ({e})")),
        }
    }
}

/// Which of the five panels a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    HomeForm,
    AwayForm,
    HomeLineup,
    AwayLineup,
    HeadToHead,
}

impl Panel {
    pub const ALL: &'static [Panel] = &[
        Panel::HomeForm,
        Panel::AwayForm,
        Panel::HomeLineup,
        Panel::AwayLineup,
        Panel::HeadToHead,
    ];
}

/// A completed sub-fetch, routed to its panel.
#[derive(Debug, Clone)]
pub enum PanelUpdate {
    HomeForm(GatewayResult<Lookup<TeamForm>>),
    AwayForm(GatewayResult<Lookup<TeamForm>>),
    HomeLineup(GatewayResult<Lookup<Lineup>>),
    AwayLineup(GatewayResult<Lookup<Lineup>>),
    HeadToHead(GatewayResult<Lookup<HeadToHead>>),
}

impl PanelUpdate {
    pub fn panel(&self) -> Panel {
        match self {
            PanelUpdate::HomeForm(_) => Panel::HomeForm,
            PanelUpdate::AwayForm(_) => Panel::AwayForm,
            PanelUpdate::HomeLineup(_) => Panel::HomeLineup,
            PanelUpdate::AwayLineup(_) => Panel::AwayLineup,
            PanelUpdate::HeadToHead(_) => Panel::HeadToHead,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeepDivePanels {
    pub home_form: PanelState<TeamForm>,
    pub away_form: PanelState<TeamForm>,
    pub home_lineup: PanelState<Lineup>,
    pub away_lineup: PanelState<Lineup>,
    pub head_to_head: PanelState<HeadToHead>,
}

impl DeepDivePanels {
    fn idle() -> Self {
        Self {
            home_form: PanelState::Idle,
            away_form: PanelState::Idle,
            home_lineup: PanelState::Idle,
            away_lineup: PanelState::Idle,
            head_to_head: PanelState::Idle,
        }
    }

    fn loading() -> Self {
        Self {
            home_form: PanelState::Loading,
            away_form: PanelState::Loading,
            home_lineup: PanelState::Loading,
            away_lineup: PanelState::Loading,
            head_to_head: PanelState::Loading,
        }
    }

    /// Inline text for `panel` when it has no data to show.
    pub fn fallback_text(&self, panel: Panel) -> Option<String> {
        match panel {
            Panel::HomeForm => self.home_form.fallback_text(),
            Panel::AwayForm => self.away_form.fallback_text(),
            Panel::HomeLineup => self.home_lineup.fallback_text(),
            Panel::AwayLineup => self.away_lineup.fallback_text(),
            Panel::HeadToHead => self.head_to_head.fallback_text(),
        }
    }

    /// Fallback text for every panel without data, keyed by panel.
    pub fn fallback_messages(&self) -> BTreeMap<Panel, String> {
        Panel::ALL
            .iter()
            .filter_map(|p| self.fallback_text(*p).map(|text| (*p, text)))
            .collect()
    }

    /// Number of panels still waiting on the backend.
    pub fn pending(&self) -> usize {
        [
            self.home_form.is_loading(),
            self.away_form.is_loading(),
            self.home_lineup.is_loading(),
            self.away_lineup.is_loading(),
            self.head_to_head.is_loading(),
        ]
        .iter()
        .filter(|l| **l)
        .count()
    }
}

impl Default for DeepDivePanels {
    fn default() -> Self {
        Self::idle()
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// The sub-fetches to issue for a fresh selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepDivePlan {
    pub epoch: SelectionEpoch,
    pub home_team: String,
    pub away_team: String,
}

#[derive(Debug, Clone, Default)]
pub struct DeepDive {
    epoch: SelectionEpoch,
    selection: Option<MatchKey>,
    panels: DeepDivePanels,
}

impl DeepDive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> SelectionEpoch {
        self.epoch
    }

    pub fn selection(&self) -> Option<&MatchKey> {
        self.selection.as_ref()
    }

    pub fn panels(&self) -> &DeepDivePanels {
        &self.panels
    }

    /// Point the deep dive at `selected`.
    ///
    /// Re-selecting the match already shown is a no-op and returns `None`,
    /// so its panels are kept. Any other change (including clearing the
    /// selection) bumps the epoch; a plan is returned when there is a match
    /// to fetch for.
    pub fn select(&mut self, selected: Option<&MatchAnalysis>) -> Option<DeepDivePlan> {
        let key = selected.map(MatchAnalysis::key);
        if key == self.selection {
            return None;
        }

        self.epoch = SelectionEpoch(self.epoch.0 + 1);
        self.selection = key;

        match selected {
            Some(m) => {
                self.panels = DeepDivePanels::loading();
                debug!(epoch = self.epoch.0, home = %m.home_team, away = %m.away_team, "Deep dive opened");
                Some(DeepDivePlan {
                    epoch: self.epoch,
                    home_team: m.home_team.clone(),
                    away_team: m.away_team.clone(),
                })
            }
            None => {
                self.panels = DeepDivePanels::idle();
                None
            }
        }
    }

    /// Apply a sub-fetch result. Returns `false` when it was stale.
    pub fn apply(&mut self, epoch: SelectionEpoch, update: PanelUpdate) -> bool {
        if epoch != self.epoch {
            debug!(
                epoch = epoch.0,
                current = self.epoch.0,
                panel = ?update.panel(),
                "Discarding stale deep-dive result"
            );
            return false;
        }

        match update {
            PanelUpdate::HomeForm(r) => self.panels.home_form = PanelState::from_result(r),
            PanelUpdate::AwayForm(r) => self.panels.away_form = PanelState::from_result(r),
            PanelUpdate::HomeLineup(r) => self.panels.home_lineup = PanelState::from_result(r),
            PanelUpdate::AwayLineup(r) => self.panels.away_lineup = PanelState::from_result(r),
            PanelUpdate::HeadToHead(r) => self.panels.head_to_head = PanelState::from_result(r),
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
