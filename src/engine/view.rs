//! The live intelligence view.
//!
//! `IntelView` owns the two pieces of mutable view state (the fetch
//! orchestrator and the deep dive) behind one lock and drives them against
//! an `IntelGateway`. Network calls run in spawned tasks with a deadline;
//! when a call completes, its result is applied under the lock only if its
//! epoch is still current. Nothing is cancelled at the transport level:
//! late results are simply discarded.

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use super::deep_dive::{
    DeepDive, DeepDivePanels, DeepDivePlan, Panel, PanelUpdate, SelectionEpoch,
};
use super::orchestrator::{FetchOrchestrator, ReloadEpoch, ReloadOutcome};
use crate::analysis::grouping::GroupedMatches;
use crate::analysis::ranking::BoardOptions;
use crate::board::compose_board;
use crate::gateway::{GatewayError, GatewayResult, IntelGateway};
use crate::types::{MatchAnalysis, MatchKey};

/// Default deadline for a single backend call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Run `fut`, turning an expired deadline into a network error.
pub async fn with_deadline<T>(
    timeout: Duration,
    fut: impl Future<Output = GatewayResult<T>>,
) -> GatewayResult<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Network(format!(
            "request timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ViewState {
    pub orchestrator: FetchOrchestrator,
    pub deep_dive: DeepDive,
}

/// Point-in-time summary of the top-level fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewStatus {
    pub state: &'static str,
    pub reload_epoch: ReloadEpoch,
    pub match_count: usize,
    pub last_updated: Option<DateTime<Utc>>,
    pub error: Option<GatewayError>,
    pub selection: Option<MatchKey>,
}

/// Deep-dive panels together with the match they belong to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeepDiveSnapshot {
    pub selection_epoch: SelectionEpoch,
    pub selection: Option<MatchKey>,
    pub panels: DeepDivePanels,
    /// Inline text for each panel that has no data to show.
    pub fallback: BTreeMap<Panel, String>,
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct IntelView {
    gateway: Arc<dyn IntelGateway>,
    state: Arc<RwLock<ViewState>>,
    request_timeout: Duration,
}

impl IntelView {
    pub fn new(gateway: Arc<dyn IntelGateway>, request_timeout: Duration) -> Self {
        Self {
            gateway,
            state: Arc::new(RwLock::new(ViewState::default())),
            request_timeout,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn IntelGateway> {
        &self.gateway
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Run a gateway call under this view's deadline.
    pub async fn bounded<T>(&self, fut: impl Future<Output = GatewayResult<T>>) -> GatewayResult<T> {
        with_deadline(self.request_timeout, fut).await
    }

    // -- Reload ------------------------------------------------------------

    /// Issue a reload and fetch in the background.
    ///
    /// The handle resolves once the result has been applied (or dropped as
    /// stale) and, if the reload moved the selection, once the resulting
    /// deep-dive fetches have settled too.
    pub async fn reload(&self) -> JoinHandle<ReloadOutcome> {
        let epoch = self.state.write().await.orchestrator.begin_reload();
        let view = self.clone();
        tokio::spawn(async move { view.run_reload(epoch).await })
    }

    async fn run_reload(&self, epoch: ReloadEpoch) -> ReloadOutcome {
        let gateway = self.gateway.clone();
        let result = self.bounded(gateway.analyze_all()).await;

        let (outcome, plan) = {
            let mut guard = self.state.write().await;
            let ViewState { orchestrator, deep_dive } = &mut *guard;
            let outcome = orchestrator.complete_reload(epoch, result, Utc::now());
            let plan = match outcome {
                ReloadOutcome::Applied { .. } => deep_dive.select(orchestrator.selected_match()),
                ReloadOutcome::Stale => None,
            };
            (outcome, plan)
        };

        if let Some(plan) = plan {
            join_all(self.spawn_deep_dive(plan)).await;
        }
        outcome
    }

    // -- Selection ---------------------------------------------------------

    /// Select a match by key and fan out its deep-dive fetches.
    ///
    /// Returns `None` when the key is not in the current list. Otherwise
    /// returns one handle per spawned sub-fetch; the list is empty when the
    /// match was already selected.
    pub async fn select(&self, key: &MatchKey) -> Option<Vec<JoinHandle<bool>>> {
        let plan = {
            let mut guard = self.state.write().await;
            let ViewState { orchestrator, deep_dive } = &mut *guard;
            let selected = orchestrator.select(key)?;
            deep_dive.select(Some(selected))
        };
        Some(plan.map(|p| self.spawn_deep_dive(p)).unwrap_or_default())
    }

    /// Five independent sub-fetches; none waits on another.
    fn spawn_deep_dive(&self, plan: DeepDivePlan) -> Vec<JoinHandle<bool>> {
        let DeepDivePlan { epoch, home_team, away_team } = plan;
        let gw = &self.gateway;

        vec![
            self.spawn_panel(epoch, PanelUpdate::HomeForm, {
                let (gw, team) = (gw.clone(), home_team.clone());
                async move { gw.team_form(&team).await }
            }),
            self.spawn_panel(epoch, PanelUpdate::AwayForm, {
                let (gw, team) = (gw.clone(), away_team.clone());
                async move { gw.team_form(&team).await }
            }),
            self.spawn_panel(epoch, PanelUpdate::HomeLineup, {
                let (gw, team) = (gw.clone(), home_team.clone());
                async move { gw.lineup(&team).await }
            }),
            self.spawn_panel(epoch, PanelUpdate::AwayLineup, {
                let (gw, team) = (gw.clone(), away_team.clone());
                async move { gw.lineup(&team).await }
            }),
            self.spawn_panel(epoch, PanelUpdate::HeadToHead, {
                let gw = gw.clone();
                async move { gw.head_to_head(&home_team, &away_team).await }
            }),
        ]
    }

    fn spawn_panel<T, W, Fut>(&self, epoch: SelectionEpoch, wrap: W, fetch: Fut) -> JoinHandle<bool>
    where
        T: Send + 'static,
        W: FnOnce(GatewayResult<T>) -> PanelUpdate + Send + 'static,
        Fut: Future<Output = GatewayResult<T>> + Send + 'static,
    {
        let state = self.state.clone();
        let timeout = self.request_timeout;
        tokio::spawn(async move {
            let update = wrap(with_deadline(timeout, fetch).await);
            let panel = update.panel();
            let applied = state.write().await.deep_dive.apply(epoch, update);
            debug!(epoch = epoch.0, panel = ?panel, applied, "Deep-dive fetch settled");
            applied
        })
    }

    // -- Snapshots ---------------------------------------------------------

    pub async fn status(&self) -> ViewStatus {
        let state = self.state.read().await;
        let o = &state.orchestrator;
        ViewStatus {
            state: o.state().name(),
            reload_epoch: o.epoch(),
            match_count: o.matches().len(),
            last_updated: o.last_updated(),
            error: o.error().cloned(),
            selection: o.selection().cloned(),
        }
    }

    /// Current match list in backend order.
    pub async fn matches(&self) -> Vec<MatchAnalysis> {
        self.state.read().await.orchestrator.matches().to_vec()
    }

    pub async fn selected_match(&self) -> Option<MatchAnalysis> {
        self.state.read().await.orchestrator.selected_match().cloned()
    }

    /// Ranked, filtered and grouped board for the current list.
    pub async fn board(&self, options: BoardOptions, today: NaiveDate) -> Vec<GroupedMatches> {
        let state = self.state.read().await;
        compose_board(state.orchestrator.matches(), options, today)
    }

    pub async fn deep_dive(&self) -> DeepDiveSnapshot {
        let state = self.state.read().await;
        let panels = state.deep_dive.panels();
        DeepDiveSnapshot {
            selection_epoch: state.deep_dive.epoch(),
            selection: state.deep_dive.selection().cloned(),
            fallback: panels.fallback_messages(),
            panels: panels.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::deep_dive::PanelState;
    use crate::gateway::{Lookup, MockIntelGateway};
    use crate::types::{HeadToHead, TeamForm};

    fn analyses() -> Vec<MatchAnalysis> {
        vec![
            MatchAnalysis::sample("Liverpool", "Everton", "2025-01-05T17:00:00Z"),
            MatchAnalysis::sample("Arsenal", "Chelsea", "2025-01-04T12:30:00Z"),
        ]
    }

    fn form(team: &str) -> TeamForm {
        TeamForm {
            team_name: team.to_string(),
            matches: Vec::new(),
            form_string: "W-D".into(),
            goals_scored: 3,
            goals_conceded: 1,
            wins: 1,
            draws: 1,
            losses: 0,
        }
    }

    fn mock_with_lookups() -> MockIntelGateway {
        let mut gw = MockIntelGateway::new();
        gw.expect_team_form().returning(|team| Ok(Lookup::Found(form(team))));
        gw.expect_lineup().returning(|_| Ok(Lookup::NotFound));
        gw.expect_head_to_head().returning(|_, _| {
            Err(GatewayError::Http { status: 503, message: "upstream down".into() })
        });
        gw
    }

    #[tokio::test]
    async fn test_reload_success_selects_first_and_fans_out() {
        let mut gw = mock_with_lookups();
        gw.expect_analyze_all().times(1).returning(|| Ok(analyses()));
        let view = IntelView::new(Arc::new(gw), DEFAULT_REQUEST_TIMEOUT);

        let outcome = view.reload().await.await.unwrap();
        assert!(matches!(outcome, ReloadOutcome::Applied { changed: true, .. }));

        let status = view.status().await;
        assert_eq!(status.state, "ready");
        assert_eq!(status.match_count, 2);
        assert_eq!(status.selection.unwrap().home_team, "Liverpool");

        let dd = view.deep_dive().await;
        assert_eq!(dd.panels.home_form.ready().unwrap().team_name, "Liverpool");
        assert_eq!(dd.panels.away_form.ready().unwrap().team_name, "Everton");
        assert_eq!(dd.panels.home_lineup, PanelState::Unavailable);
        assert!(matches!(dd.panels.head_to_head, PanelState::<HeadToHead>::Failed(_)));
        assert_eq!(dd.panels.pending(), 0);
    }

    #[tokio::test]
    async fn test_reload_failure_is_retryable() {
        let mut gw = mock_with_lookups();
        let mut calls = 0;
        gw.expect_analyze_all().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Err(GatewayError::Network("connection refused".into()))
            } else {
                Ok(analyses())
            }
        });
        let view = IntelView::new(Arc::new(gw), DEFAULT_REQUEST_TIMEOUT);

        view.reload().await.await.unwrap();
        let status = view.status().await;
        assert_eq!(status.state, "failed");
        assert_eq!(status.error, Some(GatewayError::Network("connection refused".into())));
        assert!(view.deep_dive().await.selection.is_none());

        view.reload().await.await.unwrap();
        assert_eq!(view.status().await.state, "ready");
    }

    #[tokio::test]
    async fn test_select_fans_out_for_new_match() {
        let mut gw = mock_with_lookups();
        gw.expect_analyze_all().returning(|| Ok(analyses()));
        let view = IntelView::new(Arc::new(gw), DEFAULT_REQUEST_TIMEOUT);
        view.reload().await.await.unwrap();

        let arsenal = analyses()[1].key();
        let handles = view.select(&arsenal).await.unwrap();
        assert_eq!(handles.len(), 5);
        for applied in join_all(handles).await {
            assert!(applied.unwrap());
        }
        let dd = view.deep_dive().await;
        assert_eq!(dd.selection, Some(arsenal));
        assert_eq!(dd.panels.home_form.ready().unwrap().team_name, "Arsenal");

        // Selecting it again issues nothing.
        assert!(view.select(&analyses()[1].key()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_select_unknown_match() {
        let mut gw = mock_with_lookups();
        gw.expect_analyze_all().returning(|| Ok(analyses()));
        let view = IntelView::new(Arc::new(gw), DEFAULT_REQUEST_TIMEOUT);
        view.reload().await.await.unwrap();

        let ghost = MatchAnalysis::sample("Ghost", "Town", "2025-02-01T15:00:00Z").key();
        assert!(view.select(&ghost).await.is_none());
        assert_eq!(view.status().await.selection.unwrap().home_team, "Liverpool");
    }

    #[tokio::test]
    async fn test_board_uses_current_list() {
        let mut gw = mock_with_lookups();
        gw.expect_analyze_all().returning(|| Ok(analyses()));
        let view = IntelView::new(Arc::new(gw), DEFAULT_REQUEST_TIMEOUT);
        assert!(view.board(BoardOptions::default(), "2025-01-04".parse().unwrap()).await.is_empty());

        view.reload().await.await.unwrap();
        let groups = view.board(BoardOptions::default(), "2025-01-04".parse().unwrap()).await;
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "TODAY");
        assert_eq!(groups[0].matches[0].home_team, "Arsenal");
    }

    #[tokio::test]
    async fn test_with_deadline_maps_expiry_to_network_error() {
        let never = std::future::pending::<GatewayResult<()>>();
        let err = with_deadline(Duration::from_millis(20), never).await.unwrap_err();
        assert_eq!(err.kind(), "network");
        assert!(err.to_string().contains("timed out"));

        let ok = with_deadline(Duration::from_millis(20), async { Ok::<_, GatewayError>(7) }).await;
        tokio_test::assert_ok!(ok);
    }

    #[tokio::test]
    async fn test_bounded_proxy_call() {
        let mut gw = MockIntelGateway::new();
        gw.expect_metrics().returning(|| {
            Err(GatewayError::Decode("missing field `total`".into()))
        });
        let view = IntelView::new(Arc::new(gw), DEFAULT_REQUEST_TIMEOUT);
        let err = tokio_test::assert_err!(view.bounded(view.gateway().metrics()).await);
        assert_eq!(err.kind(), "decode");
    }
}
