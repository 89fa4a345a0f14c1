#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Single owner of the current analysis selection.
//!
//! Every primary request (region selection or simulation) is stamped with
//! a monotonically increasing generation when it is issued. A completed
//! request is applied only if its generation is still the latest issued,
//! so a slow response can never overwrite a newer one regardless of
//! completion order. Cell refinements use a separate generation for the
//! trend/forecast pair they re-fetch.
//!
//! Views read the state through [`SelectionManager::snapshot`] or follow
//! it with [`SelectionManager::subscribe`].

mod report;
mod state;

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bio_risk_models::{Coordinate, MitigationPlan, Selection, SimulationParams};
use bio_risk_orchestrator::{ClientError, OrchestrationError, OrchestrationResult, Orchestrator};
use thiserror::Error;
use tokio::sync::watch;

pub use report::{ReportFile, file_name};
pub use state::{Phase, SelectionSnapshot};

use state::SelectionState;

/// Errors surfaced by selection operations.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The latest primary request failed. The previous analysis is kept.
    #[error("Analysis failed: {0}")]
    Analysis(#[source] OrchestrationError),

    /// The requested cell is not part of the current grid.
    #[error("Unknown grid cell: {grid_id}")]
    UnknownCell {
        /// The requested identifier.
        grid_id: String,
    },

    /// The operation needs a selection and there is none.
    #[error("Nothing is selected")]
    NoSelection,

    /// A report export is already running.
    #[error("A report export is already in progress")]
    ExportInProgress,

    /// Report generation failed.
    #[error("Report generation failed: {0}")]
    Report(#[source] OrchestrationError),

    /// Mitigation plan fetch failed.
    #[error("Mitigation plan unavailable: {0}")]
    Mitigation(#[source] OrchestrationError),
}

/// What happened to a request once it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The result was applied to the selection.
    Applied,
    /// A newer request was issued meanwhile; the result was discarded.
    Superseded,
    /// The request was not sent (invalid coordinate or no region yet).
    Ignored,
}

/// Owns the selection state and applies orchestrated results to it.
pub struct SelectionManager {
    orchestrator: Orchestrator,
    state: Mutex<SelectionState>,
    updates: watch::Sender<SelectionSnapshot>,
}

impl SelectionManager {
    /// Creates an idle manager.
    #[must_use]
    pub fn new(orchestrator: Orchestrator) -> Self {
        let state = SelectionState::default();
        let (updates, _) = watch::channel(state.snapshot());
        Self {
            orchestrator,
            state: Mutex::new(state),
            updates,
        }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> SelectionSnapshot {
        self.lock().snapshot()
    }

    /// Receiver notified after every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SelectionSnapshot> {
        self.updates.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, SelectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &SelectionState) {
        self.updates.send_replace(state.snapshot());
    }

    /// Stamps a new primary request and enters [`Phase::Loading`].
    fn begin_primary(&self, state: &mut SelectionState) -> u64 {
        state.issued += 1;
        state.phase = Phase::Loading;
        self.publish(state);
        state.issued
    }

    /// Selects the region around `coord` and fetches its analysis, trend,
    /// forecast and alerts.
    ///
    /// The request is issued when this method is called, not when the
    /// returned future is first polled.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::Analysis`] if this is still the latest
    /// request and its primary fetch fails.
    pub fn select_region(
        &self,
        coord: Coordinate,
    ) -> impl Future<Output = Result<Outcome, SelectionError>> + Send + '_ {
        let ticket = if coord.is_valid() {
            let mut state = self.lock();
            state.current_coords = Some(coord);
            Some(self.begin_primary(&mut state))
        } else {
            log::debug!("Ignoring selection of invalid coordinate ({}, {})", coord.lat, coord.lng);
            None
        };

        async move {
            let Some(generation) = ticket else {
                return Ok(Outcome::Ignored);
            };
            let result = self.orchestrator.run_analysis(coord, None).await;
            self.commit_primary(generation, result)
        }
    }

    /// Re-runs the current region as a what-if simulation.
    ///
    /// Only the analysis and selection change; trend, forecast and alerts
    /// keep their values. Does nothing before a region has been chosen.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::Analysis`] if this is still the latest
    /// request and the simulation fails.
    pub fn simulate(
        &self,
        params: SimulationParams,
    ) -> impl Future<Output = Result<Outcome, SelectionError>> + Send + '_ {
        let ticket = {
            let mut state = self.lock();
            let coords = state.current_coords;
            coords.map(|coord| (coord, self.begin_primary(&mut state)))
        };
        if ticket.is_none() {
            log::debug!("Ignoring simulation without a selected region");
        }

        async move {
            let Some((coord, generation)) = ticket else {
                return Ok(Outcome::Ignored);
            };
            let result = self.orchestrator.run_analysis(coord, Some(&params)).await;
            self.commit_primary(generation, result)
        }
    }

    fn commit_primary(
        &self,
        generation: u64,
        result: Result<OrchestrationResult, OrchestrationError>,
    ) -> Result<Outcome, SelectionError> {
        let mut state = self.lock();
        if generation != state.issued {
            log::debug!(
                "Discarding stale analysis (generation {generation}, latest {})",
                state.issued
            );
            return Ok(Outcome::Superseded);
        }

        match result {
            Ok(OrchestrationResult::Region(bundle)) => {
                state.trend = bundle.trend;
                state.forecast = bundle.forecast;
                state.alerts = bundle.alerts;
                state.aux_issued += 1;
                state.selected = Some(Selection::Region(bundle.analysis.clone()));
                state.current_analysis = Some(bundle.analysis);
            }
            Ok(OrchestrationResult::Simulation(analysis)) => {
                state.aux_issued += 1;
                state.selected = Some(Selection::Region(analysis.clone()));
                state.current_analysis = Some(analysis);
            }
            Err(e) => {
                log::error!("Analysis failed, keeping the previous result: {e}");
                state.phase = state.settled_phase();
                self.publish(&state);
                return Err(SelectionError::Analysis(e));
            }
        }

        state.phase = Phase::Ready;
        state.committed = generation;
        self.publish(&state);
        Ok(Outcome::Applied)
    }

    /// Selects one cell of the current grid and re-fetches trend and
    /// forecast for its location. Alerts and the phase are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::UnknownCell`] if `grid_id` is not part of
    /// the current analysis. Trend or forecast failures keep the previous
    /// values and are not errors.
    pub fn select_cell<'a>(
        &'a self,
        grid_id: &str,
    ) -> impl Future<Output = Result<Outcome, SelectionError>> + Send + use<'a> {
        let ticket = self.begin_cell(grid_id);

        async move {
            let Some((generation, at)) = ticket? else {
                return Ok(Outcome::Applied);
            };

            futures::join!(
                async {
                    let result = self.orchestrator.trend(at).await;
                    self.apply_aux(generation, "trend", result, |s, v| s.trend = v);
                },
                async {
                    let result = self.orchestrator.forecast(at).await;
                    self.apply_aux(generation, "forecast", result, |s, v| s.forecast = v);
                },
            );

            Ok(Outcome::Applied)
        }
    }

    fn begin_cell(&self, grid_id: &str) -> Result<Option<(u64, Coordinate)>, SelectionError> {
        let mut state = self.lock();
        let cell = state
            .current_analysis
            .as_ref()
            .and_then(|analysis| analysis.cell(grid_id))
            .cloned()
            .ok_or_else(|| SelectionError::UnknownCell {
                grid_id: grid_id.to_string(),
            })?;

        log::debug!("Selecting cell {grid_id}");
        let at = cell.location;
        state.selected = Some(Selection::Cell(cell));
        let ticket = at.map(|at| {
            state.aux_issued += 1;
            (state.aux_issued, at)
        });
        self.publish(&state);
        Ok(ticket)
    }

    fn apply_aux<T>(
        &self,
        generation: u64,
        what: &str,
        result: Result<Vec<T>, ClientError>,
        set: impl FnOnce(&mut SelectionState, Vec<T>),
    ) {
        let mut state = self.lock();
        if generation != state.aux_issued {
            log::debug!("Discarding stale {what} (generation {generation})");
            return;
        }
        match result {
            Ok(items) => {
                set(&mut state, items);
                self.publish(&state);
            }
            Err(e) => log::warn!("Failed to refresh {what}, keeping previous values: {e}"),
        }
    }

    /// Fetches the mitigation plan for the selected location.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NoSelection`] if nothing with a location
    /// is selected, or [`SelectionError::Mitigation`] if the fetch fails.
    pub async fn mitigation_plan(&self) -> Result<MitigationPlan, SelectionError> {
        let at = self
            .lock()
            .selected
            .as_ref()
            .and_then(Selection::location)
            .ok_or(SelectionError::NoSelection)?;

        self.orchestrator
            .mitigation_plan(at)
            .await
            .map_err(SelectionError::Mitigation)
    }

    /// Generates a PDF report for the current selection.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NoSelection`] without a selection,
    /// [`SelectionError::ExportInProgress`] while another export runs, or
    /// [`SelectionError::Report`] if generation fails or times out.
    pub async fn export_report(&self) -> Result<ReportFile, SelectionError> {
        let selection = {
            let mut state = self.lock();
            let selection = state.selected.clone().ok_or(SelectionError::NoSelection)?;
            if state.exporting {
                return Err(SelectionError::ExportInProgress);
            }
            state.exporting = true;
            self.publish(&state);
            selection
        };
        let _guard = ExportGuard { manager: self };

        let bytes = self
            .orchestrator
            .generate_report(&selection)
            .await
            .map_err(|e| {
                log::error!("Report generation failed: {e}");
                SelectionError::Report(e)
            })?;

        let report = ReportFile::new(&selection, bytes);
        log::info!("Generated {} ({} bytes)", report.file_name, report.bytes.len());
        Ok(report)
    }
}

/// Clears the exporting flag however the export ends.
struct ExportGuard<'a> {
    manager: &'a SelectionManager,
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.manager.lock();
        state.exporting = false;
        self.manager.publish(&state);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use bio_risk_client::stub::{Call, StubBackend, forecast_point, sample_analysis, trend_point};
    use bio_risk_models::{MitigationPlan, RiskLevel};

    const BENGALURU: Coordinate = Coordinate::new(12.9716, 77.5946);
    const CHENNAI: Coordinate = Coordinate::new(13.0827, 80.2707);

    fn setup() -> (Arc<StubBackend>, SelectionManager) {
        let stub = Arc::new(StubBackend::new());
        let manager = SelectionManager::new(Orchestrator::new(stub.clone()));
        (stub, manager)
    }

    fn analyzed_location(manager: &SelectionManager) -> Coordinate {
        manager.snapshot().current_analysis.unwrap().location
    }

    #[tokio::test]
    async fn region_selection_populates_everything() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 3));
        stub.set_trend(Ok(vec![trend_point("Jan 2025", 0.71)]));
        stub.set_forecast(Ok(vec![forecast_point("2025-01-02", 5.5)]));

        let outcome = manager.select_region(BENGALURU).await.unwrap();

        assert_eq!(outcome, Outcome::Applied);
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, Phase::Ready);
        assert_eq!(snapshot.current_coords, Some(BENGALURU));
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.trend.len(), 1);
        assert_eq!(snapshot.forecast.len(), 1);
        assert!(matches!(snapshot.selected, Some(Selection::Region(_))));
        assert_eq!(snapshot.selected_location(), Some(BENGALURU));
    }

    #[tokio::test]
    async fn failing_trend_leaves_an_empty_series() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 1));
        stub.set_trend(Err(500));
        stub.set_forecast(Ok(vec![forecast_point("2025-01-02", 7.0)]));

        manager.select_region(BENGALURU).await.unwrap();

        let snapshot = manager.snapshot();
        let analysis = snapshot.current_analysis.unwrap();
        assert_eq!(analysis.rules.unwrap().risk_level, RiskLevel::High);
        assert!(snapshot.trend.is_empty());
        assert_eq!(snapshot.forecast.len(), 1);
    }

    #[tokio::test]
    async fn later_selection_wins_when_it_finishes_first() {
        let (stub, manager) = setup();
        let release_first = stub.push_region_gated(sample_analysis(BENGALURU, RiskLevel::High, 2));
        stub.push_region(sample_analysis(CHENNAI, RiskLevel::Low, 3));

        let first = manager.select_region(BENGALURU);
        let second = manager.select_region(CHENNAI);
        assert!(manager.snapshot().is_loading());

        let (first, second) = tokio::join!(first, async {
            let outcome = second.await;
            let _ = release_first.send(());
            outcome
        });

        assert_eq!(first.unwrap(), Outcome::Superseded);
        assert_eq!(second.unwrap(), Outcome::Applied);
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.current_analysis.unwrap().location, CHENNAI);
        assert_eq!(snapshot.current_coords, Some(CHENNAI));
        assert_eq!(snapshot.phase, Phase::Ready);
        assert_eq!(snapshot.generation, 2);
    }

    #[tokio::test]
    async fn earlier_selection_finishing_first_is_still_discarded() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 2));
        let release_second = stub.push_region_gated(sample_analysis(CHENNAI, RiskLevel::Low, 3));

        let first = manager.select_region(BENGALURU);
        let second = manager.select_region(CHENNAI);

        let first = first.await;
        assert_eq!(first.unwrap(), Outcome::Superseded);
        assert!(manager.snapshot().current_analysis.is_none());
        assert!(manager.snapshot().is_loading());

        let _ = release_second.send(());
        assert_eq!(second.await.unwrap(), Outcome::Applied);
        assert_eq!(analyzed_location(&manager), CHENNAI);
    }

    #[tokio::test]
    async fn simulation_issued_later_beats_pending_region() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 2));
        manager.select_region(BENGALURU).await.unwrap();

        let release_region = stub.push_region_gated(sample_analysis(BENGALURU, RiskLevel::Low, 2));
        stub.push_simulation(sample_analysis(BENGALURU, RiskLevel::Medium, 2));
        let params = SimulationParams::new(80, 10, 0.0).unwrap();

        let region = manager.select_region(BENGALURU);
        let simulation = manager.simulate(params);
        let (region, simulation) = tokio::join!(region, async {
            let outcome = simulation.await;
            let _ = release_region.send(());
            outcome
        });

        assert_eq!(region.unwrap(), Outcome::Superseded);
        assert_eq!(simulation.unwrap(), Outcome::Applied);
        let analysis = manager.snapshot().current_analysis.unwrap();
        assert_eq!(analysis.rules.unwrap().risk_level, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn simulation_leaves_auxiliary_series_untouched() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 2));
        stub.set_trend(Ok(vec![trend_point("Jan 2025", 0.71)]));
        manager.select_region(BENGALURU).await.unwrap();
        let before = manager.snapshot();

        stub.set_trend(Ok(vec![trend_point("Feb 2025", 0.2)]));
        stub.push_simulation(sample_analysis(BENGALURU, RiskLevel::Medium, 2));
        let params = SimulationParams::new(50, 20, 1.5).unwrap();

        let outcome = manager.simulate(params).await.unwrap();

        assert_eq!(outcome, Outcome::Applied);
        let after = manager.snapshot();
        assert_eq!(after.trend, before.trend);
        assert_eq!(after.forecast, before.forecast);
        assert_eq!(after.alerts, before.alerts);
        assert_eq!(
            after.current_analysis.unwrap().rules.unwrap().risk_level,
            RiskLevel::Medium
        );
        assert_eq!(stub.calls().last(), Some(&Call::Simulate(BENGALURU, params)));
    }

    #[tokio::test]
    async fn simulation_without_region_is_ignored() {
        let (stub, manager) = setup();

        let outcome = manager.simulate(SimulationParams::default()).await.unwrap();

        assert_eq!(outcome, Outcome::Ignored);
        assert_eq!(manager.snapshot().phase, Phase::Idle);
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_coordinate_is_ignored() {
        let (stub, manager) = setup();

        let outcome = manager
            .select_region(Coordinate::new(95.0, 10.0))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Ignored);
        assert_eq!(manager.snapshot().current_coords, None);
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn cell_selection_refreshes_trend_and_forecast_only() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 3));
        manager.select_region(BENGALURU).await.unwrap();
        let calls_before = stub.calls().len();

        stub.set_trend(Ok(vec![trend_point("Mar 2025", 0.4)]));
        stub.set_forecast(Ok(vec![forecast_point("2025-03-01", 8.0)]));
        manager.select_cell("G-1").await.unwrap();

        let snapshot = manager.snapshot();
        let Some(Selection::Cell(cell)) = &snapshot.selected else {
            panic!("expected a cell selection");
        };
        assert_eq!(cell.grid_id, "G-1");
        assert_eq!(snapshot.trend[0].date, "Mar 2025");
        assert!((snapshot.forecast[0].risk_score - 8.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.phase, Phase::Ready);
        assert_eq!(analyzed_location(&manager), BENGALURU);

        let cell_at = cell.location.unwrap();
        let new_calls = &stub.calls()[calls_before..];
        assert_eq!(new_calls.len(), 2);
        assert!(new_calls.contains(&Call::Trend(cell_at)));
        assert!(new_calls.contains(&Call::Forecast(cell_at)));
    }

    #[tokio::test]
    async fn stale_cell_trend_is_discarded() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 3));
        manager.select_region(BENGALURU).await.unwrap();

        let release_trend = stub.push_trend_gated(Ok(vec![trend_point("STALE", 0.1)]));
        let release_forecast =
            stub.push_forecast_gated(Ok(vec![forecast_point("STALE", 9.0)]));
        let mut first = std::pin::pin!(manager.select_cell("G-1"));
        assert!(futures::poll!(first.as_mut()).is_pending());

        stub.set_trend(Ok(vec![trend_point("FRESH", 0.9)]));
        stub.set_forecast(Ok(vec![forecast_point("FRESH", 2.0)]));
        manager.select_cell("G-2").await.unwrap();
        assert_eq!(manager.snapshot().trend[0].date, "FRESH");

        let _ = release_trend.send(());
        let _ = release_forecast.send(());
        assert_eq!(first.await.unwrap(), Outcome::Applied);

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.trend[0].date, "FRESH");
        assert_eq!(snapshot.forecast[0].date, "FRESH");
        let Some(Selection::Cell(cell)) = &snapshot.selected else {
            panic!("expected a cell selection");
        };
        assert_eq!(cell.grid_id, "G-2");
    }

    #[tokio::test]
    async fn cell_trend_held_back_past_a_simulation_is_dropped() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 3));
        stub.set_trend(Ok(vec![trend_point("REGION", 0.7)]));
        manager.select_region(BENGALURU).await.unwrap();

        let release_cell = stub.push_trend_gated(Ok(vec![trend_point("CELL", 0.3)]));
        let mut cell = std::pin::pin!(manager.select_cell("G-2"));
        assert!(futures::poll!(cell.as_mut()).is_pending());

        stub.push_simulation(sample_analysis(BENGALURU, RiskLevel::Medium, 3));
        let params = SimulationParams::new(80, 10, 0.0).unwrap();
        assert_eq!(manager.simulate(params).await.unwrap(), Outcome::Applied);

        let _ = release_cell.send(());
        cell.await.unwrap();

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.trend[0].date, "REGION");
        assert!(matches!(snapshot.selected, Some(Selection::Region(_))));
    }

    #[tokio::test]
    async fn cell_forecast_failure_keeps_previous_forecast() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 3));
        stub.set_forecast(Ok(vec![forecast_point("2025-01-02", 5.5)]));
        manager.select_region(BENGALURU).await.unwrap();

        stub.set_trend(Ok(vec![trend_point("Mar 2025", 0.4)]));
        stub.set_forecast(Err(500));
        manager.select_cell("G-2").await.unwrap();

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.trend[0].date, "Mar 2025");
        assert_eq!(snapshot.forecast[0].date, "2025-01-02");
    }

    #[tokio::test]
    async fn cell_without_location_skips_fetches() {
        let (stub, manager) = setup();
        let mut analysis = sample_analysis(BENGALURU, RiskLevel::Low, 2);
        analysis.grid[0].location = None;
        stub.push_region(analysis);
        manager.select_region(BENGALURU).await.unwrap();
        let calls_before = stub.calls().len();

        manager.select_cell("G-0").await.unwrap();

        assert_eq!(stub.calls().len(), calls_before);
        assert_eq!(manager.snapshot().selected_location(), None);
    }

    #[tokio::test]
    async fn unknown_cell_is_an_error() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::Low, 2));
        manager.select_region(BENGALURU).await.unwrap();

        let err = manager.select_cell("nope").await.unwrap_err();

        assert!(matches!(err, SelectionError::UnknownCell { .. }));
        assert!(matches!(
            manager.snapshot().selected,
            Some(Selection::Region(_))
        ));
    }

    #[tokio::test]
    async fn primary_failure_keeps_previous_analysis() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 2));
        manager.select_region(BENGALURU).await.unwrap();
        stub.push_region_failure(CHENNAI, 500);

        let err = manager.select_region(CHENNAI).await.unwrap_err();

        assert!(matches!(err, SelectionError::Analysis(_)));
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, Phase::Ready);
        assert_eq!(snapshot.generation, 1);
        assert_eq!(analyzed_location(&manager), BENGALURU);
    }

    #[tokio::test]
    async fn failed_simulation_keeps_previous_analysis() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 2));
        manager.select_region(BENGALURU).await.unwrap();
        stub.push_simulation_failure(500);

        let err = manager
            .simulate(SimulationParams::new(90, 0, 2.0).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, SelectionError::Analysis(_)));
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, Phase::Ready);
        assert_eq!(snapshot.generation, 1);
        let analysis = snapshot.current_analysis.unwrap();
        assert_eq!(analysis.rules.unwrap().risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn region_issued_later_beats_pending_simulation() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 2));
        manager.select_region(BENGALURU).await.unwrap();

        let release_simulation =
            stub.push_simulation_gated(sample_analysis(BENGALURU, RiskLevel::Medium, 2));
        stub.push_region(sample_analysis(CHENNAI, RiskLevel::Low, 2));

        let simulation = manager.simulate(SimulationParams::default());
        let region = manager.select_region(CHENNAI);
        let (simulation, region) = tokio::join!(simulation, async {
            let outcome = region.await;
            let _ = release_simulation.send(());
            outcome
        });

        assert_eq!(simulation.unwrap(), Outcome::Superseded);
        assert_eq!(region.unwrap(), Outcome::Applied);
        let analysis = manager.snapshot().current_analysis.unwrap();
        assert_eq!(analysis.location, CHENNAI);
        assert_eq!(analysis.rules.unwrap().risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn first_failure_returns_to_idle() {
        let (stub, manager) = setup();
        stub.push_region_failure(BENGALURU, 502);

        assert!(manager.select_region(BENGALURU).await.is_err());

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert!(snapshot.current_analysis.is_none());
    }

    #[tokio::test]
    async fn export_names_the_file_and_clears_the_flag() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 3));
        manager.select_region(BENGALURU).await.unwrap();
        stub.set_report(Ok(b"%PDF-1.4".to_vec()));

        let report = manager.export_report().await.unwrap();

        assert_eq!(report.file_name, "Biodiversity_Report_G-1.pdf");
        assert_eq!(report.bytes, b"%PDF-1.4");
        assert!(!manager.snapshot().exporting);
    }

    #[tokio::test]
    async fn failed_export_clears_the_flag() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 1));
        manager.select_region(BENGALURU).await.unwrap();

        let err = manager.export_report().await.unwrap_err();

        assert!(matches!(err, SelectionError::Report(_)));
        assert!(!manager.snapshot().exporting);
    }

    #[tokio::test]
    async fn second_export_while_one_runs_is_refused() {
        let (stub, manager) = setup();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 1));
        manager.select_region(BENGALURU).await.unwrap();
        let release_report = stub.push_report_gated(Ok(b"%PDF".to_vec()));

        let mut first = std::pin::pin!(manager.export_report());
        assert!(futures::poll!(first.as_mut()).is_pending());
        assert!(manager.snapshot().exporting);

        let err = manager.export_report().await.unwrap_err();
        assert!(matches!(err, SelectionError::ExportInProgress));
        assert!(manager.snapshot().exporting);

        let _ = release_report.send(());
        let report = first.await.unwrap();
        assert_eq!(report.bytes, b"%PDF");
        assert!(!manager.snapshot().exporting);
    }

    #[tokio::test]
    async fn export_without_selection_sends_nothing() {
        let (stub, manager) = setup();

        let err = manager.export_report().await.unwrap_err();

        assert!(matches!(err, SelectionError::NoSelection));
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn mitigation_plan_uses_the_selected_location() {
        let (stub, manager) = setup();
        assert!(matches!(
            manager.mitigation_plan().await,
            Err(SelectionError::NoSelection)
        ));

        stub.push_region(sample_analysis(BENGALURU, RiskLevel::High, 1));
        manager.select_region(BENGALURU).await.unwrap();
        stub.set_mitigation(Ok(MitigationPlan {
            location: "Bengaluru".to_string(),
            focus: "Urban heat".to_string(),
            threats: vec![],
            strategies: vec![],
            reduction_forecast: 35.0,
        }));

        let plan = manager.mitigation_plan().await.unwrap();

        assert_eq!(plan.focus, "Urban heat");
        assert_eq!(stub.calls().last(), Some(&Call::MitigationPlan(BENGALURU)));
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let (stub, manager) = setup();
        let mut updates = manager.subscribe();
        stub.push_region(sample_analysis(BENGALURU, RiskLevel::Low, 1));

        manager.select_region(BENGALURU).await.unwrap();

        assert!(updates.has_changed().unwrap());
        let latest = updates.borrow_and_update().clone();
        assert_eq!(latest.phase, Phase::Ready);
        assert_eq!(latest, manager.snapshot());
    }
}
