#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analysis fetch orchestration.
//!
//! Turns a selected coordinate (and optional simulation parameters) into
//! the set of backend calls that populate the dashboard:
//!
//! 1. One **primary** request: `/analyze-region`, or `/simulate` when
//!    simulation parameters are given.
//! 2. Only after a successful region analysis, three **auxiliary**
//!    requests run concurrently: `/trend-data`, `/forecast` and
//!    `/alerts`, keyed by the selected coordinate. Each one degrades to an
//!    empty list on failure without affecting its siblings.
//!
//! Simulation requests never re-fetch the auxiliary series; the caller
//! keeps whatever it already shows.
//!
//! The orchestrator holds no selection state. It returns data and leaves
//! applying it to the selection manager.

use std::sync::Arc;

pub use bio_risk_client::{AnalysisBackend, ClientError};
use bio_risk_geo::build_region_query;
use bio_risk_models::{
    Alert, AnalysisResult, Coordinate, ForecastPoint, MitigationPlan, Selection, SimulationParams,
    TrendPoint,
};
use thiserror::Error;

/// Errors from orchestrated requests.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The coordinate was not a valid WGS84 point; nothing was sent.
    #[error("Invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate {
        /// Rejected latitude.
        lat: f64,
        /// Rejected longitude.
        lng: f64,
    },

    /// The primary analysis or simulation request failed.
    #[error("Primary analysis request failed: {0}")]
    Primary(#[source] ClientError),

    /// A single-purpose request (mitigation plan, report) failed.
    #[error(transparent)]
    Request(#[from] ClientError),
}

/// Everything fetched for a region selection.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionBundle {
    /// The region analysis.
    pub analysis: AnalysisResult,
    /// Historical vegetation/temperature trend, empty if its fetch failed.
    pub trend: Vec<TrendPoint>,
    /// Risk forecast, empty if its fetch failed.
    pub forecast: Vec<ForecastPoint>,
    /// Active alerts, empty if their fetch failed.
    pub alerts: Vec<Alert>,
}

/// Result of [`Orchestrator::run_analysis`].
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestrationResult {
    /// A region analysis with its auxiliary series.
    Region(RegionBundle),
    /// A simulation; auxiliary series are intentionally absent.
    Simulation(AnalysisResult),
}

impl OrchestrationResult {
    /// The primary analysis of either variant.
    #[must_use]
    pub const fn analysis(&self) -> &AnalysisResult {
        match self {
            Self::Region(bundle) => &bundle.analysis,
            Self::Simulation(analysis) => analysis,
        }
    }
}

/// Sequences backend calls for region and simulation requests.
#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn AnalysisBackend>,
}

impl Orchestrator {
    /// Creates an orchestrator over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        Self { backend }
    }

    /// Runs a region analysis, or a simulation when `sim` is given.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::InvalidCoordinate`] without sending
    /// anything if `coord` is invalid, or [`OrchestrationError::Primary`]
    /// if the primary request fails. Auxiliary failures are not errors.
    pub async fn run_analysis(
        &self,
        coord: Coordinate,
        sim: Option<&SimulationParams>,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        let query = build_region_query(coord).ok_or(OrchestrationError::InvalidCoordinate {
            lat: coord.lat,
            lng: coord.lng,
        })?;

        if let Some(params) = sim {
            log::info!(
                "Simulating ({}, {}) with urban={}% conservation={}%",
                coord.lat,
                coord.lng,
                params.urban_growth_pct,
                params.conservation_pct
            );
            let analysis = self
                .backend
                .simulate(&query, params)
                .await
                .map_err(OrchestrationError::Primary)?;
            return Ok(OrchestrationResult::Simulation(analysis));
        }

        log::info!("Analyzing region around ({}, {})", coord.lat, coord.lng);
        let analysis = self
            .backend
            .analyze_region(&query)
            .await
            .map_err(OrchestrationError::Primary)?;

        let (trend, forecast, alerts) =
            futures::join!(self.trend(coord), self.forecast(coord), self.alerts(coord));

        Ok(OrchestrationResult::Region(RegionBundle {
            analysis,
            trend: or_empty("trend", trend),
            forecast: or_empty("forecast", forecast),
            alerts: or_empty("alerts", alerts),
        }))
    }

    /// Fetches the historical trend at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn trend(&self, at: Coordinate) -> Result<Vec<TrendPoint>, ClientError> {
        self.backend.trend(at).await
    }

    /// Fetches the risk forecast at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn forecast(&self, at: Coordinate) -> Result<Vec<ForecastPoint>, ClientError> {
        self.backend.forecast(at).await
    }

    /// Fetches active alerts at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn alerts(&self, at: Coordinate) -> Result<Vec<Alert>, ClientError> {
        self.backend.alerts(at).await
    }

    /// Fetches the mitigation plan at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::Request`] if the request fails.
    pub async fn mitigation_plan(
        &self,
        at: Coordinate,
    ) -> Result<MitigationPlan, OrchestrationError> {
        Ok(self.backend.mitigation_plan(at).await?)
    }

    /// Requests a PDF report for `selection`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::Request`] if the request fails or
    /// times out.
    pub async fn generate_report(
        &self,
        selection: &Selection,
    ) -> Result<Vec<u8>, OrchestrationError> {
        Ok(self.backend.generate_report(selection).await?)
    }
}

/// Degrades an auxiliary failure to an empty list.
fn or_empty<T>(what: &str, result: Result<Vec<T>, ClientError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        log::warn!("Failed to fetch {what}, continuing without it: {e}");
        Vec::new()
    })
}
