#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Derived indicator values for historical epochs and what-if projections.
//!
//! Everything here is pure and synchronous. The coefficients are fixed
//! constants of the dashboard model and are not configurable.
//!
//! Every bounded output is clamped to its domain in both directions:
//! forest coverage and habitat to percentages, NDVI to `[0, 1]`, with the
//! projection floors (habitat 2 %, survival 0.5, thermal delta 0.2)
//! applied on top. Temperatures are never clamped.

pub mod epoch;
pub mod projection;

use bio_risk_models::InvalidParamsError;
use serde::Serialize;
use thiserror::Error;

pub use epoch::{BASELINE_YEAR, EpochIndicators, at_year};
pub use projection::{
    ExtinctionRisk, HISTORICAL_THREATS, Projection, ProjectionRisk, SurvivalStatus, ThermalStatus,
    ThreatBars, project, project_percentages,
};

/// Errors from the simulation mapper.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Epoch mode only extrapolates backwards from the baseline year.
    #[error("Target year {year} is after the {BASELINE_YEAR} baseline")]
    FutureEpoch {
        /// Rejected year.
        year: i32,
    },

    /// A baseline indicator was NaN or infinite.
    #[error("Baseline {field} must be a finite number")]
    NonFiniteBaseline {
        /// Offending field.
        field: &'static str,
    },

    /// Projection inputs were out of range.
    #[error(transparent)]
    InvalidParams(#[from] InvalidParamsError),
}

/// Headline metrics shown for the present-day (non-simulated) view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineMetrics {
    /// Habitat density in percent.
    pub habitat_pct: f64,
    /// Species survival index.
    pub species_index: f64,
    /// Soil moisture in percent.
    pub moisture_pct: f64,
    /// Carbon sink in tonnes.
    pub carbon_sink_t: f64,
}

/// Present-day baseline the projection formulas start from.
pub const BASELINE_METRICS: BaselineMetrics = BaselineMetrics {
    habitat_pct: 78.3,
    species_index: 7.5,
    moisture_pct: 44.0,
    carbon_sink_t: 1.2,
};

/// Clamps `value` to a percentage.
pub(crate) const fn clamp_pct(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}
