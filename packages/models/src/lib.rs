#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Wire and domain types for the bio-risk analysis backend.
//!
//! These types mirror the JSON shapes exchanged with the analysis backend
//! (`/analyze-region`, `/simulate`, `/trend-data`, `/forecast`, `/alerts`,
//! `/mitigation-plan`). Fields the backend may omit are `Option` or
//! `#[serde(default)]` so that a sparse payload still deserializes and the
//! cell is still rendered.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, `[-90, 90]`.
    pub lat: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub lng: f64,
}

impl Coordinate {
    /// Creates a coordinate without validating it.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns `true` if both components are finite and within WGS84
    /// range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A latitude/longitude aligned query box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern latitude boundary.
    pub min_lat: f64,
    /// Northern latitude boundary.
    pub max_lat: f64,
    /// Western longitude boundary.
    pub min_lng: f64,
    /// Eastern longitude boundary.
    pub max_lng: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given edges.
    #[must_use]
    pub const fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    /// Center point of the box.
    #[must_use]
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            f64::midpoint(self.min_lat, self.max_lat),
            f64::midpoint(self.min_lng, self.max_lng),
        )
    }
}

/// Risk classification assigned by the backend rule engine.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(from = "String")]
pub enum RiskLevel {
    /// Stable habitat. Unrecognized levels also parse as `Low`.
    #[default]
    Low,
    /// Moderate risk.
    Medium,
    /// Critical threat.
    High,
}

impl From<String> for RiskLevel {
    fn from(level: String) -> Self {
        level.parse().unwrap_or_default()
    }
}

/// Satellite-derived indicators for a region or grid cell.
///
/// Only the indicators the orchestration layer reasons about are typed;
/// anything else the backend sends (land use, water index, ...) is kept
/// verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    /// Normalized vegetation index, `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndvi: Option<f64>,
    /// Surface temperature in degrees Celsius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Forest coverage percentage, `[0, 100]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forest_coverage: Option<f64>,
    /// Estimated above-ground biomass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biomass: Option<f64>,
    /// Untyped indicators passed through unchanged.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Output of the backend rule engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rules {
    /// Overall risk classification.
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// Risk score on a `0..=10` scale.
    #[serde(default)]
    pub risk_score: f64,
    /// Human-readable reasons that contributed to the score.
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// Output of the backend ML model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlAssessment {
    /// Predicted class label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    /// Model confidence, `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Per-class probabilities.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub probabilities: BTreeMap<String, f64>,
}

/// A species group affected by the identified risk factors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesImpact {
    /// Species group (e.g. "Pollinators").
    pub group: String,
    /// Description of the impact on that group.
    pub impact: String,
}

/// One sub-unit of a region analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    /// Identifier, unique within its grid.
    pub grid_id: String,
    /// Cell center.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinate>,
    /// Cell indicators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicators: Option<Indicators>,
    /// Cell rule-engine output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Rules>,
    /// Cell ML output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml: Option<MlAssessment>,
    /// Species impacts for this cell.
    #[serde(default)]
    pub impacts: Vec<SpeciesImpact>,
    /// Suggested interventions for this cell.
    #[serde(default)]
    pub interventions: Vec<String>,
}

/// A backend-computed risk summary for a bounded area around a point.
///
/// Replaced wholesale on every region or simulation fetch; never mutated
/// in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Point the analysis is centered on.
    pub location: Coordinate,
    /// Grid identifier of the representative (center) cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_id: Option<String>,
    /// All cells of the analyzed region.
    #[serde(default)]
    pub grid: Vec<GridCell>,
    /// Region-level indicators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicators: Option<Indicators>,
    /// Region-level rule-engine output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Rules>,
    /// Region-level ML output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml: Option<MlAssessment>,
    /// Species impacts for the region.
    #[serde(default)]
    pub impacts: Vec<SpeciesImpact>,
    /// Suggested interventions for the region.
    #[serde(default)]
    pub interventions: Vec<String>,
}

impl AnalysisResult {
    /// Looks up a cell of this result's grid by its identifier.
    #[must_use]
    pub fn cell(&self, grid_id: &str) -> Option<&GridCell> {
        self.grid.iter().find(|c| c.grid_id == grid_id)
    }
}

/// The currently selected analysis subject: either the whole region result
/// or one of its grid cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Selection {
    /// The full region result.
    Region(AnalysisResult),
    /// One cell of the current region's grid.
    Cell(GridCell),
}

impl Selection {
    /// Location used to key trend, forecast and mitigation queries.
    #[must_use]
    pub const fn location(&self) -> Option<Coordinate> {
        match self {
            Self::Region(result) => Some(result.location),
            Self::Cell(cell) => cell.location,
        }
    }

    /// Grid identifier of the selection, if it has one.
    #[must_use]
    pub fn grid_id(&self) -> Option<&str> {
        match self {
            Self::Region(result) => result.grid_id.as_deref(),
            Self::Cell(cell) => Some(&cell.grid_id),
        }
    }

    /// Rule-engine output of the selection.
    #[must_use]
    pub const fn rules(&self) -> Option<&Rules> {
        match self {
            Self::Region(result) => result.rules.as_ref(),
            Self::Cell(cell) => cell.rules.as_ref(),
        }
    }

    /// Indicators of the selection.
    #[must_use]
    pub const fn indicators(&self) -> Option<&Indicators> {
        match self {
            Self::Region(result) => result.indicators.as_ref(),
            Self::Cell(cell) => cell.indicators.as_ref(),
        }
    }
}

/// One month of the historical vegetation/temperature trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Display date (e.g. "Mar 2025").
    pub date: String,
    /// Vegetation index for the period.
    pub ndvi: f64,
    /// Mean temperature for the period.
    pub temperature: f64,
    /// Vegetation decline relative to the first period, in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decline_pct: Option<f64>,
}

/// One day of the risk forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// ISO date.
    pub date: String,
    /// Forecast risk score, `0..=10`.
    pub risk_score: f64,
    /// Notable event expected on this day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Risk band of the forecast score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<RiskLevel>,
}

/// An active early-warning alert for a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert type (e.g. "Fire Risk").
    #[serde(rename = "type")]
    pub kind: String,
    /// Alert severity.
    pub severity: RiskLevel,
    /// Description.
    pub desc: String,
}

/// One recommended mitigation strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitigationStrategy {
    /// Strategy title.
    pub title: String,
    /// Strategy description.
    pub desc: String,
    /// Concrete methods.
    #[serde(default)]
    pub methods: Vec<String>,
}

/// Backend-generated mitigation plan for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigationPlan {
    /// Location name.
    pub location: String,
    /// Primary focus of the plan.
    pub focus: String,
    /// Threats the plan addresses.
    #[serde(default)]
    pub threats: Vec<String>,
    /// Recommended strategies.
    #[serde(default)]
    pub strategies: Vec<MitigationStrategy>,
    /// Expected risk reduction in percent.
    pub reduction_forecast: f64,
}

/// Policy-style inputs for a what-if simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Urban growth, `0..=100` percent.
    pub urban_growth_pct: u8,
    /// Conservation funding, `0..=100` percent.
    pub conservation_pct: u8,
    /// Additional warming in degrees Celsius.
    #[serde(default)]
    pub temp_increase: f64,
}

impl SimulationParams {
    /// Creates validated simulation parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if either percentage exceeds 100 or
    /// `temp_increase` is not finite.
    pub fn new(
        urban_growth_pct: u8,
        conservation_pct: u8,
        temp_increase: f64,
    ) -> Result<Self, InvalidParamsError> {
        if urban_growth_pct > 100 {
            return Err(InvalidParamsError::Percentage {
                field: "urban_growth_pct",
                value: urban_growth_pct,
            });
        }
        if conservation_pct > 100 {
            return Err(InvalidParamsError::Percentage {
                field: "conservation_pct",
                value: conservation_pct,
            });
        }
        if !temp_increase.is_finite() {
            return Err(InvalidParamsError::Temperature);
        }
        Ok(Self {
            urban_growth_pct,
            conservation_pct,
            temp_increase,
        })
    }
}

/// Error returned when [`SimulationParams`] are out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidParamsError {
    /// A percentage field was above 100.
    #[error("invalid {field} {value}: expected 0-100")]
    Percentage {
        /// Field name.
        field: &'static str,
        /// Rejected value.
        value: u8,
    },
    /// The temperature increase was NaN or infinite.
    #[error("temp_increase must be a finite number")]
    Temperature,
}
