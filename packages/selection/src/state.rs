//! Selection state and its read-only snapshot.

use bio_risk_models::{
    Alert, AnalysisResult, Coordinate, ForecastPoint, Selection, TrendPoint,
};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

/// Lifecycle of the primary analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// No analysis has been applied yet.
    #[default]
    Idle,
    /// A region or simulation request is in flight.
    Loading,
    /// An analysis is present and no primary request is in flight.
    Ready,
}

/// The mutable selection state. Only [`crate::SelectionManager`] writes
/// it.
#[derive(Debug, Default)]
pub(crate) struct SelectionState {
    pub phase: Phase,
    pub current_analysis: Option<AnalysisResult>,
    pub selected: Option<Selection>,
    pub current_coords: Option<Coordinate>,
    pub trend: Vec<TrendPoint>,
    pub forecast: Vec<ForecastPoint>,
    pub alerts: Vec<Alert>,
    pub exporting: bool,
    /// Latest issued primary generation.
    pub issued: u64,
    /// Generation of the applied analysis.
    pub committed: u64,
    /// Latest issued trend/forecast generation.
    pub aux_issued: u64,
}

impl SelectionState {
    pub fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            phase: self.phase,
            current_analysis: self.current_analysis.clone(),
            selected: self.selected.clone(),
            current_coords: self.current_coords,
            trend: self.trend.clone(),
            forecast: self.forecast.clone(),
            alerts: self.alerts.clone(),
            exporting: self.exporting,
            generation: self.committed,
        }
    }

    /// Phase to fall back to once no primary request is pending.
    pub const fn settled_phase(&self) -> Phase {
        if self.current_analysis.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        }
    }
}

/// Read-only view of the selection handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSnapshot {
    /// Primary analysis lifecycle.
    pub phase: Phase,
    /// The applied region or simulation result.
    pub current_analysis: Option<AnalysisResult>,
    /// The region result or one of its grid cells.
    pub selected: Option<Selection>,
    /// The coordinate the current region was requested for.
    pub current_coords: Option<Coordinate>,
    /// Historical trend for the selected location.
    pub trend: Vec<TrendPoint>,
    /// Risk forecast for the selected location.
    pub forecast: Vec<ForecastPoint>,
    /// Active alerts for the region.
    pub alerts: Vec<Alert>,
    /// Whether a report export is in progress.
    pub exporting: bool,
    /// Generation of the applied analysis (0 before the first one).
    pub generation: u64,
}

impl SelectionSnapshot {
    /// Whether a primary request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    /// Location of the current selection.
    #[must_use]
    pub fn selected_location(&self) -> Option<Coordinate> {
        self.selected.as_ref().and_then(Selection::location)
    }
}
