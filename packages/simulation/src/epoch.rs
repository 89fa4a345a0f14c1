//! Historical epoch mode: linear back-extrapolation from the 2024
//! baseline.

use bio_risk_models::Indicators;
use serde::{Deserialize, Serialize};

use crate::{SimulationError, clamp_pct};

/// Year the baseline indicators were observed.
pub const BASELINE_YEAR: i32 = 2024;

const FOREST_PER_YEAR: f64 = 1.5;
const NDVI_PER_YEAR: f64 = 0.01;
const TEMP_PER_YEAR: f64 = 0.2;

/// The indicators epoch mode extrapolates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochIndicators {
    /// Forest coverage in percent.
    pub forest_coverage: f64,
    /// Vegetation index in `[0, 1]`.
    pub ndvi: f64,
    /// Surface temperature in degrees Celsius.
    pub temperature: f64,
}

impl EpochIndicators {
    /// Baseline from backend indicators, if all three values are present.
    #[must_use]
    pub fn from_indicators(indicators: &Indicators) -> Option<Self> {
        Some(Self {
            forest_coverage: indicators.forest_coverage?,
            ndvi: indicators.ndvi?,
            temperature: indicators.temperature?,
        })
    }

    fn check_finite(&self) -> Result<(), SimulationError> {
        for (field, value) in [
            ("forest_coverage", self.forest_coverage),
            ("ndvi", self.ndvi),
            ("temperature", self.temperature),
        ] {
            if !value.is_finite() {
                return Err(SimulationError::NonFiniteBaseline { field });
            }
        }
        Ok(())
    }
}

/// Extrapolates `baseline` (observed in [`BASELINE_YEAR`]) back to
/// `year`.
///
/// # Errors
///
/// Returns [`SimulationError::FutureEpoch`] if `year` is after the
/// baseline year, or [`SimulationError::NonFiniteBaseline`] if a baseline
/// value is NaN or infinite.
pub fn at_year(baseline: EpochIndicators, year: i32) -> Result<EpochIndicators, SimulationError> {
    if year > BASELINE_YEAR {
        return Err(SimulationError::FutureEpoch { year });
    }
    baseline.check_finite()?;

    let years_back = f64::from(BASELINE_YEAR - year);

    Ok(EpochIndicators {
        forest_coverage: clamp_pct(years_back.mul_add(FOREST_PER_YEAR, baseline.forest_coverage)),
        ndvi: years_back.mul_add(NDVI_PER_YEAR, baseline.ndvi).clamp(0.0, 1.0),
        temperature: years_back.mul_add(-TEMP_PER_YEAR, baseline.temperature),
    })
}
