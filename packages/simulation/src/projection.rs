//! Projection mode: the causal what-if model driven by urban growth and
//! conservation percentages.

use bio_risk_models::SimulationParams;
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::{BASELINE_METRICS, SimulationError, clamp_pct};

const HABITAT_LOSS_PER_URBAN: f64 = 60.0;
const HABITAT_GAIN_PER_CONSERVATION: f64 = 25.0;
const SURVIVAL_LOSS_PER_URBAN: f64 = 4.0;
const SURVIVAL_GAIN_PER_CONSERVATION: f64 = 2.0;
const WARMING_PER_URBAN: f64 = 4.0;
const COOLING_PER_CONSERVATION: f64 = 1.5;

const HABITAT_FLOOR: f64 = 2.0;
const SURVIVAL_FLOOR: f64 = 0.5;
const THERMAL_FLOOR: f64 = 0.2;

/// Overall classification of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
pub enum ProjectionRisk {
    /// Habitat loss above 30 %.
    #[serde(rename = "Elevated/Critical")]
    #[strum(serialize = "Elevated/Critical")]
    ElevatedCritical,
    /// Habitat loss of 30 % or less.
    #[serde(rename = "Stable/Moderate")]
    #[strum(serialize = "Stable/Moderate")]
    StableModerate,
}

/// Survival label; critical below an index of 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SurvivalStatus {
    /// Unclamped index below 4.
    Critical,
    /// Index of 4 or more.
    Recovering,
}

/// Warming above 1.5 °C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ThermalStatus {
    /// Delta above 1.5 °C.
    Warming,
    /// Delta of 1.5 °C or less.
    Stable,
}

/// Catastrophic above 40 % habitat loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtinctionRisk {
    /// Habitat loss above 40 %.
    Catastrophic,
    /// Habitat loss of 40 % or less.
    Moderate,
}

/// Threat intensity bars, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatBars {
    /// Habitat fragmentation.
    pub fragmentation: f64,
    /// Soil moisture loss.
    pub moisture_loss: f64,
    /// Share of the region under protection.
    pub protection_coverage: f64,
}

/// Threat bars of the present-day view.
pub const HISTORICAL_THREATS: ThreatBars = ThreatBars {
    fragmentation: 75.0,
    moisture_loss: 55.0,
    protection_coverage: 30.0,
};

impl ThreatBars {
    fn for_params(params: &SimulationParams) -> Self {
        let urban = f64::from(params.urban_growth_pct);
        let conservation = f64::from(params.conservation_pct);
        Self {
            fragmentation: clamp_pct(urban.mul_add(0.3, 75.0)),
            moisture_loss: clamp_pct(urban.mul_add(0.2, 55.0)),
            protection_coverage: clamp_pct(1.5 * conservation),
        }
    }
}

/// Output of [`project`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    /// Percentage points of habitat lost (negative means gained).
    pub habitat_loss: f64,
    /// Remaining habitat in percent, within `[2, 100]`.
    pub projected_habitat: f64,
    /// Species survival index, at least 0.5.
    pub survival_index: f64,
    /// Regional warming in degrees Celsius, at least 0.2.
    pub thermal_delta: f64,
    /// Overall classification from habitat loss.
    pub risk: ProjectionRisk,
    /// Label for `survival_index`.
    pub survival_status: SurvivalStatus,
    /// Label for `thermal_delta`.
    pub thermal_status: ThermalStatus,
    /// Label for `habitat_loss`.
    pub extinction_risk: ExtinctionRisk,
    /// Whether the habitat trend points down (loss above 10 %).
    pub habitat_declining: bool,
    /// Threat bars under these parameters.
    pub threats: ThreatBars,
}

/// Projects the baseline metrics under `params`.
///
/// Only the urban growth and conservation percentages drive the model.
#[must_use]
pub fn project(params: &SimulationParams) -> Projection {
    let urban = f64::from(params.urban_growth_pct) / 100.0;
    let conservation = f64::from(params.conservation_pct) / 100.0;

    let habitat_loss =
        urban.mul_add(HABITAT_LOSS_PER_URBAN, -conservation * HABITAT_GAIN_PER_CONSERVATION);
    let projected_habitat =
        (BASELINE_METRICS.habitat_pct - habitat_loss).clamp(HABITAT_FLOOR, 100.0);

    let survival = BASELINE_METRICS.species_index
        - urban.mul_add(SURVIVAL_LOSS_PER_URBAN, -conservation * SURVIVAL_GAIN_PER_CONSERVATION);
    let thermal =
        urban.mul_add(WARMING_PER_URBAN, -conservation * COOLING_PER_CONSERVATION);

    Projection {
        habitat_loss,
        projected_habitat,
        survival_index: survival.max(SURVIVAL_FLOOR),
        thermal_delta: thermal.max(THERMAL_FLOOR),
        risk: if habitat_loss > 30.0 {
            ProjectionRisk::ElevatedCritical
        } else {
            ProjectionRisk::StableModerate
        },
        survival_status: if survival < 4.0 {
            SurvivalStatus::Critical
        } else {
            SurvivalStatus::Recovering
        },
        thermal_status: if thermal > 1.5 {
            ThermalStatus::Warming
        } else {
            ThermalStatus::Stable
        },
        extinction_risk: if habitat_loss > 40.0 {
            ExtinctionRisk::Catastrophic
        } else {
            ExtinctionRisk::Moderate
        },
        habitat_declining: habitat_loss > 10.0,
        threats: ThreatBars::for_params(params),
    }
}

/// Validates raw slider percentages and projects them.
///
/// # Errors
///
/// Returns [`SimulationError::InvalidParams`] if either percentage is
/// above 100.
pub fn project_percentages(
    urban_growth_pct: u8,
    conservation_pct: u8,
) -> Result<Projection, SimulationError> {
    let params = SimulationParams::new(urban_growth_pct, conservation_pct, 0.0)?;
    Ok(project(&params))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(urban: u8, conservation: u8) -> SimulationParams {
        SimulationParams::new(urban, conservation, 0.0).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn heavy_urbanization_worked_example() {
        let projection = project(&params(80, 10));

        assert!(close(projection.habitat_loss, 45.5));
        assert!(close(projection.projected_habitat, 32.8));
        assert!(close(projection.survival_index, 4.5));
        assert!(close(projection.thermal_delta, 3.05));
        assert_eq!(projection.risk, ProjectionRisk::ElevatedCritical);
        assert_eq!(projection.survival_status, SurvivalStatus::Recovering);
        assert_eq!(projection.thermal_status, ThermalStatus::Warming);
        assert_eq!(projection.extinction_risk, ExtinctionRisk::Catastrophic);
        assert!(projection.habitat_declining);
    }

    #[test]
    fn full_conservation_hits_the_floors() {
        let projection = project(&params(0, 100));

        assert!(close(projection.habitat_loss, -25.0));
        assert!(close(projection.projected_habitat, 100.0));
        assert!(close(projection.survival_index, 9.5));
        assert!(close(projection.thermal_delta, 0.2));
        assert_eq!(projection.risk, ProjectionRisk::StableModerate);
        assert_eq!(projection.thermal_status, ThermalStatus::Stable);
        assert!(!projection.habitat_declining);
    }

    #[test]
    fn total_urbanization_without_conservation() {
        let projection = project(&params(100, 0));

        assert!(close(projection.projected_habitat, 18.3));
        assert!(close(projection.survival_index, 3.5));
        assert_eq!(projection.survival_status, SurvivalStatus::Critical);
        assert!(close(projection.threats.fragmentation, 100.0));
        assert!(close(projection.threats.moisture_loss, 75.0));
        assert!(close(projection.threats.protection_coverage, 0.0));
    }

    #[test]
    fn outputs_never_fall_below_their_floors() {
        for urban in 0..=100 {
            for conservation in (0..=100).step_by(5) {
                let projection = project(&params(urban, conservation));
                assert!(projection.projected_habitat >= HABITAT_FLOOR);
                assert!(projection.projected_habitat <= 100.0);
                assert!(projection.survival_index >= SURVIVAL_FLOOR);
                assert!(projection.thermal_delta >= THERMAL_FLOOR);
                assert!(projection.threats.protection_coverage <= 100.0);
            }
        }
    }

    #[test]
    fn more_urban_growth_never_increases_habitat() {
        for conservation in (0..=100).step_by(10) {
            let mut previous = f64::INFINITY;
            for urban in 0..=100 {
                let habitat = project(&params(urban, conservation)).projected_habitat;
                assert!(habitat <= previous, "urban={urban} conservation={conservation}");
                previous = habitat;
            }
        }
    }

    #[test]
    fn more_conservation_never_decreases_habitat() {
        for urban in (0..=100).step_by(10) {
            let mut previous = f64::NEG_INFINITY;
            for conservation in 0..=100 {
                let habitat = project(&params(urban, conservation)).projected_habitat;
                assert!(habitat >= previous, "urban={urban} conservation={conservation}");
                previous = habitat;
            }
        }
    }

    #[test]
    fn protection_coverage_saturates() {
        let projection = project(&params(0, 80));
        assert!(close(projection.threats.protection_coverage, 100.0));
    }

    #[test]
    fn out_of_range_percentages_are_rejected() {
        assert!(matches!(
            project_percentages(101, 0),
            Err(SimulationError::InvalidParams(_))
        ));
        assert!(project_percentages(40, 60).is_ok());
    }

    #[test]
    fn labels_serialize_like_the_dashboard() {
        let value = serde_json::to_value(project(&params(80, 10))).unwrap();
        assert_eq!(value["risk"], "Elevated/Critical");
        assert_eq!(value["survivalStatus"], "RECOVERING");
        assert_eq!(value["extinctionRisk"], "CATASTROPHIC");
        assert_eq!(ProjectionRisk::StableModerate.to_string(), "Stable/Moderate");
    }
}
