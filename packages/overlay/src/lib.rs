#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Grid overlay classification.
//!
//! Maps a grid cell to a [`ColorCategory`] under the selected [`Lens`].
//! Cells lacking indicators or rules are never an error; they get
//! [`ColorCategory::Neutral`] and are still drawn.

use bio_risk_models::{GridCell, RiskLevel};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Severity colours of the classification lens.
pub const HIGH_COLOR: &str = "#ff4d4d";
pub const MEDIUM_COLOR: &str = "#f1c40f";
pub const LOW_COLOR: &str = "#2ecc71";

/// Colour of cells that cannot be classified.
pub const NEUTRAL_COLOR: &str = "rgba(255, 255, 255, 0.2)";

const SEVERE_FIRE_COLOR: &str = "#ff4500";
const ELEVATED_FIRE_COLOR: &str = "#ff8c00";
const LOW_FIRE_COLOR: &str = "rgba(255, 165, 0, 0.1)";

const VEGETATION_HUE: u16 = 120;
const VEGETATION_SATURATION_PCT: u8 = 80;

/// Which indicator drives the grid colour.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Lens {
    /// Rule-engine risk level.
    #[default]
    #[strum(to_string = "classification", serialize = "risk")]
    Classification,
    /// NDVI ramp from sparse to dense canopy.
    #[strum(to_string = "vegetationIndex", serialize = "ndvi")]
    VegetationIndex,
    /// Surface temperature bands.
    #[strum(to_string = "fireRisk", serialize = "fire")]
    FireRisk,
}

impl Lens {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Classification, Self::VegetationIndex, Self::FireRisk]
    }

    /// Legend entries for this lens, most severe (or densest) first.
    #[must_use]
    pub fn legend(self) -> Vec<LegendEntry> {
        let entry = |label: &'static str, category: ColorCategory| LegendEntry {
            label,
            color: category.css(),
        };
        match self {
            Self::Classification => vec![
                entry("Critical Threat", ColorCategory::Severity(RiskLevel::High)),
                entry("Moderate Risk", ColorCategory::Severity(RiskLevel::Medium)),
                entry("Stable Habitat", ColorCategory::Severity(RiskLevel::Low)),
            ],
            Self::VegetationIndex => vec![
                entry("Dense Canopy", ColorCategory::vegetation(1.0)),
                entry("Sparse Vegetation", ColorCategory::vegetation(0.0)),
            ],
            Self::FireRisk => vec![
                entry("Severe (> 35 °C)", ColorCategory::Fire(FireBand::Severe)),
                entry("Elevated (> 30 °C)", ColorCategory::Fire(FireBand::Elevated)),
                entry("Low", ColorCategory::Fire(FireBand::Low)),
            ],
        }
    }
}

/// Temperature band of the fire lens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FireBand {
    /// Above 35 °C.
    Severe,
    /// Above 30 °C.
    Elevated,
    /// 30 °C or below.
    Low,
}

impl FireBand {
    /// Band for a surface temperature in degrees Celsius.
    #[must_use]
    pub fn for_temperature(temperature: f64) -> Self {
        if temperature > 35.0 {
            Self::Severe
        } else if temperature > 30.0 {
            Self::Elevated
        } else {
            Self::Low
        }
    }
}

/// Visual category of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ColorCategory {
    /// Classification lens severity.
    Severity(RiskLevel),
    /// Vegetation ramp; lightness in percent, within `[20, 55]`.
    Vegetation {
        /// HSL lightness.
        lightness_pct: f64,
    },
    /// Fire lens band.
    Fire(FireBand),
    /// Indicators or rules missing.
    Neutral,
}

impl ColorCategory {
    /// Vegetation category for an NDVI value, clamped to `[0, 1]`.
    #[must_use]
    pub fn vegetation(ndvi: f64) -> Self {
        let ndvi = if ndvi.is_nan() { 0.0 } else { ndvi.clamp(0.0, 1.0) };
        Self::Vegetation {
            lightness_pct: ndvi.mul_add(35.0, 20.0),
        }
    }

    /// CSS colour string.
    #[must_use]
    pub fn css(&self) -> String {
        match self {
            Self::Severity(RiskLevel::High) => HIGH_COLOR.to_string(),
            Self::Severity(RiskLevel::Medium) => MEDIUM_COLOR.to_string(),
            Self::Severity(RiskLevel::Low) => LOW_COLOR.to_string(),
            Self::Vegetation { lightness_pct } => format!(
                "hsl({VEGETATION_HUE}, {VEGETATION_SATURATION_PCT}%, {}%)",
                round_to(*lightness_pct, 2)
            ),
            Self::Fire(FireBand::Severe) => SEVERE_FIRE_COLOR.to_string(),
            Self::Fire(FireBand::Elevated) => ELEVATED_FIRE_COLOR.to_string(),
            Self::Fire(FireBand::Low) => LOW_FIRE_COLOR.to_string(),
            Self::Neutral => NEUTRAL_COLOR.to_string(),
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Classifies `cell` under `lens`.
///
/// A cell without indicators or without rules is [`ColorCategory::Neutral`]
/// under every lens. A missing NDVI or temperature reading counts as 0.
#[must_use]
pub fn classify(cell: &GridCell, lens: Lens) -> ColorCategory {
    let (Some(indicators), Some(rules)) = (&cell.indicators, &cell.rules) else {
        return ColorCategory::Neutral;
    };

    match lens {
        Lens::Classification => ColorCategory::Severity(rules.risk_level),
        Lens::VegetationIndex => ColorCategory::vegetation(indicators.ndvi.unwrap_or(0.0)),
        Lens::FireRisk => {
            ColorCategory::Fire(FireBand::for_temperature(indicators.temperature.unwrap_or(0.0)))
        }
    }
}

/// One legend row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    /// Caption.
    pub label: &'static str,
    /// CSS colour.
    pub color: String,
}

/// A classified cell, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellOverlay {
    /// Cell identifier.
    pub grid_id: String,
    /// Category under the chosen lens.
    pub category: ColorCategory,
    /// CSS colour for `category`.
    pub color: String,
}

/// Classifies every cell of `grid`.
#[must_use]
pub fn classify_grid(grid: &[GridCell], lens: Lens) -> Vec<CellOverlay> {
    grid.iter()
        .map(|cell| {
            let category = classify(cell, lens);
            CellOverlay {
                grid_id: cell.grid_id.clone(),
                color: category.css(),
                category,
            }
        })
        .collect()
}

/// Mean ML confidence over the cells that report one.
#[must_use]
pub fn average_confidence(grid: &[GridCell]) -> Option<f64> {
    let (sum, count) = grid
        .iter()
        .filter_map(|cell| cell.ml.as_ref()?.confidence)
        .filter(|c| c.is_finite())
        .fold((0.0, 0_u32), |(sum, count), c| (sum + c, count + 1));

    (count > 0).then(|| sum / f64::from(count))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use bio_risk_models::{Indicators, MlAssessment, Rules};

    fn cell(risk_level: RiskLevel, ndvi: Option<f64>, temperature: Option<f64>) -> GridCell {
        GridCell {
            grid_id: "G-0".to_string(),
            location: None,
            indicators: Some(Indicators {
                ndvi,
                temperature,
                ..Indicators::default()
            }),
            rules: Some(Rules {
                risk_level,
                ..Rules::default()
            }),
            ml: None,
            impacts: vec![],
            interventions: vec![],
        }
    }

    #[test]
    fn classification_uses_severity_colors() {
        for (level, color) in [
            (RiskLevel::High, HIGH_COLOR),
            (RiskLevel::Medium, MEDIUM_COLOR),
            (RiskLevel::Low, LOW_COLOR),
        ] {
            let category = classify(&cell(level, None, None), Lens::Classification);
            assert_eq!(category.css(), color);
        }
    }

    #[test]
    fn vegetation_ramp_is_monotonic() {
        let sparse = classify(&cell(RiskLevel::Low, Some(0.0), None), Lens::VegetationIndex);
        let dense = classify(&cell(RiskLevel::Low, Some(1.0), None), Lens::VegetationIndex);
        assert_eq!(sparse.css(), "hsl(120, 80%, 20%)");
        assert_eq!(dense.css(), "hsl(120, 80%, 55%)");

        let mut previous = f64::NEG_INFINITY;
        for step in 0..=20 {
            let ndvi = f64::from(step) / 20.0;
            let ColorCategory::Vegetation { lightness_pct } = ColorCategory::vegetation(ndvi) else {
                panic!("expected a vegetation category");
            };
            assert!(lightness_pct >= previous);
            previous = lightness_pct;
        }
    }

    #[test]
    fn vegetation_clamps_out_of_range_ndvi() {
        assert_eq!(ColorCategory::vegetation(1.7), ColorCategory::vegetation(1.0));
        assert_eq!(ColorCategory::vegetation(-0.3), ColorCategory::vegetation(0.0));
        assert_eq!(ColorCategory::vegetation(f64::NAN), ColorCategory::vegetation(0.0));
    }

    #[test]
    fn fire_bands_follow_thresholds() {
        let band = |t| classify(&cell(RiskLevel::Low, None, Some(t)), Lens::FireRisk);
        assert_eq!(band(36.0), ColorCategory::Fire(FireBand::Severe));
        assert_eq!(band(35.0), ColorCategory::Fire(FireBand::Elevated));
        assert_eq!(band(30.5), ColorCategory::Fire(FireBand::Elevated));
        assert_eq!(band(30.0), ColorCategory::Fire(FireBand::Low));
        assert_eq!(band(36.0).css(), "#ff4500");
        assert_eq!(band(20.0).css(), "rgba(255, 165, 0, 0.1)");
    }

    #[test]
    fn missing_indicators_or_rules_are_neutral() {
        let mut no_rules = cell(RiskLevel::High, Some(0.8), Some(40.0));
        no_rules.rules = None;
        let mut no_indicators = cell(RiskLevel::High, Some(0.8), Some(40.0));
        no_indicators.indicators = None;

        for lens in Lens::all() {
            assert_eq!(classify(&no_rules, *lens), ColorCategory::Neutral);
            assert_eq!(classify(&no_indicators, *lens), ColorCategory::Neutral);
        }
        assert_eq!(ColorCategory::Neutral.css(), NEUTRAL_COLOR);
    }

    #[test]
    fn missing_readings_count_as_zero() {
        let bare = cell(RiskLevel::Medium, None, None);
        assert_eq!(
            classify(&bare, Lens::VegetationIndex),
            ColorCategory::vegetation(0.0)
        );
        assert_eq!(
            classify(&bare, Lens::FireRisk),
            ColorCategory::Fire(FireBand::Low)
        );
    }

    #[test]
    fn lens_parses_names_and_aliases() {
        assert_eq!(Lens::from_str("vegetationIndex").unwrap(), Lens::VegetationIndex);
        assert_eq!(Lens::from_str("ndvi").unwrap(), Lens::VegetationIndex);
        assert_eq!(Lens::from_str("fire").unwrap(), Lens::FireRisk);
        assert_eq!(Lens::FireRisk.to_string(), "fireRisk");
        assert!(Lens::from_str("thermal").is_err());
    }

    #[test]
    fn lens_parse_error_is_a_std_error() {
        fn boxed<E: std::error::Error + Send + Sync + 'static>(e: E) -> Box<dyn std::error::Error + Send + Sync> {
            Box::new(e)
        }

        let err = boxed(Lens::from_str("thermal").unwrap_err());
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn legends_have_an_entry_per_band() {
        assert_eq!(Lens::Classification.legend().len(), 3);
        assert_eq!(Lens::VegetationIndex.legend().len(), 2);
        let fire = Lens::FireRisk.legend();
        assert_eq!(fire[0].color, "#ff4500");
    }

    #[test]
    fn average_confidence_skips_cells_without_one() {
        let mut grid = vec![
            cell(RiskLevel::Low, None, None),
            cell(RiskLevel::Low, None, None),
            cell(RiskLevel::Low, None, None),
        ];
        grid[0].ml = Some(MlAssessment {
            confidence: Some(0.9),
            ..MlAssessment::default()
        });
        grid[1].ml = Some(MlAssessment {
            confidence: Some(0.8),
            ..MlAssessment::default()
        });

        let average = average_confidence(&grid).unwrap();
        assert!((average - 0.85).abs() < 1e-9);
        assert_eq!(average_confidence(&grid[2..]), None);
    }

    #[test]
    fn grid_overlay_carries_colors() {
        let grid = vec![cell(RiskLevel::High, Some(0.5), Some(31.0))];
        let overlay = classify_grid(&grid, Lens::Classification);
        assert_eq!(overlay[0].grid_id, "G-0");
        assert_eq!(overlay[0].color, HIGH_COLOR);

        let json = serde_json::to_value(&overlay[0]).unwrap();
        assert_eq!(json["gridId"], "G-0");
    }
}
