//! Command handlers shared by the subcommands and the interactive menu.
//!
//! Each handler drives the selection manager the way a map view would and
//! returns the resulting view model as JSON.

use std::path::{Path, PathBuf};

use bio_risk_geocoder::{GeocodedPlace, Geocoder};
use bio_risk_models::{Coordinate, SimulationParams};
use bio_risk_overlay::{Lens, average_confidence, classify_grid};
use bio_risk_selection::{Outcome, SelectionManager, SelectionSnapshot};
use bio_risk_simulation::{
    BASELINE_METRICS, EpochIndicators, HISTORICAL_THREATS, at_year, project, project_percentages,
};
use serde_json::{Value, json};

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Selects the region around `at` and waits for its analysis.
///
/// # Errors
///
/// Returns an error if the coordinate is invalid or the analysis fails.
pub async fn select_region(manager: &SelectionManager, at: Coordinate) -> CliResult<()> {
    match manager.select_region(at).await? {
        Outcome::Applied | Outcome::Superseded => Ok(()),
        Outcome::Ignored => Err(format!("Invalid coordinate ({}, {})", at.lat, at.lng).into()),
    }
}

/// The current selection with its grid-wide model confidence.
#[must_use]
pub fn region_view(snapshot: &SelectionSnapshot) -> Value {
    let confidence = snapshot
        .current_analysis
        .as_ref()
        .and_then(|analysis| average_confidence(&analysis.grid));

    json!({
        "selection": snapshot,
        "averageConfidence": confidence,
    })
}

/// Resolves `text` to a place and selects its region.
///
/// Returns `None` when nothing matched.
///
/// # Errors
///
/// Returns an error if the search text is blank, the geocoder fails, or
/// the analysis fails.
pub async fn search(
    geocoder: &Geocoder,
    manager: &SelectionManager,
    text: &str,
) -> CliResult<Option<Value>> {
    let Some(GeocodedPlace {
        coord,
        display_name,
    }) = geocoder.search(text).await?
    else {
        log::warn!("Location not found: {text}");
        return Ok(None);
    };

    log::info!(
        "Found {} at ({}, {})",
        display_name.as_deref().unwrap_or(text),
        coord.lat,
        coord.lng
    );
    select_region(manager, coord).await?;

    let mut view = region_view(&manager.snapshot());
    view["place"] = json!({
        "displayName": display_name,
        "lat": coord.lat,
        "lng": coord.lng,
    });
    Ok(Some(view))
}

/// Re-runs the selected region as a simulation and annotates it with the
/// local projection.
///
/// # Errors
///
/// Returns an error if no region is selected or the simulation fails.
pub async fn simulate(manager: &SelectionManager, params: SimulationParams) -> CliResult<Value> {
    if manager.simulate(params).await? == Outcome::Ignored {
        return Err("Select a region before running a simulation".into());
    }

    Ok(json!({
        "selection": manager.snapshot(),
        "params": params,
        "projection": project(&params),
    }))
}

/// Selects one cell of the current grid.
///
/// # Errors
///
/// Returns an error if the cell is not part of the current analysis.
pub async fn select_cell(manager: &SelectionManager, grid_id: &str) -> CliResult<Value> {
    manager.select_cell(grid_id).await?;
    Ok(json!({ "selection": manager.snapshot() }))
}

/// Classifies the current grid under `lens`.
///
/// # Errors
///
/// Returns an error if no analysis has been applied.
pub fn overlay(snapshot: &SelectionSnapshot, lens: Lens) -> CliResult<Value> {
    let analysis = snapshot
        .current_analysis
        .as_ref()
        .ok_or("No analysis to draw an overlay for")?;

    Ok(json!({
        "lens": lens,
        "legend": lens.legend(),
        "cells": classify_grid(&analysis.grid, lens),
        "averageConfidence": average_confidence(&analysis.grid),
    }))
}

/// Mitigation plan for the current selection.
///
/// # Errors
///
/// Returns an error if nothing is selected or the fetch fails.
pub async fn mitigation(manager: &SelectionManager) -> CliResult<Value> {
    let plan = manager.mitigation_plan().await?;
    Ok(serde_json::to_value(plan)?)
}

/// Exports a report for the current selection into `out_dir`.
///
/// # Errors
///
/// Returns an error if the export fails or the file cannot be written.
pub async fn export_report(manager: &SelectionManager, out_dir: &Path) -> CliResult<PathBuf> {
    let report = manager.export_report().await?;
    tokio::fs::create_dir_all(out_dir).await?;
    let path = out_dir.join(&report.file_name);
    tokio::fs::write(&path, &report.bytes).await?;
    log::info!("Wrote {}", path.display());
    Ok(path)
}

/// Baseline, historical threats and the projection for slider values.
///
/// # Errors
///
/// Returns an error if a percentage is above 100.
pub fn projection(urban_growth_pct: u8, conservation_pct: u8) -> CliResult<Value> {
    Ok(json!({
        "baseline": BASELINE_METRICS,
        "historicalThreats": HISTORICAL_THREATS,
        "projection": project_percentages(urban_growth_pct, conservation_pct)?,
    }))
}

/// Indicators extrapolated back to `year`.
///
/// # Errors
///
/// Returns an error for future years or non-finite baselines.
pub fn epoch(baseline: EpochIndicators, year: i32) -> CliResult<Value> {
    Ok(json!({
        "year": year,
        "baseline": baseline,
        "indicators": at_year(baseline, year)?,
    }))
}
