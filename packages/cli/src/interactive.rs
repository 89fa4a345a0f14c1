//! Menu-driven session.
//!
//! Keeps one selection for the whole session, so simulations, cell
//! refinements, overlays and exports act on the region chosen earlier,
//! just like the map view.

use std::path::PathBuf;

use bio_risk_cli_utils::MultiProgress;
use bio_risk_geocoder::Geocoder;
use bio_risk_models::{Coordinate, SimulationParams};
use bio_risk_overlay::Lens;
use bio_risk_selection::SelectionManager;
use bio_risk_simulation::EpochIndicators;
use dialoguer::{Input, Select};

use crate::commands::{self, CliResult};
use crate::print_json;

/// Default map center (Chennai).
const DEFAULT_CENTER: Coordinate = Coordinate::new(13.0827, 80.2707);

enum Action {
    AnalyzeRegion,
    SearchPlace,
    Simulate,
    SelectCell,
    Overlay,
    Mitigation,
    ExportReport,
    Project,
    Epoch,
    Quit,
}

impl Action {
    const ALL: &[Self] = &[
        Self::AnalyzeRegion,
        Self::SearchPlace,
        Self::Simulate,
        Self::SelectCell,
        Self::Overlay,
        Self::Mitigation,
        Self::ExportReport,
        Self::Project,
        Self::Epoch,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::AnalyzeRegion => "Analyze a coordinate",
            Self::SearchPlace => "Search for a place",
            Self::Simulate => "Simulate policy scenario",
            Self::SelectCell => "Select a grid cell",
            Self::Overlay => "Show grid overlay",
            Self::Mitigation => "Show mitigation plan",
            Self::ExportReport => "Export PDF report",
            Self::Project => "Project metrics offline",
            Self::Epoch => "Extrapolate to a past year",
            Self::Quit => "Quit",
        }
    }
}

/// Runs the menu loop until the user quits.
///
/// Failed actions are reported and the loop continues.
///
/// # Errors
///
/// Returns an error if a prompt cannot be shown.
pub async fn run(manager: &SelectionManager, multi: &MultiProgress) -> CliResult<()> {
    println!("Bio-Risk Analysis");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();
    let geocoder = Geocoder::from_env()?;

    loop {
        let idx = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;

        let result = match Action::ALL[idx] {
            Action::Quit => return Ok(()),
            Action::AnalyzeRegion => analyze(manager).await,
            Action::SearchPlace => search(manager, &geocoder).await,
            Action::Simulate => simulate(manager).await,
            Action::SelectCell => select_cell(manager).await,
            Action::Overlay => overlay(manager),
            Action::Mitigation => commands::mitigation(manager).await.map(Some),
            Action::ExportReport => export(manager).await,
            Action::Project => project(),
            Action::Epoch => epoch(manager),
        };

        match result {
            Ok(Some(view)) => print_json(multi, &view)?,
            Ok(None) => {}
            Err(e) => log::error!("{e}"),
        }
    }
}

type ActionResult = CliResult<Option<serde_json::Value>>;

fn prompt_coordinate(manager: &SelectionManager) -> CliResult<Coordinate> {
    let center = manager.snapshot().current_coords.unwrap_or(DEFAULT_CENTER);
    let lat = Input::<f64>::new()
        .with_prompt("Latitude")
        .default(center.lat)
        .interact_text()?;
    let lng = Input::<f64>::new()
        .with_prompt("Longitude")
        .default(center.lng)
        .interact_text()?;
    Ok(Coordinate::new(lat, lng))
}

fn prompt_percentage(prompt: &str, default: u8) -> CliResult<u8> {
    Ok(Input::<u8>::new()
        .with_prompt(prompt)
        .default(default)
        .validate_with(|value: &u8| {
            if *value <= 100 {
                Ok(())
            } else {
                Err("expected 0-100")
            }
        })
        .interact_text()?)
}

async fn analyze(manager: &SelectionManager) -> ActionResult {
    let at = prompt_coordinate(manager)?;
    commands::select_region(manager, at).await?;
    Ok(Some(commands::region_view(&manager.snapshot())))
}

async fn search(manager: &SelectionManager, geocoder: &Geocoder) -> ActionResult {
    let text: String = Input::new().with_prompt("Place").interact_text()?;
    let view = commands::search(geocoder, manager, &text).await?;
    if view.is_none() {
        println!("Location not found.");
    }
    Ok(view)
}

async fn simulate(manager: &SelectionManager) -> ActionResult {
    let urban = prompt_percentage("Urban growth %", 50)?;
    let conservation = prompt_percentage("Conservation %", 20)?;
    let temp_increase = Input::<f64>::new()
        .with_prompt("Temperature increase (°C)")
        .default(0.0)
        .interact_text()?;

    let params = SimulationParams::new(urban, conservation, temp_increase)?;
    commands::simulate(manager, params).await.map(Some)
}

async fn select_cell(manager: &SelectionManager) -> ActionResult {
    let ids: Vec<String> = manager
        .snapshot()
        .current_analysis
        .map(|analysis| analysis.grid.into_iter().map(|cell| cell.grid_id).collect())
        .unwrap_or_default();
    if ids.is_empty() {
        return Err("Analyze a region first".into());
    }

    let idx = Select::new()
        .with_prompt("Grid cell")
        .items(&ids)
        .default(0)
        .interact()?;
    commands::select_cell(manager, &ids[idx]).await.map(Some)
}

fn overlay(manager: &SelectionManager) -> ActionResult {
    let lenses = Lens::all();
    let labels: Vec<String> = lenses.iter().map(ToString::to_string).collect();
    let idx = Select::new()
        .with_prompt("Lens")
        .items(&labels)
        .default(0)
        .interact()?;
    commands::overlay(&manager.snapshot(), lenses[idx]).map(Some)
}

async fn export(manager: &SelectionManager) -> ActionResult {
    let out: String = Input::new()
        .with_prompt("Output directory")
        .default(".".to_string())
        .interact_text()?;
    let path = commands::export_report(manager, &PathBuf::from(out)).await?;
    println!("Saved {}", path.display());
    Ok(None)
}

fn project() -> ActionResult {
    let urban = prompt_percentage("Urban growth %", 50)?;
    let conservation = prompt_percentage("Conservation %", 20)?;
    commands::projection(urban, conservation).map(Some)
}

fn epoch(manager: &SelectionManager) -> ActionResult {
    let observed = manager
        .snapshot()
        .current_analysis
        .and_then(|analysis| analysis.indicators)
        .and_then(|indicators| EpochIndicators::from_indicators(&indicators));
    let Some(baseline) = observed else {
        return Err("The current analysis has no forest, NDVI and temperature readings".into());
    };

    let year = Input::<i32>::new()
        .with_prompt("Year")
        .default(2015)
        .interact_text()?;
    commands::epoch(baseline, year).map(Some)
}
