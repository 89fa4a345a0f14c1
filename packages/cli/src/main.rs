#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front-end for the bio-risk analysis dashboard.
//!
//! ```text
//! bio_risk analyze --lat 13.08 --lng 80.27
//! bio_risk search "Bengaluru"
//! bio_risk simulate --lat 13.08 --lng 80.27 --urban 80 --conservation 10
//! bio_risk cell --lat 13.08 --lng 80.27 G-12
//! bio_risk overlay --lat 13.08 --lng 80.27 --lens ndvi
//! bio_risk report --lat 13.08 --lng 80.27 --cell G-12 --out reports
//! bio_risk project --urban 80 --conservation 10
//! bio_risk epoch --year 2010 --forest 78.3 --ndvi 0.6 --temp 30
//! ```
//!
//! Running `bio_risk` with no subcommand enters interactive mode, which
//! keeps one selection alive across actions.
//!
//! Endpoints default to the bundled service configuration and can be
//! overridden with `BIO_RISK_API_BASE` and `BIO_RISK_GEOCODER_URL`.

mod commands;
mod interactive;
mod narration;

use std::path::PathBuf;
use std::sync::Arc;

use bio_risk_cli_utils::MultiProgress;
use bio_risk_client::HttpBackend;
use bio_risk_geocoder::Geocoder;
use bio_risk_models::{Coordinate, SimulationParams};
use bio_risk_orchestrator::Orchestrator;
use bio_risk_overlay::Lens;
use bio_risk_selection::SelectionManager;
use bio_risk_simulation::EpochIndicators;
use clap::{Args, Parser, Subcommand};

use crate::commands::CliResult;

#[derive(Parser)]
#[command(
    name = "bio_risk",
    about = "Biodiversity risk analysis for any point on the map"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// The clicked map point.
#[derive(Args, Clone, Copy)]
struct At {
    /// Latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    lng: f64,
}

impl From<At> for Coordinate {
    fn from(at: At) -> Self {
        Self::new(at.lat, at.lng)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the region around a coordinate
    Analyze {
        #[command(flatten)]
        at: At,
    },
    /// Search for a place and analyze its region
    Search {
        /// Free-text place name
        text: String,
    },
    /// Analyze a region, then re-run it under a policy scenario
    Simulate {
        #[command(flatten)]
        at: At,
        /// Urban growth percentage
        #[arg(long, default_value = "50", value_parser = clap::value_parser!(u8).range(0..=100))]
        urban: u8,
        /// Conservation funding percentage
        #[arg(long, default_value = "20", value_parser = clap::value_parser!(u8).range(0..=100))]
        conservation: u8,
        /// Additional warming in degrees Celsius
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        temp_increase: f64,
    },
    /// Analyze a region and select one of its grid cells
    Cell {
        #[command(flatten)]
        at: At,
        /// Grid cell id
        grid_id: String,
    },
    /// Analyze a region and classify its grid under a lens
    Overlay {
        #[command(flatten)]
        at: At,
        /// classification, vegetationIndex (ndvi) or fireRisk (fire)
        #[arg(long, default_value = "classification")]
        lens: Lens,
    },
    /// Analyze a region and print its mitigation plan
    Mitigation {
        #[command(flatten)]
        at: At,
    },
    /// Analyze a region and export its PDF report
    Report {
        #[command(flatten)]
        at: At,
        /// Grid cell to report on instead of the whole region
        #[arg(long)]
        cell: Option<String>,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Project habitat and survival metrics without the backend
    Project {
        /// Urban growth percentage
        #[arg(long, default_value = "50", value_parser = clap::value_parser!(u8).range(0..=100))]
        urban: u8,
        /// Conservation funding percentage
        #[arg(long, default_value = "20", value_parser = clap::value_parser!(u8).range(0..=100))]
        conservation: u8,
    },
    /// Extrapolate observed indicators back to a past year
    Epoch {
        /// Target year
        #[arg(long)]
        year: i32,
        /// Observed forest coverage percentage
        #[arg(long)]
        forest: f64,
        /// Observed NDVI
        #[arg(long)]
        ndvi: f64,
        /// Observed surface temperature in degrees Celsius
        #[arg(long, allow_negative_numbers = true)]
        temp: f64,
    },
}

/// Prints `value` as pretty JSON without tearing active spinners.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn print_json(multi: &MultiProgress, value: &serde_json::Value) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    multi.suspend(|| println!("{text}"));
    Ok(())
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let multi = bio_risk_cli_utils::init_logger();
    let cli = Cli::parse();

    let backend = HttpBackend::from_env()?;
    log::debug!("Using backend at {}", backend.config().base_url);
    let manager = SelectionManager::new(Orchestrator::new(Arc::new(backend)));
    let narrator = narration::spawn(&manager, multi.clone());

    let result = match cli.command {
        None => interactive::run(&manager, &multi).await,
        Some(command) => run_command(&manager, &multi, command).await,
    };

    drop(manager);
    narrator.await?;

    result
}

async fn run_command(
    manager: &SelectionManager,
    multi: &MultiProgress,
    command: Commands,
) -> CliResult<()> {
    let view = match command {
        Commands::Analyze { at } => {
            commands::select_region(manager, at.into()).await?;
            commands::region_view(&manager.snapshot())
        }
        Commands::Search { text } => {
            let geocoder = Geocoder::from_env()?;
            let Some(view) = commands::search(&geocoder, manager, &text).await? else {
                println!("Location not found.");
                return Ok(());
            };
            view
        }
        Commands::Simulate {
            at,
            urban,
            conservation,
            temp_increase,
        } => {
            let params = SimulationParams::new(urban, conservation, temp_increase)?;
            commands::select_region(manager, at.into()).await?;
            commands::simulate(manager, params).await?
        }
        Commands::Cell { at, grid_id } => {
            commands::select_region(manager, at.into()).await?;
            commands::select_cell(manager, &grid_id).await?
        }
        Commands::Overlay { at, lens } => {
            commands::select_region(manager, at.into()).await?;
            commands::overlay(&manager.snapshot(), lens)?
        }
        Commands::Mitigation { at } => {
            commands::select_region(manager, at.into()).await?;
            commands::mitigation(manager).await?
        }
        Commands::Report { at, cell, out } => {
            commands::select_region(manager, at.into()).await?;
            if let Some(grid_id) = cell {
                commands::select_cell(manager, &grid_id).await?;
            }
            let path = commands::export_report(manager, &out).await?;
            println!("Saved {}", path.display());
            return Ok(());
        }
        Commands::Project {
            urban,
            conservation,
        } => commands::projection(urban, conservation)?,
        Commands::Epoch {
            year,
            forest,
            ndvi,
            temp,
        } => {
            let baseline = EpochIndicators {
                forest_coverage: forest,
                ndvi,
                temperature: temp,
            };
            commands::epoch(baseline, year)?
        }
    };

    print_json(multi, &view)
}
