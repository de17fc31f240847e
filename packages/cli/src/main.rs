#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for counting incidents by category within the search
//! radius of one or many locations.
//!
//! Uses `indicatif-log-bridge` (via [`crime_radius_cli_utils::init_logger`])
//! so log lines and the batch progress bar share the terminal cleanly.

mod commands;
mod config;
mod locations;
mod report;

use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use crime_radius_aggregate::{EngineSettings, ProximityEngine};
use crime_radius_cli_utils::BatchProgress;
use crime_radius_dataset::LoadError;
use crime_radius_incident_models::{Coordinate, InvalidCoordinateError};

use crate::config::AppConfig;
use crate::report::OutputFormat;

/// Errors surfaced by the command line.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}", path = .path.display())]
    ReadConfig {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid.
    #[error("invalid config {path}: {source}", path = .path.display())]
    ParseConfig {
        /// Config file path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// The incident dataset could not be loaded.
    #[error(transparent)]
    Dataset(#[from] LoadError),

    /// The locations file could not be opened.
    #[error("failed to open locations {path}: {source}", path = .path.display())]
    ReadLocations {
        /// Locations file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A location row has a non-finite coordinate.
    #[error("location '{id}': {source}")]
    InvalidLocation {
        /// Id of the offending row.
        id: String,
        /// The rejected coordinate.
        source: InvalidCoordinateError,
    },

    /// A query coordinate given on the command line is not finite.
    #[error(transparent)]
    InvalidCoordinate(#[from] InvalidCoordinateError),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser)]
#[command(
    name = "crime_radius",
    about = "Count incidents by category within 0.8 km of a location"
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Incident CSV to load (overrides `dataset.path` in the config)
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count incidents around a single coordinate
    Count {
        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Count incidents around every location in a CSV (`id,longitude,latitude`)
    Batch {
        /// Locations CSV
        #[arg(long)]
        locations: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
    },
    /// Show how many incidents of each category were loaded
    Summary {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crime_radius_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.dataset {
        config.dataset.path = Some(path);
    }

    let start = Instant::now();
    let collection = crime_radius_dataset::load_path(&config.dataset).map_err(CliError::from)?;
    let settings = EngineSettings {
        margins: config.search.margins.resolve(),
    };
    let engine = ProximityEngine::new(collection, settings);
    log::info!(
        "Engine ready in {:.2?} ({} incidents, margins {:?})",
        start.elapsed(),
        engine.collection().len(),
        settings.margins
    );

    let stdout = std::io::stdout();

    match cli.command {
        Commands::Count { lon, lat, json } => {
            let coordinate = Coordinate::new(lon, lat).map_err(CliError::from)?;
            commands::count(&engine, coordinate, json, stdout.lock())?;
        }
        Commands::Batch {
            locations,
            output,
            format,
        } => {
            let progress = BatchProgress::attach(&multi, "Counting incidents");

            if let Some(path) = output {
                let file = std::fs::File::create(&path).map_err(CliError::from)?;
                let mut writer = BufWriter::new(file);
                commands::batch(&engine, &locations, format, &progress, &mut writer)?;
                writer.flush().map_err(CliError::from)?;
                log::info!("Wrote results to {}", path.display());
            } else {
                commands::batch(&engine, &locations, format, &progress, stdout.lock())?;
            }
        }
        Commands::Summary { json } => {
            commands::summary(&engine, json, stdout.lock())?;
        }
    }

    Ok(())
}
