//! Subcommand implementations, written against generic writers so they can
//! be exercised without a terminal.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use crime_radius_aggregate::{ProgressCallback, ProximityEngine};
use crime_radius_incident_models::Coordinate;

use crate::CliError;
use crate::locations::read_locations;
use crate::report::{OutputFormat, render_table, write_csv, write_json};

/// Counts incidents around one coordinate.
///
/// # Errors
///
/// Returns [`CliError`] if writing the output fails.
pub fn count<W: Write>(
    engine: &ProximityEngine,
    coordinate: Coordinate,
    json: bool,
    mut out: W,
) -> Result<(), CliError> {
    let result = engine.aggregate(coordinate);
    log::info!("{coordinate}: {} incidents within radius", result.total());

    if json {
        serde_json::to_writer_pretty(&mut out, &result)?;
        writeln!(out)?;
    } else {
        out.write_all(render_table(&result).as_bytes())?;
    }
    Ok(())
}

/// Counts incidents around every location in the `locations` CSV.
///
/// # Errors
///
/// Returns [`CliError`] if the locations cannot be read or the output
/// cannot be written.
pub fn batch<W: Write>(
    engine: &ProximityEngine,
    locations: &Path,
    format: OutputFormat,
    progress: &Arc<dyn ProgressCallback>,
    out: W,
) -> Result<(), CliError> {
    let file = File::open(locations).map_err(|source| CliError::ReadLocations {
        path: locations.to_path_buf(),
        source,
    })?;
    let locations = read_locations(BufReader::new(file))?;

    let results = engine.aggregate_batch(&locations, progress);

    match format {
        OutputFormat::Csv => write_csv(out, &locations, &results),
        OutputFormat::Json => write_json(out, &locations, &results),
    }
}

/// Prints the loaded dataset's size and per-category counts.
///
/// # Errors
///
/// Returns [`CliError`] if writing the output fails.
pub fn summary<W: Write>(engine: &ProximityEngine, json: bool, mut out: W) -> Result<(), CliError> {
    let counts = engine.collection().category_counts();

    if json {
        serde_json::to_writer_pretty(&mut out, &counts)?;
        writeln!(out)?;
    } else {
        writeln!(
            out,
            "{} incidents in {} categories",
            counts.total(),
            counts.by_category().len()
        )?;
        out.write_all(render_table(&counts).as_bytes())?;
    }
    Ok(())
}
