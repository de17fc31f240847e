//! Output formatting for aggregation results.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use crime_radius_incident_models::{AggregationResult, Coordinate};
use serde::Serialize;

use crate::CliError;

/// Prefix of every per-category column in the wide CSV.
pub const CATEGORY_PREFIX: &str = "category:";

/// Batch output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One row per location, one column per category, then `total`.
    Csv,
    /// An object keyed by location id.
    Json,
}

/// Renders one result as aligned `category count` lines followed by the
/// total.
#[must_use]
pub fn render_table(result: &AggregationResult) -> String {
    let width = result
        .iter()
        .map(|(category, _)| category.len())
        .max()
        .unwrap_or(0)
        .max("total".len());

    let mut out = String::new();
    for (category, count) in result.iter() {
        out.push_str(&format!("{category:<width$}  {count}\n"));
    }
    out.push_str(&format!("{:<width$}  {}\n", "total", result.total()));
    out
}

/// Writes the wide batch table: `id,longitude,latitude`, one zero-filled
/// `category:<name>` column per category seen in any result, then `total`.
///
/// The prefix keeps category columns apart from the fixed ones, so a
/// category literally named `total` or `id` gets its own column.
/// Rows follow `locations` order. A repeated id is written once, at its
/// last occurrence, matching which result the batch kept.
///
/// # Errors
///
/// Returns [`CliError::Csv`] or [`CliError::Io`] if writing fails.
pub fn write_csv<W: Write>(
    writer: W,
    locations: &[(String, Coordinate)],
    results: &BTreeMap<String, AggregationResult>,
) -> Result<(), CliError> {
    let categories: BTreeSet<&str> = results
        .values()
        .flat_map(|r| r.iter().map(|(category, _)| category))
        .collect();

    let mut out = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = ["id", "longitude", "latitude"]
        .into_iter()
        .map(str::to_owned)
        .collect();
    header.extend(categories.iter().map(|c| format!("{CATEGORY_PREFIX}{c}")));
    header.push("total".to_owned());
    out.write_record(&header)?;

    let last: BTreeMap<&str, usize> = locations
        .iter()
        .enumerate()
        .map(|(i, (id, _))| (id.as_str(), i))
        .collect();

    for (i, (id, coordinate)) in locations.iter().enumerate() {
        if last.get(id.as_str()) != Some(&i) {
            continue;
        }
        let Some(result) = results.get(id) else {
            continue;
        };

        let mut row = vec![
            id.clone(),
            coordinate.longitude().to_string(),
            coordinate.latitude().to_string(),
        ];
        row.extend(categories.iter().map(|c| result.count(c).to_string()));
        row.push(result.total().to_string());
        out.write_record(&row)?;
    }

    out.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct LocationReport<'a> {
    coordinate: Coordinate,
    #[serde(flatten)]
    result: &'a AggregationResult,
}

/// Writes `{ "<id>": { "coordinate": .., "byCategory": .., "total": .. } }`.
///
/// # Errors
///
/// Returns [`CliError::Json`] if serialization or writing fails.
pub fn write_json<W: Write>(
    writer: W,
    locations: &[(String, Coordinate)],
    results: &BTreeMap<String, AggregationResult>,
) -> Result<(), CliError> {
    let coordinates: BTreeMap<&str, Coordinate> = locations
        .iter()
        .map(|(id, coordinate)| (id.as_str(), *coordinate))
        .collect();

    let report: BTreeMap<&str, LocationReport<'_>> = results
        .iter()
        .filter_map(|(id, result)| {
            coordinates.get(id.as_str()).map(|&coordinate| {
                (id.as_str(), LocationReport { coordinate, result })
            })
        })
        .collect();

    serde_json::to_writer_pretty(writer, &report)?;
    Ok(())
}
