//! Delimited-text loader for the incident table.
//!
//! Resolves the longitude, latitude, and category columns by header name
//! (falling back to position for a bare three-column table), parses every
//! row, and builds an [`IncidentCollection`]. Any format error aborts the
//! whole load; there is no partial result.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use crime_radius_incident_models::{Coordinate, IncidentRecord};

use crate::config::{ColumnMapping, DatasetConfig};
use crate::{DatasetFormatError, IncidentCollection, LoadError};

/// Column indices of the three canonical fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    longitude: usize,
    latitude: usize,
    category: usize,
}

/// Loads the incident table at `config.path`.
///
/// # Errors
///
/// Returns [`LoadError::NoPath`] if no path is configured,
/// [`LoadError::Io`] if the file cannot be opened, and
/// [`LoadError::Format`] if its contents are malformed.
pub fn load_path(config: &DatasetConfig) -> Result<IncidentCollection, LoadError> {
    let path = config.path.as_deref().ok_or(LoadError::NoPath)?;
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!("Loading incidents from {}", path.display());
    Ok(load_reader(BufReader::new(file), config)?)
}

/// Loads the incident table from any reader.
///
/// # Errors
///
/// Returns [`DatasetFormatError`] if the required columns cannot be
/// resolved, a row has the wrong number of fields, a coordinate is not a
/// number, or the text is not valid delimited data.
pub fn load_reader<R: Read>(
    reader: R,
    config: &DatasetConfig,
) -> Result<IncidentCollection, DatasetFormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter_byte())
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();
    let columns = resolve_columns(&headers, &config.columns)?;

    let mut interned: BTreeMap<String, Arc<str>> = BTreeMap::new();
    let mut records = Vec::new();
    let mut excluded: u64 = 0;
    let mut skipped: u64 = 0;

    for (i, result) in reader.records().enumerate() {
        let row = result?;
        // Header is line 1; fall back to counting when the reader has no
        // position information.
        let line = row.position().map_or(i as u64 + 2, csv::Position::line);

        if row.len() != headers.len() {
            return Err(DatasetFormatError::Arity {
                line,
                expected: headers.len(),
                found: row.len(),
            });
        }

        let category = row.get(columns.category).unwrap_or("");
        let longitude = parse_field(row.get(columns.longitude), line, "longitude")?;
        let latitude = parse_field(row.get(columns.latitude), line, "latitude")?;

        let (Some(longitude), Some(latitude)) = (longitude, latitude) else {
            skipped += 1;
            continue;
        };
        let Ok(coordinate) = Coordinate::new(longitude, latitude) else {
            skipped += 1;
            continue;
        };
        if category.is_empty() {
            skipped += 1;
            continue;
        }
        if category == config.excluded_category {
            excluded += 1;
            continue;
        }

        let category = match interned.get(category) {
            Some(existing) => Arc::clone(existing),
            None => {
                let label: Arc<str> = Arc::from(category);
                interned.insert(category.to_owned(), Arc::clone(&label));
                label
            }
        };

        records.push(IncidentRecord {
            coordinate,
            category,
        });
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} rows with missing or non-finite location or category");
    }
    log::info!(
        "Loaded {} incidents in {} categories ({excluded} '{}' records excluded)",
        records.len(),
        interned.len(),
        config.excluded_category
    );

    Ok(IncidentCollection::with_exclusion(
        records,
        &config.excluded_category,
    ))
}

/// Parses a coordinate field. Empty fields are missing values (`None`),
/// not errors.
fn parse_field(
    raw: Option<&str>,
    line: u64,
    column: &'static str,
) -> Result<Option<f64>, DatasetFormatError> {
    let value = raw.unwrap_or("").trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| DatasetFormatError::InvalidNumber {
            line,
            column,
            value: value.to_owned(),
        })
}

/// Finds the canonical columns by header name.
///
/// A three-column table whose header names none of them is read by
/// position. If exactly two resolve by name, the remaining column takes
/// the third role. Any other partial match is an error.
fn resolve_columns(
    headers: &[String],
    mapping: &ColumnMapping,
) -> Result<Columns, DatasetFormatError> {
    let find = |names: &[String]| {
        names.iter().find_map(|name| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name.trim()))
        })
    };

    let longitude = find(&mapping.longitude);
    let latitude = find(&mapping.latitude);
    let category = find(&mapping.category);

    if let (Some(longitude), Some(latitude), Some(category)) = (longitude, latitude, category) {
        return Ok(Columns {
            longitude,
            latitude,
            category,
        });
    }

    if headers.len() == 3 {
        match (longitude, latitude, category) {
            (None, None, None) => {
                log::info!(
                    "Header {headers:?} names no known columns; reading as (longitude, latitude, category)"
                );
                return Ok(Columns {
                    longitude: 0,
                    latitude: 1,
                    category: 2,
                });
            }
            (Some(lon), Some(lat), None) if lon != lat => {
                let category = 3 - lon - lat;
                log::info!("Reading unnamed column '{}' as category", headers[category]);
                return Ok(Columns {
                    longitude: lon,
                    latitude: lat,
                    category,
                });
            }
            (Some(lon), None, Some(cat)) if lon != cat => {
                let latitude = 3 - lon - cat;
                log::info!("Reading unnamed column '{}' as latitude", headers[latitude]);
                return Ok(Columns {
                    longitude: lon,
                    latitude,
                    category: cat,
                });
            }
            (None, Some(lat), Some(cat)) if lat != cat => {
                let longitude = 3 - lat - cat;
                log::info!("Reading unnamed column '{}' as longitude", headers[longitude]);
                return Ok(Columns {
                    longitude,
                    latitude: lat,
                    category: cat,
                });
            }
            _ => {}
        }
    }

    let missing = [
        ("longitude", longitude),
        ("latitude", latitude),
        ("category", category),
    ]
    .into_iter()
    .filter_map(|(name, idx)| idx.is_none().then_some(name))
    .collect();

    Err(DatasetFormatError::MissingColumns { missing })
}
