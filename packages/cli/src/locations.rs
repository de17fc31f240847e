//! Query locations for batch runs.
//!
//! A CSV with `id`, `longitude`, and `latitude` columns (a few common
//! aliases are accepted). Any other columns are ignored, so an upstream
//! listing export can be fed in unchanged.

use std::io::Read;

use crime_radius_incident_models::Coordinate;
use serde::Deserialize;

use crate::CliError;

#[derive(Debug, Deserialize)]
struct LocationRow {
    #[serde(alias = "name", alias = "Name", alias = "Restaurant", alias = "ID")]
    id: String,
    #[serde(alias = "Longitude", alias = "lon", alias = "lng")]
    longitude: f64,
    #[serde(alias = "Latitude", alias = "lat")]
    latitude: f64,
}

/// Reads `(id, coordinate)` pairs in file order.
///
/// # Errors
///
/// Returns [`CliError::Csv`] if a row is missing a column or has a
/// non-numeric coordinate, and [`CliError::InvalidLocation`] if a
/// coordinate is not finite.
pub fn read_locations<R: Read>(reader: R) -> Result<Vec<(String, Coordinate)>, CliError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut locations = Vec::new();
    for row in reader.deserialize::<LocationRow>() {
        let row = row?;
        let coordinate = Coordinate::new(row.longitude, row.latitude).map_err(|source| {
            CliError::InvalidLocation {
                id: row.id.clone(),
                source,
            }
        })?;
        locations.push((row.id, coordinate));
    }

    log::info!("Read {} query locations", locations.len());
    Ok(locations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_locations_and_ignores_extra_columns() {
        let locations = read_locations(
            "id,cuisine,longitude,latitude\n\
             Kabul House,afghan,-87.6846,41.9665\n\
             Noon O Kabab, afghan , -87.7069 , 41.9656\n"
                .as_bytes(),
        )
        .unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[1].0, "Noon O Kabab");
        assert!((locations[1].1.longitude() - -87.7069).abs() < f64::EPSILON);
    }

    #[test]
    fn accepts_header_aliases() {
        let locations =
            read_locations("Restaurant,Latitude,Longitude\nCafe,41.9,-87.6\n".as_bytes()).unwrap();
        assert_eq!(locations[0].0, "Cafe");
        assert!((locations[0].1.latitude() - 41.9).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        let err = read_locations("id,longitude,latitude\nbad,inf,41.9\n".as_bytes()).unwrap_err();
        match err {
            CliError::InvalidLocation { id, .. } => assert_eq!(id, "bad"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_columns() {
        assert!(matches!(
            read_locations("id,longitude\nx,-87.6\n".as_bytes()),
            Err(CliError::Csv(_))
        ));
    }
}
