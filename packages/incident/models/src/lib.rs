#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core value types for proximity-based incident counting.
//!
//! Defines the query [`Coordinate`], the loaded [`IncidentRecord`], and the
//! per-query [`AggregationResult`], along with the policy constants shared
//! by every stage of the counter.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Radius around a query coordinate within which incidents are counted.
///
/// Fixed for the lifetime of the engine. Distances equal to this value are
/// outside the radius.
pub const SEARCH_RADIUS_KM: f64 = 0.8;

/// Earth radius used by the great-circle distance.
///
/// This is the WGS84 equatorial radius applied uniformly (a spherical
/// approximation, not an ellipsoidal model).
pub const EARTH_RADIUS_KM: f64 = 6378.1370;

/// Category label of records that are dropped at load time and never
/// counted.
pub const EXCLUDED_CATEGORY: &str = "NON-CRIMINAL";

/// Error returned when a coordinate component is NaN or infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidCoordinateError {
    /// The longitude that was provided.
    pub longitude: f64,
    /// The latitude that was provided.
    pub latitude: f64,
}

impl std::fmt::Display for InvalidCoordinateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid coordinate ({}, {}): longitude and latitude must be finite",
            self.longitude, self.latitude
        )
    }
}

impl std::error::Error for InvalidCoordinateError {}

/// A point on the earth's surface in decimal degrees.
///
/// Both components are guaranteed finite; the only way to build one is
/// [`Coordinate::new`]. No range check is applied, so a longitude of `200.0`
/// is accepted.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    longitude: f64,
    latitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    longitude: f64,
    latitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = InvalidCoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.longitude, raw.latitude)
    }
}

impl Coordinate {
    /// Creates a coordinate from a longitude/latitude pair.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoordinateError`] if either component is NaN or
    /// infinite.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, InvalidCoordinateError> {
        if longitude.is_finite() && latitude.is_finite() {
            Ok(Self {
                longitude,
                latitude,
            })
        } else {
            Err(InvalidCoordinateError {
                longitude,
                latitude,
            })
        }
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// The coordinate as an `[x, y]` pair, i.e. `[longitude, latitude]`.
    #[must_use]
    pub const fn as_xy(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.longitude, self.latitude)
    }
}

/// One categorized, geolocated incident from the loaded dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    /// Where the incident happened.
    pub coordinate: Coordinate,
    /// Category label exactly as it appears in the source dataset.
    pub category: Arc<str>,
}

impl IncidentRecord {
    /// Creates a record from an already validated coordinate.
    #[must_use]
    pub fn new(coordinate: Coordinate, category: impl Into<Arc<str>>) -> Self {
        Self {
            coordinate,
            category: category.into(),
        }
    }

    /// Whether this record carries the [`EXCLUDED_CATEGORY`] label.
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        &*self.category == EXCLUDED_CATEGORY
    }
}

/// Per-category incident counts for one query, with an explicit total.
///
/// The total is a separate field rather than a synthetic category key, so a
/// real category named `"total"` or `"SUM"` cannot collide with it. The only
/// way to add to the counts is [`AggregationResult::record`], which keeps
/// `total` equal to the sum of the category counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    by_category: BTreeMap<String, u64>,
    total: u64,
}

impl AggregationResult {
    /// Counts one more incident of `category`.
    pub fn record(&mut self, category: &str) {
        if let Some(count) = self.by_category.get_mut(category) {
            *count += 1;
        } else {
            self.by_category.insert(category.to_owned(), 1);
        }
        self.total += 1;
    }

    /// Total number of incidents counted across all categories.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Count for a single category. Categories with no incidents return 0.
    #[must_use]
    pub fn count(&self, category: &str) -> u64 {
        self.by_category.get(category).copied().unwrap_or(0)
    }

    /// Category counts in lexical category order. Only categories with at
    /// least one incident are present.
    #[must_use]
    pub const fn by_category(&self) -> &BTreeMap<String, u64> {
        &self.by_category
    }

    /// Iterates `(category, count)` pairs in lexical category order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.by_category.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Whether no incidents were counted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl<'a> FromIterator<&'a str> for AggregationResult {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut result = Self::default();
        for category in iter {
            result.record(category);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_coordinates() {
        assert!(Coordinate::new(f64::NAN, 41.0).is_err());
        assert!(Coordinate::new(-87.0, f64::INFINITY).is_err());
        assert!(Coordinate::new(f64::NEG_INFINITY, f64::NAN).is_err());
    }

    #[test]
    fn accepts_out_of_range_but_finite() {
        let c = Coordinate::new(200.0, -95.0).unwrap();
        assert!((c.longitude() - 200.0).abs() < f64::EPSILON);
        assert!((c.latitude() - -95.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deserialize_validates_coordinate() {
        let ok: Coordinate =
            serde_json::from_str(r#"{"longitude": -87.6, "latitude": 41.8}"#).unwrap();
        assert!((ok.longitude() - -87.6).abs() < f64::EPSILON);

        let err = serde_json::from_str::<Coordinate>(r#"{"longitude": 1e999, "latitude": 41.8}"#);
        assert!(err.is_err());
    }

    #[test]
    fn total_tracks_category_counts() {
        let result: AggregationResult = ["THEFT", "BATTERY", "THEFT"].into_iter().collect();
        assert_eq!(result.total(), 3);
        assert_eq!(result.count("THEFT"), 2);
        assert_eq!(result.count("BATTERY"), 1);
        assert_eq!(result.count("ROBBERY"), 0);
        assert_eq!(result.by_category().values().sum::<u64>(), result.total());
    }

    #[test]
    fn total_is_disjoint_from_categories() {
        let result: AggregationResult = ["total", "SUM", "total"].into_iter().collect();
        assert_eq!(result.total(), 3);
        assert_eq!(result.count("total"), 2);
        assert_eq!(result.count("SUM"), 1);
    }

    #[test]
    fn empty_result_has_zero_total() {
        let result = AggregationResult::default();
        assert!(result.is_empty());
        assert_eq!(result.total(), 0);
        assert!(result.by_category().is_empty());
    }

    #[test]
    fn serializes_with_explicit_total() {
        let result: AggregationResult = ["THEFT", "THEFT"].into_iter().collect();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"byCategory": {"THEFT": 2}, "total": 2})
        );
    }

    #[test]
    fn excluded_category_is_exact_match() {
        let c = Coordinate::new(0.0, 0.0).unwrap();
        assert!(IncidentRecord::new(c, EXCLUDED_CATEGORY).is_excluded());
        assert!(!IncidentRecord::new(c, "non-criminal").is_excluded());
        assert!(!IncidentRecord::new(c, "NON-CRIMINAL (SUBJECT SPECIFIED)").is_excluded());
    }
}
