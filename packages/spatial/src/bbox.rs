//! Rectangular pre-filter in coordinate-degree space.
//!
//! The box around a query coordinate circumscribes the search radius, so it
//! never excludes a record the exact distance test would keep (see
//! [`SearchMargins::is_sound_at`] for where that holds). It only exists to
//! shrink the candidate set before the haversine test.

use crime_radius_incident_models::{
    Coordinate, EARTH_RADIUS_KM, IncidentRecord, SEARCH_RADIUS_KM,
};
use rstar::AABB;
use serde::{Deserialize, Serialize};

/// Margins that are negative, NaN, or infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidMarginsError {
    /// The longitude margin that was provided.
    pub longitude_deg: f64,
    /// The latitude margin that was provided.
    pub latitude_deg: f64,
}

impl std::fmt::Display for InvalidMarginsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid search margins ({}, {}): both must be finite and non-negative",
            self.longitude_deg, self.latitude_deg
        )
    }
}

impl std::error::Error for InvalidMarginsError {}

/// Half-widths of the pre-filter box in decimal degrees.
///
/// Deserialization goes through [`SearchMargins::new`], so margins read from
/// config are always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSearchMargins")]
pub struct SearchMargins {
    /// Added to and subtracted from the query longitude.
    pub longitude_deg: f64,
    /// Added to and subtracted from the query latitude.
    pub latitude_deg: f64,
}

#[derive(Deserialize)]
struct RawSearchMargins {
    longitude_deg: f64,
    latitude_deg: f64,
}

impl TryFrom<RawSearchMargins> for SearchMargins {
    type Error = InvalidMarginsError;

    fn try_from(raw: RawSearchMargins) -> Result<Self, Self::Error> {
        Self::new(raw.longitude_deg, raw.latitude_deg)
    }
}

impl SearchMargins {
    /// The 0.8 km radius converted to degrees near Chicago (about 41.9° N).
    ///
    /// These are deployment constants, not a general conversion: the
    /// longitude margin shrinks in kilometres as latitude grows, and the box
    /// stops covering the radius beyond roughly 52.9° of latitude. Use
    /// [`SearchMargins::for_latitude`] to deploy elsewhere.
    pub const CHICAGO: Self = Self {
        longitude_deg: 0.011_915,
        latitude_deg: 0.008_994,
    };

    /// Creates margins from half-widths in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidMarginsError`] if either value is negative, NaN, or
    /// infinite.
    pub fn new(longitude_deg: f64, latitude_deg: f64) -> Result<Self, InvalidMarginsError> {
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if valid(longitude_deg) && valid(latitude_deg) {
            Ok(Self {
                longitude_deg,
                latitude_deg,
            })
        } else {
            Err(InvalidMarginsError {
                longitude_deg,
                latitude_deg,
            })
        }
    }

    /// Derives margins that cover the search radius for queries near
    /// `latitude`.
    ///
    /// Near the poles, where no longitude span is narrow enough, the
    /// longitude margin becomes 180° (the whole globe in that axis).
    #[must_use]
    pub fn for_latitude(latitude: f64) -> Self {
        // Pad slightly so the result passes `is_sound_at` despite rounding.
        let angular = SEARCH_RADIUS_KM / EARTH_RADIUS_KM * 1.000_001;
        let latitude_deg = angular.to_degrees();
        let widest = widest_cos(latitude, latitude_deg);
        let half = (angular / 2.0).sin();

        let longitude_deg = if widest <= half {
            180.0
        } else {
            (2.0 * (half / widest).asin()).to_degrees()
        };

        Self {
            longitude_deg,
            latitude_deg,
        }
    }

    /// Whether a box built with these margins around a query at `latitude`
    /// contains every point within [`SEARCH_RADIUS_KM`] of it.
    ///
    /// Ignores wrap-around at the antimeridian.
    #[must_use]
    pub fn is_sound_at(&self, latitude: f64) -> bool {
        let angular = SEARCH_RADIUS_KM / EARTH_RADIUS_KM;
        if self.latitude_deg.to_radians() < angular {
            return false;
        }
        if self.longitude_deg >= 180.0 {
            return true;
        }

        // sin(d / 2R) >= cos(max |lat|) * sin(dlon / 2), so any point beyond
        // the longitude margin is at least this far away.
        let widest = widest_cos(latitude, self.latitude_deg);
        widest * (self.longitude_deg.to_radians() / 2.0).sin() >= (angular / 2.0).sin()
    }
}

impl Default for SearchMargins {
    fn default() -> Self {
        Self::CHICAGO
    }
}

/// Cosine of the largest absolute latitude a record inside the latitude
/// margin can have.
fn widest_cos(latitude: f64, latitude_margin_deg: f64) -> f64 {
    (latitude.abs() + latitude_margin_deg)
        .min(90.0)
        .to_radians()
        .cos()
        .max(0.0)
}

/// Inclusive longitude/latitude bounds around a query coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western bound.
    pub lon_lo: f64,
    /// Eastern bound.
    pub lon_hi: f64,
    /// Southern bound.
    pub lat_lo: f64,
    /// Northern bound.
    pub lat_hi: f64,
}

impl BoundingBox {
    /// Builds the box `coordinate ± margins`.
    #[must_use]
    pub fn around(coordinate: Coordinate, margins: SearchMargins) -> Self {
        Self {
            lon_hi: coordinate.longitude() + margins.longitude_deg,
            lon_lo: coordinate.longitude() - margins.longitude_deg,
            lat_hi: coordinate.latitude() + margins.latitude_deg,
            lat_lo: coordinate.latitude() - margins.latitude_deg,
        }
    }

    /// Whether `coordinate` lies within all four bounds (edges included).
    #[must_use]
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        let (lon, lat) = (coordinate.longitude(), coordinate.latitude());
        lon <= self.lon_hi && lon >= self.lon_lo && lat <= self.lat_hi && lat >= self.lat_lo
    }

    /// Records of `records` that fall inside the box, by linear scan.
    pub fn select<'a>(
        &self,
        records: &'a [IncidentRecord],
    ) -> impl Iterator<Item = &'a IncidentRecord> + use<'a> {
        let bbox = *self;
        records.iter().filter(move |r| bbox.contains(r.coordinate))
    }

    /// The box as an R-tree envelope.
    #[must_use]
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.lon_lo, self.lat_lo], [self.lon_hi, self.lat_hi])
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::distance::is_within_radius;

    fn coord(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat).unwrap()
    }

    #[test]
    fn bounds_follow_margins() {
        let bbox = BoundingBox::around(coord(-87.6, 41.8), SearchMargins::CHICAGO);
        assert!((bbox.lon_hi - (-87.6 + 0.011_915)).abs() < 1e-12);
        assert!((bbox.lon_lo - (-87.6 - 0.011_915)).abs() < 1e-12);
        assert!((bbox.lat_hi - (41.8 + 0.008_994)).abs() < 1e-12);
        assert!((bbox.lat_lo - (41.8 - 0.008_994)).abs() < 1e-12);
    }

    #[test]
    fn edges_are_inclusive() {
        let bbox = BoundingBox::around(coord(10.0, 20.0), SearchMargins::CHICAGO);
        assert!(bbox.contains(coord(bbox.lon_hi, bbox.lat_hi)));
        assert!(bbox.contains(coord(bbox.lon_lo, bbox.lat_lo)));
        assert!(!bbox.contains(coord(bbox.lon_hi + 1e-9, 20.0)));
        assert!(!bbox.contains(coord(10.0, bbox.lat_lo - 1e-9)));
    }

    #[test]
    fn select_filters_without_mutating() {
        let records = vec![
            IncidentRecord::new(coord(0.0, 0.0), "THEFT"),
            IncidentRecord::new(coord(0.005, 0.005), "BATTERY"),
            IncidentRecord::new(coord(50.0, 50.0), "THEFT"),
        ];
        let bbox = BoundingBox::around(coord(0.0, 0.0), SearchMargins::CHICAGO);
        let selected: Vec<_> = bbox.select(&records).collect();
        assert_eq!(selected.len(), 2);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn chicago_margins_are_sound_near_chicago_only() {
        assert!(SearchMargins::CHICAGO.is_sound_at(41.88));
        assert!(SearchMargins::CHICAGO.is_sound_at(0.0));
        assert!(SearchMargins::CHICAGO.is_sound_at(-50.0));
        assert!(!SearchMargins::CHICAGO.is_sound_at(60.0));
    }

    #[test]
    fn derived_margins_are_sound_and_tight() {
        for lat in [0.0, 41.88, 60.0, -75.0, 89.0] {
            let margins = SearchMargins::for_latitude(lat);
            assert!(margins.is_sound_at(lat), "unsound at {lat}: {margins:?}");
        }
        let chicago = SearchMargins::for_latitude(41.88);
        assert!(chicago.longitude_deg < SearchMargins::CHICAGO.longitude_deg);
        assert!(chicago.latitude_deg < SearchMargins::CHICAGO.latitude_deg);
    }

    #[test]
    fn derived_margins_cover_whole_longitude_at_pole() {
        let margins = SearchMargins::for_latitude(90.0);
        assert!((margins.longitude_deg - 180.0).abs() < f64::EPSILON);
        assert!(margins.is_sound_at(90.0));
    }

    #[test]
    fn undersized_latitude_margin_is_unsound() {
        let margins = SearchMargins {
            longitude_deg: 1.0,
            latitude_deg: 0.001,
        };
        assert!(!margins.is_sound_at(0.0));
    }

    #[test]
    fn rejects_negative_or_non_finite_margins() {
        assert!(SearchMargins::new(0.01, 0.009).is_ok());
        assert!(SearchMargins::new(0.0, 0.0).is_ok());
        assert!(SearchMargins::new(-0.01, 0.009).is_err());
        assert!(SearchMargins::new(0.01, f64::NAN).is_err());
        assert!(SearchMargins::new(f64::INFINITY, 0.009).is_err());
    }

    proptest! {
        #[test]
        fn prefilter_never_drops_a_record_inside_the_radius(
            lon in -179.0f64..179.0,
            lat in -50.0f64..50.0,
            dlon in -0.02f64..0.02,
            dlat in -0.02f64..0.02,
        ) {
            let query = coord(lon, lat);
            let record = coord(lon + dlon, lat + dlat);
            let bbox = BoundingBox::around(query, SearchMargins::CHICAGO);
            if is_within_radius(query, record) {
                prop_assert!(bbox.contains(record));
            }
        }

        #[test]
        fn derived_margins_never_drop_a_record_inside_the_radius(
            lon in -179.0f64..179.0,
            lat in -85.0f64..85.0,
            dlon in -0.2f64..0.2,
            dlat in -0.01f64..0.01,
        ) {
            let query = coord(lon, lat);
            let record = coord(lon + dlon, lat + dlat);
            let bbox = BoundingBox::around(query, SearchMargins::for_latitude(lat));
            if is_within_radius(query, record) {
                prop_assert!(bbox.contains(record));
            }
        }
    }
}
