//! Great-circle distance and the radius boundary rule.

use crime_radius_incident_models::{Coordinate, EARTH_RADIUS_KM, SEARCH_RADIUS_KM};

/// Surface distance in kilometres between two coordinates on a sphere of
/// radius [`EARTH_RADIUS_KM`], using the haversine formula.
#[must_use]
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let lon1 = a.longitude().to_radians();
    let lon2 = b.longitude().to_radians();

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push near-antipodal pairs just past 1.
    let h = h.min(1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Whether a distance counts as inside the search radius.
///
/// Strictly less than [`SEARCH_RADIUS_KM`]: a distance of exactly the
/// radius is outside.
#[must_use]
pub fn is_within_radius_km(distance_km: f64) -> bool {
    distance_km < SEARCH_RADIUS_KM
}

/// Whether `b` lies strictly within [`SEARCH_RADIUS_KM`] of `a`.
#[must_use]
pub fn is_within_radius(a: Coordinate, b: Coordinate) -> bool {
    is_within_radius_km(haversine_km(a, b))
}
