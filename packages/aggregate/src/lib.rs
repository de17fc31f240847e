#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Radius aggregation over a loaded incident collection.
//!
//! [`ProximityEngine`] composes the bounding-box pre-filter, the haversine
//! radius test, and [`tally`] into one query per coordinate, and runs
//! batches of queries in parallel over the shared, read-only collection.

pub mod engine;
pub mod progress;

use crime_radius_incident_models::{AggregationResult, IncidentRecord};

pub use engine::{EngineSettings, ProximityEngine};
pub use progress::{NullProgress, ProgressCallback, null_progress};

/// Counts `records` per category.
///
/// An empty input yields an empty mapping with a total of 0.
#[must_use]
pub fn tally<'a>(records: impl IntoIterator<Item = &'a IncidentRecord>) -> AggregationResult {
    records.into_iter().map(|r| &*r.category).collect()
}
