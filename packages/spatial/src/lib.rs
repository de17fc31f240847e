#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial filtering for radius queries.
//!
//! Builds an R-tree over the loaded incident positions once at startup and
//! answers "which records fall in this box" with an envelope query, then
//! provides the exact haversine radius test for the surviving candidates.

pub mod bbox;
pub mod distance;

use std::sync::Arc;

use crime_radius_incident_models::IncidentRecord;
use rstar::{AABB, RTree, RTreeObject};

pub use bbox::{BoundingBox, InvalidMarginsError, SearchMargins};
pub use distance::{haversine_km, is_within_radius, is_within_radius_km};

/// An incident position stored in the R-tree, pointing back at its record.
struct IndexedPoint {
    position: [f64; 2],
    slot: usize,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// Read-only R-tree over incident positions.
///
/// Constructed once and shared across all queries. Candidate lookups return
/// exactly the records [`BoundingBox::select`] would, without scanning the
/// whole collection.
pub struct IncidentIndex {
    records: Arc<[IncidentRecord]>,
    tree: RTree<IndexedPoint>,
}

impl IncidentIndex {
    /// Bulk-loads an R-tree over the positions of `records`.
    #[must_use]
    pub fn new(records: Arc<[IncidentRecord]>) -> Self {
        let points = records
            .iter()
            .enumerate()
            .map(|(slot, record)| IndexedPoint {
                position: record.coordinate.as_xy(),
                slot,
            })
            .collect();

        let tree = RTree::bulk_load(points);
        log::info!("Indexed {} incidents into spatial index", tree.size());

        Self { records, tree }
    }

    /// Records whose position lies inside `bbox`, edges included.
    ///
    /// Order is unspecified.
    pub fn candidates<'a>(
        &'a self,
        bbox: &BoundingBox,
    ) -> impl Iterator<Item = &'a IncidentRecord> + use<'a> {
        self.tree
            .locate_in_envelope(&bbox.envelope())
            .filter_map(|point| self.records.get(point.slot))
    }

    /// The indexed records in their original order.
    #[must_use]
    pub fn records(&self) -> &[IncidentRecord] {
        &self.records
    }

    /// Number of indexed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
