//! Per-coordinate query pipeline and the parallel batch driver.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crime_radius_dataset::IncidentCollection;
use crime_radius_incident_models::{AggregationResult, Coordinate};
use crime_radius_spatial::{BoundingBox, IncidentIndex, SearchMargins, is_within_radius};
use rayon::prelude::*;

use crate::progress::ProgressCallback;
use crate::tally;

/// Tunables fixed at engine construction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineSettings {
    /// Pre-filter box half-widths.
    pub margins: SearchMargins,
}

/// Counts incidents per category within the search radius of a coordinate.
///
/// Owns the loaded collection and its spatial index. Both are immutable
/// after construction, so a single engine can serve any number of
/// concurrent queries.
pub struct ProximityEngine {
    collection: IncidentCollection,
    index: IncidentIndex,
    settings: EngineSettings,
    warned_unsound: AtomicBool,
}

impl ProximityEngine {
    /// Indexes `collection` and returns an engine ready for queries.
    #[must_use]
    pub fn new(collection: IncidentCollection, settings: EngineSettings) -> Self {
        let index = IncidentIndex::new(Arc::clone(collection.records()));
        Self {
            collection,
            index,
            settings,
            warned_unsound: AtomicBool::new(false),
        }
    }

    /// The collection queries run against.
    #[must_use]
    pub const fn collection(&self) -> &IncidentCollection {
        &self.collection
    }

    /// The settings the engine was built with.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Counts incidents per category strictly within the search radius of
    /// `coordinate`.
    #[must_use]
    pub fn aggregate(&self, coordinate: Coordinate) -> AggregationResult {
        self.check_margins(coordinate);

        let bbox = BoundingBox::around(coordinate, self.settings.margins);
        let mut candidates: u64 = 0;
        let result = tally(
            self.index
                .candidates(&bbox)
                .inspect(|_| candidates += 1)
                .filter(|record| is_within_radius(coordinate, record.coordinate)),
        );

        log::debug!(
            "{coordinate}: {candidates} candidates in box, {} within radius",
            result.total()
        );

        result
    }

    /// Runs [`ProximityEngine::aggregate`] for every `(key, coordinate)`
    /// pair on the rayon pool and returns the results keyed by the
    /// caller-supplied identifier.
    ///
    /// Coordinates are evaluated independently and in no particular order.
    /// If a key appears more than once, the result for its last occurrence
    /// in `queries` is kept.
    pub fn aggregate_batch<K>(
        &self,
        queries: &[(K, Coordinate)],
        progress: &Arc<dyn ProgressCallback>,
    ) -> BTreeMap<K, AggregationResult>
    where
        K: Ord + Clone + Send + Sync,
    {
        log::info!(
            "Aggregating {} coordinates against {} incidents",
            queries.len(),
            self.collection.len()
        );
        progress.set_total(queries.len() as u64);

        let results: Vec<(K, AggregationResult)> = queries
            .par_iter()
            .map(|(key, coordinate)| {
                let result = self.aggregate(*coordinate);
                progress.inc(1);
                (key.clone(), result)
            })
            .collect();

        let unique: BTreeMap<K, AggregationResult> = results.into_iter().collect();
        if unique.len() < queries.len() {
            log::warn!(
                "{} duplicate keys in batch; keeping the last occurrence of each",
                queries.len() - unique.len()
            );
        }

        progress.finish(format!("aggregated {} coordinates", queries.len()));
        unique
    }

    /// Runs [`ProximityEngine::aggregate`] for every coordinate in parallel,
    /// pairing each result with its coordinate in input order.
    #[must_use]
    pub fn aggregate_coordinates(
        &self,
        coordinates: &[Coordinate],
    ) -> Vec<(Coordinate, AggregationResult)> {
        coordinates
            .par_iter()
            .map(|&coordinate| (coordinate, self.aggregate(coordinate)))
            .collect()
    }

    fn check_margins(&self, coordinate: Coordinate) {
        if self.settings.margins.is_sound_at(coordinate.latitude()) {
            return;
        }
        if self.warned_unsound.swap(true, Ordering::Relaxed) {
            log::debug!("Pre-filter margins do not cover the radius at {coordinate}");
        } else {
            log::warn!(
                "Pre-filter margins {:?} do not cover the search radius at latitude {}; \
                 counts may be low. Configure margins for this latitude.",
                self.settings.margins,
                coordinate.latitude()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crime_radius_incident_models::{EXCLUDED_CATEGORY, IncidentRecord};
    use proptest::prelude::*;

    use super::*;
    use crate::progress::null_progress;

    fn coord(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat).unwrap()
    }

    fn engine(records: Vec<IncidentRecord>) -> ProximityEngine {
        ProximityEngine::new(
            IncidentCollection::from_records(records),
            EngineSettings::default(),
        )
    }

    fn theft_scenario() -> ProximityEngine {
        engine(vec![
            IncidentRecord::new(coord(0.0, 0.0), "THEFT"),
            IncidentRecord::new(coord(0.0, 0.000_05), "THEFT"),
            IncidentRecord::new(coord(50.0, 50.0), "THEFT"),
        ])
    }

    /// Records scattered over roughly 3 km around downtown Chicago.
    fn chicago_records() -> Vec<IncidentRecord> {
        let categories = ["THEFT", "BATTERY", "ASSAULT", EXCLUDED_CATEGORY, "ROBBERY"];
        (0..400_u32)
            .map(|i| {
                let t = f64::from(i);
                let lon = -87.63 + (t * 7.3).sin() * 0.02;
                let lat = 41.88 + (t * 3.1).cos() * 0.015;
                let category = categories[i as usize % categories.len()];
                IncidentRecord::new(coord(lon, lat), category)
            })
            .collect()
    }

    #[test]
    fn counts_nearby_thefts() {
        let result = theft_scenario().aggregate(coord(0.0, 0.0));
        assert_eq!(result.count("THEFT"), 2);
        assert_eq!(result.total(), 2);
        assert_eq!(result.by_category().len(), 1);
    }

    #[test]
    fn nothing_nearby_is_an_empty_result() {
        let result = theft_scenario().aggregate(coord(10.0, 10.0));
        assert_eq!(result.total(), 0);
        assert!(result.by_category().is_empty());
    }

    #[test]
    fn empty_collection_is_an_empty_result() {
        let result = engine(Vec::new()).aggregate(coord(-87.63, 41.88));
        assert!(result.is_empty());
    }

    #[test]
    fn excluded_category_never_counted() {
        let engine = engine(vec![
            IncidentRecord::new(coord(-87.63, 41.88), EXCLUDED_CATEGORY),
            IncidentRecord::new(coord(-87.63, 41.88), "THEFT"),
        ]);
        let result = engine.aggregate(coord(-87.63, 41.88));
        assert_eq!(result.count(EXCLUDED_CATEGORY), 0);
        assert_eq!(result.total(), 1);
    }

    #[test]
    fn in_box_but_outside_radius_is_not_counted() {
        // Box corner is about 1.3 km away; the radius is 0.8 km.
        let center = coord(-87.63, 41.88);
        let bbox = BoundingBox::around(center, SearchMargins::CHICAGO);
        let engine = engine(vec![IncidentRecord::new(
            coord(bbox.lon_hi, bbox.lat_hi),
            "THEFT",
        )]);
        assert!(engine.aggregate(center).is_empty());
    }

    #[test]
    fn matches_brute_force_over_whole_collection() {
        let engine = engine(chicago_records());
        for query in [coord(-87.63, 41.88), coord(-87.64, 41.87), coord(-87.615, 41.89)] {
            let expected = tally(
                engine
                    .collection()
                    .iter()
                    .filter(|r| is_within_radius(query, r.coordinate)),
            );
            assert_eq!(engine.aggregate(query), expected);
        }
    }

    #[test]
    fn batch_is_keyed_by_caller_id() {
        let engine = theft_scenario();
        let queries = vec![
            ("Kabul House".to_owned(), coord(0.0, 0.0)),
            ("Far Away".to_owned(), coord(50.0, 50.0)),
            ("Nowhere".to_owned(), coord(-10.0, -10.0)),
        ];
        let results = engine.aggregate_batch(&queries, &null_progress());
        assert_eq!(results.len(), 3);
        assert_eq!(results["Kabul House"].total(), 2);
        assert_eq!(results["Far Away"].total(), 1);
        assert!(results["Nowhere"].is_empty());
    }

    #[test]
    fn batch_matches_sequential_queries() {
        let engine = engine(chicago_records());
        let queries: Vec<(u32, Coordinate)> = (0..50_u32)
            .map(|i| {
                let t = f64::from(i);
                (i, coord(-87.65 + t * 0.001, 41.86 + t * 0.0008))
            })
            .collect();

        let batch = engine.aggregate_batch(&queries, &null_progress());
        for (key, coordinate) in &queries {
            assert_eq!(batch[key], engine.aggregate(*coordinate));
        }
    }

    #[test]
    fn duplicate_keys_keep_last_occurrence() {
        let engine = theft_scenario();
        let queries = vec![(1, coord(0.0, 0.0)), (1, coord(50.0, 50.0))];
        let results = engine.aggregate_batch(&queries, &null_progress());
        assert_eq!(results.len(), 1);
        assert_eq!(results[&1].total(), 1);
    }

    #[test]
    fn coordinate_batch_preserves_input_order() {
        let engine = theft_scenario();
        let coordinates = [coord(50.0, 50.0), coord(0.0, 0.0)];
        let results = engine.aggregate_coordinates(&coordinates);
        assert_eq!(results[0].0, coordinates[0]);
        assert_eq!(results[0].1.total(), 1);
        assert_eq!(results[1].1.total(), 2);
    }

    #[test]
    fn unsound_margins_still_answer() {
        let engine = engine(vec![IncidentRecord::new(coord(10.0, 70.0), "THEFT")]);
        assert_eq!(engine.aggregate(coord(10.0, 70.0)).total(), 1);
        assert_eq!(engine.aggregate(coord(10.0, 70.0)).total(), 1);
    }

    proptest! {
        #[test]
        fn results_are_consistent_and_deterministic(
            lon in -87.66f64..-87.60,
            lat in 41.86f64..41.90,
        ) {
            let engine = engine(chicago_records());
            let query = coord(lon, lat);
            let first = engine.aggregate(query);
            let second = engine.aggregate(query);

            prop_assert_eq!(first.by_category().values().sum::<u64>(), first.total());
            prop_assert_eq!(first.count(EXCLUDED_CATEGORY), 0);
            prop_assert_eq!(first, second);
        }
    }
}
