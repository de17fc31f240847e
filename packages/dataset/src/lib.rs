#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident dataset loading.
//!
//! Parses the raw incident table (longitude, latitude, category) into typed
//! [`IncidentRecord`]s, drops every record of the excluded category, and
//! exposes the result as an [`IncidentCollection`] that is read-only for
//! the rest of the process.

pub mod config;
pub mod loader;

use std::path::PathBuf;
use std::sync::Arc;

use crime_radius_incident_models::{AggregationResult, EXCLUDED_CATEGORY, IncidentRecord};

pub use config::{ColumnMapping, DatasetConfig};
pub use loader::{load_path, load_reader};

/// The raw table does not have the shape the loader expects.
#[derive(Debug, thiserror::Error)]
pub enum DatasetFormatError {
    /// The header row does not name the required columns and the table is
    /// not a plain three-column table either.
    #[error("dataset is missing required column(s): {}", .missing.join(", "))]
    MissingColumns {
        /// Canonical names of the columns that could not be resolved.
        missing: Vec<&'static str>,
    },

    /// A data row has a different number of fields than the header.
    #[error("line {line}: expected {expected} fields, found {found}")]
    Arity {
        /// 1-based line number in the source.
        line: u64,
        /// Number of header columns.
        expected: usize,
        /// Number of fields in the row.
        found: usize,
    },

    /// A coordinate field is present but is not a number.
    #[error("line {line}: {column} value '{value}' is not a number")]
    InvalidNumber {
        /// 1-based line number in the source.
        line: u64,
        /// Canonical column name (`longitude` or `latitude`).
        column: &'static str,
        /// The offending raw value.
        value: String,
    },

    /// The delimited text itself could not be parsed.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors from loading a dataset off disk.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No dataset path was configured.
    #[error("no dataset path configured")]
    NoPath,

    /// The dataset file could not be opened.
    #[error("failed to open dataset {path}: {source}", path = .path.display())]
    Io {
        /// Path that was being opened.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file was readable but malformed.
    #[error(transparent)]
    Format(#[from] DatasetFormatError),
}

/// Immutable, cheaply cloneable collection of loaded incidents.
///
/// Never contains a record of the excluded category. Clones share the same
/// backing slice, so one collection can be handed to any number of
/// concurrent readers.
#[derive(Debug, Clone)]
pub struct IncidentCollection {
    records: Arc<[IncidentRecord]>,
}

impl IncidentCollection {
    /// Builds a collection, dropping records labelled [`EXCLUDED_CATEGORY`].
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = IncidentRecord>) -> Self {
        Self::with_exclusion(records, EXCLUDED_CATEGORY)
    }

    /// Builds a collection, dropping records whose category equals
    /// `excluded_category` exactly.
    #[must_use]
    pub fn with_exclusion(
        records: impl IntoIterator<Item = IncidentRecord>,
        excluded_category: &str,
    ) -> Self {
        Self {
            records: records
                .into_iter()
                .filter(|r| &*r.category != excluded_category)
                .collect(),
        }
    }

    /// Shared handle to the backing records.
    #[must_use]
    pub const fn records(&self) -> &Arc<[IncidentRecord]> {
        &self.records
    }

    /// Number of loaded records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates the loaded records in source order.
    pub fn iter(&self) -> std::slice::Iter<'_, IncidentRecord> {
        self.records.iter()
    }

    /// Per-category totals over the whole collection.
    #[must_use]
    pub fn category_counts(&self) -> AggregationResult {
        self.records.iter().map(|r| &*r.category).collect()
    }
}

impl<'a> IntoIterator for &'a IncidentCollection {
    type Item = &'a IncidentRecord;
    type IntoIter = std::slice::Iter<'a, IncidentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
