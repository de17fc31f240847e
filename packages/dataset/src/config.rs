//! Dataset location and column configuration.
//!
//! Deserialized from the `[dataset]` table of the application TOML. Every
//! field has a default, so an empty table (or none at all) yields a config
//! that reads a comma-delimited file with conventional header names.

use std::path::PathBuf;

use crime_radius_incident_models::EXCLUDED_CATEGORY;
use serde::Deserialize;

/// Where the incident table lives and how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Path to the incident table. `None` until set by the config file or
    /// the command line.
    pub path: Option<PathBuf>,
    /// Field delimiter. Only the first byte is used.
    pub delimiter: String,
    /// Records with exactly this category are dropped at load time.
    pub excluded_category: String,
    /// Accepted header names for each canonical column.
    pub columns: ColumnMapping,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: ",".to_owned(),
            excluded_category: EXCLUDED_CATEGORY.to_owned(),
            columns: ColumnMapping::default(),
        }
    }
}

impl DatasetConfig {
    /// Delimiter byte handed to the CSV reader. Falls back to `,` when the
    /// configured delimiter is empty.
    #[must_use]
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

/// Header names accepted for each canonical column, tried in order and
/// compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    /// Header names for the longitude column.
    pub longitude: Vec<String>,
    /// Header names for the latitude column.
    pub latitude: Vec<String>,
    /// Header names for the category column.
    pub category: Vec<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| (*s).to_owned()).collect()
        }

        Self {
            longitude: names(&["longitude", "lon", "lng", "long", "x"]),
            latitude: names(&["latitude", "lat", "y"]),
            category: names(&[
                "type",
                "category",
                "primary type",
                "primary_type",
                "crime_type",
                "offense",
            ]),
        }
    }
}
