//! Application config file.
//!
//! ```toml
//! [dataset]
//! path = "data/crimes_type.csv"
//! excluded_category = "NON-CRIMINAL"
//!
//! [search]
//! margins = "chicago"        # or { latitude = 47.6 }
//!                            # or { longitude_deg = 0.012, latitude_deg = 0.009 }
//! ```

use std::path::Path;

use crime_radius_dataset::DatasetConfig;
use crime_radius_spatial::SearchMargins;
use serde::Deserialize;

use crate::CliError;

/// Top-level config file contents.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Incident table location and shape.
    pub dataset: DatasetConfig,
    /// Pre-filter settings.
    pub search: SearchConfig,
}

impl AppConfig {
    /// Reads the config at `path`, or returns the defaults when no path is
    /// given.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::ReadConfig`] if the file cannot be read and
    /// [`CliError::ParseConfig`] if it is not valid config TOML.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let config = parse_config(&text).map_err(|source| CliError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!("Loaded config from {}: {config:?}", path.display());
        Ok(config)
    }
}

/// Parses config TOML.
///
/// # Errors
///
/// Returns the TOML error if `text` does not describe an [`AppConfig`].
pub fn parse_config(text: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(text)
}

/// `[search]` table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// How the pre-filter box margins are chosen.
    pub margins: MarginsSetting,
}

/// Which pre-filter margins to use.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MarginsSetting {
    /// A named deployment preset.
    Named(NamedMargins),
    /// Margins derived for a deployment latitude.
    ForLatitude {
        /// Latitude the queries are expected near.
        latitude: f64,
    },
    /// Explicit half-widths in degrees.
    Explicit(SearchMargins),
}

impl Default for MarginsSetting {
    fn default() -> Self {
        Self::Named(NamedMargins::Chicago)
    }
}

impl MarginsSetting {
    /// The concrete margins this setting selects.
    #[must_use]
    pub fn resolve(&self) -> SearchMargins {
        match self {
            Self::Named(NamedMargins::Chicago) => SearchMargins::CHICAGO,
            Self::ForLatitude { latitude } => SearchMargins::for_latitude(*latitude),
            Self::Explicit(margins) => *margins,
        }
    }
}

/// Named margin presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedMargins {
    /// [`SearchMargins::CHICAGO`].
    Chicago,
}
