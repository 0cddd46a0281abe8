use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::model::EntityType;
use crate::source::{DatasetLocation, LocationSource};
use crate::timeline::TimeBucketMode;

/// Session settings, stored as JSON:
///
/// ```json
/// {
///   "sources": {
///     "airline": "data/airline.csv",
///     "airport": "data/airport.csv",
///     "lounge": "https://example.org/lounge.csv"
///   },
///   "ranking_min_reviews": 10,
///   "bucket_mode": "5-year",
///   "logging": { "level": "info,review_explorer=debug", "json_file": "logs/explorer.log" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExplorerConfig {
    /// File path or http(s) URL per dataset.
    pub sources: BTreeMap<EntityType, String>,
    /// Reviews an entity needs before it is ranked.
    pub ranking_min_reviews: usize,
    /// Reviews a country needs before it is charted.
    pub country_min_reviews: usize,
    /// Initial time bucket mode of the trend chart.
    pub bucket_mode: TimeBucketMode,
    pub logging: LoggingConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            sources: BTreeMap::new(),
            ranking_min_reviews: 10,
            country_min_reviews: 1,
            bucket_mode: TimeBucketMode::All,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directives for stderr, e.g. `"info,review_explorer=debug"`.
    pub level: String,
    /// Daily-rolling JSON log file, if any.
    pub json_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_file: None,
        }
    }
}

impl ExplorerConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn locations(&self) -> BTreeMap<EntityType, DatasetLocation> {
        self.sources
            .iter()
            .map(|(t, raw)| (*t, DatasetLocation::parse(raw)))
            .collect()
    }

    /// A row source reading the configured locations.
    pub fn source(&self) -> LocationSource {
        LocationSource::new(self.locations())
    }
}
