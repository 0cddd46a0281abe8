//! Dataset ingestion.
//!
//! The three review files are fetched concurrently, each exactly once.
//! Normalization starts per dataset as soon as its rows arrive; the session
//! can only be built after all three tasks have finished, whether they
//! succeeded or not. A failed dataset stays empty and does not hold back the
//! others.

mod http;
mod tabular;

pub use http::{HttpClient, ReqwestClient, fetch_dataset};
pub use tabular::{parse_rows, read_file};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info};

use crate::model::{Datasets, EntityType, RawRow};
use crate::normalize::normalize;

/// Transport for raw review rows.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_rows(&self, entity_type: EntityType) -> Result<Vec<RawRow>>;
}

/// Where one dataset lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetLocation {
    File(PathBuf),
    Url(String),
}

impl DatasetLocation {
    /// `http://` and `https://` locations are URLs, anything else a path.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            DatasetLocation::Url(raw.to_string())
        } else {
            DatasetLocation::File(PathBuf::from(raw))
        }
    }
}

impl fmt::Display for DatasetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetLocation::File(p) => write!(f, "{}", p.display()),
            DatasetLocation::Url(u) => f.write_str(u),
        }
    }
}

/// Reads each dataset from a local file or over HTTP.
pub struct LocationSource<C = ReqwestClient> {
    locations: BTreeMap<EntityType, DatasetLocation>,
    client: C,
}

impl LocationSource<ReqwestClient> {
    pub fn new(locations: BTreeMap<EntityType, DatasetLocation>) -> Self {
        Self::with_client(locations, ReqwestClient::new())
    }
}

impl<C: HttpClient> LocationSource<C> {
    pub fn with_client(locations: BTreeMap<EntityType, DatasetLocation>, client: C) -> Self {
        Self { locations, client }
    }
}

#[async_trait]
impl<C: HttpClient> RowSource for LocationSource<C> {
    async fn fetch_rows(&self, entity_type: EntityType) -> Result<Vec<RawRow>> {
        let location = self
            .locations
            .get(&entity_type)
            .with_context(|| format!("no location configured for the {entity_type} dataset"))?;

        match location {
            DatasetLocation::File(path) => {
                let path = path.clone();
                tokio::task::spawn_blocking(move || read_file(&path)).await?
            }
            DatasetLocation::Url(url) => {
                let bytes = fetch_dataset(&self.client, url).await?;
                parse_rows(bytes.as_slice()).with_context(|| format!("parsing {url}"))
            }
        }
    }
}

/// A dataset that could not be loaded.
#[derive(Debug)]
pub struct LoadFailure {
    pub entity_type: EntityType,
    pub error: anyhow::Error,
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load {} reviews: {:#}", self.entity_type, self.error)
    }
}

/// Outcome of the ingestion join.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub datasets: Datasets,
    /// Datasets that loaded, in completion order.
    pub loaded: Vec<EntityType>,
    /// Datasets that failed, in completion order.
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    /// The failure to surface to the user: the first one to happen.
    pub fn first_error(&self) -> Option<&LoadFailure> {
        self.failures.first()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// How many datasets have finished, loaded or not.
    pub fn finished(&self) -> usize {
        self.loaded.len() + self.failures.len()
    }
}

/// Fetches and normalizes all three datasets concurrently and waits for
/// every one of them to finish.
#[tracing::instrument(skip(source))]
pub async fn load_all(source: Arc<dyn RowSource>) -> LoadReport {
    let mut tasks = JoinSet::new();
    let mut task_types = HashMap::new();

    for entity_type in EntityType::ALL {
        let source = source.clone();
        let span = tracing::info_span!("load_dataset", entity_type = %entity_type);
        let handle = tasks.spawn(
            async move {
                let rows = source.fetch_rows(entity_type).await?;
                let records = normalize(&rows, entity_type);
                info!(rows = rows.len(), records = records.len(), "Dataset loaded");
                Ok::<_, anyhow::Error>(records)
            }
            .instrument(span),
        );
        task_types.insert(handle.id(), entity_type);
    }

    let mut report = LoadReport::default();

    while let Some(joined) = tasks.join_next_with_id().await {
        let (entity_type, outcome) = match joined {
            Ok((id, outcome)) => (task_types[&id], outcome),
            Err(e) => (task_types[&e.id()], Err(anyhow!("load task aborted: {e}"))),
        };

        match outcome {
            Ok(records) => {
                report.datasets.set(entity_type, records);
                report.loaded.push(entity_type);
            }
            Err(error) => {
                let failure = LoadFailure { entity_type, error };
                error!(entity_type = %entity_type, error = %failure, "Dataset failed to load");
                report.failures.push(failure);
            }
        }
    }

    info!(
        loaded = report.loaded.len(),
        failed = report.failures.len(),
        records = report.datasets.total_records(),
        "Ingestion finished"
    );
    report
}
