//! Exploration session: the joined datasets, the filter broker and the chart
//! series derived from them.
//!
//! Nothing is cached between filter changes. Every [`Explorer::snapshot`]
//! reads the current [`FilterState`] and rebuilds every series from the
//! canonical records. Chart listeners are called after every filter change
//! and after every bucket mode change.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::aggregate::Aggregate;
use crate::charts;
use crate::config::ExplorerConfig;
use crate::dimension::{self, Dimension};
use crate::filter::{FilterBroker, FilterState, SubscriptionId};
use crate::model::{Datasets, EntityType};
use crate::source::{LoadReport, RowSource, load_all};
use crate::timeline::{BucketKey, TimeBucketMode};

/// Every series the views draw, computed from one filter snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSet {
    pub state: FilterState,
    /// Label of the plotted dimension.
    pub dimension: Dimension,
    pub rankings: BTreeMap<EntityType, Vec<Aggregate<String>>>,
    pub recommendation: BTreeMap<String, f64>,
    pub countries: BTreeMap<EntityType, Vec<Aggregate<String>>>,
    pub bucket_mode: TimeBucketMode,
    pub trend: Vec<Aggregate<BucketKey>>,
    pub comparison: Vec<Aggregate<EntityType>>,
    pub coverage: Vec<(Dimension, Vec<EntityType>)>,
}

type ChartListener = Arc<dyn Fn(&ChartSet) + Send + Sync>;

pub struct Explorer {
    datasets: Datasets,
    broker: Arc<FilterBroker>,
    ranking_min_reviews: usize,
    country_min_reviews: usize,
    bucket_mode: Mutex<TimeBucketMode>,
    chart_listeners: Mutex<Vec<(SubscriptionId, ChartListener)>>,
    load_error: Option<String>,
}

impl Explorer {
    pub fn new(datasets: Datasets, config: &ExplorerConfig) -> Self {
        Self {
            datasets,
            broker: Arc::new(FilterBroker::new()),
            ranking_min_reviews: config.ranking_min_reviews,
            country_min_reviews: config.country_min_reviews,
            bucket_mode: Mutex::new(config.bucket_mode),
            chart_listeners: Mutex::new(Vec::new()),
            load_error: None,
        }
    }

    /// Builds the session from a finished ingestion. The first failure, if
    /// any, is kept for display; the rest were already logged.
    pub fn from_report(report: LoadReport, config: &ExplorerConfig) -> Self {
        let load_error = report.first_error().map(ToString::to_string);
        if let Some(message) = &load_error {
            warn!(failed = report.failures.len(), first = %message, "Exploring with partial data");
        }
        Self {
            load_error,
            ..Self::new(report.datasets, config)
        }
    }

    /// Loads the configured datasets and opens a session once all three have
    /// finished.
    pub async fn open(config: &ExplorerConfig) -> Self {
        Self::open_with(Arc::new(config.source()), config).await
    }

    pub async fn open_with(source: Arc<dyn RowSource>, config: &ExplorerConfig) -> Self {
        let report = load_all(source).await;
        info!(records = report.datasets.total_records(), "Explorer ready");
        Self::from_report(report, config)
    }

    pub fn datasets(&self) -> &Datasets {
        &self.datasets
    }

    pub fn broker(&self) -> &Arc<FilterBroker> {
        &self.broker
    }

    /// Number of effective filter changes so far.
    pub fn revision(&self) -> u64 {
        self.broker.revision()
    }

    /// The ingestion error to show, if a dataset failed.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Distinct entity names of one dataset, for selection lists.
    pub fn entity_names(&self, entity_type: EntityType) -> BTreeSet<String> {
        self.datasets
            .get(entity_type)
            .iter()
            .map(|r| r.entity_name().to_string())
            .collect()
    }

    pub fn bucket_mode(&self) -> TimeBucketMode {
        *self.bucket_mode.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Switches the trend granularity and redraws for chart listeners if
    /// the mode changed.
    pub fn set_bucket_mode(&self, mode: TimeBucketMode) {
        let changed = {
            let mut current = self.bucket_mode.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *current, mode) != mode
        };
        if !changed {
            return;
        }

        let listeners: Vec<ChartListener> = self
            .lock_chart_listeners()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        if listeners.is_empty() {
            return;
        }
        let charts = self.snapshot();
        for listener in listeners {
            listener(&charts);
        }
    }

    /// Charts for the broker's current state.
    pub fn snapshot(&self) -> ChartSet {
        let state = self.broker.current();
        self.charts_for(&state)
    }

    /// Charts for an arbitrary filter state.
    pub fn charts_for(&self, state: &FilterState) -> ChartSet {
        let bucket_mode = self.bucket_mode();

        let rankings = EntityType::ALL
            .into_iter()
            .map(|t| {
                let series = charts::entity_ranking(
                    self.datasets.get(t),
                    t,
                    state,
                    self.ranking_min_reviews,
                );
                (t, series)
            })
            .collect();

        let countries = EntityType::ALL
            .into_iter()
            .map(|t| {
                let series = charts::country_breakdown(
                    self.datasets.get(t),
                    t,
                    state,
                    self.country_min_reviews,
                );
                (t, series)
            })
            .collect();

        ChartSet {
            state: state.clone(),
            dimension: state.effective_dimension().dimension(),
            rankings,
            recommendation: charts::recommendation_share(
                &self.datasets.airline,
                state,
                self.ranking_min_reviews,
            ),
            countries,
            bucket_mode,
            trend: charts::bucketed_trend(&self.datasets, state, bucket_mode),
            comparison: charts::entity_comparison(&self.datasets, state),
            coverage: dimension::coverage(),
        }
    }

    /// Calls `f` with freshly computed charts after every filter or bucket
    /// mode change.
    pub fn on_change<F>(self: &Arc<Self>, f: F) -> SubscriptionId
    where
        F: Fn(&ChartSet) + Send + Sync + 'static,
    {
        let listener: ChartListener = Arc::new(f);
        let session = Arc::downgrade(self);
        let on_filter = listener.clone();
        let id = self.broker.subscribe(move |state| {
            if let Some(session) = session.upgrade() {
                on_filter(&session.charts_for(state));
            }
        });
        self.lock_chart_listeners().push((id, listener));
        id
    }

    /// Stops a listener registered with [`Explorer::on_change`].
    pub fn remove_listener(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock_chart_listeners();
        listeners.retain(|(lid, _)| *lid != id);
        self.broker.unsubscribe(id)
    }

    fn lock_chart_listeners(&self) -> MutexGuard<'_, Vec<(SubscriptionId, ChartListener)>> {
        self.chart_listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::DimensionKey;
    use crate::model::CanonicalRecord;
    use chrono::NaiveDate;

    fn record(t: EntityType, name: &str, overall: f64) -> CanonicalRecord {
        CanonicalRecord::new(t, name)
            .unwrap()
            .with_rating("overall", overall)
            .with_date(NaiveDate::from_ymd_opt(2014, 6, 1))
    }

    fn explorer() -> Explorer {
        let datasets = Datasets {
            airline: vec![
                record(EntityType::Airline, "A", 8.0),
                record(EntityType::Airline, "B", 4.0),
            ],
            airport: vec![record(EntityType::Airport, "LHR", 6.0)],
            lounge: vec![],
        };
        let config = ExplorerConfig {
            ranking_min_reviews: 1,
            ..ExplorerConfig::default()
        };
        Explorer::new(datasets, &config)
    }

    #[test]
    fn test_snapshot_reflects_latest_state() {
        let ex = explorer();
        let before = ex.snapshot();
        assert_eq!(before.dimension.key, DimensionKey::Overall);
        assert_eq!(before.rankings[&EntityType::Airline].len(), 2);

        ex.broker().set_selected_entities(BTreeSet::from(["B".to_string()]));
        let after = ex.snapshot();
        assert_eq!(after.rankings[&EntityType::Airline].len(), 1);
        assert_eq!(after.rankings[&EntityType::Airline][0].key, "B");
        assert_eq!(after.rankings[&EntityType::Airport].len(), 1);
    }

    #[test]
    fn test_bucket_mode_switch() {
        let ex = explorer();
        assert_eq!(ex.snapshot().bucket_mode, TimeBucketMode::All);

        ex.set_bucket_mode(TimeBucketMode::Individual);
        let charts = ex.snapshot();
        assert_eq!(charts.bucket_mode, TimeBucketMode::Individual);
        assert!(charts.trend.iter().all(|a| a.key.period.label() == "2014"));
    }

    #[test]
    fn test_on_change_recomputes() {
        let ex = Arc::new(explorer());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        ex.on_change(move |charts| {
            sink.lock().unwrap().push(charts.dimension.key);
        });

        ex.broker().set_active_dimension(Some(DimensionKey::Food));
        ex.broker().set_active_dimension(Some(DimensionKey::Food));
        assert_eq!(ex.revision(), 2);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![DimensionKey::Food, DimensionKey::Overall]
        );
    }

    #[test]
    fn test_bucket_mode_change_redraws_listeners() {
        let ex = Arc::new(explorer());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = ex.on_change(move |charts| {
            sink.lock().unwrap().push(charts.bucket_mode);
        });

        ex.set_bucket_mode(TimeBucketMode::FiveYear);
        ex.set_bucket_mode(TimeBucketMode::FiveYear);
        ex.broker().set_active_dimension(Some(DimensionKey::Food));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![TimeBucketMode::FiveYear, TimeBucketMode::FiveYear]
        );

        assert!(ex.remove_listener(id));
        ex.set_bucket_mode(TimeBucketMode::All);
        ex.broker().set_active_dimension(None);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_entity_names() {
        let ex = explorer();
        assert_eq!(
            ex.entity_names(EntityType::Airline),
            BTreeSet::from(["A".to_string(), "B".to_string()])
        );
        assert!(ex.entity_names(EntityType::Lounge).is_empty());
    }

    #[test]
    fn test_charts_serialize() {
        let json = serde_json::to_value(explorer().snapshot()).unwrap();
        assert_eq!(json["dimension"]["label"], "Overall");
        assert!(json["rankings"]["airline"].is_array());
    }
}
