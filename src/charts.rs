//! Series builders for the linked charts.
//!
//! Each builder reads a [`FilterState`] snapshot, keeps the records the
//! selection admits, resolves the active dimension per entity type and
//! aggregates. Means are labelled with the dimension key (`overall` when no
//! dimension is active), so every chart reads the same field name whatever
//! the entity type.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::aggregate::{Aggregate, Field, NO_MINIMUM, aggregate};
use crate::dimension;
use crate::filter::FilterState;
use crate::model::{CanonicalRecord, Datasets, EntityType};
use crate::stats::ratio;
use crate::timeline::{self, BucketKey, MonthKey, TimeBucketMode};

fn admitted<'a>(
    records: &'a [CanonicalRecord],
    entity_type: EntityType,
    state: &FilterState,
) -> Vec<&'a CanonicalRecord> {
    records
        .iter()
        .filter(|r| r.entity_type() == entity_type && state.admits(r))
        .collect()
}

/// Orders by `field` descending; groups without data go last, ties by key.
pub fn rank_desc<K: Ord>(series: &mut [Aggregate<K>], field: &str) {
    series.sort_by(|a, b| match (a.mean_of(field), b.mean_of(field)) {
        (Some(x), Some(y)) => y.total_cmp(&x).then_with(|| a.key.cmp(&b.key)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.key.cmp(&b.key),
    });
}

/// Per-entity scores of the active dimension, best first. Entities with
/// fewer than `min_reviews` reviews are left out.
pub fn entity_ranking(
    records: &[CanonicalRecord],
    entity_type: EntityType,
    state: &FilterState,
    min_reviews: usize,
) -> Vec<Aggregate<String>> {
    let field = dimension::field_for(state.active_dimension(), entity_type);
    let rows = admitted(records, entity_type, state);

    let mut series = aggregate(
        &rows,
        |r| Some(r.entity_name().to_string()),
        &[field],
        min_reviews,
    );
    rank_desc(&mut series, field.name);
    series
}

/// Share of reviews recommending each airline, over reviews that state it.
pub fn recommendation_share(
    records: &[CanonicalRecord],
    state: &FilterState,
    min_reviews: usize,
) -> BTreeMap<String, f64> {
    let mut tally: BTreeMap<&str, (usize, usize, usize)> = BTreeMap::new();
    for r in admitted(records, EntityType::Airline, state) {
        let entry = tally.entry(r.entity_name()).or_default();
        entry.0 += 1;
        match r.recommended() {
            Some(true) => {
                entry.1 += 1;
                entry.2 += 1;
            }
            Some(false) => entry.2 += 1,
            None => {}
        }
    }

    tally
        .into_iter()
        .filter(|(_, (reviews, _, _))| *reviews >= min_reviews)
        .filter_map(|(name, (_, yes, answered))| Some((name.to_string(), ratio(yes, answered)?)))
        .collect()
}

/// Scores of the active dimension by reviewer country.
pub fn country_breakdown(
    records: &[CanonicalRecord],
    entity_type: EntityType,
    state: &FilterState,
    min_reviews: usize,
) -> Vec<Aggregate<String>> {
    let field = dimension::field_for(state.active_dimension(), entity_type);
    let rows = admitted(records, entity_type, state);

    aggregate(&rows, |r| r.country().map(str::to_string), &[field], min_reviews)
}

/// Monthly scores of the active dimension for all three entity types.
pub fn monthly_trend(datasets: &Datasets, state: &FilterState) -> Vec<Aggregate<MonthKey>> {
    datasets
        .iter()
        .flat_map(|(entity_type, records)| {
            let field = dimension::field_for(state.active_dimension(), entity_type);
            let rows = admitted(records, entity_type, state);
            timeline::monthly(&rows, &[field])
        })
        .collect()
}

/// [`monthly_trend`] at the granularity of `mode`.
pub fn bucketed_trend(
    datasets: &Datasets,
    state: &FilterState,
    mode: TimeBucketMode,
) -> Vec<Aggregate<BucketKey>> {
    timeline::bucket(&monthly_trend(datasets, state), mode)
}

/// One aggregate per entity type for the active dimension. Types the
/// dimension does not apply to, or without any records, report `None`.
pub fn entity_comparison(datasets: &Datasets, state: &FilterState) -> Vec<Aggregate<EntityType>> {
    datasets
        .iter()
        .map(|(entity_type, records)| {
            let field = dimension::field_for(state.active_dimension(), entity_type);
            let rows = admitted(records, entity_type, state);
            aggregate(&rows, |_| Some(entity_type), &[field], NO_MINIMUM)
                .pop()
                .unwrap_or_else(|| empty(entity_type, field))
        })
        .collect()
}

fn empty<K>(key: K, field: Field<'_>) -> Aggregate<K> {
    Aggregate {
        key,
        count: 0,
        mean: BTreeMap::from([(field.name.to_string(), None)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::DimensionKey;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn airline(name: &str, overall: f64, seat: Option<f64>, rec: Option<bool>) -> CanonicalRecord {
        let r = CanonicalRecord::new(EntityType::Airline, name)
            .unwrap()
            .with_rating("overall", overall)
            .with_recommended(rec)
            .with_country(Some("UK".to_string()))
            .with_date(NaiveDate::from_ymd_opt(2015, 1, 10));
        match seat {
            Some(v) => r.with_rating("seat_comfort", v),
            None => r,
        }
    }

    fn lounge(name: &str, overall: f64, cleanliness: f64) -> CanonicalRecord {
        CanonicalRecord::new(EntityType::Lounge, name)
            .unwrap()
            .with_rating("overall", overall)
            .with_rating("cleanliness", cleanliness)
            .with_date(NaiveDate::from_ymd_opt(2016, 3, 1))
    }

    fn datasets() -> Datasets {
        Datasets {
            airline: vec![
                airline("ExampleAir", 8.0, Some(8.0), Some(true)),
                airline("ExampleAir", 6.0, Some(10.0), Some(false)),
                airline("ExampleAir", 4.0, None, None),
                airline("OtherAir", 9.0, Some(2.0), Some(true)),
            ],
            airport: vec![],
            lounge: vec![lounge("Sky", 6.0, 8.0), lounge("Sky", 8.0, 4.0)],
        }
    }

    #[test]
    fn test_ranking_uses_overall_without_dimension() {
        let ds = datasets();
        let out = entity_ranking(&ds.airline, EntityType::Airline, &FilterState::default(), 1);

        assert_eq!(out[0].key, "OtherAir");
        assert_eq!(out[0].mean_of("overall"), Some(9.0));
        assert_eq!(out[1].key, "ExampleAir");
        assert_eq!(out[1].count, 3);
        assert_eq!(out[1].mean_of("overall"), Some(6.0));
    }

    #[test]
    fn test_ranking_follows_active_dimension() {
        let ds = datasets();
        let state = FilterState::new(Some(DimensionKey::Comfort), BTreeSet::new());
        let out = entity_ranking(&ds.airline, EntityType::Airline, &state, 1);

        assert_eq!(out[0].key, "ExampleAir");
        assert_eq!(out[0].mean_of("comfort"), Some(9.0));
        assert_eq!(out[1].mean_of("comfort"), Some(2.0));
    }

    #[test]
    fn test_ranking_threshold() {
        let ds = datasets();
        let out = entity_ranking(&ds.airline, EntityType::Airline, &FilterState::default(), 2);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "ExampleAir");
    }

    #[test]
    fn test_not_applicable_dimension_gives_null_not_error() {
        let ds = datasets();
        let state = FilterState::new(Some(DimensionKey::Cleanliness), BTreeSet::new());
        let out = entity_ranking(&ds.airline, EntityType::Airline, &state, 1);

        assert_eq!(out.len(), 2);
        for a in &out {
            assert_eq!(a.mean.get("cleanliness"), Some(&None));
        }
    }

    #[test]
    fn test_null_scores_rank_last() {
        let mut series = vec![
            empty("a".to_string(), Field::new("x")),
            Aggregate {
                key: "b".to_string(),
                count: 1,
                mean: BTreeMap::from([("x".to_string(), Some(1.0))]),
            },
        ];
        rank_desc(&mut series, "x");
        assert_eq!(series[0].key, "b");
    }

    #[test]
    fn test_selection_filters_airlines() {
        let ds = datasets();
        let state = FilterState::new(None, BTreeSet::from(["OtherAir".to_string()]));
        let out = entity_ranking(&ds.airline, EntityType::Airline, &state, 1);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "OtherAir");
    }

    #[test]
    fn test_recommendation_share() {
        let ds = datasets();
        let share = recommendation_share(&ds.airline, &FilterState::default(), 1);
        assert_eq!(share.get("ExampleAir"), Some(&0.5));
        assert_eq!(share.get("OtherAir"), Some(&1.0));
    }

    #[test]
    fn test_country_breakdown() {
        let ds = datasets();
        let out = country_breakdown(&ds.airline, EntityType::Airline, &FilterState::default(), 1);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "UK");
        assert_eq!(out[0].count, 4);
        assert_eq!(out[0].mean_of("overall"), Some(6.75));
    }

    #[test]
    fn test_comparison_covers_every_entity_type() {
        let ds = datasets();
        let state = FilterState::new(Some(DimensionKey::Cleanliness), BTreeSet::new());
        let out = entity_comparison(&ds, &state);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].key, EntityType::Airline);
        assert_eq!(out[0].count, 4);
        assert!(!out[0].has_data("cleanliness"));
        assert_eq!(out[1].key, EntityType::Airport);
        assert_eq!(out[1].count, 0);
        assert!(!out[1].has_data("cleanliness"));
        assert_eq!(out[2].mean_of("cleanliness"), Some(6.0));
    }

    #[test]
    fn test_monthly_trend_labels_means_by_dimension() {
        let ds = datasets();
        let state = FilterState::new(Some(DimensionKey::Comfort), BTreeSet::new());
        let out = monthly_trend(&ds, &state);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].key.entity_type, EntityType::Airline);
        assert_eq!(out[0].mean_of("comfort"), Some(20.0 / 3.0));
        assert_eq!(out[1].key.entity_type, EntityType::Lounge);
        assert_eq!(out[1].mean.get("comfort"), Some(&None));
    }

    #[test]
    fn test_bucketed_trend() {
        let ds = datasets();
        let out = bucketed_trend(&ds, &FilterState::default(), TimeBucketMode::FiveYear);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].key.period.label(), "2015-2019");
    }
}
