//! Monthly aggregation and the time bucketer.
//!
//! Every bucket mode is derived from the same monthly aggregates; no mode
//! keeps state of its own, so switching modes back and forth reproduces the
//! same numbers.
//!
//! Pooling years (`All`, `FiveYear`) averages monthly means without
//! weighting them by their review counts. Counts are summed.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::Datelike;

use crate::aggregate::{Aggregate, Field, NO_MINIMUM, Observation, aggregate};
use crate::model::{CanonicalRecord, EntityType};

/// Calendar month of one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthKey {
    pub entity_type: EntityType,
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    /// `None` for undated records.
    pub fn of(record: &CanonicalRecord) -> Option<Self> {
        record.date().map(|d| MonthKey {
            entity_type: record.entity_type(),
            year: d.year(),
            month: d.month(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeBucketMode {
    /// Every year pooled per calendar month.
    #[default]
    #[serde(rename = "all")]
    All,
    /// One series per year.
    #[serde(rename = "individual")]
    Individual,
    /// Years grouped into five-year periods starting on multiples of five.
    #[serde(rename = "5-year")]
    FiveYear,
}

impl TimeBucketMode {
    pub const ALL: [TimeBucketMode; 3] = [
        TimeBucketMode::All,
        TimeBucketMode::Individual,
        TimeBucketMode::FiveYear,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeBucketMode::All => "all",
            TimeBucketMode::Individual => "individual",
            TimeBucketMode::FiveYear => "5-year",
        }
    }
}

impl fmt::Display for TimeBucketMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown time bucket mode `{0}` (expected all, individual or 5-year)")]
pub struct ParseBucketModeError(pub String);

impl FromStr for TimeBucketMode {
    type Err = ParseBucketModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TimeBucketMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseBucketModeError(s.to_string()))
    }
}

/// The time span a bucketed aggregate covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Period {
    All,
    Year(i32),
    /// First year of a five-year span.
    FiveYear(i32),
}

impl Period {
    pub fn label(&self) -> String {
        match self {
            Period::All => "All years".to_string(),
            Period::Year(y) => y.to_string(),
            Period::FiveYear(start) => format!("{}-{}", start, start + 4),
        }
    }
}

fn five_year_start(year: i32) -> i32 {
    year.div_euclid(5) * 5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BucketKey {
    pub entity_type: EntityType,
    pub period: Period,
    pub month: u32,
}

impl BucketKey {
    /// The monthly key behind a per-year bucket.
    pub fn as_month(&self) -> Option<MonthKey> {
        match self.period {
            Period::Year(year) => Some(MonthKey {
                entity_type: self.entity_type,
                year,
                month: self.month,
            }),
            _ => None,
        }
    }
}

/// Groups dated records by `(entity type, year, month)`.
pub fn monthly<R>(records: &[R], fields: &[Field<'_>]) -> Vec<Aggregate<MonthKey>>
where
    R: Observation + Borrow<CanonicalRecord>,
{
    aggregate(
        records,
        |r| MonthKey::of(<R as Borrow<CanonicalRecord>>::borrow(r)),
        fields,
        NO_MINIMUM,
    )
}

/// Re-derives monthly aggregates at the granularity of `mode`.
pub fn bucket(monthly: &[Aggregate<MonthKey>], mode: TimeBucketMode) -> Vec<Aggregate<BucketKey>> {
    match mode {
        TimeBucketMode::Individual => monthly
            .iter()
            .cloned()
            .map(|a| {
                a.map_key(|k| BucketKey {
                    entity_type: k.entity_type,
                    period: Period::Year(k.year),
                    month: k.month,
                })
            })
            .collect(),
        TimeBucketMode::All => rollup(monthly, |_| Period::All),
        TimeBucketMode::FiveYear => rollup(monthly, |year| Period::FiveYear(five_year_start(year))),
    }
}

/// Recovers monthly aggregates from per-year buckets. Other periods are
/// skipped.
pub fn unbucket(buckets: &[Aggregate<BucketKey>]) -> Vec<Aggregate<MonthKey>> {
    buckets
        .iter()
        .filter_map(|a| {
            let key = a.key.as_month()?;
            Some(a.clone().map_key(|_| key))
        })
        .collect()
}

fn rollup(
    monthly: &[Aggregate<MonthKey>],
    period: impl Fn(i32) -> Period,
) -> Vec<Aggregate<BucketKey>> {
    let names: BTreeSet<&str> = monthly
        .iter()
        .flat_map(|a| a.mean.keys().map(String::as_str))
        .collect();
    let fields: Vec<Field<'_>> = names.into_iter().map(Field::new).collect();

    aggregate(
        monthly,
        |a| {
            Some(BucketKey {
                entity_type: a.key.entity_type,
                period: period(a.key.year),
                month: a.key.month,
            })
        },
        &fields,
        NO_MINIMUM,
    )
}
