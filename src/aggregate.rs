//! Generic group-and-reduce engine.
//!
//! Groups observations by a caller-supplied key and reduces each group to a
//! total count plus the mean of each requested field. A mean is `None` when
//! the group holds no value for that field; it is never reported as zero.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::CanonicalRecord;
use crate::stats::mean;

/// Passing this as `min_count` keeps every group.
pub const NO_MINIMUM: usize = 1;

/// Anything the aggregator can reduce.
pub trait Observation {
    /// How many reviews this observation stands for. Summed into
    /// [`Aggregate::count`].
    fn weight(&self) -> usize {
        1
    }

    /// Value of `field`, or `None` when absent.
    fn value(&self, field: &str) -> Option<f64>;
}

impl Observation for CanonicalRecord {
    fn value(&self, field: &str) -> Option<f64> {
        self.rating(field)
    }
}

impl<T: Observation + ?Sized> Observation for &T {
    fn weight(&self) -> usize {
        (**self).weight()
    }

    fn value(&self, field: &str) -> Option<f64> {
        (**self).value(field)
    }
}

/// Re-aggregating aggregates gives a mean of means: each prior group counts
/// once, whatever its size, while counts are summed.
impl<K> Observation for Aggregate<K> {
    fn weight(&self) -> usize {
        self.count
    }

    fn value(&self, field: &str) -> Option<f64> {
        self.mean_of(field)
    }
}

/// A field to average. `name` labels the output; `source` is the field read
/// from each observation. A field without a source is not applicable and
/// always reduces to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    pub name: &'a str,
    pub source: Option<&'a str>,
}

impl<'a> Field<'a> {
    pub const fn new(name: &'a str) -> Self {
        Self { name, source: Some(name) }
    }

    pub const fn alias(name: &'a str, source: Option<&'a str>) -> Self {
        Self { name, source }
    }
}

/// One group's summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate<K> {
    pub key: K,
    pub count: usize,
    pub mean: BTreeMap<String, Option<f64>>,
}

impl<K> Aggregate<K> {
    pub fn mean_of(&self, field: &str) -> Option<f64> {
        self.mean.get(field).copied().flatten()
    }

    pub fn has_data(&self, field: &str) -> bool {
        self.mean_of(field).is_some()
    }

    pub fn map_key<J>(self, f: impl FnOnce(K) -> J) -> Aggregate<J> {
        Aggregate {
            key: f(self.key),
            count: self.count,
            mean: self.mean,
        }
    }
}

/// Groups `items` by `key_fn` and reduces each group.
///
/// Items whose key is `None` are left out. Groups whose summed weight is
/// below `min_count` are dropped. Output is ordered by key; equal input
/// multisets always give identical output regardless of input order.
pub fn aggregate<T, K, F>(
    items: &[T],
    key_fn: F,
    fields: &[Field<'_>],
    min_count: usize,
) -> Vec<Aggregate<K>>
where
    T: Observation,
    K: Ord,
    F: Fn(&T) -> Option<K>,
{
    let mut groups: BTreeMap<K, Vec<&T>> = BTreeMap::new();
    for item in items {
        if let Some(key) = key_fn(item) {
            groups.entry(key).or_default().push(item);
        }
    }

    groups
        .into_iter()
        .filter_map(|(key, members)| {
            let count: usize = members.iter().map(|m| m.weight()).sum();
            if count < min_count {
                return None;
            }

            let means = fields
                .iter()
                .map(|field| {
                    let value = field.source.and_then(|source| {
                        let values: Vec<f64> =
                            members.iter().filter_map(|m| m.value(source)).collect();
                        mean(&values)
                    });
                    (field.name.to_string(), value)
                })
                .collect();

            Some(Aggregate {
                key,
                count,
                mean: means,
            })
        })
        .collect()
}
