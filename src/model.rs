//! Core data types shared by every stage of the pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// One parsed row as handed over by a [`crate::source::RowSource`]:
/// CSV header -> raw cell text.
pub type RawRow = HashMap<String, String>;

/// The three review categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Airline,
    Airport,
    Lounge,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [EntityType::Airline, EntityType::Airport, EntityType::Lounge];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Airline => "airline",
            EntityType::Airport => "airport",
            EntityType::Lounge => "lounge",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity type `{0}` (expected airline, airport or lounge)")]
pub struct ParseEntityTypeError(pub String);

impl FromStr for EntityType {
    type Err = ParseEntityTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "airline" => Ok(EntityType::Airline),
            "airport" => Ok(EntityType::Airport),
            "lounge" => Ok(EntityType::Lounge),
            _ => Err(ParseEntityTypeError(s.to_string())),
        }
    }
}

/// A review row after normalization. Every rating is on the 0–10 scale.
///
/// Only obtainable through [`CanonicalRecord::new`] (or the normalizer), so a
/// record without an entity name cannot exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    entity_type: EntityType,
    entity_name: String,
    date: Option<NaiveDate>,
    country: Option<String>,
    ratings: BTreeMap<&'static str, f64>,
    recommended: Option<bool>,
}

impl CanonicalRecord {
    /// Returns `None` when `entity_name` is blank.
    pub fn new(entity_type: EntityType, entity_name: impl Into<String>) -> Option<Self> {
        let entity_name = entity_name.into().trim().to_string();
        if entity_name.is_empty() {
            return None;
        }
        Some(Self {
            entity_type,
            entity_name,
            date: None,
            country: None,
            ratings: BTreeMap::new(),
            recommended: None,
        })
    }

    /// Sets a canonical (already rescaled) rating. Values outside `[0, 10]`
    /// or non-finite values leave the field absent.
    pub fn with_rating(mut self, field: &'static str, value: f64) -> Self {
        if value.is_finite() && (0.0..=10.0).contains(&value) {
            self.ratings.insert(field, value);
        }
        self
    }

    pub fn with_date(mut self, date: Option<NaiveDate>) -> Self {
        self.date = date;
        self
    }

    pub fn with_country(mut self, country: Option<String>) -> Self {
        self.country = country.filter(|c| !c.trim().is_empty());
        self
    }

    /// Ignored for non-airline records.
    pub fn with_recommended(mut self, recommended: Option<bool>) -> Self {
        self.recommended = match self.entity_type {
            EntityType::Airline => recommended,
            _ => None,
        };
        self
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn rating(&self, field: &str) -> Option<f64> {
        self.ratings.get(field).copied()
    }

    pub fn ratings(&self) -> &BTreeMap<&'static str, f64> {
        &self.ratings
    }

    pub fn recommended(&self) -> Option<bool> {
        self.recommended
    }
}

/// The three normalized datasets, available once ingestion has joined.
/// A dataset that failed to load is simply empty.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub airline: Vec<CanonicalRecord>,
    pub airport: Vec<CanonicalRecord>,
    pub lounge: Vec<CanonicalRecord>,
}

impl Datasets {
    pub fn get(&self, entity_type: EntityType) -> &[CanonicalRecord] {
        match entity_type {
            EntityType::Airline => &self.airline,
            EntityType::Airport => &self.airport,
            EntityType::Lounge => &self.lounge,
        }
    }

    pub fn set(&mut self, entity_type: EntityType, records: Vec<CanonicalRecord>) {
        match entity_type {
            EntityType::Airline => self.airline = records,
            EntityType::Airport => self.airport = records,
            EntityType::Lounge => self.lounge = records,
        }
    }

    /// `(entity_type, records)` in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityType, &[CanonicalRecord])> {
        EntityType::ALL.into_iter().map(|t| (t, self.get(t)))
    }

    pub fn total_records(&self) -> usize {
        self.airline.len() + self.airport.len() + self.lounge.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_parse() {
        assert_eq!("Airline".parse::<EntityType>(), Ok(EntityType::Airline));
        assert_eq!(" lounge ".parse::<EntityType>(), Ok(EntityType::Lounge));
        assert!("train".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_blank_name_is_rejected() {
        assert!(CanonicalRecord::new(EntityType::Airport, "   ").is_none());
        assert!(CanonicalRecord::new(EntityType::Airport, "").is_none());
    }

    #[test]
    fn test_rating_outside_range_is_absent() {
        let rec = CanonicalRecord::new(EntityType::Lounge, "x")
            .unwrap()
            .with_rating("comfort", 12.0)
            .with_rating("overall", 8.0)
            .with_rating("catering", f64::NAN);

        assert_eq!(rec.rating("comfort"), None);
        assert_eq!(rec.rating("catering"), None);
        assert_eq!(rec.rating("overall"), Some(8.0));
    }

    #[test]
    fn test_recommended_only_for_airlines() {
        let airport = CanonicalRecord::new(EntityType::Airport, "lhr")
            .unwrap()
            .with_recommended(Some(true));
        assert_eq!(airport.recommended(), None);

        let airline = CanonicalRecord::new(EntityType::Airline, "ba")
            .unwrap()
            .with_recommended(Some(false));
        assert_eq!(airline.recommended(), Some(false));
    }

    #[test]
    fn test_datasets_iter_order() {
        let ds = Datasets::default();
        let order: Vec<_> = ds.iter().map(|(t, _)| t).collect();
        assert_eq!(order, EntityType::ALL.to_vec());
        assert_eq!(ds.total_records(), 0);
    }
}
