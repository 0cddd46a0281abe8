//! Column layout of the three review files.
//!
//! Column names are an external contract and are matched verbatim. Each
//! recognized rating column carries its native scale; the canonical field
//! name is the column name without the `_rating` suffix.

use crate::model::EntityType;

/// A recognized rating column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingColumn {
    /// Column header in the source file.
    pub column: &'static str,
    /// Canonical field name used in [`crate::model::CanonicalRecord`].
    pub field: &'static str,
    /// Highest value the source scale allows.
    pub native_max: f64,
}

impl RatingColumn {
    const fn ten(column: &'static str, field: &'static str) -> Self {
        Self { column, field, native_max: 10.0 }
    }

    const fn five(column: &'static str, field: &'static str) -> Self {
        Self { column, field, native_max: 5.0 }
    }

    /// Factor that brings the native scale onto 0–10.
    pub fn multiplier(&self) -> f64 {
        10.0 / self.native_max
    }
}

pub const OVERALL: &str = "overall";
pub const DATE_COLUMN: &str = "date";
pub const COUNTRY_COLUMN: &str = "author_country";
pub const RECOMMENDED_COLUMN: &str = "recommended";

static AIRLINE_RATINGS: &[RatingColumn] = &[
    RatingColumn::ten("overall_rating", OVERALL),
    RatingColumn::five("seat_comfort_rating", "seat_comfort"),
    RatingColumn::five("cabin_staff_rating", "cabin_staff"),
    RatingColumn::five("food_beverages_rating", "food_beverages"),
    RatingColumn::five("inflight_entertainment_rating", "inflight_entertainment"),
    RatingColumn::five("ground_service_rating", "ground_service"),
    RatingColumn::five("wifi_connectivity_rating", "wifi_connectivity"),
    RatingColumn::five("value_money_rating", "value_money"),
];

static AIRPORT_RATINGS: &[RatingColumn] = &[
    RatingColumn::ten("overall_rating", OVERALL),
    RatingColumn::five("queuing_rating", "queuing"),
    RatingColumn::five("terminal_cleanliness_rating", "terminal_cleanliness"),
    RatingColumn::five("terminal_seating_rating", "terminal_seating"),
    RatingColumn::five("terminal_signs_rating", "terminal_signs"),
    RatingColumn::five("food_beverages_rating", "food_beverages"),
    RatingColumn::five("airport_shopping_rating", "airport_shopping"),
    RatingColumn::five("wifi_connectivity_rating", "wifi_connectivity"),
    RatingColumn::five("airport_staff_rating", "airport_staff"),
];

static LOUNGE_RATINGS: &[RatingColumn] = &[
    RatingColumn::five("overall_rating", OVERALL),
    RatingColumn::five("comfort_rating", "comfort"),
    RatingColumn::five("cleanliness_rating", "cleanliness"),
    RatingColumn::five("bar_beverages_rating", "bar_beverages"),
    RatingColumn::five("catering_rating", "catering"),
    RatingColumn::five("washrooms_rating", "washrooms"),
    RatingColumn::five("wifi_connectivity_rating", "wifi_connectivity"),
    RatingColumn::five("staff_service_rating", "staff_service"),
];

pub fn rating_columns(entity_type: EntityType) -> &'static [RatingColumn] {
    match entity_type {
        EntityType::Airline => AIRLINE_RATINGS,
        EntityType::Airport => AIRPORT_RATINGS,
        EntityType::Lounge => LOUNGE_RATINGS,
    }
}

/// Looks up a rating column by its canonical field name.
pub fn rating_column(entity_type: EntityType, field: &str) -> Option<&'static RatingColumn> {
    rating_columns(entity_type).iter().find(|c| c.field == field)
}

pub fn name_column(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Airline => "airline_name",
        EntityType::Airport => "airport_name",
        EntityType::Lounge => "lounge_name",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_entity_has_overall() {
        for t in EntityType::ALL {
            assert!(rating_column(t, OVERALL).is_some(), "{t} lacks overall");
        }
    }

    #[test]
    fn test_field_names_strip_suffix() {
        for t in EntityType::ALL {
            for c in rating_columns(t) {
                assert_eq!(c.column, format!("{}_rating", c.field));
            }
        }
    }

    #[test]
    fn test_multipliers() {
        assert_eq!(rating_column(EntityType::Airline, OVERALL).unwrap().multiplier(), 1.0);
        assert_eq!(rating_column(EntityType::Airline, "seat_comfort").unwrap().multiplier(), 2.0);
        assert_eq!(rating_column(EntityType::Lounge, OVERALL).unwrap().multiplier(), 2.0);
    }
}
