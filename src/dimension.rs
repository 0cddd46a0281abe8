//! Dimension registry: the cross-entity rating axes and, per entity type,
//! the field that measures each axis.
//!
//! | Dimension   | airline          | airport              | lounge        |
//! |-------------|------------------|----------------------|---------------|
//! | comfort     | seat_comfort     | -                    | comfort       |
//! | staff       | cabin_staff      | -                    | staff_service |
//! | food        | food_beverages   | food_beverages       | -             |
//! | cleanliness | -                | terminal_cleanliness | cleanliness   |
//! | overall     | overall          | overall              | overall       |

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::aggregate::Field;
use crate::model::EntityType;
use crate::schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionKey {
    Comfort,
    Staff,
    Food,
    Cleanliness,
    Overall,
}

impl DimensionKey {
    pub const ALL: [DimensionKey; 5] = [
        DimensionKey::Comfort,
        DimensionKey::Staff,
        DimensionKey::Food,
        DimensionKey::Cleanliness,
        DimensionKey::Overall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DimensionKey::Comfort => "comfort",
            DimensionKey::Staff => "staff",
            DimensionKey::Food => "food",
            DimensionKey::Cleanliness => "cleanliness",
            DimensionKey::Overall => "overall",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DimensionKey::Comfort => "Comfort",
            DimensionKey::Staff => "Staff",
            DimensionKey::Food => "Food",
            DimensionKey::Cleanliness => "Cleanliness",
            DimensionKey::Overall => "Overall",
        }
    }

    pub fn dimension(self) -> Dimension {
        Dimension {
            key: self,
            label: self.label(),
        }
    }
}

impl fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dimension `{0}`")]
pub struct ParseDimensionError(pub String);

impl FromStr for DimensionKey {
    type Err = ParseDimensionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        DimensionKey::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseDimensionError(s.to_string()))
    }
}

/// A named rating axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimension {
    pub key: DimensionKey,
    pub label: &'static str,
}

/// Where a dimension's value lives for one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldDescriptor {
    /// Canonical field name on [`crate::model::CanonicalRecord`].
    pub field: &'static str,
    /// Raw-to-canonical scale factor of that field. Canonical records are
    /// already scaled; this is informational.
    pub multiplier: f64,
}

fn field_name(key: DimensionKey, entity_type: EntityType) -> Option<&'static str> {
    use DimensionKey as D;
    use EntityType as E;

    match (key, entity_type) {
        (D::Comfort, E::Airline) => Some("seat_comfort"),
        (D::Comfort, E::Airport) => None,
        (D::Comfort, E::Lounge) => Some("comfort"),
        (D::Staff, E::Airline) => Some("cabin_staff"),
        (D::Staff, E::Airport) => None,
        (D::Staff, E::Lounge) => Some("staff_service"),
        (D::Food, E::Airline) => Some("food_beverages"),
        (D::Food, E::Airport) => Some("food_beverages"),
        (D::Food, E::Lounge) => None,
        (D::Cleanliness, E::Airline) => None,
        (D::Cleanliness, E::Airport) => Some("terminal_cleanliness"),
        (D::Cleanliness, E::Lounge) => Some("cleanliness"),
        (D::Overall, _) => Some(schema::OVERALL),
    }
}

/// Resolves a dimension for an entity type. `None` means not applicable.
pub fn resolve(key: DimensionKey, entity_type: EntityType) -> Option<FieldDescriptor> {
    let field = field_name(key, entity_type)?;
    let column = schema::rating_column(entity_type, field)?;
    Some(FieldDescriptor {
        field,
        multiplier: column.multiplier(),
    })
}

pub fn has_data(key: DimensionKey, entity_type: EntityType) -> bool {
    resolve(key, entity_type).is_some()
}

/// Aggregator field for the active dimension, labelled by the dimension key.
/// With no active dimension this is the entity's own overall rating.
pub fn field_for(active: Option<DimensionKey>, entity_type: EntityType) -> Field<'static> {
    let key = active.unwrap_or(DimensionKey::Overall);
    Field::alias(key.as_str(), resolve(key, entity_type).map(|d| d.field))
}

/// Entity types each dimension applies to, in registry order.
pub fn coverage() -> Vec<(Dimension, Vec<EntityType>)> {
    DimensionKey::ALL
        .into_iter()
        .map(|key| {
            let types = EntityType::ALL
                .into_iter()
                .filter(|&t| has_data(key, t))
                .collect();
            (key.dimension(), types)
        })
        .collect()
}
