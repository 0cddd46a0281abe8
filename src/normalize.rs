//! Normalizer: raw rows of one source file -> canonical records.
//!
//! Rows without an entity name or without a usable overall rating are
//! dropped silently. They are routine data noise, not errors.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::model::{CanonicalRecord, EntityType, RawRow};
use crate::schema::{self, RatingColumn};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d %B %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Converts raw rows of a single source into canonical records.
pub fn normalize(rows: &[RawRow], entity_type: EntityType) -> Vec<CanonicalRecord> {
    let records: Vec<CanonicalRecord> = rows
        .iter()
        .filter_map(|row| normalize_row(row, entity_type))
        .collect();

    debug!(
        entity_type = %entity_type,
        rows = rows.len(),
        kept = records.len(),
        dropped = rows.len() - records.len(),
        "Normalized dataset"
    );

    records
}

/// Normalizes one row, or returns `None` when the row must be dropped.
pub fn normalize_row(row: &RawRow, entity_type: EntityType) -> Option<CanonicalRecord> {
    let name = row.get(schema::name_column(entity_type))?;
    let mut record = CanonicalRecord::new(entity_type, name.as_str())?;

    for column in schema::rating_columns(entity_type) {
        if let Some(value) = row.get(column.column).and_then(|raw| scale_rating(raw, column)) {
            record = record.with_rating(column.field, value);
        }
    }

    record.rating(schema::OVERALL)?;

    let date = row.get(schema::DATE_COLUMN).and_then(|d| parse_date(d));
    let country = row.get(schema::COUNTRY_COLUMN).cloned();
    let recommended = row.get(schema::RECOMMENDED_COLUMN).and_then(|r| parse_flag(r));

    Some(
        record
            .with_date(date)
            .with_country(country)
            .with_recommended(recommended),
    )
}

/// Parses a raw rating and rescales it to 0–10.
///
/// Zero counts as "no rating", as do blanks, garbage, negatives and values
/// beyond the column's native scale.
pub fn scale_rating(raw: &str, column: &RatingColumn) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    if !value.is_finite() || value <= 0.0 || value > column.native_max {
        return None;
    }
    Some(value * column.multiplier())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" | "y" => Some(true),
        "0" | "0.0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}
