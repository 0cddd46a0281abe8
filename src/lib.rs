//! Normalization, aggregation and linked filtering for airline, airport and
//! lounge review datasets.
//!
//! Raw rows are normalized once per dataset into [`model::CanonicalRecord`]s
//! on a common 0–10 scale. Charts re-aggregate those records by whatever key
//! they need, reading the shared [`filter::FilterBroker`] before every pass
//! to learn which rating dimension to plot and which airlines to include.

pub mod aggregate;
pub mod charts;
pub mod config;
pub mod dimension;
pub mod explorer;
pub mod filter;
pub mod model;
pub mod normalize;
pub mod schema;
pub mod source;
pub mod stats;
pub mod telemetry;
pub mod timeline;
