//! Header-delimited parsing of review files into [`RawRow`]s.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use crate::model::RawRow;

/// Parses CSV text into one map per row, keyed by header.
///
/// Short rows are accepted; missing trailing cells are simply absent.
pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

pub fn read_file(path: &Path) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    parse_rows(file).with_context(|| format!("parsing {}", path.display()))
}
