//! Numeric reductions used by the aggregator.

/// Arithmetic mean, or `None` for an empty slice.
///
/// Values are summed in ascending order so the result does not depend on
/// the order in which they were collected.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(sorted.iter().sum::<f64>() / sorted.len() as f64)
}

/// Share of `part` in `total`, or `None` when `total` is zero.
pub fn ratio(part: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(part as f64 / total as f64)
    }
}
