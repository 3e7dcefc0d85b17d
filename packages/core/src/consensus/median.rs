//! Lower-middle median.
//!
//! For even-length samples the lower of the two middle elements is chosen
//! so the result is always a member of the sample.

use std::cmp::Ordering;

/// Index of the lower-middle element in a sorted slice of `len` items.
pub fn lower_middle_index(len: usize) -> Option<usize> {
    if len == 0 {
        None
    } else {
        Some((len - 1) / 2)
    }
}

/// Median of finite values. Non-finite entries are ignored.
pub fn lower_median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    lower_middle_index(sorted.len()).map(|i| sorted[i])
}

/// Median member of `items` ordered by `key`. Ties keep input order.
pub fn median_by<T, F>(items: &[T], key: F) -> Option<&T>
where
    F: Fn(&T) -> f64,
{
    let mut refs: Vec<&T> = items.iter().collect();
    refs.sort_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal));
    lower_middle_index(refs.len()).map(|i| refs[i])
}
