//! Step-shape preserving reduction of scalar traces.

use tracing::debug;

use super::run::{RunCollapser, Sample};
use crate::error::{ProfileError, Result};

/// Drops samples that repeat their predecessor without changing the drawn shape.
///
/// The first sample is always kept. A run of equal values keeps its first and
/// last sample so it still renders as a flat segment up to the next differing
/// value; the trailing run of the series is not closed. Linear interpolation
/// between the returned points reproduces the original value at every input
/// timestamp. Applying the reduction to its own output is a no-op.
///
/// `timestamps` must be sorted ascending and as long as `values`.
///
/// ```rust
/// use tsprofile::reduce::{reduce_scalar, Sample};
///
/// let points = reduce_scalar(&[0, 10, 20, 30, 40, 50], &[1, 1, 1, 2, 2, 3]).unwrap();
/// let pairs: Vec<(i64, i32)> = points.iter().map(|p| (p.time, p.value)).collect();
/// assert_eq!(pairs, vec![(0, 1), (20, 1), (30, 2), (40, 2), (50, 3)]);
/// ```
pub fn reduce_scalar<T: Clone + PartialEq>(timestamps: &[i64], values: &[T]) -> Result<Vec<Sample<T>>> {
    if timestamps.len() != values.len() {
        return Err(ProfileError::invalid_input(format!(
            "{} timestamps for {} values",
            timestamps.len(),
            values.len()
        )));
    }

    let mut collapser = RunCollapser::new();
    let mut events = Vec::new();
    for (time, value) in timestamps.iter().zip(values) {
        collapser.push(Sample::new(*time, value.clone()), &mut events);
    }

    let points: Vec<Sample<T>> = events.into_iter().map(|e| e.into_sample()).collect();
    debug!(
        original = values.len(),
        reduced = points.len(),
        "Reduced scalar trace"
    );
    Ok(points)
}
