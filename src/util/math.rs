//! Scalar helpers shared by the layers.

use crate::util::{DetOutError, DetOutResult};

/// Logistic sigmoid.
#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Index of the largest value, starting from `(0, 0.0)` and updating only on
/// a strictly greater value.
///
/// Ties keep the earlier index, and a row whose values are all `<= 0.0`
/// resolves to index 0.
pub(crate) fn argmax_from_zero<I>(values: I) -> usize
where
    I: IntoIterator<Item = f32>,
{
    let mut best_idx = 0usize;
    let mut best = 0.0f32;
    for (idx, value) in values.into_iter().enumerate() {
        if value > best {
            best_idx = idx;
            best = value;
        }
    }
    best_idx
}

/// Product of `factors`, or `SizeOverflow` naming `context`.
pub(crate) fn checked_size(context: &'static str, factors: &[usize]) -> DetOutResult<usize> {
    factors
        .iter()
        .try_fold(1usize, |acc, &f| acc.checked_mul(f))
        .ok_or(DetOutError::SizeOverflow { context })
}
