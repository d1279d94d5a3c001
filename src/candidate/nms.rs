//! Greedy IoU-based non-maximum suppression with an adaptive threshold.

use crate::bbox::NormalizedBBox;
use crate::util::{DetOutError, DetOutResult};
use std::cmp::Ordering;

/// Parameters for per-class suppression.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NmsParams {
    /// Scores at or below this value are discarded before suppression.
    pub confidence_threshold: f32,
    /// Initial IoU threshold; a candidate is suppressed at or above it.
    pub nms_threshold: f32,
    /// Multiplicative decay of the IoU threshold, in `(0, 1]`.
    pub eta: f32,
    /// Cap on candidates considered before suppression.
    pub top_k: Option<usize>,
}

/// Adaptive thresholds only decay while above this value.
const ETA_DECAY_FLOOR: f32 = 0.5;

/// Descending by score; equal scores keep ascending index order.
fn score_desc(a: &(f32, usize), b: &(f32, usize)) -> Ordering {
    b.0.total_cmp(&a.0)
}

/// Returns `(score, index)` pairs with score above `threshold`, sorted by
/// descending score and truncated to `top_k`.
///
/// The sort is stable, so equal scores stay in index order.
pub fn max_score_indices(scores: &[f32], threshold: f32, top_k: Option<usize>) -> Vec<(f32, usize)> {
    let mut pairs: Vec<(f32, usize)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, score)| score > threshold)
        .map(|(idx, score)| (score, idx))
        .collect();
    pairs.sort_by(score_desc);
    if let Some(k) = top_k {
        pairs.truncate(k);
    }
    pairs
}

/// Runs greedy NMS over `bboxes` scored by `scores` and returns the kept
/// indices in the order they were confirmed (descending score).
///
/// A candidate is kept when its IoU with every already-kept box is below the
/// adaptive threshold. After each kept box, if `eta < 1` and the threshold is
/// still above 0.5, the threshold is multiplied by `eta`.
pub fn nms_fast(
    bboxes: &[NormalizedBBox],
    scores: &[f32],
    params: &NmsParams,
) -> DetOutResult<Vec<usize>> {
    if bboxes.len() != scores.len() {
        return Err(DetOutError::ShapeMismatch {
            context: "nms boxes and scores",
            expected: scores.len(),
            got: bboxes.len(),
        });
    }

    let candidates = max_score_indices(scores, params.confidence_threshold, params.top_k);
    let mut adaptive_threshold = params.nms_threshold;
    let mut kept: Vec<usize> = Vec::with_capacity(candidates.len());

    for &(_, idx) in &candidates {
        let bbox = &bboxes[idx];
        let keep = kept
            .iter()
            .all(|&kept_idx| bbox.jaccard_overlap(&bboxes[kept_idx]) < adaptive_threshold);
        if !keep {
            continue;
        }
        kept.push(idx);
        if params.eta < 1.0 && adaptive_threshold > ETA_DECAY_FLOOR {
            adaptive_threshold *= params.eta;
        }
    }

    Ok(kept)
}
