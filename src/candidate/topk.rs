//! Cross-class cap on detections kept per image.

use crate::extract::{LabelIndexed, LabelScores};
use crate::util::{DetOutError, DetOutResult};

/// Kept prior indices per class label.
pub type LabelIndices = LabelIndexed<Vec<usize>>;

/// Total number of indices across all labels.
pub fn count_indices(indices: &LabelIndices) -> usize {
    indices.iter().map(|(_, list)| list.len()).sum()
}

/// Keeps at most `keep_top_k` detections per image across all classes.
///
/// When the total does not exceed the cap the input is returned unchanged.
/// Otherwise all `(score, label, index)` triples are ranked by descending
/// score (stable: label order, then suppression order, breaks ties) and the
/// survivors are regrouped by label.
pub fn keep_top_k(
    indices: LabelIndices,
    conf_scores: &LabelScores,
    keep_top_k: Option<usize>,
) -> DetOutResult<LabelIndices> {
    let Some(cap) = keep_top_k else {
        return Ok(indices);
    };
    if count_indices(&indices) <= cap {
        return Ok(indices);
    }

    let mut ranked: Vec<(f32, usize, i32)> = Vec::new();
    for (label, label_indices) in indices.iter() {
        let scores = conf_scores.get(label, "confidence predictions")?;
        for &idx in label_indices {
            let score = *scores.get(idx).ok_or(DetOutError::IndexOutOfBounds {
                index: idx,
                len: scores.len(),
                context: "top-k score lookup",
            })?;
            ranked.push((score, idx, label));
        }
    }
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.truncate(cap);

    let mut kept = LabelIndices::new();
    for (_, idx, label) in ranked {
        kept.entry_or_default(label).push(idx);
    }
    Ok(kept)
}
