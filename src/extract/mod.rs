//! Reshaping raw prediction blobs into label-indexed lists.
//!
//! Location, confidence, and attribute tensors arrive in prior-major order
//! (`[prior][class][...]`). The helpers here transpose one batch item into
//! per-label lists of length `num_priors`, and decode location offsets
//! against the prior boxes. The batch-level functions simply map the
//! per-item ones over the batch.

mod label;

pub use label::{LabelIndexed, SHARED_LOCATION_LABEL};

use crate::bbox::{decode_bbox, CodeType, NormalizedBBox, PriorBoxes};
use crate::tensor::TensorView;
use crate::util::math::checked_size;
use crate::util::{DetOutError, DetOutResult};

/// Per-image location offsets or decoded boxes, keyed by class label.
pub type LabelBBoxes = LabelIndexed<Vec<NormalizedBBox>>;

/// Per-image scores, keyed by class (or attribute category) label.
pub type LabelScores = LabelIndexed<Vec<f32>>;

/// How location predictions are laid out and decoded.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DecodeParams {
    /// One set of offsets shared by every class, keyed `-1`.
    pub share_location: bool,
    /// Classes with their own offsets: 1 when shared, else `num_classes`.
    pub num_loc_classes: usize,
    pub background_label_id: i32,
    pub code_type: CodeType,
    pub variance_encoded_in_target: bool,
}

fn check_item_len(context: &'static str, data: &[f32], expected: usize) -> DetOutResult<()> {
    if data.len() < expected {
        return Err(DetOutError::ShapeMismatch {
            context,
            expected,
            got: data.len(),
        });
    }
    Ok(())
}

#[inline]
fn loc_label(share_location: bool, class: usize) -> i32 {
    if share_location {
        SHARED_LOCATION_LABEL
    } else {
        class as i32
    }
}

/// Splits one image's raw location offsets (`[prior][loc_class][4]`) into
/// per-label offset lists.
pub fn loc_predictions_item(
    data: &[f32],
    num_priors: usize,
    num_loc_classes: usize,
    share_location: bool,
) -> DetOutResult<LabelBBoxes> {
    let prior_stride = checked_size("location prediction stride", &[num_loc_classes, 4])?;
    let needed = checked_size("location predictions size", &[num_priors, prior_stride])?;
    check_item_len("location predictions", data, needed)?;

    let mut preds = LabelBBoxes::new();
    if num_loc_classes == 0 {
        return Ok(preds);
    }
    for class in 0..num_loc_classes {
        preds.insert(
            loc_label(share_location, class),
            Vec::with_capacity(num_priors),
        );
    }
    for (prior_idx, prior_chunk) in data
        .chunks_exact(prior_stride)
        .take(num_priors)
        .enumerate()
    {
        for (class, offsets) in prior_chunk.chunks_exact(4).enumerate() {
            let label = loc_label(share_location, class);
            let list = preds.entry_or_default(label);
            debug_assert_eq!(list.len(), prior_idx);
            list.push(NormalizedBBox::from_slice(offsets));
        }
    }
    Ok(preds)
}

/// Location offsets for every image of the batch.
pub fn loc_predictions(
    loc: &TensorView<'_>,
    num_priors: usize,
    num_loc_classes: usize,
    share_location: bool,
) -> DetOutResult<Vec<LabelBBoxes>> {
    (0..loc.num())
        .map(|n| loc_predictions_item(loc.item(n)?, num_priors, num_loc_classes, share_location))
        .collect()
}

/// Decodes one image's offsets against the priors.
///
/// When locations are not shared the background label is skipped and has no
/// entry in the result.
pub fn decode_item(
    loc_preds: &LabelBBoxes,
    priors: &PriorBoxes,
    params: &DecodeParams,
) -> DetOutResult<LabelBBoxes> {
    let mut decoded = LabelBBoxes::new();
    for class in 0..params.num_loc_classes {
        let label = loc_label(params.share_location, class);
        if !params.share_location && label == params.background_label_id {
            continue;
        }
        let offsets = loc_preds.get(label, "location predictions")?;
        if offsets.len() != priors.len() {
            return Err(DetOutError::ShapeMismatch {
                context: "decoded location count",
                expected: priors.len(),
                got: offsets.len(),
            });
        }
        let boxes = priors
            .boxes()
            .iter()
            .zip(priors.variances())
            .zip(offsets)
            .map(|((prior, variance), target)| {
                decode_bbox(
                    prior,
                    variance,
                    params.code_type,
                    params.variance_encoded_in_target,
                    target,
                )
            })
            .collect();
        decoded.insert(label, boxes);
    }
    Ok(decoded)
}

/// Decodes every image of the batch.
pub fn decode_all(
    all_loc_preds: &[LabelBBoxes],
    priors: &PriorBoxes,
    params: &DecodeParams,
) -> DetOutResult<Vec<LabelBBoxes>> {
    all_loc_preds
        .iter()
        .map(|preds| decode_item(preds, priors, params))
        .collect()
}

/// Transposes one image's `[prior][category]` scores into per-category lists.
///
/// Serves the main class confidences and every auxiliary attribute head
/// alike; only `num_categories` differs.
pub fn confidence_scores_item(
    data: &[f32],
    num_priors: usize,
    num_categories: usize,
) -> DetOutResult<LabelScores> {
    let needed = checked_size("confidence scores size", &[num_priors, num_categories])?;
    check_item_len("confidence scores", data, needed)?;

    let mut per_category: Vec<Vec<f32>> = (0..num_categories)
        .map(|_| Vec::with_capacity(num_priors))
        .collect();
    if num_categories > 0 {
        for prior_scores in data.chunks_exact(num_categories).take(num_priors) {
            for (list, &score) in per_category.iter_mut().zip(prior_scores) {
                list.push(score);
            }
        }
    }
    Ok(per_category
        .into_iter()
        .enumerate()
        .map(|(category, scores)| (category as i32, scores))
        .collect())
}

/// Per-category scores for every image of the batch.
pub fn confidence_scores(
    tensor: &TensorView<'_>,
    num_priors: usize,
    num_categories: usize,
) -> DetOutResult<Vec<LabelScores>> {
    (0..tensor.num())
        .map(|n| confidence_scores_item(tensor.item(n)?, num_priors, num_categories))
        .collect()
}
