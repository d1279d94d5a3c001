//! Low-level building blocks for custom post-processing pipelines.
//!
//! These expose the individual pipeline stages used by `DetectionOutput`:
//! extraction, decoding, per-class NMS, and the cross-class cap. Most users
//! should prefer the top-level `DetectionOutput` API.

pub use crate::attribute::{argmax_category, resolve_attributes};
pub use crate::bbox::{decode_bbox, encode_bbox};
pub use crate::candidate::nms::{max_score_indices, nms_fast, NmsParams};
pub use crate::candidate::topk::{count_indices, keep_top_k, LabelIndices};
pub use crate::extract::{
    confidence_scores, confidence_scores_item, decode_all, decode_item, loc_predictions,
    loc_predictions_item, DecodeParams, LabelBBoxes, LabelScores, SHARED_LOCATION_LABEL,
};
