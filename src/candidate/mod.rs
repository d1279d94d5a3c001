//! Candidate selection and pruning.
//!
//! Per-class greedy non-maximum suppression and the cross-class cap on the
//! number of detections kept per image.

pub(crate) mod nms;
pub(crate) mod topk;
