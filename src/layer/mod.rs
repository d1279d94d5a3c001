//! The detection output layer.
//!
//! `DetectionOutput` validates its configuration once, checks the input
//! shapes once per batch, then runs decode, per-class NMS, the cross-class
//! cap, and attribute resolution image by image before packing the result
//! table. Images are independent; with the `rayon` feature and
//! `parallel = true` they are processed on the rayon pool and collected back
//! in batch order.

mod config;
mod table;

pub use config::{DetectionOutputConfig, NmsConfig};
pub use table::{Detection, DetectionTable};

use crate::attribute::{resolve_attributes, AttributeHead};
use crate::bbox::PriorBoxes;
use crate::candidate::nms::{nms_fast, NmsParams};
use crate::candidate::topk::{count_indices, keep_top_k, LabelIndices};
use crate::extract::{
    confidence_scores_item, decode_item, loc_predictions_item, DecodeParams, LabelScores,
    SHARED_LOCATION_LABEL,
};
use crate::tensor::{TensorShape, TensorView};
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::math::checked_size;
use crate::util::{DetOutError, DetOutResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Input blobs of one forward call.
#[derive(Clone, Debug)]
pub struct DetectionInputs<'a> {
    /// Location offsets, `[N, P * L * 4, 1, 1]`.
    pub loc: TensorView<'a>,
    /// Class confidences, `[N, P * num_classes, 1, 1]`.
    pub conf: TensorView<'a>,
    /// Prior boxes then variances, `[N, 2, P * 4, 1]`.
    pub prior: TensorView<'a>,
    /// Attribute heads in declared order, each `[N, P * width, 1, 1]`.
    pub attributes: Vec<TensorView<'a>>,
}

impl<'a> DetectionInputs<'a> {
    /// Inputs without attribute heads.
    pub fn new(loc: TensorView<'a>, conf: TensorView<'a>, prior: TensorView<'a>) -> Self {
        Self {
            loc,
            conf,
            prior,
            attributes: Vec::new(),
        }
    }

    /// Attaches attribute head tensors in declared head order.
    pub fn with_attributes(mut self, attributes: Vec<TensorView<'a>>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Shapes of every input, in blob order.
    pub fn shapes(&self) -> InputShapes {
        InputShapes {
            loc: self.loc.shape(),
            conf: self.conf.shape(),
            prior: self.prior.shape(),
            attributes: self.attributes.iter().map(TensorView::shape).collect(),
        }
    }
}

/// Shapes of the layer inputs, used for the per-batch consistency check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputShapes {
    pub loc: TensorShape,
    pub conf: TensorShape,
    pub prior: TensorShape,
    pub attributes: Vec<TensorShape>,
}

/// Batch dimensions established by [`DetectionOutput::reshape`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BatchLayout {
    /// Images in the batch.
    pub num: usize,
    /// Prior boxes per image.
    pub num_priors: usize,
    /// Width of one output row.
    pub row_width: usize,
}

fn expect_eq(context: &'static str, expected: usize, got: usize) -> DetOutResult<()> {
    if expected != got {
        return Err(DetOutError::ShapeMismatch {
            context,
            expected,
            got,
        });
    }
    Ok(())
}

/// Detection output layer: decode, suppress, select, and annotate.
#[derive(Clone, Debug)]
pub struct DetectionOutput {
    cfg: DetectionOutputConfig,
    num_classes: usize,
    heads: Vec<AttributeHead>,
}

impl DetectionOutput {
    /// Validates `cfg` and builds the layer.
    pub fn new(cfg: DetectionOutputConfig) -> DetOutResult<Self> {
        let num_classes = cfg.validate()?;
        let heads = cfg.attributes.heads();
        Ok(Self {
            cfg,
            num_classes,
            heads,
        })
    }

    pub fn config(&self) -> &DetectionOutputConfig {
        &self.cfg
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Classes with their own location offsets.
    pub fn num_loc_classes(&self) -> usize {
        if self.cfg.share_location {
            1
        } else {
            self.num_classes
        }
    }

    /// Attribute heads in declared order.
    pub fn heads(&self) -> &[AttributeHead] {
        &self.heads
    }

    pub fn row_width(&self) -> usize {
        self.cfg.attributes.row_width()
    }

    /// Checks that every input agrees on batch size and prior count.
    ///
    /// The prior count is `prior.height / 4`; location, confidence, and each
    /// attribute head must carry exactly that many priors.
    pub fn reshape(&self, shapes: &InputShapes) -> DetOutResult<BatchLayout> {
        let num = shapes.loc.num;
        expect_eq("confidence batch size", num, shapes.conf.num)?;
        expect_eq("prior channels", 2, shapes.prior.channels)?;
        if shapes.prior.height % 4 != 0 {
            return Err(DetOutError::ShapeMismatch {
                context: "prior height",
                expected: shapes.prior.height / 4 * 4,
                got: shapes.prior.height,
            });
        }
        let num_priors = shapes.prior.height / 4;

        expect_eq(
            "location predictions",
            checked_size(
                "location predictions size",
                &[num_priors, self.num_loc_classes(), 4],
            )?,
            shapes.loc.channels,
        )?;
        expect_eq(
            "confidence predictions",
            checked_size("confidence predictions size", &[num_priors, self.num_classes])?,
            shapes.conf.channels,
        )?;

        expect_eq("attribute head count", self.heads.len(), shapes.attributes.len())?;
        for (head, shape) in self.heads.iter().zip(&shapes.attributes) {
            expect_eq("attribute batch size", num, shape.num)?;
            let expected = checked_size("attribute predictions size", &[num_priors, head.width])?;
            expect_eq("attribute predictions", expected, shape.channels)?;
        }

        let layout = BatchLayout {
            num,
            num_priors,
            row_width: self.row_width(),
        };
        trace_event!("reshape", num = layout.num, num_priors = layout.num_priors);
        Ok(layout)
    }

    fn decode_params(&self) -> DecodeParams {
        DecodeParams {
            share_location: self.cfg.share_location,
            num_loc_classes: self.num_loc_classes(),
            background_label_id: self.cfg.background_label_id,
            code_type: self.cfg.code_type,
            variance_encoded_in_target: self.cfg.variance_encoded_in_target,
        }
    }

    fn nms_params(&self) -> NmsParams {
        NmsParams {
            confidence_threshold: self.cfg.confidence_threshold,
            nms_threshold: self.cfg.nms.nms_threshold,
            eta: self.cfg.nms.eta,
            top_k: self.cfg.nms.top_k,
        }
    }

    /// Runs the pipeline and returns the packed output table.
    pub fn forward(&self, inputs: &DetectionInputs<'_>) -> DetOutResult<DetectionTable> {
        let per_image = self.detect(inputs)?;
        let table = DetectionTable::assemble(&per_image, self.row_width())?;
        if table.is_empty_result() {
            trace_event!("no_detections", num = per_image.len());
        }
        Ok(table)
    }

    /// Runs the pipeline and returns the typed detections of each image.
    pub fn detect(&self, inputs: &DetectionInputs<'_>) -> DetOutResult<Vec<Vec<Detection>>> {
        let layout = self.reshape(&inputs.shapes())?;
        let _span = trace_span!(
            "detection_output",
            num = layout.num,
            num_priors = layout.num_priors
        )
        .entered();

        if layout.num == 0 {
            return Ok(Vec::new());
        }
        let priors = PriorBoxes::from_tensor(&inputs.prior, layout.num_priors)?;

        #[cfg(feature = "rayon")]
        {
            if self.cfg.parallel {
                return (0..layout.num)
                    .into_par_iter()
                    .map(|image_id| self.detect_image(inputs, &layout, &priors, image_id))
                    .collect();
            }
        }

        (0..layout.num)
            .map(|image_id| self.detect_image(inputs, &layout, &priors, image_id))
            .collect()
    }

    fn detect_image(
        &self,
        inputs: &DetectionInputs<'_>,
        layout: &BatchLayout,
        priors: &PriorBoxes,
        image_id: usize,
    ) -> DetOutResult<Vec<Detection>> {
        let _span = trace_span!("nms_image", image = image_id).entered();
        let num_priors = layout.num_priors;
        let share_location = self.cfg.share_location;

        let loc_preds = loc_predictions_item(
            inputs.loc.item(image_id)?,
            num_priors,
            self.num_loc_classes(),
            share_location,
        )?;
        let decoded = decode_item(&loc_preds, priors, &self.decode_params())?;
        let conf_scores =
            confidence_scores_item(inputs.conf.item(image_id)?, num_priors, self.num_classes)?;

        let nms_params = self.nms_params();
        let mut indices = LabelIndices::new();
        for class in 0..self.num_classes {
            let label = class as i32;
            if label == self.cfg.background_label_id {
                continue;
            }
            let scores = conf_scores.get(label, "confidence predictions")?;
            let loc_label = if share_location {
                SHARED_LOCATION_LABEL
            } else {
                label
            };
            let bboxes = decoded.get(loc_label, "location predictions")?;
            let kept = nms_fast(bboxes, scores, &nms_params)?;
            trace_debug!("nms_class", image = image_id, label = label, kept = kept.len());
            indices.insert(label, kept);
        }

        let indices = keep_top_k(indices, &conf_scores, self.cfg.keep_top_k)?;
        let num_kept = count_indices(&indices);
        if num_kept == 0 {
            return Ok(Vec::new());
        }

        let head_scores = self
            .heads
            .iter()
            .zip(&inputs.attributes)
            .map(|(head, tensor)| {
                confidence_scores_item(tensor.item(image_id)?, num_priors, head.width)
            })
            .collect::<DetOutResult<Vec<LabelScores>>>()?;

        let mut detections = Vec::with_capacity(num_kept);
        for (label, label_indices) in indices.iter() {
            let scores = conf_scores.get(label, "confidence predictions")?;
            let loc_label = if share_location {
                SHARED_LOCATION_LABEL
            } else {
                label
            };
            let bboxes = decoded.get(loc_label, "location predictions")?;
            for &idx in label_indices {
                let bbox = *bboxes.get(idx).ok_or(DetOutError::IndexOutOfBounds {
                    index: idx,
                    len: bboxes.len(),
                    context: "decoded boxes",
                })?;
                detections.push(Detection {
                    image_id,
                    label,
                    score: scores[idx],
                    bbox,
                    attributes: resolve_attributes(&head_scores, &self.heads, idx)?,
                });
            }
        }

        trace_event!("kept_detections", image = image_id, count = detections.len());
        Ok(detections)
    }
}
