//! Box codecs relative to prior boxes.
//!
//! Each codec maps a 4-value regression target to a box given a prior and
//! its variance. When `variance_encoded_in_target` is set the variance has
//! already been folded into the target and is treated as all ones.

use crate::bbox::NormalizedBBox;

/// Parametrization of a regression target relative to its prior.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CodeType {
    /// Corner offsets added to the prior corners.
    #[default]
    Corner,
    /// Center offsets scaled by prior size, log-space size ratios.
    CenterSize,
    /// Corner offsets scaled by prior width and height.
    CornerSize,
}

#[inline]
fn effective_variance(variance: &[f32; 4], encoded_in_target: bool) -> [f32; 4] {
    if encoded_in_target {
        [1.0; 4]
    } else {
        *variance
    }
}

/// Decodes a regression target into a box. No clipping is applied.
pub fn decode_bbox(
    prior: &NormalizedBBox,
    variance: &[f32; 4],
    code_type: CodeType,
    variance_encoded_in_target: bool,
    target: &NormalizedBBox,
) -> NormalizedBBox {
    let v = effective_variance(variance, variance_encoded_in_target);
    match code_type {
        CodeType::Corner => NormalizedBBox::new(
            prior.xmin + v[0] * target.xmin,
            prior.ymin + v[1] * target.ymin,
            prior.xmax + v[2] * target.xmax,
            prior.ymax + v[3] * target.ymax,
        ),
        CodeType::CenterSize => {
            let prior_w = prior.width();
            let prior_h = prior.height();
            let (prior_cx, prior_cy) = prior.center();

            let cx = v[0] * target.xmin * prior_w + prior_cx;
            let cy = v[1] * target.ymin * prior_h + prior_cy;
            let w = (v[2] * target.xmax).exp() * prior_w;
            let h = (v[3] * target.ymax).exp() * prior_h;

            NormalizedBBox::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
        }
        CodeType::CornerSize => {
            let prior_w = prior.width();
            let prior_h = prior.height();
            NormalizedBBox::new(
                prior.xmin + v[0] * target.xmin * prior_w,
                prior.ymin + v[1] * target.ymin * prior_h,
                prior.xmax + v[2] * target.xmax * prior_w,
                prior.ymax + v[3] * target.ymax * prior_h,
            )
        }
    }
}

/// Encodes `bbox` as a regression target relative to `prior`; the inverse of
/// [`decode_bbox`] for the same codec and variance handling.
///
/// `CenterSize` and `CornerSize` require a prior with non-zero extent, and
/// `CenterSize` additionally a box with positive extent.
pub fn encode_bbox(
    prior: &NormalizedBBox,
    variance: &[f32; 4],
    code_type: CodeType,
    variance_encoded_in_target: bool,
    bbox: &NormalizedBBox,
) -> NormalizedBBox {
    let v = effective_variance(variance, variance_encoded_in_target);
    match code_type {
        CodeType::Corner => NormalizedBBox::new(
            (bbox.xmin - prior.xmin) / v[0],
            (bbox.ymin - prior.ymin) / v[1],
            (bbox.xmax - prior.xmax) / v[2],
            (bbox.ymax - prior.ymax) / v[3],
        ),
        CodeType::CenterSize => {
            let prior_w = prior.width();
            let prior_h = prior.height();
            let (prior_cx, prior_cy) = prior.center();
            let (cx, cy) = bbox.center();
            NormalizedBBox::new(
                (cx - prior_cx) / prior_w / v[0],
                (cy - prior_cy) / prior_h / v[1],
                (bbox.width() / prior_w).ln() / v[2],
                (bbox.height() / prior_h).ln() / v[3],
            )
        }
        CodeType::CornerSize => {
            let prior_w = prior.width();
            let prior_h = prior.height();
            NormalizedBBox::new(
                (bbox.xmin - prior.xmin) / prior_w / v[0],
                (bbox.ymin - prior.ymin) / prior_h / v[1],
                (bbox.xmax - prior.xmax) / prior_w / v[2],
                (bbox.ymax - prior.ymax) / prior_h / v[3],
            )
        }
    }
}
