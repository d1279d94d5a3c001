//! Prior boxes and their variances.

use crate::bbox::NormalizedBBox;
use crate::tensor::TensorView;
use crate::util::math::checked_size;
use crate::util::{DetOutError, DetOutResult};

/// Prior (anchor) boxes shared by every image of a batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriorBoxes {
    boxes: Vec<NormalizedBBox>,
    variances: Vec<[f32; 4]>,
}

impl PriorBoxes {
    /// Creates priors from parallel box and variance lists.
    pub fn new(boxes: Vec<NormalizedBBox>, variances: Vec<[f32; 4]>) -> DetOutResult<Self> {
        if boxes.len() != variances.len() {
            return Err(DetOutError::ShapeMismatch {
                context: "prior variances",
                expected: boxes.len(),
                got: variances.len(),
            });
        }
        Ok(Self { boxes, variances })
    }

    /// Reads `num_priors` boxes followed by `num_priors` variance vectors from
    /// the first item of the prior tensor (`[N, 2, P * 4, 1]`).
    pub fn from_tensor(prior: &TensorView<'_>, num_priors: usize) -> DetOutResult<Self> {
        let data = prior.item(0)?;
        let box_len = checked_size("prior box count", &[num_priors, 4])?;
        let needed = checked_size("prior tensor size", &[box_len, 2])?;
        if data.len() < needed {
            return Err(DetOutError::ShapeMismatch {
                context: "prior tensor",
                expected: needed,
                got: data.len(),
            });
        }

        let (box_data, var_data) = data[..needed].split_at(box_len);
        let boxes = box_data
            .chunks_exact(4)
            .map(NormalizedBBox::from_slice)
            .collect();
        let variances = var_data
            .chunks_exact(4)
            .map(|v| [v[0], v[1], v[2], v[3]])
            .collect();
        Ok(Self { boxes, variances })
    }

    /// Number of priors.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// True when there are no priors.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Prior boxes in prior order.
    pub fn boxes(&self) -> &[NormalizedBBox] {
        &self.boxes
    }

    /// Per-prior variances, parallel to [`PriorBoxes::boxes`].
    pub fn variances(&self) -> &[[f32; 4]] {
        &self.variances
    }
}
