//! Auxiliary per-box attribute heads.
//!
//! Some detectors carry extra per-prior classification heads next to the
//! main class scores: blur and occlusion levels for faces, or the seven
//! character positions of a license plate. Each head is resolved on its
//! own by taking the arg-max category at the detection's prior index.

use crate::extract::LabelScores;
use crate::util::math::argmax_from_zero;
use crate::util::{DetOutError, DetOutResult};

/// Number of leading columns in every output row:
/// `[image_id, label, score, xmin, ymin, xmax, ymax]`.
pub const BASE_ROW_WIDTH: usize = 7;

/// Positional letter heads of a license plate.
pub const PLATE_LETTER_HEADS: usize = 5;

/// Which auxiliary heads the network produces, with their category counts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AttributeMode {
    /// Boxes and classes only.
    #[default]
    None,
    /// Blur then occlusion level per face.
    Face {
        blur_width: usize,
        occlusion_width: usize,
    },
    /// Province character, region letter, then five positional letters.
    LicensePlate {
        chinese_width: usize,
        english_width: usize,
        letter_width: usize,
    },
}

/// One auxiliary head as seen by the pipeline.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AttributeHead {
    /// Head name used in error messages and logs.
    pub name: &'static str,
    /// Number of categories the head scores per prior.
    pub width: usize,
}

const LETTER_NAMES: [&str; PLATE_LETTER_HEADS] =
    ["letter_1", "letter_2", "letter_3", "letter_4", "letter_5"];

impl AttributeMode {
    /// Face mode with three blur and three occlusion levels.
    pub fn face() -> Self {
        Self::Face {
            blur_width: 3,
            occlusion_width: 3,
        }
    }

    /// Heads in the order their tensors follow the prior tensor and their
    /// values appear in output rows.
    pub fn heads(&self) -> Vec<AttributeHead> {
        match *self {
            Self::None => Vec::new(),
            Self::Face {
                blur_width,
                occlusion_width,
            } => vec![
                AttributeHead {
                    name: "blur",
                    width: blur_width,
                },
                AttributeHead {
                    name: "occlusion",
                    width: occlusion_width,
                },
            ],
            Self::LicensePlate {
                chinese_width,
                english_width,
                letter_width,
            } => {
                let mut heads = vec![
                    AttributeHead {
                        name: "chinese",
                        width: chinese_width,
                    },
                    AttributeHead {
                        name: "english",
                        width: english_width,
                    },
                ];
                heads.extend(LETTER_NAMES.iter().map(|&name| AttributeHead {
                    name,
                    width: letter_width,
                }));
                heads
            }
        }
    }

    pub fn num_heads(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Face { .. } => 2,
            Self::LicensePlate { .. } => 2 + PLATE_LETTER_HEADS,
        }
    }

    /// Width of one output row: 7, 9 (face), or 14 (plate).
    pub fn row_width(&self) -> usize {
        BASE_ROW_WIDTH + self.num_heads()
    }

    /// Rejects heads with no categories.
    pub fn validate(&self) -> DetOutResult<()> {
        let field = match self {
            Self::None => return Ok(()),
            Self::Face { .. } => "attributes.face",
            Self::LicensePlate { .. } => "attributes.license_plate",
        };
        if self.heads().iter().any(|head| head.width == 0) {
            return Err(DetOutError::Configuration {
                field,
                reason: "attribute heads need at least one category",
            });
        }
        Ok(())
    }
}

/// Arg-max category of one head at `prior_idx`.
///
/// The running best starts at `(0, 0.0)` and only moves on a strictly larger
/// score, so ties resolve to the lowest category.
pub fn argmax_category(
    scores: &LabelScores,
    width: usize,
    prior_idx: usize,
) -> DetOutResult<usize> {
    let mut values = Vec::with_capacity(width);
    for category in 0..width {
        let list = scores.get(category as i32, "attribute scores")?;
        let value = list.get(prior_idx).ok_or(DetOutError::IndexOutOfBounds {
            index: prior_idx,
            len: list.len(),
            context: "attribute prior index",
        })?;
        values.push(*value);
    }
    Ok(argmax_from_zero(values))
}

/// Resolves every head for the detection at `prior_idx`, in head order.
///
/// `head_scores` and `heads` are parallel slices.
pub fn resolve_attributes(
    head_scores: &[LabelScores],
    heads: &[AttributeHead],
    prior_idx: usize,
) -> DetOutResult<Vec<usize>> {
    if head_scores.len() != heads.len() {
        return Err(DetOutError::ShapeMismatch {
            context: "attribute head count",
            expected: heads.len(),
            got: head_scores.len(),
        });
    }
    head_scores
        .iter()
        .zip(heads)
        .map(|(scores, head)| argmax_category(scores, head.width, prior_idx))
        .collect()
}
