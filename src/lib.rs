//! detout is a CPU-first implementation of SSD-style detection output layers.
//!
//! The main entry point is [`DetectionOutput`], which turns per-prior
//! location offsets and class confidences into a deduplicated detection
//! table, optionally annotated with auxiliary attribute heads (face blur and
//! occlusion, or license plate characters). A [`Swish`] activation layer is
//! provided alongside. Per-image processing can run on the rayon pool via
//! the `rayon` feature.

pub mod activation;
pub mod attribute;
pub mod bbox;
mod candidate;
pub mod extract;
pub mod layer;
pub mod lowlevel;
pub mod tensor;
mod trace;
pub mod util;

pub use activation::{swish, Swish};
pub use attribute::{AttributeHead, AttributeMode};
pub use bbox::{CodeType, NormalizedBBox, PriorBoxes};
pub use extract::LabelIndexed;
pub use layer::{
    BatchLayout, Detection, DetectionInputs, DetectionOutput, DetectionOutputConfig,
    DetectionTable, InputShapes, NmsConfig,
};
pub use tensor::{TensorShape, TensorView};
pub use util::{DetOutError, DetOutResult};
