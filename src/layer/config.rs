//! Detection output configuration.

use crate::attribute::AttributeMode;
use crate::bbox::CodeType;
use crate::util::{DetOutError, DetOutResult};

/// Per-class non-maximum suppression settings.
#[derive(Clone, Debug, PartialEq)]
pub struct NmsConfig {
    /// IoU at or above which a lower-scoring box is suppressed.
    pub nms_threshold: f32,
    /// Adaptive threshold decay in `(0, 1]`; 1 disables decay.
    pub eta: f32,
    /// Candidates per class considered before suppression (`None` = all).
    pub top_k: Option<usize>,
}

impl Default for NmsConfig {
    fn default() -> Self {
        Self {
            nms_threshold: 0.3,
            eta: 1.0,
            top_k: None,
        }
    }
}

impl NmsConfig {
    /// Validates threshold ranges.
    pub fn validate(&self) -> DetOutResult<()> {
        if !self.nms_threshold.is_finite() || self.nms_threshold < 0.0 {
            return Err(DetOutError::Configuration {
                field: "nms.nms_threshold",
                reason: "must be finite and non-negative",
            });
        }
        if self.eta.is_nan() || self.eta <= 0.0 || self.eta > 1.0 {
            return Err(DetOutError::Configuration {
                field: "nms.eta",
                reason: "must be in (0, 1]",
            });
        }
        Ok(())
    }
}

/// Configuration for [`DetectionOutput`](crate::DetectionOutput).
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionOutputConfig {
    /// Number of classes including background. Required.
    pub num_classes: Option<usize>,
    /// Auxiliary attribute heads following the prior tensor.
    pub attributes: AttributeMode,
    /// One set of location offsets shared by every class.
    pub share_location: bool,
    /// Class excluded from suppression and output.
    pub background_label_id: i32,
    /// Codec used to decode location offsets.
    pub code_type: CodeType,
    /// Variance already folded into the regression target.
    pub variance_encoded_in_target: bool,
    /// Detections kept per image across classes (`None` = all).
    pub keep_top_k: Option<usize>,
    /// Only scores strictly above this value are considered.
    pub confidence_threshold: f32,
    pub nms: NmsConfig,
    /// Process batch images on the rayon pool (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for DetectionOutputConfig {
    fn default() -> Self {
        Self {
            num_classes: None,
            attributes: AttributeMode::None,
            share_location: true,
            background_label_id: 0,
            code_type: CodeType::Corner,
            variance_encoded_in_target: false,
            keep_top_k: None,
            confidence_threshold: f32::MIN,
            nms: NmsConfig::default(),
            parallel: false,
        }
    }
}

impl DetectionOutputConfig {
    /// Default configuration for `num_classes` classes.
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes: Some(num_classes),
            ..Self::default()
        }
    }

    /// Validates the configuration and returns the class count.
    pub fn validate(&self) -> DetOutResult<usize> {
        let num_classes = self.num_classes.ok_or(DetOutError::Configuration {
            field: "num_classes",
            reason: "must be specified",
        })?;
        if num_classes == 0 {
            return Err(DetOutError::Configuration {
                field: "num_classes",
                reason: "must be at least 1",
            });
        }
        if self.confidence_threshold.is_nan() {
            return Err(DetOutError::Configuration {
                field: "confidence_threshold",
                reason: "must be a number",
            });
        }
        self.nms.validate()?;
        self.attributes.validate()?;
        Ok(num_classes)
    }
}
