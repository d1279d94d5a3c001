//! Normalized bounding boxes, prior boxes, and box codecs.

mod codec;
mod prior;

pub use codec::{decode_bbox, encode_bbox, CodeType};
pub use prior::PriorBoxes;

/// Axis-aligned box in normalized image coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct NormalizedBBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl NormalizedBBox {
    /// Creates a box from its corners.
    pub const fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Builds a box from the first four values of `values`, in
    /// `xmin, ymin, xmax, ymax` order.
    pub(crate) fn from_slice(values: &[f32]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    /// Box center as `(cx, cy)`.
    pub fn center(&self) -> (f32, f32) {
        ((self.xmin + self.xmax) / 2.0, (self.ymin + self.ymax) / 2.0)
    }

    /// Area of the box; inverted boxes have zero area.
    pub fn size(&self) -> f32 {
        if self.xmax < self.xmin || self.ymax < self.ymin {
            return 0.0;
        }
        self.width() * self.height()
    }

    /// Intersection of two boxes; disjoint boxes yield the empty box.
    pub fn intersect(&self, other: &Self) -> Self {
        if other.xmin > self.xmax
            || other.xmax < self.xmin
            || other.ymin > self.ymax
            || other.ymax < self.ymin
        {
            return Self::default();
        }
        Self::new(
            self.xmin.max(other.xmin),
            self.ymin.max(other.ymin),
            self.xmax.min(other.xmax),
            self.ymax.min(other.ymax),
        )
    }

    /// Intersection over union with `other`, in `[0, 1]`.
    pub fn jaccard_overlap(&self, other: &Self) -> f32 {
        let inter = self.intersect(other);
        let inter_size = inter.size();
        if inter_size <= 0.0 {
            return 0.0;
        }
        let union = self.size() + other.size() - inter_size;
        if union <= 0.0 {
            return 0.0;
        }
        inter_size / union
    }
}

#[cfg(test)]
mod tests {
    use super::NormalizedBBox;

    #[test]
    fn disjoint_boxes_do_not_overlap() {
        let a = NormalizedBBox::new(0.0, 0.0, 0.2, 0.2);
        let b = NormalizedBBox::new(0.5, 0.5, 0.7, 0.7);
        assert_eq!(a.intersect(&b), NormalizedBBox::default());
        assert_eq!(a.jaccard_overlap(&b), 0.0);
    }

    #[test]
    fn half_shifted_boxes_overlap_by_a_third() {
        let a = NormalizedBBox::new(0.0, 0.0, 0.2, 0.1);
        let b = NormalizedBBox::new(0.1, 0.0, 0.3, 0.1);
        assert!((a.jaccard_overlap(&b) - 1.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn inverted_box_has_zero_size() {
        let a = NormalizedBBox::new(0.5, 0.5, 0.1, 0.9);
        assert_eq!(a.size(), 0.0);
    }
}
