//! Typed detections and the flat output table.

use crate::attribute::BASE_ROW_WIDTH;
use crate::bbox::NormalizedBBox;
use crate::util::{DetOutError, DetOutResult};

/// One kept detection.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Index of the image within the batch.
    pub image_id: usize,
    pub label: i32,
    pub score: f32,
    pub bbox: NormalizedBBox,
    /// Arg-max category per attribute head, in head order.
    pub attributes: Vec<usize>,
}

impl Detection {
    fn write_row(&self, row: &mut [f32]) {
        row[0] = self.image_id as f32;
        row[1] = self.label as f32;
        row[2] = self.score;
        row[3] = self.bbox.xmin;
        row[4] = self.bbox.ymin;
        row[5] = self.bbox.xmax;
        row[6] = self.bbox.ymax;
        for (dst, &category) in row[BASE_ROW_WIDTH..].iter_mut().zip(&self.attributes) {
            *dst = category as f32;
        }
    }
}

/// Output blob of shape `[1, 1, rows, row_width]`.
///
/// Each row is `[image_id, label, score, xmin, ymin, xmax, ymax, attrs...]`.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionTable {
    data: Vec<f32>,
    num_rows: usize,
    row_width: usize,
}

impl DetectionTable {
    /// Packs per-image detections into rows, images in batch order.
    ///
    /// When no image has a detection, one sentinel row per image is emitted
    /// with every field `-1` except the image id.
    pub fn assemble(per_image: &[Vec<Detection>], row_width: usize) -> DetOutResult<Self> {
        if row_width < BASE_ROW_WIDTH {
            return Err(DetOutError::ShapeMismatch {
                context: "output row width",
                expected: BASE_ROW_WIDTH,
                got: row_width,
            });
        }

        let total: usize = per_image.iter().map(Vec::len).sum();
        if total == 0 {
            return Ok(Self::sentinel(per_image.len(), row_width));
        }

        let mut data = vec![0.0f32; total * row_width];
        let mut rows = data.chunks_exact_mut(row_width);
        for det in per_image.iter().flatten() {
            if det.attributes.len() != row_width - BASE_ROW_WIDTH {
                return Err(DetOutError::ShapeMismatch {
                    context: "detection attribute count",
                    expected: row_width - BASE_ROW_WIDTH,
                    got: det.attributes.len(),
                });
            }
            // `data` holds exactly `total` rows.
            if let Some(row) = rows.next() {
                det.write_row(row);
            }
        }

        Ok(Self {
            data,
            num_rows: total,
            row_width,
        })
    }

    /// One all-`-1` row per image, carrying only the image id.
    pub fn sentinel(num_images: usize, row_width: usize) -> Self {
        let mut data = vec![-1.0f32; num_images * row_width];
        for (image_id, row) in data.chunks_exact_mut(row_width).enumerate() {
            row[0] = image_id as f32;
        }
        Self {
            data,
            num_rows: num_images,
            row_width,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn row_width(&self) -> usize {
        self.row_width
    }

    /// Blob shape `[1, 1, rows, row_width]`.
    pub fn shape(&self) -> [usize; 4] {
        [1, 1, self.num_rows, self.row_width]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Returns row `idx`, if present.
    pub fn row(&self, idx: usize) -> Option<&[f32]> {
        let start = idx.checked_mul(self.row_width)?;
        self.data.get(start..start + self.row_width)
    }

    /// Iterates rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.row_width)
    }

    /// True when the table holds only sentinel rows.
    pub fn is_empty_result(&self) -> bool {
        self.rows().all(|row| row[1] == -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{Detection, DetectionTable};
    use crate::bbox::NormalizedBBox;

    #[test]
    fn rows_carry_attributes_after_box() {
        let det = Detection {
            image_id: 1,
            label: 2,
            score: 0.75,
            bbox: NormalizedBBox::new(0.1, 0.2, 0.3, 0.4),
            attributes: vec![2, 0],
        };
        let table = DetectionTable::assemble(&[Vec::new(), vec![det]], 9).unwrap();
        assert_eq!(table.shape(), [1, 1, 1, 9]);
        assert_eq!(
            table.row(0).unwrap(),
            &[1.0, 2.0, 0.75, 0.1, 0.2, 0.3, 0.4, 2.0, 0.0]
        );
        assert!(!table.is_empty_result());
    }

    #[test]
    fn attribute_count_must_match_row_width() {
        let det = Detection {
            image_id: 0,
            label: 1,
            score: 0.5,
            bbox: NormalizedBBox::default(),
            attributes: vec![1],
        };
        assert!(DetectionTable::assemble(&[vec![det]], 7).is_err());
    }
}
