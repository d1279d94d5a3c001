//! Borrowed 4-D tensor views.
//!
//! `TensorView` wraps a contiguous `f32` buffer in `[num, channels, height,
//! width]` order, the blob convention used by the host runtime. The buffer
//! must hold exactly as many elements as the shape implies; per-item slices
//! are zero-copy views into the same backing slice.

use crate::util::math::checked_size;
use crate::util::{DetOutError, DetOutResult};

/// Shape of a 4-D blob in `[num, channels, height, width]` order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TensorShape {
    pub num: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl TensorShape {
    /// Creates a shape from its four extents.
    pub fn new(num: usize, channels: usize, height: usize, width: usize) -> Self {
        Self {
            num,
            channels,
            height,
            width,
        }
    }

    /// Returns the shape as an array.
    pub fn dims(&self) -> [usize; 4] {
        [self.num, self.channels, self.height, self.width]
    }

    /// Number of elements per batch item (`channels * height * width`).
    pub fn item_count(&self) -> DetOutResult<usize> {
        checked_size("tensor item count", &[self.channels, self.height, self.width])
    }

    /// Total number of elements.
    pub fn count(&self) -> DetOutResult<usize> {
        checked_size("tensor count", &[self.num, self.item_count()?])
    }
}

/// Borrowed, shape-checked view of a contiguous `f32` blob.
#[derive(Copy, Clone, Debug)]
pub struct TensorView<'a> {
    data: &'a [f32],
    shape: TensorShape,
}

impl<'a> TensorView<'a> {
    /// Creates a view over `data` with the given shape.
    ///
    /// Fails when the buffer length differs from the element count of `shape`.
    pub fn new(data: &'a [f32], shape: TensorShape) -> DetOutResult<Self> {
        let needed = shape.count()?;
        if data.len() != needed {
            return Err(DetOutError::ShapeMismatch {
                context: "tensor buffer length",
                expected: needed,
                got: data.len(),
            });
        }
        Ok(Self { data, shape })
    }

    /// Creates a view from a `[num, channels, height, width]` array.
    pub fn from_dims(data: &'a [f32], dims: [usize; 4]) -> DetOutResult<Self> {
        Self::new(data, TensorShape::new(dims[0], dims[1], dims[2], dims[3]))
    }

    /// Returns the tensor shape.
    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    /// Batch size.
    pub fn num(&self) -> usize {
        self.shape.num
    }

    /// Channels per item.
    pub fn channels(&self) -> usize {
        self.shape.channels
    }

    /// Height extent.
    pub fn height(&self) -> usize {
        self.shape.height
    }

    /// Width extent.
    pub fn width(&self) -> usize {
        self.shape.width
    }

    /// Returns the full backing slice.
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Returns the contiguous slice of batch item `n`.
    pub fn item(&self, n: usize) -> DetOutResult<&'a [f32]> {
        if n >= self.shape.num {
            return Err(DetOutError::IndexOutOfBounds {
                index: n,
                len: self.shape.num,
                context: "batch item",
            });
        }
        let stride = self.shape.item_count()?;
        let start = n * stride;
        self.data
            .get(start..start + stride)
            .ok_or(DetOutError::IndexOutOfBounds {
                index: start + stride,
                len: self.data.len(),
                context: "batch item",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{TensorShape, TensorView};
    use crate::util::DetOutError;

    #[test]
    fn item_slices_are_contiguous() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let view = TensorView::from_dims(&data, [3, 4, 1, 1]).unwrap();
        assert_eq!(view.item(1).unwrap(), &[4.0, 5.0, 6.0, 7.0]);
        assert!(view.item(3).is_err());
    }

    #[test]
    fn overflowing_shape_is_a_size_error() {
        let shape = TensorShape::new(2, usize::MAX, 2, 1);
        assert_eq!(
            shape.item_count(),
            Err(DetOutError::SizeOverflow {
                context: "tensor item count"
            })
        );
        let shape = TensorShape::new(usize::MAX, 2, 1, 1);
        assert_eq!(
            shape.count(),
            Err(DetOutError::SizeOverflow {
                context: "tensor count"
            })
        );
        assert!(TensorView::new(&[], shape).is_err());
    }

    #[test]
    fn shape_counts_multiply() {
        let shape = TensorShape::new(2, 3, 4, 5);
        assert_eq!(shape.item_count().unwrap(), 60);
        assert_eq!(shape.count().unwrap(), 120);
        assert_eq!(shape.dims(), [2, 3, 4, 5]);
    }
}
