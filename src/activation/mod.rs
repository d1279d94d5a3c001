//! Swish activation: `y = x * sigmoid(beta * x)`.

use crate::util::math::sigmoid;
use crate::util::{DetOutError, DetOutResult};

/// Swish with a fixed `beta`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Swish {
    pub beta: f32,
}

impl Default for Swish {
    fn default() -> Self {
        Self { beta: 1.0 }
    }
}

/// Swish of a single value.
#[inline]
pub fn swish(x: f32, beta: f32) -> f32 {
    sigmoid(beta * x) * x
}

fn check_len(context: &'static str, expected: usize, got: usize) -> DetOutResult<()> {
    if expected != got {
        return Err(DetOutError::ShapeMismatch {
            context,
            expected,
            got,
        });
    }
    Ok(())
}

impl Swish {
    pub fn new(beta: f32) -> Self {
        Self { beta }
    }

    /// Derivative of swish at `x`.
    #[inline]
    pub fn derivative(&self, x: f32) -> f32 {
        let s = sigmoid(self.beta * x);
        s + self.beta * x * s * (1.0 - s)
    }

    /// Elementwise forward pass into `output`.
    pub fn forward(&self, input: &[f32], output: &mut [f32]) -> DetOutResult<()> {
        check_len("swish output", input.len(), output.len())?;
        for (y, &x) in output.iter_mut().zip(input) {
            *y = swish(x, self.beta);
        }
        Ok(())
    }

    /// Forward pass into a new buffer.
    pub fn forward_vec(&self, input: &[f32]) -> Vec<f32> {
        input.iter().map(|&x| swish(x, self.beta)).collect()
    }

    /// Backward pass: `bottom_diff = top_diff * swish'(bottom_data)`.
    pub fn backward(
        &self,
        bottom_data: &[f32],
        top_diff: &[f32],
        bottom_diff: &mut [f32],
    ) -> DetOutResult<()> {
        check_len("swish top diff", bottom_data.len(), top_diff.len())?;
        check_len("swish bottom diff", bottom_data.len(), bottom_diff.len())?;
        for ((dx, &x), &dy) in bottom_diff.iter_mut().zip(bottom_data).zip(top_diff) {
            *dx = dy * self.derivative(x);
        }
        Ok(())
    }
}
