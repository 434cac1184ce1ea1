use ndarray::Array2;
use rand::Rng;

use crate::error::Result;

/// A pure computational model over a flat parameter buffer.
///
/// A `Model` defines how to evaluate a function and how to turn an output
/// error signal into parameter gradients. It does not own parameters, access
/// datasets, or run training loops.
pub trait Model {
    /// Returns the number of scalar parameters expected in `params` and `grad`.
    fn size(&self) -> usize;

    /// Draws a fresh parameter buffer of exactly `size` elements.
    fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32>;

    /// Computes the model output for a batch of inputs, one row per sample.
    ///
    /// Implementations may cache per-layer state for the next `backward` call.
    ///
    /// # Errors
    /// Returns `TrainErr::SizeMismatch` if `params` or `x` have the wrong shape.
    fn forward(&mut self, params: &[f32], x: Array2<f32>) -> Result<Array2<f32>>;

    /// Accumulates gradients into `grad` given the loss derivative `d` with
    /// respect to the output of the last `forward` call, and returns the
    /// derivative with respect to the input.
    ///
    /// # Errors
    /// Returns `TrainErr::SizeMismatch` if buffer lengths or `d` do not match.
    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>)
    -> Result<Array2<f32>>;
}
