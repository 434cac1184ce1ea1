use ndarray::Array2;
use rand::Rng;

use super::{Model, activations::ActFn, layers::Layer};
use crate::error::{Result, TrainErr};

/// A sequential model: information flows forward when computing an output and
/// backward when computing the deltas of its layers.
#[derive(Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    /// Builds a multilayer perceptron from consecutive widths, applying
    /// `act_fn` after every layer.
    ///
    /// # Panics
    /// Panics if fewer than two widths are given.
    pub fn mlp(widths: &[usize], act_fn: ActFn) -> Self {
        assert!(widths.len() >= 2, "an mlp needs at least two widths");

        Self::new(
            widths
                .windows(2)
                .map(|w| Layer::dense((w[0], w[1]), Some(act_fn))),
        )
    }

}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32> {
        self.layers
            .iter()
            .flat_map(|layer| layer.init_params(rng))
            .collect()
    }

    fn forward(&mut self, params: &[f32], x: Array2<f32>) -> Result<Array2<f32>> {
        if params.len() != self.size() {
            return Err(TrainErr::SizeMismatch {
                what: "params",
                got: params.len(),
                expected: self.size(),
            });
        }

        let mut rest = params;
        let mut x = x;

        for layer in &mut self.layers {
            let (head, tail) = rest.split_at(layer.size());
            x = layer.forward(head, x)?;
            rest = tail;
        }

        Ok(x)
    }

    fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        let size = self.size();

        if params.len() != size {
            return Err(TrainErr::SizeMismatch {
                what: "params",
                got: params.len(),
                expected: size,
            });
        }

        if grad.len() != size {
            return Err(TrainErr::SizeMismatch {
                what: "grad",
                got: grad.len(),
                expected: size,
            });
        }

        let mut end = size;

        for layer in self.layers.iter_mut().rev() {
            let start = end - layer.size();
            d = layer.backward(&params[start..end], &mut grad[start..end], d)?;
            end = start;
        }

        Ok(d)
    }
}
