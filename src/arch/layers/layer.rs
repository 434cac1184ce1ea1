use ndarray::Array2;
use rand::Rng;

use super::Dense;
use crate::arch::activations::ActFn;
use crate::error::Result;
use Layer::*;

/// A model layer.
#[derive(Clone)]
pub enum Layer {
    Dense(Dense),
}

impl Layer {
    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self::Dense(Dense::new(dim, act_fn))
    }

    pub fn size(&self) -> usize {
        match self {
            Dense(l) => l.size(),
        }
    }

    pub fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32> {
        match self {
            Dense(l) => l.init_params(rng),
        }
    }

    pub fn forward(&mut self, params: &[f32], x: Array2<f32>) -> Result<Array2<f32>> {
        match self {
            Dense(l) => l.forward(params, x),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        match self {
            Dense(l) => l.backward(params, grad, d),
        }
    }
}
