use super::{Optimizer, OptimizerState};
use crate::error::{Result, TrainErr};

const KIND: &str = "gradient_descent";

/// Gradient descent optimization algorithm.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Returns a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on `update_params`.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    /// Updates the parameters by making a step in the opposite direction of
    /// the gradient, with a length of `learning_rate`.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        if grad.len() != params.len() {
            return Err(TrainErr::SizeMismatch {
                what: "grad",
                got: grad.len(),
                expected: params.len(),
            });
        }

        let lr = self.learning_rate;

        for (w, g) in params.iter_mut().zip(grad) {
            *w -= lr * g;
        }

        Ok(())
    }

    fn state(&self) -> OptimizerState {
        OptimizerState::new(KIND)
    }

    fn restore(&mut self, state: OptimizerState) -> Result<()> {
        state.expect_kind(KIND)
    }
}
