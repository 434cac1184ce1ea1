use super::{Optimizer, OptimizerState};
use crate::error::{Result, TrainErr};

const KIND: &str = "momentum";

/// Gradient descent with momentum.
#[derive(Debug, Clone)]
pub struct Momentum {
    learning_rate: f32,
    momentum: f32,
    velocity: Box<[f32]>,
}

impl Momentum {
    /// Creates a new `Momentum` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - Hyperparameter to the optimization algorithm.
    pub fn new(len: usize, learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for Momentum {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        if grad.len() != params.len() {
            return Err(TrainErr::SizeMismatch {
                what: "grad",
                got: grad.len(),
                expected: params.len(),
            });
        }

        if self.velocity.len() != params.len() {
            return Err(TrainErr::SizeMismatch {
                what: "velocity",
                got: self.velocity.len(),
                expected: params.len(),
            });
        }

        let lr = self.learning_rate;
        let mu = self.momentum;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.velocity.iter_mut())
            .for_each(|((p, g), v)| {
                *v = (mu * *v) + g;
                *p -= lr * *v;
            });

        Ok(())
    }

    fn state(&self) -> OptimizerState {
        OptimizerState::new(KIND).with_buffer("velocity", &self.velocity)
    }

    fn restore(&mut self, mut state: OptimizerState) -> Result<()> {
        state.expect_kind(KIND)?;
        self.velocity = state.take_buffer("velocity", self.velocity.len())?.into();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_equals_plain_gradient_descent() {
        let mut opt = Momentum::new(2, 0.1, 0.9);
        let mut params = [1.0, 1.0];

        opt.update_params(&[1.0, -1.0], &mut params).unwrap();
        assert_eq!(params, [0.9, 1.1]);
    }

    #[test]
    fn velocity_accumulates_across_steps() {
        let mut opt = Momentum::new(1, 0.1, 0.5);
        let mut params = [0.0];

        opt.update_params(&[1.0], &mut params).unwrap();
        opt.update_params(&[1.0], &mut params).unwrap();

        // v1 = 1, v2 = 1.5, total step = 0.1 * 2.5
        assert!((params[0] + 0.25).abs() < 1e-6);
    }

    #[test]
    fn restore_rejects_foreign_state() {
        let mut opt = Momentum::new(1, 0.1, 0.5);
        let state = OptimizerState::new("adam");

        assert!(opt.restore(state).is_err());
    }
}
