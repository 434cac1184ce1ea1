use super::{Optimizer, OptimizerState};
use crate::error::{Result, TrainErr};

const KIND: &str = "adam";

/// The Adam optimization algorithm.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    beta2_t: f32,
    v: Box<[f32]>,
    s: Box<[f32]>,
    epsilon: f32,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            beta1_t: 1.,
            beta2_t: 1.,
            v: vec![0.; len].into_boxed_slice(),
            s: vec![0.; len].into_boxed_slice(),
            epsilon,
        }
    }

    /// `Adam` with the usual defaults for everything but the learning rate.
    pub fn with_defaults(len: usize, learning_rate: f32) -> Self {
        Self::new(len, learning_rate, 0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        if grad.len() != params.len() {
            return Err(TrainErr::SizeMismatch {
                what: "grad",
                got: grad.len(),
                expected: params.len(),
            });
        }

        if self.v.len() != params.len() {
            return Err(TrainErr::SizeMismatch {
                what: "moments",
                got: self.v.len(),
                expected: params.len(),
            });
        }

        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let bc1 = 1. - self.beta1_t;
        let bc2 = 1. - self.beta2_t;
        let step_size = lr * (bc2.sqrt() / bc1);

        params
            .iter_mut()
            .zip(grad)
            .zip(self.v.iter_mut())
            .zip(self.s.iter_mut())
            .for_each(|(((p, g), v), s)| {
                *v = b1 * *v + (1. - b1) * g;
                *s = b2 * *s + (1. - b2) * g.powi(2);
                *p -= step_size * *v / (s.sqrt() + eps);
            });

        Ok(())
    }

    fn state(&self) -> OptimizerState {
        OptimizerState::new(KIND)
            .with_scalar("beta1_t", self.beta1_t)
            .with_scalar("beta2_t", self.beta2_t)
            .with_buffer("v", &self.v)
            .with_buffer("s", &self.s)
    }

    fn restore(&mut self, mut state: OptimizerState) -> Result<()> {
        state.expect_kind(KIND)?;

        self.beta1_t = state.scalar("beta1_t")?;
        self.beta2_t = state.scalar("beta2_t")?;
        self.v = state.take_buffer("v", self.v.len())?.into();
        self.s = state.take_buffer("s", self.s.len())?.into();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_has_learning_rate_magnitude() {
        let mut opt = Adam::with_defaults(1, 0.01);
        let mut params = [1.0];

        opt.update_params(&[0.5], &mut params).unwrap();

        // Bias correction makes the very first step ~lr * sign(g).
        assert!((params[0] - (1.0 - 0.01)).abs() < 1e-4);
    }

    #[test]
    fn restored_state_reproduces_the_same_trajectory() {
        let mut a = Adam::with_defaults(2, 0.01);
        let mut pa = [1.0, -1.0];

        a.update_params(&[0.3, -0.7], &mut pa).unwrap();
        let snapshot = a.state();

        let mut b = Adam::with_defaults(2, 0.01);
        let mut pb = pa;
        b.restore(snapshot).unwrap();

        a.update_params(&[0.1, 0.1], &mut pa).unwrap();
        b.update_params(&[0.1, 0.1], &mut pb).unwrap();

        assert_eq!(pa, pb);
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut opt = Adam::with_defaults(3, 0.01);
        let mut params = [0.1, 0.2, 0.3];
        opt.update_params(&[1.0, -1.0, 0.5], &mut params).unwrap();

        let json = serde_json::to_string(&opt.state()).unwrap();
        let back: OptimizerState = serde_json::from_str(&json).unwrap();

        assert_eq!(back, opt.state());
    }
}
