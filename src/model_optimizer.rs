use ndarray::{Array2, ArrayView2};
use rand::{SeedableRng, rngs::StdRng};

use crate::arch::Model;
use crate::error::{Result, TrainErr};
use crate::optimization::{Optimizer, OptimizerState};

/// A named pairing of a model, its parameter and gradient buffers, and the
/// optimizer that updates them.
///
/// This is the unit that trainers train and checkpoint stores persist. The
/// `epochs_trained` counter travels with the parameters so bookkeeping stays
/// consistent across clones, saves, and restores.
pub struct ModelOptimizer<M, O>
where
    M: Model,
    O: Optimizer,
{
    name: String,
    model: M,
    optimizer: O,
    params: Vec<f32>,
    grad: Vec<f32>,
    epochs_trained: usize,
}

impl<M, O> ModelOptimizer<M, O>
where
    M: Model,
    O: Optimizer,
{
    /// Creates a new `ModelOptimizer` with freshly drawn parameters.
    ///
    /// # Arguments
    /// * `name` - The name this model is tracked and persisted under.
    /// * `model` - The model to wrap.
    /// * `optimizer` - The optimizer applied on every `backward_step`.
    /// * `seed` - Fixes the parameter draw when given.
    ///
    /// # Errors
    /// Returns `TrainErr::SizeMismatch` if the model draws a parameter buffer
    /// that disagrees with its own `size`.
    pub fn new(name: &str, model: M, optimizer: O, seed: Option<u64>) -> Result<Self> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let params = model.init_params(&mut rng);

        if params.len() != model.size() {
            return Err(TrainErr::SizeMismatch {
                what: "params",
                got: params.len(),
                expected: model.size(),
            });
        }

        let grad = vec![0.0; params.len()];

        Ok(Self {
            name: name.to_string(),
            model,
            optimizer,
            params,
            grad,
            epochs_trained: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    pub fn epochs_trained(&self) -> usize {
        self.epochs_trained
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    /// Snapshot of the optimizer internals, for persistence.
    pub fn optimizer_state(&self) -> OptimizerState {
        self.optimizer.state()
    }

    /// Runs the model on a batch without touching any state besides the
    /// forward caches.
    pub fn forward(&mut self, x: Array2<f32>) -> Result<Array2<f32>> {
        self.model.forward(&self.params, x)
    }

    /// Convenience wrapper over `forward` for borrowed inputs.
    pub fn predict(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.forward(x.to_owned())
    }

    /// Backpropagates a loss derivative through the last forwarded batch and
    /// applies one optimizer update.
    pub fn backward_step(&mut self, d: Array2<f32>) -> Result<()> {
        self.grad.fill(0.0);
        self.model.backward(&self.params, &mut self.grad, d)?;
        self.optimizer.update_params(&self.grad, &mut self.params)
    }

    pub(crate) fn bump_epoch(&mut self) {
        self.epochs_trained += 1;
    }

    /// Overwrites parameters, optimizer internals, and the epoch counter with
    /// a persisted snapshot.
    pub(crate) fn import_snapshot(
        &mut self,
        params: Vec<f32>,
        epochs_trained: usize,
        optimizer: OptimizerState,
    ) -> Result<()> {
        if params.len() != self.params.len() {
            return Err(TrainErr::SizeMismatch {
                what: "params",
                got: params.len(),
                expected: self.params.len(),
            });
        }

        self.optimizer.restore(optimizer)?;
        self.params = params;
        self.epochs_trained = epochs_trained;

        Ok(())
    }
}

impl<M, O> ModelOptimizer<M, O>
where
    M: Model + Clone,
    O: Optimizer + Clone,
{
    /// Deep-copies this wrapper, parameters and optimizer state included,
    /// under a new name.
    ///
    /// The copy starts with a zeroed epoch counter: it keeps the learned
    /// parameters but begins its own history under the new name.
    pub fn clone_as(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            model: self.model.clone(),
            optimizer: self.optimizer.clone(),
            params: self.params.clone(),
            grad: vec![0.0; self.grad.len()],
            epochs_trained: 0,
        }
    }
}
