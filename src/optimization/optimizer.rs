use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainErr};

/// An optimization algorithm that turns gradients into parameter updates.
pub trait Optimizer {
    /// Applies one update step to `params` using `grad`.
    ///
    /// # Errors
    /// Returns `TrainErr::SizeMismatch` when the buffer lengths disagree.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;

    /// Exports the mutable internals (moment buffers, step counters) for
    /// persistence. Hyperparameters are construction-time and not included.
    fn state(&self) -> OptimizerState;

    /// Restores internals previously exported by `state`.
    ///
    /// # Errors
    /// Returns `TrainErr::CheckpointFormat` when the state belongs to another
    /// algorithm or its buffers have the wrong length.
    fn restore(&mut self, state: OptimizerState) -> Result<()>;
}

/// Serializable snapshot of an optimizer's internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerState {
    pub kind: String,
    pub scalars: BTreeMap<String, f32>,
    pub buffers: BTreeMap<String, Vec<f32>>,
}

impl OptimizerState {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            scalars: BTreeMap::new(),
            buffers: BTreeMap::new(),
        }
    }

    pub fn with_scalar(mut self, name: &str, value: f32) -> Self {
        self.scalars.insert(name.to_string(), value);
        self
    }

    pub fn with_buffer(mut self, name: &str, values: &[f32]) -> Self {
        self.buffers.insert(name.to_string(), values.to_vec());
        self
    }

    /// Checks that the snapshot was produced by the named algorithm.
    pub fn expect_kind(&self, kind: &str) -> Result<()> {
        if self.kind != kind {
            return Err(TrainErr::CheckpointFormat(format!(
                "optimizer state is {}, expected {kind}",
                self.kind
            )));
        }
        Ok(())
    }

    /// Removes a buffer, checking its length.
    pub fn take_buffer(&mut self, name: &str, len: usize) -> Result<Vec<f32>> {
        let buffer = self
            .buffers
            .remove(name)
            .ok_or_else(|| TrainErr::CheckpointFormat(format!("missing buffer {name}")))?;

        if buffer.len() != len {
            return Err(TrainErr::CheckpointFormat(format!(
                "buffer {name} has {} element(s), expected {len}",
                buffer.len()
            )));
        }

        Ok(buffer)
    }

    pub fn scalar(&self, name: &str) -> Result<f32> {
        self.scalars
            .get(name)
            .copied()
            .ok_or_else(|| TrainErr::CheckpointFormat(format!("missing scalar {name}")))
    }
}
