use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use safetensors::SafeTensors;
use safetensors::tensor::{Dtype, TensorView};
use serde::{Deserialize, Serialize};

use crate::arch::Model;
use crate::error::{Result, TrainErr};
use crate::model_optimizer::ModelOptimizer;
use crate::optimization::{Optimizer, OptimizerState};

const PARAMS_TENSOR: &str = "params";

/// Sidecar payload describing one checkpoint.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointMeta {
    model: String,
    epoch: usize,
    num_params: usize,
    saved_at: u64,
}

/// Epoch-keyed persistence for one named model.
///
/// Binding captures the model's name and parameter count; every later call is
/// validated against them, so a store can never serve a model it was not
/// bound to. Each checkpoint is three sibling files keyed by epoch: the
/// parameter tensor (`model_{epoch}.safetensors`), the optimizer internals
/// (`optimizer_{epoch}.json`), and the metadata (`meta_{epoch}.json`).
pub struct CheckpointIO {
    dir: PathBuf,
    model_name: String,
    num_params: usize,
}

impl CheckpointIO {
    /// Binds a model to a checkpoint directory, creating it if needed.
    pub fn bind<M, O, P>(model: &ModelOptimizer<M, O>, dir: P) -> Result<Self>
    where
        M: Model,
        O: Optimizer,
        P: AsRef<Path>,
    {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            model_name: model.name().to_string(),
            num_params: model.num_params(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a checkpoint keyed by the model's current epoch counter.
    ///
    /// # Returns
    /// The epoch the checkpoint was stored under.
    pub fn save<M, O>(&self, model: &ModelOptimizer<M, O>) -> Result<usize>
    where
        M: Model,
        O: Optimizer,
    {
        self.check_name(model.name())?;

        let epoch = model.epochs_trained();

        let bytes: &[u8] = bytemuck::cast_slice(model.params());
        let view = TensorView::new(Dtype::F32, vec![model.num_params()], bytes)?;
        safetensors::serialize_to_file([(PARAMS_TENSOR, view)], &None, &self.params_path(epoch))?;

        fs::write(
            self.optimizer_path(epoch),
            serde_json::to_string_pretty(&model.optimizer_state())?,
        )?;

        let meta = CheckpointMeta {
            model: self.model_name.clone(),
            epoch,
            num_params: self.num_params,
            saved_at: unix_seconds(),
        };
        fs::write(self.meta_path(epoch), serde_json::to_string_pretty(&meta)?)?;

        debug!(epoch = epoch; "saved checkpoint for {}", self.model_name);
        Ok(epoch)
    }

    /// Restores the checkpoint stored under `epoch` into the model.
    pub fn load<M, O>(&self, model: &mut ModelOptimizer<M, O>, epoch: usize) -> Result<()>
    where
        M: Model,
        O: Optimizer,
    {
        self.check_name(model.name())?;

        let params_path = self.params_path(epoch);
        if !params_path.exists() {
            return Err(TrainErr::CheckpointNotFound {
                dir: self.dir.clone(),
            });
        }

        let meta: CheckpointMeta =
            serde_json::from_str(&fs::read_to_string(self.meta_path(epoch))?)?;

        if meta.model != self.model_name {
            return Err(TrainErr::ModelNameMismatch {
                bound: self.model_name.clone(),
                got: meta.model,
            });
        }

        if meta.num_params != self.num_params {
            return Err(TrainErr::CheckpointFormat(format!(
                "checkpoint holds {} parameter(s), expected {}",
                meta.num_params, self.num_params
            )));
        }

        let raw = fs::read(&params_path)?;
        let tensors = SafeTensors::deserialize(&raw)?;
        let view = tensors.tensor(PARAMS_TENSOR)?;

        if view.dtype() != Dtype::F32 {
            return Err(TrainErr::CheckpointFormat(format!(
                "parameter tensor is {:?}, expected F32",
                view.dtype()
            )));
        }

        let params: Vec<f32> = bytemuck::pod_collect_to_vec(view.data());

        let state: OptimizerState =
            serde_json::from_str(&fs::read_to_string(self.optimizer_path(epoch))?)?;

        model.import_snapshot(params, meta.epoch, state)?;

        debug!(epoch = epoch; "restored checkpoint for {}", self.model_name);
        Ok(())
    }

    /// Restores the newest checkpoint in the directory.
    ///
    /// # Returns
    /// The epoch that was restored.
    ///
    /// # Errors
    /// Returns `TrainErr::CheckpointNotFound` when the directory holds no
    /// checkpoint at all.
    pub fn load_last<M, O>(&self, model: &mut ModelOptimizer<M, O>) -> Result<usize>
    where
        M: Model,
        O: Optimizer,
    {
        let epoch = self
            .last_epoch()?
            .ok_or_else(|| TrainErr::CheckpointNotFound {
                dir: self.dir.clone(),
            })?;

        self.load(model, epoch)?;
        Ok(epoch)
    }

    /// The highest epoch any stored checkpoint is keyed by, if one exists.
    pub fn last_epoch(&self) -> Result<Option<usize>> {
        let mut last = None;

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();

            let Some(name) = file_name.to_str() else {
                continue;
            };

            let Some(epoch) = name
                .strip_prefix("model_")
                .and_then(|rest| rest.strip_suffix(".safetensors"))
                .and_then(|digits| digits.parse::<usize>().ok())
            else {
                continue;
            };

            last = last.max(Some(epoch));
        }

        Ok(last)
    }

    fn check_name(&self, got: &str) -> Result<()> {
        if got != self.model_name {
            return Err(TrainErr::ModelNameMismatch {
                bound: self.model_name.clone(),
                got: got.to_string(),
            });
        }
        Ok(())
    }

    fn params_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_{epoch}.safetensors"))
    }

    fn optimizer_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("optimizer_{epoch}.json"))
    }

    fn meta_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("meta_{epoch}.json"))
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
