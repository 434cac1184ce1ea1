use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::MetricLog;
use crate::error::Result;

/// How many array elements survive into the recorded configuration.
///
/// Keeps datasets and other bulk values from leaking into `config.json`.
const MAX_CONFIG_ITEMS: usize = 10;

/// The phase a metric row was produced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Train,
    Val,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Train => "train",
            Phase::Val => "val",
        }
    }
}

/// Train- and validation-phase histories for one model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PhaseLogs {
    train: MetricLog,
    val: MetricLog,
}

/// A named experiment: a directory, a recorded configuration, and per-model
/// metric histories.
///
/// An `Experiment` is inert until activated with [`Experiment::run`], which
/// creates the run directory and yields the live [`ExperimentRun`] handle.
pub struct Experiment {
    name: String,
    pardir: PathBuf,
    config: Value,
}

impl Experiment {
    /// Creates a new `Experiment` rooted at `experiments/` by default.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pardir: PathBuf::from("experiments"),
            config: Value::Null,
        }
    }

    /// Sets the parent directory the run directory is created under.
    pub fn with_pardir<P: AsRef<Path>>(mut self, pardir: P) -> Self {
        self.pardir = pardir.as_ref().to_path_buf();
        self
    }

    /// Records an arbitrary JSON configuration with the run.
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// Activates the experiment.
    ///
    /// Creates `pardir/name`, records the clipped configuration and run
    /// metadata, and resumes any metric histories persisted by a previous
    /// activation of the same directory.
    ///
    /// # Errors
    /// Returns an error when the directory or its files cannot be written,
    /// or when existing histories fail to parse.
    pub fn run(self) -> Result<ExperimentRun> {
        let dir = self.pardir.join(&self.name);
        fs::create_dir_all(&dir)?;

        let config = clip_value(&self.config, MAX_CONFIG_ITEMS);
        fs::write(dir.join("config.json"), serde_json::to_string_pretty(&config)?)?;

        let metadata = json!({
            "name": self.name,
            "started_at": unix_seconds(),
        });
        fs::write(dir.join("run.json"), serde_json::to_string_pretty(&metadata)?)?;

        let metrics_path = dir.join("metrics.json");
        let logs = if metrics_path.exists() {
            serde_json::from_str(&fs::read_to_string(&metrics_path)?)?
        } else {
            BTreeMap::new()
        };

        info!("experiment {} active at {}", self.name, dir.display());

        Ok(ExperimentRun {
            name: self.name,
            dir,
            config,
            logs,
        })
    }
}

/// An activated experiment.
///
/// Owns the run directory and the per-model metric histories; trainers log
/// into it and it persists everything on `save_logs`.
pub struct ExperimentRun {
    name: String,
    dir: PathBuf,
    config: Value,
    logs: BTreeMap<String, PhaseLogs>,
}

impl ExperimentRun {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The configuration as recorded, clipping included.
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Names of every model that has logged under this run.
    pub fn models(&self) -> Vec<&str> {
        self.logs.keys().map(String::as_str).collect()
    }

    /// Number of epochs logged for a model in a phase.
    pub fn epoch_count(&self, model: &str, phase: Phase) -> usize {
        self.metrics(model, phase).map_or(0, MetricLog::len)
    }

    /// The metric history of a model in a phase, if any was logged.
    pub fn metrics(&self, model: &str, phase: Phase) -> Option<&MetricLog> {
        let logs = self.logs.get(model)?;
        match phase {
            Phase::Train => Some(&logs.train),
            Phase::Val => Some(&logs.val),
        }
    }

    /// Appends one epoch row to a model's history.
    pub fn log_epoch(
        &mut self,
        model: &str,
        phase: Phase,
        epoch: usize,
        keys: &[String],
        values: Vec<f32>,
    ) -> Result<()> {
        let logs = self.logs.entry(model.to_string()).or_default();
        let log = match phase {
            Phase::Train => &mut logs.train,
            Phase::Val => &mut logs.val,
        };

        log.append(keys, epoch, values)
    }

    /// The directory checkpoints for a model default to under this run.
    pub fn checkpoint_dir(&self, model: &str) -> PathBuf {
        self.dir.join("checkpoints").join(model)
    }

    /// Persists every metric history: `metrics.json` for resuming, plus one
    /// CSV per model and phase for downstream tooling.
    pub fn save_logs(&self) -> Result<()> {
        fs::write(
            self.dir.join("metrics.json"),
            serde_json::to_string_pretty(&self.logs)?,
        )?;

        let csv_dir = self.dir.join("metrics");
        fs::create_dir_all(&csv_dir)?;

        for (model, logs) in &self.logs {
            for (phase, log) in [(Phase::Train, &logs.train), (Phase::Val, &logs.val)] {
                if log.is_empty() {
                    continue;
                }
                log.write_csv(&csv_dir.join(format!("{model}_{}.csv", phase.as_str())))?;
            }
        }

        Ok(())
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Recursively bounds array sizes in a configuration value.
///
/// Arrays longer than `max_items` keep their first `max_items` elements and
/// gain a trailing `"..."` marker; objects are clipped per field.
fn clip_value(value: &Value, max_items: usize) -> Value {
    match value {
        Value::Array(items) => {
            let mut clipped: Vec<Value> = items
                .iter()
                .take(max_items)
                .map(|item| clip_value(item, max_items))
                .collect();

            if items.len() > max_items {
                clipped.push(Value::String("...".to_string()));
            }

            Value::Array(clipped)
        }
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), clip_value(v, max_items)))
                .collect(),
        ),
        other => other.clone(),
    }
}
