use std::{error::Error, fmt, io, path::PathBuf};

use safetensors::SafeTensorError;

/// The result type used across the crate.
pub type Result<T> = std::result::Result<T, TrainErr>;

/// Failures raised while building, training, tracking, or persisting models.
#[derive(Debug)]
pub enum TrainErr {
    /// A buffer or batch does not have the expected number of elements.
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// The dataset holds no samples.
    EmptyDataset,
    /// An input is invalid for domain reasons.
    InvalidInput(&'static str),
    /// A metric row was appended with a key set different from the log's.
    MetricKeysMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },
    /// A model's epoch counter disagrees with the epochs logged under its name.
    EpochMismatch {
        model: String,
        logged: usize,
        trained: usize,
    },
    /// A checkpoint store was asked to serve a model it was not bound to.
    ModelNameMismatch { bound: String, got: String },
    /// No checkpoint exists where one was requested.
    CheckpointNotFound { dir: PathBuf },
    /// A checkpoint payload is present but malformed.
    CheckpointFormat(String),
    Io(io::Error),
    Json(serde_json::Error),
    Tensor(SafeTensorError),
    Csv(csv::Error),
}

impl fmt::Display for TrainErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "size mismatch for {what}: got {got}, expected {expected}"),
            TrainErr::EmptyDataset => write!(f, "dataset holds no samples"),
            TrainErr::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            TrainErr::MetricKeysMismatch { expected, got } => write!(
                f,
                "metric keys mismatch: expected {expected:?}, got {got:?}"
            ),
            TrainErr::EpochMismatch {
                model,
                logged,
                trained,
            } => write!(
                f,
                "model {model} has trained {trained} epoch(s) but {logged} are logged under its name"
            ),
            TrainErr::ModelNameMismatch { bound, got } => {
                write!(f, "checkpoint store is bound to {bound}, got model {got}")
            }
            TrainErr::CheckpointNotFound { dir } => {
                write!(f, "no checkpoint found in {}", dir.display())
            }
            TrainErr::CheckpointFormat(msg) => write!(f, "malformed checkpoint: {msg}"),
            TrainErr::Io(e) => write!(f, "io error: {e}"),
            TrainErr::Json(e) => write!(f, "json error: {e}"),
            TrainErr::Tensor(e) => write!(f, "tensor error: {e}"),
            TrainErr::Csv(e) => write!(f, "csv error: {e}"),
        }
    }
}

impl Error for TrainErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainErr::Io(e) => Some(e),
            TrainErr::Json(e) => Some(e),
            TrainErr::Tensor(e) => Some(e),
            TrainErr::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TrainErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for TrainErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<SafeTensorError> for TrainErr {
    fn from(value: SafeTensorError) -> Self {
        Self::Tensor(value)
    }
}

impl From<csv::Error> for TrainErr {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}
