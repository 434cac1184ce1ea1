mod experiment;
mod log;

pub use experiment::{Experiment, ExperimentRun, Phase};
pub use log::MetricLog;
