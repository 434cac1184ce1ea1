mod metrics;
mod trainer;

pub use metrics::{LossAndMetricsCalculator, MetricAggregator, MetricFn};
pub use trainer::Trainer;
