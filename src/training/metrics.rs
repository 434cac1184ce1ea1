use ndarray::{Array2, ArrayView2};

use crate::arch::loss::LossFn;

/// A scalar metric computed over a batch of predictions and targets.
pub type MetricFn = fn(ArrayView2<f32>, ArrayView2<f32>) -> f32;

/// Couples a loss function with any number of named diagnostic metrics.
///
/// The loss drives the backward pass; the metrics are only evaluated and
/// logged. The first reported key is always `loss`.
pub struct LossAndMetricsCalculator<L>
where
    L: LossFn,
{
    loss_fn: L,
    metrics: Vec<(String, MetricFn)>,
}

impl<L> LossAndMetricsCalculator<L>
where
    L: LossFn,
{
    /// Creates a new `LossAndMetricsCalculator`.
    ///
    /// # Arguments
    /// * `loss_fn` - The loss used for training and reported under `loss`.
    pub fn new(loss_fn: L) -> Self {
        Self {
            loss_fn,
            metrics: Vec::new(),
        }
    }

    /// Adds a named metric.
    ///
    /// # Panics
    /// Panics if the name is `loss` or already taken.
    pub fn with_metric(mut self, name: &str, metric: MetricFn) -> Self {
        assert!(name != "loss", "the loss key is reserved");
        assert!(
            self.metrics.iter().all(|(taken, _)| taken != name),
            "metric {name} is already registered"
        );

        self.metrics.push((name.to_string(), metric));
        self
    }

    /// The keys of every value `evaluate` produces, in order.
    pub fn keys(&self) -> Vec<String> {
        std::iter::once("loss".to_string())
            .chain(self.metrics.iter().map(|(name, _)| name.clone()))
            .collect()
    }

    /// Computes the loss and every metric for one batch.
    pub fn evaluate(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Vec<f32> {
        std::iter::once(self.loss_fn.loss(y_pred, y))
            .chain(self.metrics.iter().map(|(_, metric)| metric(y_pred, y)))
            .collect()
    }

    /// Derivative of the loss with respect to the predictions.
    pub fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        self.loss_fn.loss_prime(y_pred, y)
    }
}

/// Running, sample-weighted mean over per-batch metric values.
///
/// Batches may be uneven, so every contribution is weighted by its sample
/// count rather than averaged per batch.
#[derive(Debug, Clone)]
pub struct MetricAggregator {
    sums: Vec<f32>,
    samples: usize,
}

impl MetricAggregator {
    pub fn new(num_values: usize) -> Self {
        Self {
            sums: vec![0.0; num_values],
            samples: 0,
        }
    }

    pub fn update(&mut self, values: &[f32], num_samples: usize) {
        for (sum, value) in self.sums.iter_mut().zip(values) {
            *sum += value * num_samples as f32;
        }
        self.samples += num_samples;
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// The weighted means accumulated so far.
    pub fn finalize(&self) -> Vec<f32> {
        if self.samples == 0 {
            return vec![0.0; self.sums.len()];
        }

        self.sums
            .iter()
            .map(|sum| sum / self.samples as f32)
            .collect()
    }
}
