use log::{debug, info};

use super::{LossAndMetricsCalculator, MetricAggregator};
use crate::arch::{Model, loss::LossFn};
use crate::data::StandardLoader;
use crate::error::{Result, TrainErr};
use crate::experiment::{ExperimentRun, Phase};
use crate::model_optimizer::ModelOptimizer;
use crate::optimization::Optimizer;

/// Runs training epochs for one wrapped model.
///
/// A `Trainer` composes the model, the loss-and-metrics calculator, and the
/// training loader, with an optional validation loader. Every finished epoch
/// is logged into the experiment run the trainer is driven under.
pub struct Trainer<'a, M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    model: &'a mut ModelOptimizer<M, O>,
    calculator: &'a LossAndMetricsCalculator<L>,
    loader: StandardLoader,
    val_loader: Option<StandardLoader>,
}

impl<'a, M, O, L> Trainer<'a, M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    /// Creates a new `Trainer`.
    ///
    /// # Arguments
    /// * `model` - The wrapped model to train.
    /// * `calculator` - The loss and metrics evaluated on every batch.
    /// * `loader` - The training data loader.
    pub fn new(
        model: &'a mut ModelOptimizer<M, O>,
        calculator: &'a LossAndMetricsCalculator<L>,
        loader: StandardLoader,
    ) -> Self {
        Self {
            model,
            calculator,
            loader,
            val_loader: None,
        }
    }

    /// Attaches a validation loader, evaluated after every training epoch.
    pub fn with_validation(mut self, loader: StandardLoader) -> Self {
        self.val_loader = Some(loader);
        self
    }

    /// Trains for `epochs` epochs, logging one metric row per epoch and phase
    /// into `run`.
    ///
    /// # Errors
    /// Returns `TrainErr::EpochMismatch` when the run has a different number
    /// of train epochs logged under this model's name than the model itself
    /// has trained. This catches two distinct models sharing a name as well
    /// as resuming against the wrong run.
    pub fn train(&mut self, epochs: usize, run: &mut ExperimentRun) -> Result<()> {
        let name = self.model.name().to_string();

        let logged = run.epoch_count(&name, Phase::Train);
        if logged != self.model.epochs_trained() {
            return Err(TrainErr::EpochMismatch {
                model: name,
                logged,
                trained: self.model.epochs_trained(),
            });
        }

        info!("Training {name}.");

        let keys = self.calculator.keys();

        for _ in 0..epochs {
            let epoch = self.model.epochs_trained() + 1;
            let mut agg = MetricAggregator::new(keys.len());

            for (x, y) in self.loader.batches() {
                let num_samples = x.nrows();

                let y_pred = self.model.forward(x)?;
                let values = self.calculator.evaluate(y_pred.view(), y.view());
                let d = self.calculator.loss_prime(y_pred.view(), y.view());
                self.model.backward_step(d)?;

                agg.update(&values, num_samples);
            }

            let values = agg.finalize();
            debug!(epoch = epoch; "train loss {:.6}", values[0]);
            run.log_epoch(&name, Phase::Train, epoch, &keys, values)?;
            self.model.bump_epoch();

            if let Some(val_loader) = self.val_loader.as_mut() {
                let values = evaluate_loader(self.model, self.calculator, val_loader)?;
                debug!(epoch = epoch; "val loss {:.6}", values[0]);
                run.log_epoch(&name, Phase::Val, epoch, &keys, values)?;
            }
        }

        info!("End of training");
        Ok(())
    }

    /// Evaluates the validation loader without updating the model and logs
    /// the result at the model's current epoch.
    ///
    /// # Returns
    /// The aggregated metric values, aligned with the calculator's keys.
    ///
    /// # Errors
    /// Returns `TrainErr::InvalidInput` when no validation loader is attached.
    pub fn validate(&mut self, run: &mut ExperimentRun) -> Result<Vec<f32>> {
        let Some(val_loader) = self.val_loader.as_mut() else {
            return Err(TrainErr::InvalidInput("no validation loader attached"));
        };

        let name = self.model.name().to_string();
        let values = evaluate_loader(self.model, self.calculator, val_loader)?;

        run.log_epoch(
            &name,
            Phase::Val,
            self.model.epochs_trained(),
            &self.calculator.keys(),
            values.clone(),
        )?;

        Ok(values)
    }
}

/// One full pass over a loader with no parameter updates.
fn evaluate_loader<M, O, L>(
    model: &mut ModelOptimizer<M, O>,
    calculator: &LossAndMetricsCalculator<L>,
    loader: &mut StandardLoader,
) -> Result<Vec<f32>>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    let mut agg = MetricAggregator::new(calculator.keys().len());

    for (x, y) in loader.batches() {
        let num_samples = x.nrows();
        let y_pred = model.forward(x)?;
        agg.update(&calculator.evaluate(y_pred.view(), y.view()), num_samples);
    }

    Ok(agg.finalize())
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use ndarray::array;

    use super::*;
    use crate::arch::{Sequential, activations::ActFn, loss::Mse};
    use crate::data::InMemoryDataset;
    use crate::experiment::Experiment;
    use crate::optimization::GradientDescent;

    fn loader() -> StandardLoader {
        let dataset = InMemoryDataset::new(
            array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]],
            array![[0.0], [1.0], [1.0], [0.0]],
        )
        .unwrap();

        StandardLoader::new(dataset, NonZeroUsize::new(4).unwrap())
    }

    #[test]
    fn epoch_bookkeeping_rejects_name_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = Experiment::new("collisions")
            .with_pardir(dir.path())
            .run()
            .unwrap();

        let calculator = LossAndMetricsCalculator::new(Mse::new());

        let model = Sequential::mlp(&[2, 3, 1], ActFn::sigmoid(1.));
        let mut first =
            ModelOptimizer::new("net", model.clone(), GradientDescent::new(1.0), Some(1)).unwrap();
        Trainer::new(&mut first, &calculator, loader())
            .train(2, &mut run)
            .unwrap();

        // A different model under the same name starts at zero trained epochs.
        let mut second =
            ModelOptimizer::new("net", model, GradientDescent::new(1.0), Some(2)).unwrap();
        let got = Trainer::new(&mut second, &calculator, loader()).train(1, &mut run);

        assert!(matches!(got, Err(TrainErr::EpochMismatch { .. })));
    }

    #[test]
    fn validate_requires_a_validation_loader() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = Experiment::new("no_val")
            .with_pardir(dir.path())
            .run()
            .unwrap();

        let calculator = LossAndMetricsCalculator::new(Mse::new());
        let model = Sequential::mlp(&[2, 3, 1], ActFn::sigmoid(1.));
        let mut mo = ModelOptimizer::new("net", model, GradientDescent::new(1.0), Some(1)).unwrap();

        let got = Trainer::new(&mut mo, &calculator, loader()).validate(&mut run);
        assert!(matches!(got, Err(TrainErr::InvalidInput(_))));
    }
}
