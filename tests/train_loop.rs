//! End-to-end training flows: convergence on small boolean functions and the
//! per-epoch bookkeeping a run accumulates along the way.

use std::num::NonZeroUsize;

use ndarray::{ArrayView2, array};
use tempfile::tempdir;

use trainlab::arch::activations::ActFn;
use trainlab::arch::layers::Layer;
use trainlab::arch::loss::Mse;
use trainlab::arch::{Model, Sequential};
use trainlab::optimization::{Adam, GradientDescent};
use trainlab::{
    Experiment, InMemoryDataset, LossAndMetricsCalculator, ModelOptimizer, Phase, StandardLoader,
    Trainer,
};

fn xor_dataset() -> InMemoryDataset {
    InMemoryDataset::new(
        array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]],
        array![[0.0], [1.0], [1.0], [0.0]],
    )
    .unwrap()
}

fn accuracy(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
    let hits = y_pred
        .iter()
        .zip(y.iter())
        .filter(|(p, t)| (*p - *t).abs() < 0.5)
        .count();

    hits as f32 / y.len() as f32
}

#[test]
fn converges_on_xor() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = tempdir().unwrap();
    let mut run = Experiment::new("xor")
        .with_pardir(dir.path())
        .run()
        .unwrap();

    let model = Sequential::mlp(&[2, 5, 9, 1], ActFn::sigmoid(1.));
    let mut mo = ModelOptimizer::new("xor_net", model, GradientDescent::new(3.0), Some(7)).unwrap();

    let calculator = LossAndMetricsCalculator::new(Mse::new()).with_metric("accuracy", accuracy);
    let loader = StandardLoader::new(xor_dataset(), NonZeroUsize::new(4).unwrap());

    let epochs = 5000;
    Trainer::new(&mut mo, &calculator, loader)
        .train(epochs, &mut run)
        .unwrap();

    let log = run.metrics("xor_net", Phase::Train).unwrap();
    assert_eq!(log.len(), epochs);
    assert_eq!(mo.epochs_trained(), epochs);

    let losses = log.column("loss").unwrap();
    assert!(
        losses[epochs - 1] < 0.1,
        "final loss {} did not converge",
        losses[epochs - 1]
    );
    assert!(losses[epochs - 1] < losses[0]);

    let accuracies = log.column("accuracy").unwrap();
    assert_eq!(
        accuracies[epochs - 1], 1.0,
        "got {}% accuracy",
        accuracies[epochs - 1] * 100.
    );
}

#[test]
fn fits_a_line_with_adam() {
    let dir = tempdir().unwrap();
    let mut run = Experiment::new("line")
        .with_pardir(dir.path())
        .run()
        .unwrap();

    let xs: Vec<f32> = (0..10).map(|i| i as f32 / 10.).collect();
    let ys: Vec<f32> = xs.iter().map(|x| 2. * x + 1.).collect();
    let dataset = InMemoryDataset::new(
        ndarray::Array2::from_shape_vec((10, 1), xs).unwrap(),
        ndarray::Array2::from_shape_vec((10, 1), ys).unwrap(),
    )
    .unwrap();

    let model = Sequential::new([Layer::dense((1, 1), None)]);
    let optimizer = Adam::with_defaults(model.size(), 0.05);
    let mut mo = ModelOptimizer::new("line_fit", model, optimizer, Some(5)).unwrap();

    let calculator = LossAndMetricsCalculator::new(Mse::new());
    let loader =
        StandardLoader::new(dataset, NonZeroUsize::new(5).unwrap()).with_shuffle(Some(13));

    Trainer::new(&mut mo, &calculator, loader)
        .train(2000, &mut run)
        .unwrap();

    let log = run.metrics("line_fit", Phase::Train).unwrap();
    let final_loss = log.column("loss").unwrap()[log.len() - 1];
    assert!(final_loss < 1e-3, "final loss {final_loss}");

    // y = 2x + 1
    let params = mo.params();
    assert!((params[0] - 2.).abs() < 0.1, "weight {}", params[0]);
    assert!((params[1] - 1.).abs() < 0.1, "bias {}", params[1]);
}

#[test]
fn cloned_models_train_under_their_own_name() {
    let dir = tempdir().unwrap();
    let mut run = Experiment::new("cloning")
        .with_pardir(dir.path())
        .run()
        .unwrap();

    let model = Sequential::mlp(&[2, 5, 1], ActFn::sigmoid(1.));
    let mut original =
        ModelOptimizer::new("base_model", model, GradientDescent::new(1.0), Some(3)).unwrap();

    let calculator = LossAndMetricsCalculator::new(Mse::new());
    let loader = || StandardLoader::new(xor_dataset(), NonZeroUsize::new(4).unwrap());

    Trainer::new(&mut original, &calculator, loader())
        .train(5, &mut run)
        .unwrap();

    let mut cloned = original.clone_as("cloned_model");
    assert_eq!(cloned.epochs_trained(), 0);
    assert_eq!(cloned.params(), original.params());

    Trainer::new(&mut cloned, &calculator, loader())
        .train(3, &mut run)
        .unwrap();

    assert_eq!(run.models(), vec!["base_model", "cloned_model"]);
    assert_eq!(run.epoch_count("base_model", Phase::Train), 5);
    assert_eq!(run.epoch_count("cloned_model", Phase::Train), 3);
    assert_eq!(cloned.epochs_trained(), 3);

    // The clone trained on its own; the original's parameters are untouched.
    assert_ne!(cloned.params(), original.params());
}

#[test]
fn validation_metrics_are_logged_each_epoch() {
    let dir = tempdir().unwrap();
    let mut run = Experiment::new("validation")
        .with_pardir(dir.path())
        .run()
        .unwrap();

    let model = Sequential::mlp(&[2, 5, 1], ActFn::sigmoid(1.));
    let mut mo = ModelOptimizer::new("val_net", model, GradientDescent::new(1.0), Some(2)).unwrap();

    let calculator = LossAndMetricsCalculator::new(Mse::new()).with_metric("accuracy", accuracy);
    let train_loader =
        StandardLoader::new(xor_dataset(), NonZeroUsize::new(2).unwrap()).with_shuffle(Some(1));
    let val_loader = StandardLoader::new(xor_dataset(), NonZeroUsize::new(4).unwrap());

    Trainer::new(&mut mo, &calculator, train_loader)
        .with_validation(val_loader)
        .train(4, &mut run)
        .unwrap();

    let val_log = run.metrics("val_net", Phase::Val).unwrap();
    assert_eq!(val_log.len(), 4);
    assert_eq!(val_log.epochs(), &[1, 2, 3, 4]);
    assert_eq!(val_log.keys(), &["loss".to_string(), "accuracy".to_string()]);
}
