use std::num::NonZeroUsize;

use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::{SeedableRng, rngs::StdRng};

use super::InMemoryDataset;

/// Batching front-end over an [`InMemoryDataset`].
///
/// Each call to `batches` visits every sample exactly once, in shuffled order
/// when shuffling is enabled. The final batch may be short.
#[derive(Debug, Clone)]
pub struct StandardLoader {
    dataset: InMemoryDataset,
    batch_size: NonZeroUsize,
    shuffle: bool,
    rng: StdRng,
}

impl StandardLoader {
    /// Creates a new `StandardLoader`.
    ///
    /// # Arguments
    /// * `dataset` - The dataset to iterate.
    /// * `batch_size` - The number of samples per batch.
    pub fn new(dataset: InMemoryDataset, batch_size: NonZeroUsize) -> Self {
        Self {
            dataset,
            batch_size,
            shuffle: false,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Enables shuffling, optionally with a fixed seed.
    pub fn with_shuffle(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self
    }

    pub fn num_samples(&self) -> usize {
        self.dataset.len()
    }

    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size.get())
    }

    /// Starts a fresh pass over the dataset.
    pub fn batches(&mut self) -> Batches<'_> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();

        if self.shuffle {
            order.shuffle(&mut self.rng);
        }

        Batches {
            dataset: &self.dataset,
            order,
            batch_size: self.batch_size.get(),
            cursor: 0,
        }
    }
}

/// One pass of owned `(x, y)` batches.
pub struct Batches<'a> {
    dataset: &'a InMemoryDataset,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = (Array2<f32>, Array2<f32>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.order.len());
        let rows = &self.order[self.cursor..end];
        self.cursor = end;

        Some(self.dataset.select(rows))
    }
}
