use ndarray::{Array2, ArrayView2, Axis};

use crate::error::{Result, TrainErr};

/// An in-memory supervised dataset, one sample per row.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    x: Array2<f32>,
    y: Array2<f32>,
}

impl InMemoryDataset {
    /// Creates a new dataset from owned input and target matrices.
    ///
    /// # Errors
    /// Returns `TrainErr::EmptyDataset` when there are no rows and
    /// `TrainErr::SizeMismatch` when the row counts disagree.
    pub fn new(x: Array2<f32>, y: Array2<f32>) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(TrainErr::EmptyDataset);
        }

        if y.nrows() != x.nrows() {
            return Err(TrainErr::SizeMismatch {
                what: "target rows",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        Ok(Self { x, y })
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView2<'_, f32> {
        self.y.view()
    }

    /// Copies the given rows into an owned `(x, y)` pair.
    pub fn select(&self, rows: &[usize]) -> (Array2<f32>, Array2<f32>) {
        (self.x.select(Axis(0), rows), self.y.select(Axis(0), rows))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn rejects_mismatched_rows() {
        let x = array![[1.0], [2.0]];
        let y = array![[1.0]];

        assert!(matches!(
            InMemoryDataset::new(x, y),
            Err(TrainErr::SizeMismatch { .. })
        ));
    }

    #[test]
    fn rejects_empty_input() {
        let x = Array2::zeros((0, 2));
        let y = Array2::zeros((0, 1));

        assert!(matches!(
            InMemoryDataset::new(x, y),
            Err(TrainErr::EmptyDataset)
        ));
    }

    #[test]
    fn select_copies_rows_in_order() {
        let ds = InMemoryDataset::new(array![[1.0], [2.0], [3.0]], array![[10.0], [20.0], [30.0]])
            .unwrap();

        let (x, y) = ds.select(&[2, 0]);
        assert_eq!(x, array![[3.0], [1.0]]);
        assert_eq!(y, array![[30.0], [10.0]]);
    }
}
