use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;
use rand::Rng;

use crate::arch::activations::ActFn;
use crate::error::{Result, TrainErr};

/// A fully connected layer with an optional elementwise activation.
///
/// Parameters live in a flat slice: row-major weights of shape `dim`, then
/// one bias per output column.
#[derive(Clone)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,

    // Forward state reused by the next backward pass.
    x: Array2<f32>,
    z: Array2<f32>,
}

impl Dense {
    /// Returns a new `Dense`.
    ///
    /// # Arguments
    /// * `dim` - Input and output widths.
    /// * `act_fn` - The activation applied after the affine map, if any.
    ///
    /// # Panics
    /// Panics if either width is zero.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        assert!(dim.0 > 0 && dim.1 > 0, "layer widths must be non-zero");

        let zeros = Array2::zeros((1, 1));

        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
            x: zeros.clone(),
            z: zeros,
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Draws initial parameters: weights uniform in `±1/sqrt(fan_in)`,
    /// biases zero.
    pub fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32> {
        let (rows, cols) = self.dim;
        let bound = 1. / (rows as f32).sqrt();
        let dist = Uniform::new(-bound, bound).unwrap();

        let mut params = Array1::random_using(rows * cols, dist, rng).to_vec();
        params.resize(self.size, 0.);
        params
    }

    pub fn forward(&mut self, params: &[f32], x: Array2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.dim.0 {
            return Err(TrainErr::SizeMismatch {
                what: "input features",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let (w, b) = self.view_params(params);
        let mut z = x.dot(&w);
        z += &b;

        self.x = x;
        self.z = z;

        let a = match &self.act_fn {
            Some(act_fn) => self.z.mapv(|z| act_fn.f(z)),
            None => self.z.clone(),
        };

        Ok(a)
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        mut d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        if d.dim() != self.z.dim() {
            return Err(TrainErr::SizeMismatch {
                what: "output delta",
                got: d.len(),
                expected: self.z.len(),
            });
        }

        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad);
        dw += &self.x.t().dot(&d);
        db += &d.sum_axis(Axis(0));

        let (w, _) = self.view_params(params);
        Ok(d.dot(&w.t()))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of
    /// this layer.
    fn view_params<'a>(&self, params: &'a [f32]) -> (ArrayView2<'a, f32>, ArrayView1<'a, f32>) {
        let w_size = self.size - self.dim.1;
        let weights = ArrayView2::from_shape(self.dim, &params[..w_size]).unwrap();
        let biases = ArrayView1::from_shape(self.dim.1, &params[w_size..]).unwrap();
        (weights, biases)
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta
    /// biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> (ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>) {
        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw).unwrap();
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw).unwrap();
        (dw, db)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn forward_applies_affine_map() {
        let mut layer = Dense::new((2, 1), None);
        // w = [[1], [2]], b = [3]
        let params = [1.0, 2.0, 3.0];

        let y = layer.forward(&params, array![[1.0, 1.0]]).unwrap();
        assert_eq!(y, array![[6.0]]);
    }

    #[test]
    fn forward_rejects_wrong_width() {
        let mut layer = Dense::new((2, 1), None);
        let params = [0.0; 3];

        let got = layer.forward(&params, array![[1.0, 1.0, 1.0]]);
        assert!(matches!(got, Err(TrainErr::SizeMismatch { .. })));
    }

    #[test]
    fn backward_accumulates_into_grad() {
        let mut layer = Dense::new((2, 1), None);
        let params = [1.0, 2.0, 3.0];
        let mut grad = [0.0; 3];

        layer.forward(&params, array![[1.0, 2.0]]).unwrap();
        let d_prev = layer.backward(&params, &mut grad, array![[1.0]]).unwrap();

        // dw = x^T d, db = sum(d), d_prev = d w^T
        assert_eq!(grad, [1.0, 2.0, 1.0]);
        assert_eq!(d_prev, array![[1.0, 2.0]]);
    }

    #[test]
    fn init_params_covers_biases_with_zeros() {
        use rand::SeedableRng;

        let layer = Dense::new((4, 3), Some(ActFn::relu()));
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);

        let params = layer.init_params(&mut rng);
        assert_eq!(params.len(), layer.size());
        assert!(params[12..].iter().all(|&b| b == 0.));
    }
}
