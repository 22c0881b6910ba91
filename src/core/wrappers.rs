// Wrappers for faer::Mat and slice-level vector kernels

use crate::core::traits::LinearOperator;
use faer::Mat;
use num_traits::Float;

impl<T: Float> LinearOperator<T> for Mat<T> {
    fn apply(&self, alpha: T, x: &[T], beta: T, y: &mut [T]) {
        assert_eq!(self.nrows(), y.len());
        assert_eq!(self.ncols(), x.len());
        for i in 0..self.nrows() {
            let mut acc = T::zero();
            for j in 0..self.ncols() {
                acc = acc + self[(i, j)] * x[j];
            }
            y[i] = if beta == T::zero() {
                alpha * acc
            } else {
                beta * y[i] + alpha * acc
            };
        }
    }
    fn nrows(&self) -> usize {
        self.nrows()
    }
    fn ncols(&self) -> usize {
        self.ncols()
    }
}

/// dot(x, y).
pub fn dot<T: Float>(x: &[T], y: &[T]) -> T {
    assert_eq!(x.len(), y.len());
    x.iter()
        .zip(y.iter())
        .map(|(xi, yi)| *xi * *yi)
        .fold(T::zero(), |acc, v| acc + v)
}

/// ‖x‖₂.
pub fn nrm2<T: Float>(x: &[T]) -> T {
    x.iter()
        .map(|xi| *xi * *xi)
        .fold(T::zero(), |acc, v| acc + v)
        .sqrt()
}

/// y ← y + α·x.
pub fn axpy<T: Float>(alpha: T, x: &[T], y: &mut [T]) {
    assert_eq!(x.len(), y.len());
    for (yi, xi) in y.iter_mut().zip(x.iter()) {
        *yi = *yi + alpha * *xi;
    }
}
