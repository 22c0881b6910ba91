// Jacobi preconditioner for the implicit time-advance system
//
// The implicit step solves (I - Δt·L)·x = b; the operator subsystem reports
// diag(L) and the preconditioner divides each entry by (1 - Δt·diag(L)_i).
// The inverse is precomputed at setup so apply is a single elementwise
// multiply, parallel under the rayon feature with identical semantics.

use crate::preconditioner::Preconditioner;
use num_traits::Float;

/// Diagonal (Jacobi) preconditioner: M⁻¹ = diag(1 − Δt·d_i)⁻¹.
pub struct Jacobi<T> {
    pub(crate) inv_diag: Vec<T>,
}

impl<T: Float> Jacobi<T> {
    /// Build from the operator diagonal and the time step.
    pub fn from_diagonal(diag: &[T], dt: T) -> Self {
        let inv_diag = diag
            .iter()
            .map(|&d| {
                let denom = T::one() - dt * d;
                if denom != T::zero() {
                    T::one() / denom
                } else {
                    T::zero()
                }
            })
            .collect();
        Self { inv_diag }
    }
}

impl<T: Float + Send + Sync> Preconditioner<T> for Jacobi<T> {
    fn apply(&self, x: &mut [T]) {
        assert_eq!(x.len(), self.inv_diag.len());
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            x.par_iter_mut().enumerate().for_each(|(i, xi)| {
                *xi = *xi * self.inv_diag[i];
            });
        }
        #[cfg(not(feature = "rayon"))]
        {
            for (xi, mi) in x.iter_mut().zip(self.inv_diag.iter()) {
                *xi = *xi * *mi;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divides_by_shifted_diagonal() {
        let diag = vec![2.0, -1.0, 0.5];
        let dt = 0.5;
        let pc = Jacobi::from_diagonal(&diag, dt);
        let mut x = vec![1.0, 3.0, 1.5];
        pc.apply(&mut x);
        // denominators: 1 - 0.5·d = [0, 1.5, 0.75]
        assert_eq!(x[0], 0.0); // zero pivot maps to zero
        assert!((x[1] - 2.0).abs() < 1e-15);
        assert!((x[2] - 2.0).abs() < 1e-15);
    }
}
