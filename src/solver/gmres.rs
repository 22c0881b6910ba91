//! Restarted GMRES (Saad §6.4), left-preconditioned.
//!
//! Solves A·x = b for a matrix-free operator, minimizing the preconditioned
//! residual over the Krylov subspace built by modified Gram-Schmidt; the
//! least-squares problem is updated with Givens rotations so the inner
//! residual is available every iteration.
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd
//!   Edition. SIAM. §6.4

use crate::core::traits::LinearOperator;
use crate::core::wrappers::{axpy, dot, nrm2};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::SolveStats;
use num_traits::Float;

/// Default tolerance: 1e-6 in single precision, 1e-12 in double.
pub fn default_tolerance<T: Float>() -> T {
    if std::mem::size_of::<T>() <= 4 {
        T::from(1e-6).unwrap()
    } else {
        T::from(1e-12).unwrap()
    }
}

/// Default inner-iteration count before restart: at least min(10, n), at
/// most min(200, n), and no more than 512 MiB of Krylov basis.
pub fn default_gmres_restarts<T>(num_cols: usize) -> usize {
    let minimum = 10.min(num_cols);
    let maximum = 200.min(num_cols);
    let mb = (num_cols * std::mem::size_of::<T>()) as f64 / (1024.0 * 1024.0);
    ((512.0 / mb) as usize).clamp(minimum, maximum)
}

/// GMRES solver with restart; `None` parameters use the engine defaults.
pub struct GmresSolver<T> {
    pub restart: Option<usize>,
    pub tol: Option<T>,
    pub max_outer: Option<usize>,
}

impl<T: Float> GmresSolver<T> {
    pub fn new(restart: Option<usize>, tol: Option<T>, max_outer: Option<usize>) -> Self {
        Self {
            restart,
            tol,
            max_outer,
        }
    }

    /// Solve A·x = b; `x` carries the initial guess in and the solution out.
    ///
    /// Iterates until the preconditioned residual drops below the tolerance
    /// or the outer budget is exhausted; non-convergence is reported through
    /// the returned stats, not as an error.
    pub fn solve<M, P>(&self, op: &M, pc: &P, x: &mut [T], b: &[T]) -> Result<SolveStats<T>, KError>
    where
        M: LinearOperator<T>,
        P: Preconditioner<T>,
    {
        let n = b.len();
        if x.len() != n || op.nrows() != n {
            return Err(KError::InvalidArgument(format!(
                "system size mismatch: x {}, b {}, op {}",
                x.len(),
                n,
                op.nrows()
            )));
        }
        let tol = self.tol.unwrap_or_else(default_tolerance::<T>);
        if tol < T::epsilon() {
            return Err(KError::InvalidArgument(
                "tolerance must be at least machine epsilon".into(),
            ));
        }
        let restart = self.restart.unwrap_or_else(|| default_gmres_restarts::<T>(n));
        if restart == 0 || restart > n {
            return Err(KError::InvalidArgument(format!(
                "restart {restart} must be within 1..={n}"
            )));
        }
        let max_outer = self.max_outer.unwrap_or(n);
        if max_outer == 0 {
            return Err(KError::InvalidArgument(
                "outer iteration budget must be positive".into(),
            ));
        }

        let mut basis: Vec<Vec<T>> = Vec::with_capacity(restart + 1);
        let mut h = vec![vec![T::zero(); restart]; restart + 1];
        let mut g = vec![T::zero(); restart + 1];
        let mut cs = vec![T::zero(); restart + 1];
        let mut sn = vec![T::zero(); restart + 1];

        let mut total_iterations = 0;
        let mut outer = 0;
        let mut outer_res = tol + T::one();

        while outer_res > tol && outer < max_outer {
            // r₀ = M⁻¹ (b − A x)
            let mut r = b.to_vec();
            op.apply(-T::one(), x, T::one(), &mut r);
            pc.apply(&mut r);
            total_iterations += 1;

            let mut inner_res = nrm2(&r);
            if inner_res == T::zero() {
                outer_res = inner_res;
                break;
            }
            let scale = T::one() / inner_res;
            for v in r.iter_mut() {
                *v = *v * scale;
            }
            basis.clear();
            basis.push(r);
            g.iter_mut().for_each(|v| *v = T::zero());
            g[0] = inner_res;

            let mut m = 0;
            while inner_res > tol && m < restart {
                let j = m;
                // w = M⁻¹ A vⱼ
                let mut w = vec![T::zero(); n];
                op.apply(T::one(), &basis[j], T::zero(), &mut w);
                pc.apply(&mut w);
                total_iterations += 1;

                // modified Gram-Schmidt against v₀..vⱼ
                for i in 0..=j {
                    h[i][j] = dot(&w, &basis[i]);
                    axpy(-h[i][j], &basis[i], &mut w);
                }
                h[j + 1][j] = nrm2(&w);

                // previously stored rotations, then a new one for column j
                for i in 0..j {
                    let tmp = cs[i] * h[i][j] + sn[i] * h[i + 1][j];
                    h[i + 1][j] = -sn[i] * h[i][j] + cs[i] * h[i + 1][j];
                    h[i][j] = tmp;
                }
                let h_next = h[j + 1][j];
                let rho = (h[j][j] * h[j][j] + h_next * h_next).sqrt();
                if rho == T::zero() {
                    cs[j] = T::one();
                    sn[j] = T::zero();
                } else {
                    cs[j] = h[j][j] / rho;
                    sn[j] = h_next / rho;
                }
                h[j][j] = rho;
                h[j + 1][j] = T::zero();
                g[j + 1] = -sn[j] * g[j];
                g[j] = cs[j] * g[j];
                inner_res = g[j + 1].abs();
                m = j + 1;

                // happy breakdown: the Krylov space is exhausted
                if h_next == T::zero() {
                    break;
                }
                let next: Vec<T> = w.iter().map(|&wi| wi / h_next).collect();
                basis.push(next);
            }

            // back-solve the upper triangular system H y = g
            let mut y = vec![T::zero(); m];
            for i in (0..m).rev() {
                let mut acc = g[i];
                for k in (i + 1)..m {
                    acc = acc - h[i][k] * y[k];
                }
                y[i] = if h[i][i] != T::zero() {
                    acc / h[i][i]
                } else {
                    T::zero()
                };
            }
            for (i, &yi) in y.iter().enumerate() {
                axpy(yi, &basis[i], x);
            }

            outer += 1;
            outer_res = inner_res;
        }

        Ok(SolveStats {
            iterations: total_iterations,
            final_residual: outer_res,
            converged: outer_res <= tol,
        })
    }
}
