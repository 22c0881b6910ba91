//! Preconditioned BiCGSTAB (SIAM Templates book, p. 27).
//!
//! Stops when ‖r‖/‖b‖ drops below the tolerance; a vanishing ρ or ω is a
//! recoverable breakdown reported as an error so the caller can retry with
//! a different initial guess or fall back to GMRES.

use crate::core::traits::LinearOperator;
use crate::core::wrappers::{axpy, dot, nrm2};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::gmres::default_tolerance;
use crate::utils::convergence::{Convergence, SolveStats};
use num_traits::Float;

/// BiCGSTAB solver; `None` parameters use the engine defaults.
pub struct BiCgStabSolver<T> {
    pub tol: Option<T>,
    pub max_iter: Option<usize>,
}

impl<T: Float> BiCgStabSolver<T> {
    pub fn new(tol: Option<T>, max_iter: Option<usize>) -> Self {
        Self { tol, max_iter }
    }

    /// Solve A·x = b; `x` carries the initial guess in and the solution out.
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
        let max_iter = self.max_iter.unwrap_or(n);
        if max_iter == 0 {
            return Err(KError::InvalidArgument(
                "iteration budget must be positive".into(),
            ));
        }
        let conv = Convergence {
            tol,
            max_iters: max_iter,
        };

        let mut normb = nrm2(b);
        if normb == T::zero() {
            normb = T::one();
        }
        // r = b − A x
        let mut r = b.to_vec();
        op.apply(-T::one(), x, T::one(), &mut r);
        let rtilde = r.clone();

        let (_, stats) = conv.check(nrm2(&r), normb, 0);
        if stats.converged {
            return Ok(stats);
        }

        let mut rho_prev = T::zero();
        let mut alpha = T::zero();
        let mut omega = T::zero();
        let mut p = vec![T::zero(); n];
        let mut v = vec![T::zero(); n];
        let mut stats = stats;

        for i in 1..=max_iter {
            let rho = dot(&rtilde, &r);
            if rho == T::zero() {
                return Err(KError::Breakdown("bicgstab rho == 0".into()));
            }
            if i == 1 {
                p.copy_from_slice(&r);
            } else {
                let beta = (rho / rho_prev) * (alpha / omega);
                // p = r + β (p − ω v)
                for ((pj, &rj), &vj) in p.iter_mut().zip(r.iter()).zip(v.iter()) {
                    *pj = rj + beta * (*pj - omega * vj);
                }
            }
            let mut phat = p.clone();
            pc.apply(&mut phat);
            op.apply(T::one(), &phat, T::zero(), &mut v);
            alpha = rho / dot(&rtilde, &v);

            // s = r − α v  (reuse r)
            axpy(-alpha, &v, &mut r);
            let (_, s_stats) = conv.check(nrm2(&r), normb, i);
            if s_stats.converged {
                axpy(alpha, &phat, x);
                return Ok(s_stats);
            }

            let mut shat = r.clone();
            pc.apply(&mut shat);
            let mut t = vec![T::zero(); n];
            op.apply(T::one(), &shat, T::zero(), &mut t);
            omega = dot(&t, &r) / dot(&t, &t);

            axpy(alpha, &phat, x);
            axpy(omega, &shat, x);
            // r = s − ω t
            axpy(-omega, &t, &mut r);

            rho_prev = rho;
            let (_, r_stats) = conv.check(nrm2(&r), normb, i);
            stats = r_stats;
            if stats.converged {
                return Ok(stats);
            }
            if omega == T::zero() {
                return Err(KError::Breakdown("bicgstab omega == 0".into()));
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preconditioner::IdentityPreconditioner;
    use approx::assert_abs_diff_eq;
    use faer::Mat;

    #[test]
    fn tridiagonal_matches_gmres_reference() {
        let a = Mat::from_fn(4, 4, |i, j| {
            if i == j {
                -2.0
            } else if i.abs_diff(j) == 1 {
                1.0
            } else {
                0.0
            }
        });
        let b = vec![1.0, 2.0, 3.0, 4.0];
        let mut x = vec![0.0; 4];
        let solver = BiCgStabSolver::new(Some(1e-10), Some(100));
        let stats = solver
            .solve(&a, &IdentityPreconditioner, &mut x, &b)
            .unwrap();
        assert!(stats.converged, "stats = {stats:?}");
        assert!(stats.iterations <= 4, "iterations = {}", stats.iterations);
        let exact = [-4.0, -7.0, -8.0, -6.0];
        for (xi, ei) in x.iter().zip(exact.iter()) {
            assert_abs_diff_eq!(xi, ei, epsilon = 1e-8);
        }
    }

    #[test]
    fn solves_well_conditioned_nonsym() {
        let a = Mat::from_fn(3, 3, |i, j| {
            if i == j {
                4.0
            } else {
                (i + 2 * j) as f64 * 0.25 + 0.5
            }
        });
        let x_true = vec![1.0, 2.0, 3.0];
        let mut b = vec![0.0; 3];
        use crate::core::traits::LinearOperator;
        a.apply(1.0, &x_true, 0.0, &mut b);
        let mut x = vec![0.0; 3];
        let solver = BiCgStabSolver::new(Some(1e-10), Some(100));
        let stats = solver
            .solve(&a, &IdentityPreconditioner, &mut x, &b)
            .unwrap();
        assert!(stats.converged);
        for (xi, ei) in x.iter().zip(x_true.iter()) {
            assert_abs_diff_eq!(xi, ei, epsilon = 1e-8);
        }
    }

    #[test]
    fn zero_rhs_returns_immediately() {
        let a = Mat::from_fn(3, 3, |i, j| if i == j { 2.0 } else { 0.0 });
        let b = vec![0.0; 3];
        let mut x = vec![0.0; 3];
        let solver = BiCgStabSolver::<f64>::new(None, None);
        let stats = solver
            .solve(&a, &IdentityPreconditioner, &mut x, &b)
            .unwrap();
        assert!(stats.converged);
        assert_eq!(stats.iterations, 0);
    }

    #[test]
    fn reports_omega_breakdown() {
        // with b = (1, 1) the first stabilization step gives s = (¼, -¼) and
        // t = A·s = (¼, ¼), so ⟨t, s⟩ = 0 exactly and ω vanishes
        let entries = [[2.0, 1.0], [3.0, 2.0]];
        let a = Mat::from_fn(2, 2, |i, j| entries[i][j]);
        let b = vec![1.0, 1.0];
        let mut x = vec![0.0; 2];
        let solver = BiCgStabSolver::new(Some(1e-12), Some(50));
        match solver.solve(&a, &IdentityPreconditioner, &mut x, &b) {
            Err(KError::Breakdown(_)) => {}
            other => panic!("expected breakdown, got {other:?}"),
        }
    }
}
