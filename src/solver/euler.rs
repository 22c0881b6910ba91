//! Matrix-free implicit-Euler drivers.
//!
//! One backward-Euler (or IMEX-implicit) step solves (I − Δt·K)·x = b. The
//! Kronecker operator set is wrapped as the shifted operator
//! y ← β·y + α·(x − Δt·K·x) and handed to GMRES or BiCGSTAB together with
//! the Jacobi preconditioner built from the operator diagonal.

use crate::core::traits::LinearOperator;
use crate::core::wrappers::axpy;
use crate::error::KError;
use crate::kron::{Imex, KronOperators};
use crate::preconditioner::Jacobi;
use crate::solver::bicgstab::BiCgStabSolver;
use crate::solver::gmres::GmresSolver;
use crate::utils::convergence::SolveStats;
use num_traits::Float;

/// The implicit-Euler system matrix I − Δt·K, applied matrix-free.
pub struct ImplicitEulerOp<'a, T> {
    ops: &'a KronOperators<T>,
    dt: T,
    imex: Imex,
}

impl<'a, T: Float> ImplicitEulerOp<'a, T> {
    pub fn new(ops: &'a KronOperators<T>, dt: T, imex: Imex) -> Self {
        Self { ops, dt, imex }
    }
}

impl<T: Float> LinearOperator<T> for ImplicitEulerOp<'_, T> {
    fn apply(&self, alpha: T, x: &[T], beta: T, y: &mut [T]) {
        self.ops.apply_imex(self.imex, -self.dt * alpha, x, beta, y);
        axpy(alpha, x, y);
    }
    fn nrows(&self) -> usize {
        self.ops.state_len()
    }
}

/// Solve (I − Δt·K)·x = b with restarted GMRES and the diagonal
/// preconditioner reported by the operator set.
pub fn gmres_euler<T: Float + Send + Sync>(
    dt: T,
    imex: Imex,
    ops: &KronOperators<T>,
    x: &mut [T],
    b: &[T],
    restart: Option<usize>,
    max_outer: Option<usize>,
    tol: Option<T>,
) -> Result<SolveStats<T>, KError> {
    let op = ImplicitEulerOp::new(ops, dt, imex);
    let pc = Jacobi::from_diagonal(&ops.diagonal(imex), dt);
    GmresSolver::new(restart, tol, max_outer).solve(&op, &pc, x, b)
}

/// Solve (I − Δt·K)·x = b with BiCGSTAB and the diagonal preconditioner.
pub fn bicgstab_euler<T: Float + Send + Sync>(
    dt: T,
    imex: Imex,
    ops: &KronOperators<T>,
    x: &mut [T],
    b: &[T],
    max_iter: Option<usize>,
    tol: Option<T>,
) -> Result<SolveStats<T>, KError> {
    let op = ImplicitEulerOp::new(ops, dt, imex);
    let pc = Jacobi::from_diagonal(&ops.diagonal(imex), dt);
    BiCgStabSolver::new(tol, max_iter).solve(&op, &pc, x, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::connect::{Connect1d, Hierarchy};
    use crate::grid::sparse_grid_set;
    use crate::kron::KronTerm;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn decay_operator(level: usize, d: usize, lambda: f64) -> KronOperators<f64> {
        // K = λ·I expressed as a tensor product of identity blocks
        let conn = Connect1d::new(level, Hierarchy::Volume);
        let degree = 2;
        let mut coeffs = Vec::new();
        for k in 0..d {
            let mut vals = vec![0.0; conn.num_connections() * degree * degree];
            for r in 0..conn.num_cells() {
                let off = conn.get_offset(r, r).unwrap();
                let scale = if k == 0 { lambda } else { 1.0 };
                for i in 0..degree {
                    vals[off * degree * degree + i * degree + i] = scale;
                }
            }
            coeffs.push(vals);
        }
        let iset = sparse_grid_set(&vec![level; d], level);
        KronOperators::new(conn, iset, degree, vec![KronTerm::new(Imex::Implicit, coeffs)])
            .unwrap()
    }

    #[test]
    fn implicit_euler_step_matches_exact_decay_factor() {
        // du/dt = λu  ⇒  one backward-Euler step is u / (1 − λ·Δt)
        let lambda = -3.0;
        let dt = 0.05;
        let ops = decay_operator(3, 2, lambda);
        let mut rng = StdRng::seed_from_u64(4);
        let b: Vec<f64> = (0..ops.state_len())
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();

        let mut x = vec![0.0; b.len()];
        let stats = gmres_euler(dt, Imex::Implicit, &ops, &mut x, &b, None, None, Some(1e-12))
            .unwrap();
        assert!(stats.converged);
        let factor = 1.0 / (1.0 - lambda * dt);
        for (xi, bi) in x.iter().zip(b.iter()) {
            assert!((xi - factor * bi).abs() < 1e-10);
        }

        let mut x2 = vec![0.0; b.len()];
        let stats = bicgstab_euler(dt, Imex::Implicit, &ops, &mut x2, &b, None, Some(1e-12))
            .unwrap();
        assert!(stats.converged);
        for (a, b) in x.iter().zip(x2.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn solvers_agree_on_a_random_operator() {
        let level = 3;
        let d = 2;
        let degree = 2;
        let conn = Connect1d::new(level, Hierarchy::Volume);
        let mut rng = StdRng::seed_from_u64(42);
        // small off-diagonal perturbation keeps I − Δt·K well conditioned
        let coeffs: Vec<Vec<f64>> = (0..d)
            .map(|_| {
                (0..conn.num_connections() * degree * degree)
                    .map(|_| rng.gen_range(-0.2..0.2))
                    .collect()
            })
            .collect();
        let iset = sparse_grid_set(&vec![level; d], level);
        let ops = KronOperators::new(
            conn,
            iset,
            degree,
            vec![KronTerm::new(Imex::Unspecified, coeffs)],
        )
        .unwrap();
        let b: Vec<f64> = (0..ops.state_len())
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();
        let dt = 0.1;

        let mut xg = vec![0.0; b.len()];
        let sg = gmres_euler(dt, Imex::Unspecified, &ops, &mut xg, &b, None, None, Some(1e-12))
            .unwrap();
        let mut xb = vec![0.0; b.len()];
        let sb = bicgstab_euler(dt, Imex::Unspecified, &ops, &mut xb, &b, None, Some(1e-12))
            .unwrap();
        assert!(sg.converged && sb.converged);
        for (a, c) in xg.iter().zip(xb.iter()) {
            assert!((a - c).abs() < 1e-8);
        }

        // residual of the shifted system
        let op = ImplicitEulerOp::new(&ops, dt, Imex::Unspecified);
        let mut r = b.clone();
        op.apply(-1.0, &xg, 1.0, &mut r);
        let rn = crate::core::wrappers::nrm2(&r);
        assert!(rn < 1e-10, "residual {rn}");
    }
}
