//! One-dimensional Poisson sub-solver.
//!
//! Solves −φ_xx = ρ with linear finite elements on a uniform mesh, used by
//! PDE forcing terms that need a self-consistent field. The interior-node
//! system is symmetric positive definite tridiagonal and is factorized once
//! (LDLᵀ, the PTTRF/PTTRS pattern); the potential and the field E = −φ_x
//! are then evaluated at the Gauss-Legendre nodes of every element.

use crate::basis::quadrature::gauss_legendre;
use num_traits::Float;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PoissonBc {
    Dirichlet,
    Periodic,
}

// LDLᵀ factorization of an SPD tridiagonal, in place
fn pttrf<T: Float>(diag: &mut [T], off_diag: &mut [T]) {
    for i in 0..off_diag.len() {
        let e = off_diag[i];
        off_diag[i] = e / diag[i];
        diag[i + 1] = diag[i + 1] - e * off_diag[i];
    }
}

// solve with the factorization from pttrf
fn pttrs<T: Float>(diag: &[T], off_diag: &[T], b: &mut [T]) {
    let n = diag.len();
    for i in 1..n {
        b[i] = b[i] - off_diag[i - 1] * b[i - 1];
    }
    for i in 0..n {
        b[i] = b[i] / diag[i];
    }
    for i in (0..n - 1).rev() {
        b[i] = b[i] - off_diag[i] * b[i + 1];
    }
}

/// Assemble and factorize the interior-node stiffness matrix.
///
/// Returns the factorized (diagonal, off-diagonal) pair consumed by
/// [`poisson_solve`]; empty for a single element, which solves analytically.
pub fn poisson_setup<T: Float>(n_elements: usize, x_min: T, x_max: T) -> (Vec<T>, Vec<T>) {
    if n_elements == 1 {
        return (Vec::new(), Vec::new());
    }
    let dx = (x_max - x_min) / T::from(n_elements).unwrap();
    let n_nodes = n_elements - 1;
    let two = T::one() + T::one();
    let mut diag = vec![two / dx; n_nodes];
    let mut off_diag = vec![-(T::one() / dx); n_nodes.saturating_sub(1)];
    pttrf(&mut diag, &mut off_diag);
    (diag, off_diag)
}

/// Solve −φ_xx = source with φ(x_min) = φ_min, φ(x_max) = φ_max.
///
/// `source`, `phi` and `efield` hold degree+1 Gauss-Legendre values per
/// element. Under periodic boundary conditions the source is centred
/// (mean-subtracted) before the solve. A single element skips the
/// tridiagonal path and returns the boundary interpolation line.
#[allow(clippy::too_many_arguments)]
pub fn poisson_solve<T: Float>(
    source: &[T],
    diag: &[T],
    off_diag: &[T],
    phi: &mut [T],
    efield: &mut [T],
    degree: usize,
    n_elements: usize,
    x_min: T,
    x_max: T,
    phi_min: T,
    phi_max: T,
    bc: PoissonBc,
) {
    let pdof = degree + 1;
    assert_eq!(source.len(), n_elements * pdof);
    assert_eq!(phi.len(), n_elements * pdof);
    assert_eq!(efield.len(), n_elements * pdof);

    let dx = (x_max - x_min) / T::from(n_elements).unwrap();
    let half = T::from(0.5).unwrap();
    let (gp, gw) = gauss_legendre(pdof);
    let gp: Vec<T> = gp.into_iter().map(|v| T::from(v).unwrap()).collect();
    let gw: Vec<T> = gw.into_iter().map(|v| T::from(v).unwrap()).collect();

    // boundary lift, linear between the two prescribed values
    let dg = (phi_max - phi_min) / (x_max - x_min);

    if n_elements == 1 {
        for k in 0..pdof {
            let x_k = x_min + half * dx * (T::one() + gp[k]);
            phi[k] = phi_min + dg * (x_k - x_min);
            efield[k] = -dg;
        }
        return;
    }

    let n_nodes = n_elements - 1;

    // centre the source under periodic boundary conditions
    let mut ave_source = T::zero();
    if bc == PoissonBc::Periodic {
        for i in 0..n_elements {
            for q in 0..pdof {
                ave_source = ave_source + half * dx * gw[q] * source[i * pdof + q];
            }
        }
        ave_source = ave_source / (x_max - x_min);
    }

    // hat-function load vector on the interior nodes
    let quarter = half * half;
    let two = T::one() + T::one();
    let mut b = vec![T::zero(); n_nodes];
    for i in 0..n_nodes {
        for q in 0..pdof {
            b[i] = b[i]
                + quarter
                    * dx
                    * gw[q]
                    * (source[i * pdof + q] * (T::one() + gp[q])
                        + source[(i + 1) * pdof + q] * (T::one() - gp[q])
                        - two * ave_source);
        }
    }

    pttrs(diag, off_diag, &mut b);

    // first element
    for k in 0..pdof {
        let x_k = x_min + half * dx * (T::one() + gp[k]);
        let g_k = phi_min + dg * (x_k - x_min);
        phi[k] = half * b[0] * (T::one() + gp[k]) + g_k;
        efield[k] = -b[0] / dx - dg;
    }
    // interior elements
    for i in 1..n_elements - 1 {
        for q in 0..pdof {
            let k = i * pdof + q;
            let x_k = x_min + T::from(i).unwrap() * dx + half * dx * (T::one() + gp[q]);
            let g_k = phi_min + dg * (x_k - x_min);
            phi[k] = half * (b[i - 1] * (T::one() - gp[q]) + b[i] * (T::one() + gp[q])) + g_k;
            efield[k] = -(b[i] - b[i - 1]) / dx - dg;
        }
    }
    // last element
    let i = n_elements - 1;
    for q in 0..pdof {
        let k = i * pdof + q;
        let x_k = x_min + T::from(i).unwrap() * dx + half * dx * (T::one() + gp[q]);
        let g_k = phi_min + dg * (x_k - x_min);
        phi[k] = half * b[i - 1] * (T::one() - gp[q]) + g_k;
        efield[k] = b[i - 1] / dx - dg;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tridiagonal_factorization_solves() {
        // -u'' discretization on 5 nodes, solve against a direct check
        let mut d = vec![2.0; 5];
        let mut e = vec![-1.0; 4];
        pttrf(&mut d, &mut e);
        let mut b = vec![1.0, 0.0, 0.0, 0.0, 1.0];
        pttrs(&d, &e, &mut b);
        // A·x should reproduce the right-hand side
        let x = b;
        let a_row = |i: usize| -> f64 {
            let left = if i > 0 { -x[i - 1] } else { 0.0 };
            let right = if i < 4 { -x[i + 1] } else { 0.0 };
            2.0 * x[i] + left + right
        };
        let rhs = [1.0, 0.0, 0.0, 0.0, 1.0];
        for i in 0..5 {
            assert!((a_row(i) - rhs[i]).abs() < 1e-13);
        }
    }

    #[test]
    fn single_element_returns_boundary_line() {
        let degree = 2;
        let (d, e) = poisson_setup::<f64>(1, 0.0, 2.0);
        let source = vec![5.0; degree + 1];
        let mut phi = vec![0.0; degree + 1];
        let mut efield = vec![0.0; degree + 1];
        poisson_solve(
            &source, &d, &e, &mut phi, &mut efield, degree, 1, 0.0, 2.0, 1.0, 3.0,
            PoissonBc::Dirichlet,
        );
        let (gp, _) = gauss_legendre(degree + 1);
        for k in 0..=degree {
            let x_k = 1.0 * (1.0 + gp[k]);
            assert!((phi[k] - (1.0 + 1.0 * x_k)).abs() < 1e-14);
            assert!((efield[k] + 1.0).abs() < 1e-14);
        }
    }

    #[test]
    fn constant_source_has_exact_interior_nodes() {
        // -φ'' = 1 on [0, 1] with zero boundary values: φ = x(1-x)/2,
        // and linear elements are nodally exact
        let degree = 1;
        let n_elements = 4;
        let (d, e) = poisson_setup::<f64>(n_elements, 0.0, 1.0);
        let source = vec![1.0; n_elements * (degree + 1)];
        let mut phi = vec![0.0; n_elements * (degree + 1)];
        let mut efield = vec![0.0; n_elements * (degree + 1)];
        poisson_solve(
            &source, &d, &e, &mut phi, &mut efield, degree, n_elements, 0.0, 1.0, 0.0, 0.0,
            PoissonBc::Dirichlet,
        );
        // reconstruct the interior nodal values from the first elements
        let (gp, _) = gauss_legendre(degree + 1);
        let dx = 0.25;
        let exact = |x: f64| 0.5 * x * (1.0 - x);
        for i in 0..n_elements {
            for q in 0..=degree {
                let x = i as f64 * dx + 0.5 * dx * (1.0 + gp[q]);
                // the numeric solution is the linear interpolant of exact
                // nodal values
                let x0 = i as f64 * dx;
                let x1 = (i + 1) as f64 * dx;
                let lin = exact(x0) + (exact(x1) - exact(x0)) * (x - x0) / dx;
                assert!(
                    (phi[i * (degree + 1) + q] - lin).abs() < 1e-13,
                    "element {i}, node {q}"
                );
            }
        }
    }

    #[test]
    fn sine_source_converges_to_analytic_solution() {
        // -φ'' = π² sin(πx), φ(0) = φ(1) = 0  ⇒  φ = sin(πx)
        let degree = 2;
        let n_elements = 128;
        let pdof = degree + 1;
        let (d, e) = poisson_setup::<f64>(n_elements, 0.0, 1.0);
        let (gp, _) = gauss_legendre(pdof);
        let dx = 1.0 / n_elements as f64;
        let pi = std::f64::consts::PI;
        let mut source = vec![0.0; n_elements * pdof];
        for i in 0..n_elements {
            for q in 0..pdof {
                let x = i as f64 * dx + 0.5 * dx * (1.0 + gp[q]);
                source[i * pdof + q] = pi * pi * (pi * x).sin();
            }
        }
        let mut phi = vec![0.0; n_elements * pdof];
        let mut efield = vec![0.0; n_elements * pdof];
        poisson_solve(
            &source, &d, &e, &mut phi, &mut efield, degree, n_elements, 0.0, 1.0, 0.0, 0.0,
            PoissonBc::Dirichlet,
        );
        let mut max_phi_err = 0.0f64;
        let mut max_e_err = 0.0f64;
        for i in 0..n_elements {
            for q in 0..pdof {
                let x = i as f64 * dx + 0.5 * dx * (1.0 + gp[q]);
                max_phi_err = max_phi_err.max((phi[i * pdof + q] - (pi * x).sin()).abs());
                max_e_err = max_e_err.max((efield[i * pdof + q] + pi * (pi * x).cos()).abs());
            }
        }
        assert!(max_phi_err < 5e-4, "phi error {max_phi_err}");
        // E is the elementwise derivative of the linear interpolant
        assert!(max_e_err < 5e-2, "E error {max_e_err}");
    }

    #[test]
    fn periodic_source_is_centred() {
        // a constant source has zero mean-free part, so φ is the boundary
        // line and E is constant under periodic conditions
        let degree = 1;
        let n_elements = 8;
        let pdof = degree + 1;
        let (d, e) = poisson_setup::<f64>(n_elements, 0.0, 1.0);
        let source = vec![7.5; n_elements * pdof];
        let mut phi = vec![0.0; n_elements * pdof];
        let mut efield = vec![0.0; n_elements * pdof];
        poisson_solve(
            &source, &d, &e, &mut phi, &mut efield, degree, n_elements, 0.0, 1.0, 0.0, 0.0,
            PoissonBc::Periodic,
        );
        for v in &phi {
            assert!(v.abs() < 1e-12, "phi should vanish, got {v}");
        }
        for v in &efield {
            assert!(v.abs() < 1e-12, "E should vanish, got {v}");
        }
    }
}
