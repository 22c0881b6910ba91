//! Piecewise-linear hierarchical basis on the unit interval.
//!
//! Two families over the reference cell [0, 1]:
//! - the projection basis: L²-orthonormal Legendre pair plus the two-piece
//!   wavelet pair, used for Galerkin coefficients,
//! - the interpolation basis: cardinal (Lagrange) pair at the nodes
//!   {1/3, 2/3} plus the wavelet pair that is cardinal at the hierarchically
//!   new nodes {1/6, 5/6} and vanishes at every coarser node.
//!
//! Wavelets are split at x = 1/2; evaluation outside [0, 1] is the caller's
//! responsibility (supports are handled one level up, in `interp`).

pub mod quadrature;

pub const SQRT3: f64 = 1.732_050_807_568_877_2;

/// Legendre 0: constant.
pub fn pleg0(_x: f64) -> f64 {
    1.0
}

/// Legendre 1, L²-normalized on [0, 1].
pub fn pleg1(x: f64) -> f64 {
    2.0 * SQRT3 * x - SQRT3
}

/// Projection wavelet 0.
pub fn pwav0(x: f64) -> f64 {
    if x < 0.5 {
        SQRT3 * (1.0 - 4.0 * x)
    } else {
        SQRT3 * (4.0 * x - 3.0)
    }
}

/// Projection wavelet 1.
pub fn pwav1(x: f64) -> f64 {
    if x < 0.5 { 6.0 * x - 1.0 } else { 6.0 * x - 5.0 }
}

/// Interpolation basis 0: cardinal at 1/3, vanishes at 2/3.
pub fn ibas0(x: f64) -> f64 {
    2.0 - 3.0 * x
}

/// Interpolation basis 1: cardinal at 2/3, vanishes at 1/3.
pub fn ibas1(x: f64) -> f64 {
    3.0 * x - 1.0
}

/// Interpolation wavelet 0: cardinal at 1/6, zero on the right half.
pub fn iwav0(x: f64) -> f64 {
    if x < 0.5 { 2.0 - 6.0 * x } else { 0.0 }
}

/// Interpolation wavelet 1: cardinal at 5/6, zero on the left half.
pub fn iwav1(x: f64) -> f64 {
    if x < 0.5 { 0.0 } else { 6.0 * x - 4.0 }
}
