//! Assembly of the 1D interpolation transform tables.
//!
//! Three families of 2×2 blocks on the connectivity pattern, all indexed by
//! `conn.get_offset(r, c) * 4 + i * 2 + j`:
//!
//! - projection→nodal: value of the projection basis function j of cell c at
//!   node i of cell r,
//! - hierarchical surplus: value of the interpolation basis function j of
//!   cell c at node i of cell r (unit lower triangular in the hierarchical
//!   order: wavelets vanish at every coarser node inside their support),
//! - hierarchical→projection: ∫ ψ_{r,i}(x) φ_{c,j}(x) dx, integrated exactly
//!   with two-point Gauss-Legendre on each polynomial piece.

use crate::basis;
use crate::basis::quadrature::gauss_legendre;
use crate::grid::connect::{Cell1d, Connect1d};

/// Interpolation node i of the 1D cell with the given linear index.
pub(crate) fn node(cell: usize, i: usize) -> f64 {
    if cell == 0 {
        return (i as f64 + 1.0) / 3.0;
    }
    let c = Cell1d::from_linear(cell);
    let (lo, hi) = c.support();
    let h = hi - lo;
    lo + h * if i == 0 { 1.0 / 6.0 } else { 5.0 / 6.0 }
}

/// Projection basis function j of a cell, evaluated at x (zero off support).
pub(crate) fn proj_basis(cell: usize, j: usize, x: f64) -> f64 {
    if cell == 0 {
        return if j == 0 {
            basis::pleg0(x)
        } else {
            basis::pleg1(x)
        };
    }
    let c = Cell1d::from_linear(cell);
    let (lo, hi) = c.support();
    if x < lo || x > hi {
        return 0.0;
    }
    let blocks = (1u64 << (c.level - 1)) as f64;
    let xi = (x - lo) * blocks;
    blocks.sqrt() * if j == 0 { basis::pwav0(xi) } else { basis::pwav1(xi) }
}

/// Interpolation basis function j of a cell, evaluated at x (zero off
/// support); cardinal at the cell's own nodes.
pub(crate) fn interp_basis(cell: usize, j: usize, x: f64) -> f64 {
    if cell == 0 {
        return if j == 0 {
            basis::ibas0(x)
        } else {
            basis::ibas1(x)
        };
    }
    let c = Cell1d::from_linear(cell);
    let (lo, hi) = c.support();
    if x < lo || x > hi {
        return 0.0;
    }
    let xi = (x - lo) * (1u64 << (c.level - 1)) as f64;
    if j == 0 {
        basis::iwav0(xi)
    } else {
        basis::iwav1(xi)
    }
}

pub(crate) fn make_proj_to_nodal(conn: &Connect1d) -> Vec<f64> {
    let mut vals = vec![0.0; conn.num_connections() * 4];
    for r in 0..conn.num_cells() {
        for &c in conn.row(r) {
            let off = conn.get_offset(r, c).unwrap();
            for i in 0..2 {
                for j in 0..2 {
                    vals[off * 4 + i * 2 + j] = proj_basis(c, j, node(r, i));
                }
            }
        }
    }
    vals
}

pub(crate) fn make_hier_surplus(conn: &Connect1d) -> Vec<f64> {
    let mut vals = vec![0.0; conn.num_connections() * 4];
    for r in 0..conn.num_cells() {
        for &c in conn.row(r) {
            let off = conn.get_offset(r, c).unwrap();
            for i in 0..2 {
                for j in 0..2 {
                    vals[off * 4 + i * 2 + j] = interp_basis(c, j, node(r, i));
                }
            }
        }
    }
    vals
}

pub(crate) fn make_hier_to_proj(conn: &Connect1d) -> Vec<f64> {
    let (gp, gw) = gauss_legendre(2);
    let mut vals = vec![0.0; conn.num_connections() * 4];
    for r in 0..conn.num_cells() {
        let (rlo, rhi) = Cell1d::from_linear(r).support();
        for &c in conn.row(r) {
            let (clo, chi) = Cell1d::from_linear(c).support();
            let lo = rlo.max(clo);
            let hi = rhi.min(chi);
            if hi <= lo {
                // supports touch at a point only
                continue;
            }
            // split at both midpoints so every piece is a plain quadratic
            let mut pts = vec![lo, 0.5 * (rlo + rhi), 0.5 * (clo + chi), hi];
            pts.retain(|&p| p >= lo && p <= hi);
            pts.sort_by(|a, b| a.partial_cmp(b).unwrap());
            pts.dedup();
            let off = conn.get_offset(r, c).unwrap();
            for w in pts.windows(2) {
                let (p0, p1) = (w[0], w[1]);
                if p1 - p0 < 1e-300 {
                    continue;
                }
                let xm = 0.5 * (p0 + p1);
                let hw = 0.5 * (p1 - p0);
                for (x_hat, weight) in gp.iter().zip(gw.iter()) {
                    let x = xm + hw * x_hat;
                    for i in 0..2 {
                        for j in 0..2 {
                            vals[off * 4 + i * 2 + j] +=
                                hw * weight * proj_basis(r, i, x) * interp_basis(c, j, x);
                        }
                    }
                }
            }
        }
    }
    vals
}
