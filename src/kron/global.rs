//! Global Kronecker matvec over an irregular sparse index set.
//!
//! Each term stores, per dimension, one coefficient array aligned to the 1D
//! connectivity pattern: `vals[off * n² ..]` is the row-major n×n block of
//! the 1D operator at connection offset `off = conn.get_offset(r, c)`.
//!
//! The d-dimensional product is evaluated by directional sweeps through the
//! dimension-sort buckets. On an irregular (lower) index set a single sweep
//! order cannot route every contribution, because the intermediate
//! multi-index produced after each sweep must itself be a cell of the set.
//! The engine therefore splits every 1D operator into its upper (row ≤ col)
//! and strictly-lower triangles and telescopes
//!
//!   ⊗_k (U_k + L_k) = Σ_patterns (upper dims) ⊗ … ⊗ (lower dims)
//!
//! into 2^(d-1) sweep permutations, each sweeping its upper-fill dimensions
//! first (ascending), then the last dimension with both triangles, then the
//! lower-fill dimensions (descending). Every contribution is routed through
//! exactly one permutation and all of its intermediates are componentwise
//! dominated by either the source or the destination cell, hence present in
//! any lower set.

use crate::core::wrappers::axpy;
use crate::grid::connect::Connect1d;
use crate::grid::indexset::{DimensionSort, IndexSet};
use crate::kron::workspace::Workspace;
use num_traits::Float;

/// Which triangle of the 1D operator a sweep applies.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatrixFill {
    Upper,
    Both,
    Lower,
}

/// The canonical list of sweep permutations for a given dimensionality.
///
/// Permutations are enumerated by the subset of dimensions 0..d-1 assigned
/// the upper triangle, in ascending mask order; the last dimension always
/// carries both triangles. For d = 1 there is a single full sweep.
pub struct Permutes {
    steps: Vec<Vec<(usize, MatrixFill)>>,
}

impl Permutes {
    pub fn new(num_dims: usize) -> Self {
        assert!(num_dims >= 1);
        if num_dims == 1 {
            return Self {
                steps: vec![vec![(0, MatrixFill::Both)]],
            };
        }
        let m = num_dims - 1;
        let mut steps = Vec::with_capacity(1 << m);
        for mask in 0..(1usize << m) {
            let mut order = Vec::with_capacity(num_dims);
            for k in 0..m {
                if mask & (1 << k) != 0 {
                    order.push((k, MatrixFill::Upper));
                }
            }
            order.push((num_dims - 1, MatrixFill::Both));
            for k in (0..m).rev() {
                if mask & (1 << k) == 0 {
                    order.push((k, MatrixFill::Lower));
                }
            }
            steps.push(order);
        }
        Self { steps }
    }

    pub fn num_permutations(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self, p: usize) -> &[(usize, MatrixFill)] {
        &self.steps[p]
    }
}

/// One directional sweep: dst ← (I ⊗ … ⊗ A_dim ⊗ … ⊗ I) · src, restricted to
/// the requested triangle of A_dim.
pub(crate) fn sweep_dim<T: Float>(
    iset: &IndexSet,
    dsort: &DimensionSort,
    conn: &Connect1d,
    degree: usize,
    dim: usize,
    fill: MatrixFill,
    vals: &[T],
    src: &[T],
    dst: &mut [T],
) {
    let num_dims = iset.num_dims();
    let n = degree;
    let bs = n.pow(num_dims as u32);
    let stride = n.pow((num_dims - 1 - dim) as u32);
    let lines = bs / (stride * n);

    for v in dst.iter_mut() {
        *v = T::zero();
    }
    for b in 0..dsort.num_buckets(dim) {
        let bucket = dsort.bucket(dim, b);
        for i in bucket.clone() {
            let row_i = dsort.map(dim, i);
            let ci = iset.index(row_i)[dim];
            for j in bucket.clone() {
                let row_j = dsort.map(dim, j);
                let cj = iset.index(row_j)[dim];
                match fill {
                    MatrixFill::Upper if ci > cj => continue,
                    MatrixFill::Lower if ci <= cj => continue,
                    _ => {}
                }
                let Some(off) = conn.get_offset(ci, cj) else {
                    continue;
                };
                let a = &vals[off * n * n..(off + 1) * n * n];
                let xb = &src[row_j * bs..(row_j + 1) * bs];
                let yb = &mut dst[row_i * bs..(row_i + 1) * bs];
                for outer in 0..lines {
                    let base = outer * stride * n;
                    for inner in 0..stride {
                        let o = base + inner;
                        for ai in 0..n {
                            let mut acc = T::zero();
                            for bj in 0..n {
                                acc = acc + a[ai * n + bj] * xb[o + bj * stride];
                            }
                            yb[o + ai * stride] = yb[o + ai * stride] + acc;
                        }
                    }
                }
            }
        }
    }
}

/// Single-term global kronmult: y ← y + α · (⊗_k A_k) · x.
///
/// `term[k]` is the dimension-k coefficient array on the connectivity
/// pattern. This is the fast path consumed directly by the interpolation
/// engine; the multi-term operator loops over it.
pub fn kronmult_global_single<T: Float>(
    permutes: &Permutes,
    iset: &IndexSet,
    dsort: &DimensionSort,
    conn: &Connect1d,
    degree: usize,
    term: &[&[T]],
    alpha: T,
    x: &[T],
    y: &mut [T],
    ws: &mut Workspace<T>,
) {
    let num_dims = iset.num_dims();
    assert_eq!(term.len(), num_dims);
    let len = iset.num_cells() * degree.pow(num_dims as u32);
    assert_eq!(x.len(), len);
    assert_eq!(y.len(), len);
    if len == 0 {
        return;
    }
    ws.ensure(len);
    let Workspace { w1, w2 } = ws;
    for p in 0..permutes.num_permutations() {
        w1[..len].copy_from_slice(x);
        let mut flip = false;
        for &(dim, fill) in permutes.steps(p) {
            if !flip {
                sweep_dim(iset, dsort, conn, degree, dim, fill, term[dim], &w1[..len], &mut w2[..len]);
            } else {
                sweep_dim(iset, dsort, conn, degree, dim, fill, term[dim], &w2[..len], &mut w1[..len]);
            }
            flip = !flip;
        }
        let result = if flip { &w2[..len] } else { &w1[..len] };
        axpy(alpha, result, y);
    }
}

/// Scale y by β, treating β = 0 as an overwrite.
pub(crate) fn scale_output<T: Float>(beta: T, y: &mut [T]) {
    if beta == T::zero() {
        for v in y.iter_mut() {
            *v = T::zero();
        }
    } else if beta != T::one() {
        for v in y.iter_mut() {
            *v = beta * *v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::connect::Hierarchy;
    use crate::grid::sparse_grid_set;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_conn_values(conn: &Connect1d, degree: usize, rng: &mut StdRng) -> Vec<f64> {
        (0..conn.num_connections() * degree * degree)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect()
    }

    // quadratic-time reference: y[r] += x[c] · Π_k A_k[r_k, c_k]
    fn reference_apply(
        iset: &IndexSet,
        conn: &Connect1d,
        degree: usize,
        term: &[&[f64]],
        x: &[f64],
    ) -> Vec<f64> {
        let d = iset.num_dims();
        let n = degree;
        let bs = n.pow(d as u32);
        let num = iset.num_cells();
        let mut y = vec![0.0; num * bs];
        for r in 0..num {
            for c in 0..num {
                let offs: Option<Vec<usize>> = (0..d)
                    .map(|k| conn.get_offset(iset.index(r)[k], iset.index(c)[k]))
                    .collect();
                let Some(offs) = offs else { continue };
                for i in 0..bs {
                    for j in 0..bs {
                        let mut prod = 1.0;
                        let (mut ii, mut jj) = (i, j);
                        // decode intra indices, last dimension fastest
                        for k in (0..d).rev() {
                            let (ik, jk) = (ii % n, jj % n);
                            ii /= n;
                            jj /= n;
                            prod *= term[k][offs[k] * n * n + ik * n + jk];
                        }
                        y[r * bs + i] += prod * x[c * bs + j];
                    }
                }
            }
        }
        y
    }

    fn max_diff(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn one_dimensional_matches_dense_reference() {
        let mut rng = StdRng::seed_from_u64(42);
        for (num, level) in [(10usize, 4usize), (20, 5), (44, 6)] {
            let conn = Connect1d::new(level, Hierarchy::Volume);
            let iset = IndexSet::new(1, (0..num).collect());
            let dsort = DimensionSort::new(&iset);
            let perms = Permutes::new(1);
            let vals: Vec<f64> = random_conn_values(&conn, 1, &mut rng);
            let x: Vec<f64> = (0..num).map(|_| rng.gen_range(-1.0..1.0)).collect();

            let mut y_ref = vec![0.0; num];
            for i in 0..num {
                for j in 0..num {
                    if let Some(off) = conn.get_offset(i, j) {
                        y_ref[i] += x[j] * vals[off];
                    }
                }
            }

            let mut y = vec![0.0; num];
            let mut ws = Workspace::new();
            kronmult_global_single(
                &perms, &iset, &dsort, &conn, 1, &[&vals], 1.0, &x, &mut y, &mut ws,
            );
            assert!(max_diff(&y, &y_ref) < 1e-13);
        }
    }

    #[test]
    fn sparse_grid_constant_basis_matches_reference() {
        let mut rng = StdRng::seed_from_u64(42);
        for (d, level) in [(2usize, 4usize), (3, 4), (4, 3), (5, 3)] {
            let conn = Connect1d::new(level, Hierarchy::Volume);
            let iset = sparse_grid_set(&vec![level; d], level);
            let dsort = DimensionSort::new(&iset);
            let perms = Permutes::new(d);
            let vals: Vec<Vec<f64>> = (0..d)
                .map(|_| random_conn_values(&conn, 1, &mut rng))
                .collect();
            let term: Vec<&[f64]> = vals.iter().map(|v| v.as_slice()).collect();
            let x: Vec<f64> = (0..iset.num_cells())
                .map(|_| rng.gen_range(-1.0..1.0))
                .collect();

            let y_ref = reference_apply(&iset, &conn, 1, &term, &x);
            let mut y = vec![0.0; x.len()];
            let mut ws = Workspace::new();
            kronmult_global_single(
                &perms, &iset, &dsort, &conn, 1, &term, 1.0, &x, &mut y, &mut ws,
            );
            assert!(
                max_diff(&y, &y_ref) < 1e-12,
                "d = {d}, level = {level}: {}",
                max_diff(&y, &y_ref)
            );
        }
    }

    #[test]
    fn sparse_grid_linear_blocks_match_reference() {
        let mut rng = StdRng::seed_from_u64(7);
        let degree = 2;
        for (d, level) in [(2usize, 4usize), (3, 3)] {
            let conn = Connect1d::new(level, Hierarchy::Volume);
            let iset = sparse_grid_set(&vec![level; d], level);
            let dsort = DimensionSort::new(&iset);
            let perms = Permutes::new(d);
            let vals: Vec<Vec<f64>> = (0..d)
                .map(|_| random_conn_values(&conn, degree, &mut rng))
                .collect();
            let term: Vec<&[f64]> = vals.iter().map(|v| v.as_slice()).collect();
            let len = iset.num_cells() * degree.pow(d as u32);
            let x: Vec<f64> = (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect();

            let y_ref = reference_apply(&iset, &conn, degree, &term, &x);
            let mut y = vec![0.0; len];
            let mut ws = Workspace::new();
            kronmult_global_single(
                &perms, &iset, &dsort, &conn, degree, &term, 1.0, &x, &mut y, &mut ws,
            );
            assert!(
                max_diff(&y, &y_ref) < 1e-11,
                "d = {d}: {}",
                max_diff(&y, &y_ref)
            );
        }
    }

    #[test]
    fn permutation_list_is_canonical() {
        use super::MatrixFill::{Both, Lower, Upper};
        let p = Permutes::new(1);
        assert_eq!(p.num_permutations(), 1);
        assert_eq!(p.steps(0), &[(0, Both)]);

        let p = Permutes::new(3);
        assert_eq!(p.num_permutations(), 4);
        assert_eq!(p.steps(0), &[(2, Both), (1, Lower), (0, Lower)]);
        assert_eq!(p.steps(1), &[(0, Upper), (2, Both), (1, Lower)]);
        assert_eq!(p.steps(2), &[(1, Upper), (2, Both), (0, Lower)]);
        assert_eq!(p.steps(3), &[(0, Upper), (1, Upper), (2, Both)]);
    }
}
