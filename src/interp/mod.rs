//! Hierarchical multidimensional interpolation on sparse grids.
//!
//! Three equivalent representations of a function on the active index set,
//! each with 2^d values per cell (linear basis):
//!
//! - nodal values at the tensor-product interpolation nodes,
//! - hierarchical coefficients in the cardinal wavelet basis,
//! - Legendre projection coefficients.
//!
//! projection → nodal and hierarchical → projection are full transforms and
//! run through the global-kron sweeps; nodal → hierarchical is a
//! forward-substitution (the surplus tables are unit lower triangular in
//! the hierarchical order) and runs in place, one dimension at a time.

pub mod transforms;

use crate::grid::connect::Connect1d;
use crate::grid::indexset::{DimensionSort, IndexSet};
use crate::kron::global::kronmult_global_single;
use crate::kron::{Permutes, Workspace};
use num_traits::Float;

pub struct Interpolation<'a, T> {
    num_dims: usize,
    conn: &'a Connect1d,
    permutes: Permutes,
    proj_to_nodal: Vec<T>,
    surplus: Vec<T>,
    hier_to_proj: Vec<T>,
}

impl<'a, T: Float> Interpolation<'a, T> {
    /// The interpolation engine is built for the linear basis.
    pub const DEGREE: usize = 2;

    pub fn new(num_dims: usize, conn: &'a Connect1d) -> Self {
        let cast = |v: Vec<f64>| -> Vec<T> {
            v.into_iter().map(|x| T::from(x).unwrap()).collect()
        };
        Self {
            num_dims,
            conn,
            permutes: Permutes::new(num_dims),
            proj_to_nodal: cast(transforms::make_proj_to_nodal(conn)),
            surplus: cast(transforms::make_hier_surplus(conn)),
            hier_to_proj: cast(transforms::make_hier_to_proj(conn)),
        }
    }

    pub fn num_dims(&self) -> usize {
        self.num_dims
    }

    /// Values per cell: 2^d.
    pub fn block_size(&self) -> usize {
        1 << self.num_dims
    }

    /// Tensor-product node coordinates of the index set: one row of d
    /// coordinates per (cell, intra-cell node), the last dimension fastest.
    pub fn get_nodes(&self, iset: &IndexSet) -> Vec<T> {
        assert_eq!(iset.num_dims(), self.num_dims);
        let d = self.num_dims;
        let bs = self.block_size();
        let mut nodes = Vec::with_capacity(iset.num_cells() * bs * d);
        for r in 0..iset.num_cells() {
            let coords = iset.index(r);
            for j in 0..bs {
                for k in 0..d {
                    let jk = (j >> (d - 1 - k)) & 1;
                    nodes.push(T::from(transforms::node(coords[k], jk)).unwrap());
                }
            }
        }
        nodes
    }

    /// nodal ← Σ_t (⊗ E) · proj_t: evaluate `num_terms` stacked projection
    /// expansions at the nodes and sum them.
    pub fn get_nodal_values(
        &self,
        iset: &IndexSet,
        dsort: &DimensionSort,
        num_terms: usize,
        proj: &[T],
        nodal: &mut [T],
        ws: &mut Workspace<T>,
    ) {
        let len = iset.num_cells() * self.block_size();
        assert_eq!(proj.len(), num_terms * len);
        assert_eq!(nodal.len(), len);
        for v in nodal.iter_mut() {
            *v = T::zero();
        }
        let dims: Vec<&[T]> = vec![self.proj_to_nodal.as_slice(); self.num_dims];
        for t in 0..num_terms {
            kronmult_global_single(
                &self.permutes,
                iset,
                dsort,
                self.conn,
                Self::DEGREE,
                &dims,
                T::one(),
                &proj[t * len..(t + 1) * len],
                nodal,
                ws,
            );
        }
    }

    /// In-place nodal → hierarchical: sweep every dimension, subtracting
    /// from each cell the interpolant of its ancestors along that dimension
    /// (hierarchical surplus).
    pub fn compute_hierarchical_coeffs(
        &self,
        iset: &IndexSet,
        dsort: &DimensionSort,
        vals: &mut [T],
    ) {
        let d = self.num_dims;
        let n = Self::DEGREE;
        let bs = self.block_size();
        assert_eq!(vals.len(), iset.num_cells() * bs);
        for dim in 0..d {
            let stride = 1usize << (d - 1 - dim);
            let lines = bs / (stride * n);
            for b in 0..dsort.num_buckets(dim) {
                let bucket = dsort.bucket(dim, b);
                // ascending coordinate = ascending level: ancestors first
                for i in bucket.clone() {
                    let row_i = dsort.map(dim, i);
                    let ci = iset.index(row_i)[dim];
                    for j in bucket.start..i {
                        let row_j = dsort.map(dim, j);
                        let cj = iset.index(row_j)[dim];
                        let Some(off) = self.conn.get_offset(ci, cj) else {
                            continue;
                        };
                        let w = &self.surplus[off * 4..(off + 1) * 4];
                        for outer in 0..lines {
                            let base = outer * stride * n;
                            for inner in 0..stride {
                                let o = base + inner;
                                for ai in 0..n {
                                    let mut acc = T::zero();
                                    for bj in 0..n {
                                        acc = acc
                                            + w[ai * n + bj] * vals[row_j * bs + o + bj * stride];
                                    }
                                    let idx = row_i * bs + o + ai * stride;
                                    vals[idx] = vals[idx] - acc;
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// proj ← (⊗ P) · hier: project the hierarchical interpolant back onto
    /// the Legendre basis of the active set.
    pub fn get_projection_coeffs(
        &self,
        iset: &IndexSet,
        dsort: &DimensionSort,
        hier: &[T],
        proj: &mut [T],
        ws: &mut Workspace<T>,
    ) {
        let len = iset.num_cells() * self.block_size();
        assert_eq!(hier.len(), len);
        assert_eq!(proj.len(), len);
        for v in proj.iter_mut() {
            *v = T::zero();
        }
        let dims: Vec<&[T]> = vec![self.hier_to_proj.as_slice(); self.num_dims];
        kronmult_global_single(
            &self.permutes,
            iset,
            dsort,
            self.conn,
            Self::DEGREE,
            &dims,
            T::one(),
            hier,
            proj,
            ws,
        );
    }
}
