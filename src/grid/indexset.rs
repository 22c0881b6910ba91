//! Sparse multidimensional index set and its per-dimension sort.

use std::cmp::Ordering;
use std::ops::Range;

/// Packed row-major set of d-dimensional cell indices.
///
/// Each row holds the d linear 1D cell indices of one grid cell; rows are
/// distinct and kept in lexicographic order.
#[derive(Clone)]
pub struct IndexSet {
    num_dims: usize,
    indexes: Vec<usize>,
}

impl IndexSet {
    /// Build from packed rows; sorts lexicographically and removes duplicates.
    pub fn new(num_dims: usize, indexes: Vec<usize>) -> Self {
        assert!(num_dims > 0);
        assert_eq!(indexes.len() % num_dims, 0);
        let mut rows: Vec<&[usize]> = indexes.chunks(num_dims).collect();
        rows.sort();
        rows.dedup();
        let indexes = rows.concat();
        Self { num_dims, indexes }
    }

    pub fn num_dims(&self) -> usize {
        self.num_dims
    }

    pub fn num_cells(&self) -> usize {
        self.indexes.len() / self.num_dims
    }

    /// The d coordinates of cell `row`.
    pub fn index(&self, row: usize) -> &[usize] {
        &self.indexes[row * self.num_dims..(row + 1) * self.num_dims]
    }

    /// Position of a coordinate tuple, if present.
    pub fn find(&self, coords: &[usize]) -> Option<usize> {
        assert_eq!(coords.len(), self.num_dims);
        let mut lo = 0;
        let mut hi = self.num_cells();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.index(mid).cmp(coords) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Some(mid),
            }
        }
        None
    }

    /// Largest 1D cell index appearing in any dimension.
    pub fn max_index(&self) -> usize {
        self.indexes.iter().copied().max().unwrap_or(0)
    }
}

/// Per-dimension permutations grouping cells that agree on every coordinate
/// but one, used by the global kron engine for its directional sweeps.
///
/// Within a bucket the rows are ordered ascending in the sort dimension's
/// coordinate, which (by the level-major cell numbering) is also ascending in
/// refinement level.
pub struct DimensionSort {
    perm: Vec<Vec<usize>>,
    pntr: Vec<Vec<usize>>,
}

impl DimensionSort {
    pub fn new(iset: &IndexSet) -> Self {
        let d = iset.num_dims();
        let n = iset.num_cells();
        let mut perm = Vec::with_capacity(d);
        let mut pntr = Vec::with_capacity(d);
        for dim in 0..d {
            let key_cmp = |&a: &usize, &b: &usize| -> Ordering {
                let ra = iset.index(a);
                let rb = iset.index(b);
                for k in 0..d {
                    if k == dim {
                        continue;
                    }
                    match ra[k].cmp(&rb[k]) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                }
                ra[dim].cmp(&rb[dim])
            };
            let mut p: Vec<usize> = (0..n).collect();
            p.sort_by(key_cmp);

            let same_bucket = |a: usize, b: usize| -> bool {
                let ra = iset.index(a);
                let rb = iset.index(b);
                (0..d).filter(|&k| k != dim).all(|k| ra[k] == rb[k])
            };
            let mut bounds = vec![0];
            for i in 1..n {
                if !same_bucket(p[i - 1], p[i]) {
                    bounds.push(i);
                }
            }
            bounds.push(n);
            perm.push(p);
            pntr.push(bounds);
        }
        Self { perm, pntr }
    }

    pub fn num_buckets(&self, dim: usize) -> usize {
        self.pntr[dim].len() - 1
    }

    /// Sorted-position range of one bucket.
    pub fn bucket(&self, dim: usize, b: usize) -> Range<usize> {
        self.pntr[dim][b]..self.pntr[dim][b + 1]
    }

    /// Row id at sorted position `i` for dimension `dim`.
    pub fn map(&self, dim: usize, i: usize) -> usize {
        self.perm[dim][i]
    }
}
