//! Local (block-pairwise) Kronecker matvec.
//!
//! The operator is a sparse block matrix: for every nonzero (row, col) block
//! pair and every term, d operator slices of size n×n are applied as a
//! Kronecker product to the col block of x and accumulated into the row
//! block of y. Two build forms produce the same internal shape:
//!
//! - the precomputed form takes the block CSR and the per-block operator
//!   offset lists (`ia`) into a flat coefficient arena (`va`) directly;
//! - the element-table form takes the multidimensional index set and dense
//!   per-(term, dim) 1D coefficient matrices and runs the offset-list build
//!   once at construction, so grid adaptation rebuilds the lists rather than
//!   every solve step.
//!
//! Intra-block layout is row-major tensor order with the last dimension
//! fastest; operator blocks are row-major with leading dimension `lda`.

use crate::error::KError;
use num_traits::Float;
use std::ops::Range;

/// A rectangular range of row/col blocks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubGrid {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl SubGrid {
    pub fn new(rows: Range<usize>, cols: Range<usize>) -> Self {
        Self { rows, cols }
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.cols.len()
    }

    pub fn size(&self) -> usize {
        self.nrows() * self.ncols()
    }
}

/// Scratch requirement of a block range, in scalar units: two staging copies
/// per (block pair, term).
pub fn workspace_len(
    num_rows: usize,
    num_cols: usize,
    num_terms: usize,
    num_dims: usize,
    degree: usize,
) -> usize {
    2 * num_rows * num_cols * num_terms * degree.pow(num_dims as u32)
}

/// Offset-list requirement of a block range: input, work, output and
/// operator slots per (block pair, term).
pub fn offset_list_len(num_rows: usize, num_cols: usize, num_terms: usize) -> usize {
    4 * num_rows * num_cols * num_terms
}

/// Square-tile a block range so that each tile's workspace fits in
/// `budget_bytes`. Tiles step row-up then col-up; edge tiles are truncated to
/// the original range.
pub fn decompose(
    grid: &SubGrid,
    num_terms: usize,
    num_dims: usize,
    degree: usize,
    precision_bytes: usize,
    budget_bytes: usize,
) -> Vec<SubGrid> {
    let per_block = workspace_len(1, 1, num_terms, num_dims, degree) * precision_bytes;
    assert!(
        budget_bytes >= per_block,
        "workspace budget below a single block pair"
    );
    if grid.size() * per_block <= budget_bytes {
        return vec![grid.clone()];
    }
    let max_blocks = budget_bytes / per_block;
    let side = ((max_blocks as f64).sqrt().floor() as usize).max(1);
    let mut tiles = Vec::new();
    let mut r0 = grid.rows.start;
    while r0 < grid.rows.end {
        let r1 = (r0 + side).min(grid.rows.end);
        let mut c0 = grid.cols.start;
        while c0 < grid.cols.end {
            let c1 = (c0 + side).min(grid.cols.end);
            tiles.push(SubGrid::new(r0..r1, c0..c1));
            c0 = c1;
        }
        r0 = r1;
    }
    tiles
}

/// Sparse block-structured Kronecker operator.
pub struct LocalKronMatrix<T> {
    num_dims: usize,
    degree: usize,
    num_rows: usize,
    num_cols: usize,
    num_terms: usize,
    lda: usize,
    pntr: Vec<usize>,
    indx: Vec<usize>,
    // per (nonzero block, term): num_dims offsets into va
    ia: Vec<usize>,
    va: Vec<T>,
}

impl<T: Float + Send + Sync> LocalKronMatrix<T> {
    /// Build from a precomputed block CSR and operator offset lists.
    ///
    /// `ia[(z * num_terms + t) * num_dims + k]` is the start of the n×n
    /// operator slice for nonzero block `z`, term `t`, dimension `k`;
    /// slices are packed with leading dimension n.
    pub fn from_precomputed(
        num_dims: usize,
        degree: usize,
        num_cols: usize,
        num_terms: usize,
        pntr: Vec<usize>,
        indx: Vec<usize>,
        ia: Vec<usize>,
        va: Vec<T>,
    ) -> Result<Self, KError> {
        validate_shape(num_dims, degree)?;
        if pntr.is_empty() || pntr.windows(2).any(|w| w[0] > w[1]) {
            return Err(KError::InvalidArgument(
                "block row pointers must be monotone and non-empty".into(),
            ));
        }
        if *pntr.last().unwrap() != indx.len() {
            return Err(KError::InvalidArgument(
                "block column count disagrees with row pointers".into(),
            ));
        }
        if indx.iter().any(|&c| c >= num_cols) {
            return Err(KError::InvalidArgument("block column out of range".into()));
        }
        if ia.len() != indx.len() * num_terms * num_dims {
            return Err(KError::InvalidArgument(
                "operator offset list length mismatch".into(),
            ));
        }
        let lda = degree;
        if ia
            .iter()
            .any(|&o| o + (degree - 1) * lda + degree > va.len())
        {
            return Err(KError::InvalidArgument(
                "operator offset outside coefficient storage".into(),
            ));
        }
        Ok(Self {
            num_dims,
            degree,
            num_rows: pntr.len() - 1,
            num_cols,
            num_terms,
            lda,
            pntr,
            indx,
            ia,
            va,
        })
    }

    /// Build from an element table and dense per-(term, dim) 1D coefficient
    /// matrices (`terms[t * num_dims + k]`, row-major, lda×lda), over the
    /// requested row/col block range of the table.
    pub fn from_element_table(
        degree: usize,
        elem: &crate::grid::IndexSet,
        num_terms: usize,
        terms: &[Vec<T>],
        lda: usize,
        grid: &SubGrid,
    ) -> Result<Self, KError> {
        let num_dims = elem.num_dims();
        validate_shape(num_dims, degree)?;
        if terms.len() != num_terms * num_dims {
            return Err(KError::InvalidArgument(
                "expected one coefficient matrix per term and dimension".into(),
            ));
        }
        if grid.rows.end > elem.num_cells() || grid.cols.end > elem.num_cells() {
            return Err(KError::InvalidArgument(
                "block range outside the element table".into(),
            ));
        }
        let needed = (elem.max_index() + 1) * degree;
        if lda < needed || terms.iter().any(|m| m.len() != lda * lda) {
            return Err(KError::InvalidArgument(
                "coefficient matrices too small for the element table".into(),
            ));
        }

        // concatenate the term matrices into one arena
        let mut bases = Vec::with_capacity(terms.len());
        let mut va = Vec::with_capacity(terms.len() * lda * lda);
        for m in terms {
            bases.push(va.len());
            va.extend_from_slice(m);
        }

        let num_rows = grid.nrows();
        let num_cols = grid.ncols();
        let mut pntr = Vec::with_capacity(num_rows + 1);
        let mut indx = Vec::with_capacity(num_rows * num_cols);
        let mut ia = Vec::with_capacity(num_rows * num_cols * num_terms * num_dims);
        pntr.push(0);
        for r in grid.rows.clone() {
            let row_coords = elem.index(r);
            for c in grid.cols.clone() {
                let col_coords = elem.index(c);
                indx.push(c - grid.cols.start);
                for t in 0..num_terms {
                    for k in 0..num_dims {
                        let block =
                            row_coords[k] * degree * lda + col_coords[k] * degree;
                        ia.push(bases[t * num_dims + k] + block);
                    }
                }
            }
            pntr.push(indx.len());
        }
        Ok(Self {
            num_dims,
            degree,
            num_rows,
            num_cols,
            num_terms,
            lda,
            pntr,
            indx,
            ia,
            va,
        })
    }

    pub fn num_dims(&self) -> usize {
        self.num_dims
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn num_terms(&self) -> usize {
        self.num_terms
    }

    fn block_size(&self) -> usize {
        self.degree.pow(self.num_dims as u32)
    }

    pub fn input_size(&self) -> usize {
        self.num_cols * self.block_size()
    }

    pub fn output_size(&self) -> usize {
        self.num_rows * self.block_size()
    }

    /// y ← β·y + α · Σ_t (⊗_k A_{t,k}) · x.
    pub fn apply(&self, alpha: T, x: &[T], beta: T, y: &mut [T]) {
        assert_eq!(x.len(), self.input_size());
        assert_eq!(y.len(), self.output_size());
        super::global::scale_output(beta, y);
        self.apply_within(
            &SubGrid::new(0..self.num_rows, 0..self.num_cols),
            alpha,
            x,
            y,
        );
    }

    /// Accumulate the contributions of one block tile: y[tile rows] += α ·
    /// A[tile] · x[tile cols]. `x` and `y` are the full vectors.
    pub fn apply_within(&self, tile: &SubGrid, alpha: T, x: &[T], y: &mut [T]) {
        if tile.size() == 0 {
            return;
        }
        let bs = self.block_size();

        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            y[tile.rows.start * bs..tile.rows.end * bs]
                .par_chunks_mut(bs)
                .enumerate()
                .for_each_init(
                    || (vec![T::zero(); bs], vec![T::zero(); bs]),
                    |(wa, wb), (ri, yb)| {
                        self.row_kernel(tile.rows.start + ri, tile, alpha, x, yb, wa, wb);
                    },
                );
        }
        #[cfg(not(feature = "rayon"))]
        {
            let mut wa = vec![T::zero(); bs];
            let mut wb = vec![T::zero(); bs];
            for r in tile.rows.clone() {
                let yb = &mut y[r * bs..(r + 1) * bs];
                self.row_kernel(r, tile, alpha, x, yb, &mut wa, &mut wb);
            }
        }
    }

    /// Apply by square tiles whose workspace fits `budget_bytes`; identical
    /// result to `apply`.
    pub fn apply_tiled(&self, budget_bytes: usize, alpha: T, x: &[T], beta: T, y: &mut [T]) {
        assert_eq!(x.len(), self.input_size());
        assert_eq!(y.len(), self.output_size());
        super::global::scale_output(beta, y);
        let full = SubGrid::new(0..self.num_rows, 0..self.num_cols);
        for tile in decompose(
            &full,
            self.num_terms,
            self.num_dims,
            self.degree,
            std::mem::size_of::<T>(),
            budget_bytes,
        ) {
            self.apply_within(&tile, alpha, x, y);
        }
    }

    // contributions of every in-tile nonzero block of row r, into yb
    fn row_kernel(
        &self,
        r: usize,
        tile: &SubGrid,
        alpha: T,
        x: &[T],
        yb: &mut [T],
        wa: &mut [T],
        wb: &mut [T],
    ) {
        let bs = self.block_size();
        for z in self.pntr[r]..self.pntr[r + 1] {
            let c = self.indx[z];
            if !tile.cols.contains(&c) {
                continue;
            }
            let xb = &x[c * bs..(c + 1) * bs];
            for t in 0..self.num_terms {
                let ops =
                    &self.ia[(z * self.num_terms + t) * self.num_dims..][..self.num_dims];
                let in_wb = self.kron_block(ops, xb, wa, wb);
                let result = if in_wb { &wb[..bs] } else { &wa[..bs] };
                for (yi, ri) in yb.iter_mut().zip(result.iter()) {
                    *yi = *yi + alpha * *ri;
                }
            }
        }
    }

    // d successive n×n · n^(d-1) contractions, alternating the two buffers;
    // returns true when the result landed in wb
    fn kron_block(&self, ops: &[usize], xb: &[T], wa: &mut [T], wb: &mut [T]) -> bool {
        let bs = self.block_size();
        wa[..bs].copy_from_slice(xb);
        let mut flip = false;
        for k in 0..self.num_dims {
            let stride = self.degree.pow((self.num_dims - 1 - k) as u32);
            let a = &self.va[ops[k]..];
            if !flip {
                self.mode_product(stride, a, &wa[..bs], &mut wb[..bs]);
            } else {
                self.mode_product(stride, a, &wb[..bs], &mut wa[..bs]);
            }
            flip = !flip;
        }
        flip
    }

    fn mode_product(&self, stride: usize, a: &[T], src: &[T], dst: &mut [T]) {
        let n = self.degree;
        let bs = src.len();
        let lines = bs / (stride * n);
        for outer in 0..lines {
            let base = outer * stride * n;
            for inner in 0..stride {
                let o = base + inner;
                for ai in 0..n {
                    let mut acc = T::zero();
                    for bj in 0..n {
                        acc = acc + a[ai * self.lda + bj] * src[o + bj * stride];
                    }
                    dst[o + ai * stride] = acc;
                }
            }
        }
    }
}

fn validate_shape(num_dims: usize, degree: usize) -> Result<(), KError> {
    if !(1..=crate::config::MAX_DIMENSIONS).contains(&num_dims) {
        return Err(KError::InvalidArgument(format!(
            "dimensions must be 1..={}, got {num_dims}",
            crate::config::MAX_DIMENSIONS
        )));
    }
    if !(1..=crate::config::MAX_DEGREE).contains(&degree) {
        return Err(KError::InvalidArgument(format!(
            "degree must be 1..={}, got {degree}",
            crate::config::MAX_DEGREE
        )));
    }
    Ok(())
}
