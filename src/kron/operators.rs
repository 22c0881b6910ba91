//! Owning facade over the global Kronecker terms of one PDE operator.
//!
//! The operator set owns the connectivity, the index set, its dimension
//! sort and the per-term coefficient arrays; solvers borrow it as a
//! matrix-free [`LinearOperator`]. Coefficients are read-only during a
//! matvec; the interior workspace makes concurrent invocation on one
//! operator object a runtime error (use separate operator objects for
//! concurrent matvecs).

use crate::core::traits::LinearOperator;
use crate::error::KError;
use crate::grid::connect::Connect1d;
use crate::grid::indexset::{DimensionSort, IndexSet};
use crate::kron::global::{kronmult_global_single, scale_output, Permutes};
use crate::kron::workspace::Workspace;
use num_traits::Float;
use std::cell::RefCell;

/// Implicit/explicit classification of operator terms.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Imex {
    Unspecified,
    Explicit,
    Implicit,
}

/// One additive tensor-product term: per dimension, a coefficient array on
/// the 1D connectivity pattern.
pub struct KronTerm<T> {
    pub imex: Imex,
    pub coeffs: Vec<Vec<T>>,
}

impl<T> KronTerm<T> {
    pub fn new(imex: Imex, coeffs: Vec<Vec<T>>) -> Self {
        Self { imex, coeffs }
    }
}

pub struct KronOperators<T> {
    conn: Connect1d,
    iset: IndexSet,
    dsort: DimensionSort,
    permutes: Permutes,
    degree: usize,
    terms: Vec<KronTerm<T>>,
    workspace: RefCell<Workspace<T>>,
}

impl<T: Float> KronOperators<T> {
    pub fn new(
        conn: Connect1d,
        iset: IndexSet,
        degree: usize,
        terms: Vec<KronTerm<T>>,
    ) -> Result<Self, KError> {
        let num_dims = iset.num_dims();
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
        if iset.max_index() >= conn.num_cells() {
            return Err(KError::InvalidArgument(
                "index set refers to cells beyond the connectivity".into(),
            ));
        }
        let nnz = conn.num_connections();
        for (t, term) in terms.iter().enumerate() {
            if term.coeffs.len() != num_dims
                || term.coeffs.iter().any(|c| c.len() != nnz * degree * degree)
            {
                return Err(KError::InvalidArgument(format!(
                    "term {t}: expected {num_dims} coefficient arrays of length {}",
                    nnz * degree * degree
                )));
            }
        }
        let dsort = DimensionSort::new(&iset);
        let permutes = Permutes::new(num_dims);
        Ok(Self {
            conn,
            iset,
            dsort,
            permutes,
            degree,
            terms,
            workspace: RefCell::new(Workspace::new()),
        })
    }

    pub fn num_dims(&self) -> usize {
        self.iset.num_dims()
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn conn(&self) -> &Connect1d {
        &self.conn
    }

    pub fn iset(&self) -> &IndexSet {
        &self.iset
    }

    pub fn dsort(&self) -> &DimensionSort {
        &self.dsort
    }

    /// Length of a state vector: num_cells · degree^d.
    pub fn state_len(&self) -> usize {
        self.iset.num_cells() * self.degree.pow(self.num_dims() as u32)
    }

    fn term_selected(&self, imex: Imex, term: &KronTerm<T>) -> bool {
        imex == Imex::Unspecified || term.imex == Imex::Unspecified || term.imex == imex
    }

    /// y ← β·y + α · Σ_t (⊗_k A_{t,k}) · x over the terms selected by `imex`.
    pub fn apply_imex(&self, imex: Imex, alpha: T, x: &[T], beta: T, y: &mut [T]) {
        assert_eq!(x.len(), self.state_len());
        assert_eq!(y.len(), self.state_len());
        scale_output(beta, y);
        let mut ws = self.workspace.borrow_mut();
        for term in self.terms.iter().filter(|t| self.term_selected(imex, t)) {
            let dims: Vec<&[T]> = term.coeffs.iter().map(|c| c.as_slice()).collect();
            kronmult_global_single(
                &self.permutes,
                &self.iset,
                &self.dsort,
                &self.conn,
                self.degree,
                &dims,
                alpha,
                x,
                y,
                &mut ws,
            );
        }
    }

    /// Diagonal of the selected operator, one entry per cell and intra-cell
    /// degree of freedom: Σ_t Π_k A_{t,k}[(r_k, j_k), (r_k, j_k)].
    pub fn diagonal(&self, imex: Imex) -> Vec<T> {
        let d = self.num_dims();
        let n = self.degree;
        let bs = n.pow(d as u32);
        let mut diag = vec![T::zero(); self.state_len()];
        for term in self.terms.iter().filter(|t| self.term_selected(imex, t)) {
            for r in 0..self.iset.num_cells() {
                let coords = self.iset.index(r);
                for j in 0..bs {
                    let mut prod = T::one();
                    let mut jj = j;
                    for k in (0..d).rev() {
                        let jk = jj % n;
                        jj /= n;
                        let off = self
                            .conn
                            .get_offset(coords[k], coords[k])
                            .expect("self-connections are always present");
                        prod = prod * term.coeffs[k][off * n * n + jk * n + jk];
                    }
                    diag[r * bs + j] = diag[r * bs + j] + prod;
                }
            }
        }
        diag
    }
}

impl<T: Float> LinearOperator<T> for KronOperators<T> {
    fn apply(&self, alpha: T, x: &[T], beta: T, y: &mut [T]) {
        self.apply_imex(Imex::Unspecified, alpha, x, beta, y);
    }
    fn nrows(&self) -> usize {
        self.state_len()
    }
}
