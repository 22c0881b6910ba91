//! krongrid: sparse-grid Kronecker operator engine with matrix-free Krylov
//! time stepping.
//!
//! The crate discretizes evolution equations ∂u/∂t = L(u) + f over a
//! tensor-product hypercube, with L a sum of Kronecker-product terms over a
//! hierarchical sparse grid. The pieces, leaves first:
//!
//! - [`grid`]: 1D dyadic cells and their adjacency, the sparse
//!   multidimensional index set, and lower-set generation;
//! - [`kron`]: the local (block-pairwise) and global (directional-sweep)
//!   Kronecker matvec engines and the owning operator facade;
//! - [`interp`]: nodal / hierarchical / Legendre-projection conversions on
//!   sparse grids;
//! - [`solver`]: restarted GMRES and BiCGSTAB driving the operators
//!   matrix-free, the implicit-Euler wrappers, and the 1D Poisson
//!   sub-solver;
//! - [`preconditioner`]: the diagonal (Jacobi) preconditioner of the
//!   implicit system.

pub mod basis;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod grid;
pub mod interp;
pub mod kron;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use crate::core::traits::LinearOperator;
pub use config::{Options, MAX_DEGREE, MAX_DIMENSIONS};
pub use context::{SolverKind, StepContext};
pub use error::KError;
pub use grid::{Cell1d, Connect1d, DimensionSort, Hierarchy, IndexSet};
pub use interp::Interpolation;
pub use kron::{Imex, KronOperators, KronTerm, LocalKronMatrix, Permutes, SubGrid, Workspace};
pub use preconditioner::{IdentityPreconditioner, Jacobi, Preconditioner};
pub use solver::{BiCgStabSolver, GmresSolver, PoissonBc};

// Re-export SolveStats at the crate root for convenience
pub use utils::convergence::SolveStats;
