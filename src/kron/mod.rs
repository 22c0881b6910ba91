//! Kronecker-product matrix-vector engines.

pub mod global;
pub mod local;
pub mod operators;
pub mod workspace;

pub use global::{kronmult_global_single, MatrixFill, Permutes};
pub use local::{decompose, offset_list_len, workspace_len, LocalKronMatrix, SubGrid};
pub use operators::{Imex, KronOperators, KronTerm};
pub use workspace::Workspace;
