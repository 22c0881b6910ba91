//! Core traits and dense wrappers.

pub mod traits;
pub mod wrappers;

pub use traits::LinearOperator;
pub use wrappers::{axpy, dot, nrm2};
