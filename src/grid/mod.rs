//! Hierarchical 1D connectivity and sparse multidimensional index sets.

pub mod connect;
pub mod indexset;
pub mod permutations;

pub use connect::{Cell1d, Connect1d, Hierarchy};
pub use indexset::{DimensionSort, IndexSet};
pub use permutations::{cell_level, full_grid_set, lower_index_set, sparse_grid_set};
