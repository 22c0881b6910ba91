//! Engine options.

pub mod options;

pub use options::{Options, MAX_DEGREE, MAX_DIMENSIONS};
