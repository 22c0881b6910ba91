//! Discretization and time-stepping options.
//!
//! Every `Option<_>` field is the "unset" sentinel: the engine picks its
//! default. Invalid combinations are rejected by [`Options::validate`]
//! before any solve begins; restart-vs-size checks that need the system
//! size happen inside the solvers.

use crate::error::KError;
use crate::grid::{full_grid_set, sparse_grid_set, IndexSet};

/// Highest supported dimensionality of the tensor-product domain.
pub const MAX_DIMENSIONS: usize = 6;

/// Highest supported polynomial degree per dimension.
pub const MAX_DEGREE: usize = 10;

#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Polynomial order per dimension, 1..=10.
    pub degree: Option<usize>,
    /// Per-dimension maximum refinement level; the length sets the
    /// dimensionality.
    pub levels: Vec<usize>,
    /// Cap on the hierarchical level sum; defaults to max(levels).
    pub max_level: Option<usize>,
    /// Skip sparse selection and build the full anisotropic box.
    pub use_full_grid: bool,
    pub num_time_steps: Option<usize>,
    pub dt: Option<f64>,
    /// GMRES restart length.
    pub restart: Option<usize>,
    /// Solver tolerance; defaults per precision inside the solvers.
    pub tolerance: Option<f64>,
    /// Iteration budget for the solvers.
    pub max_iterations: Option<usize>,
}

impl Options {
    pub fn validate(&self) -> Result<(), KError> {
        if self.levels.is_empty() || self.levels.len() > MAX_DIMENSIONS {
            return Err(KError::InvalidArgument(format!(
                "levels must name 1..={MAX_DIMENSIONS} dimensions, got {}",
                self.levels.len()
            )));
        }
        if let Some(n) = self.degree {
            if !(1..=MAX_DEGREE).contains(&n) {
                return Err(KError::InvalidArgument(format!(
                    "degree must be 1..={MAX_DEGREE}, got {n}"
                )));
            }
        }
        if let Some(dt) = self.dt {
            if !(dt > 0.0) {
                return Err(KError::InvalidArgument(format!(
                    "time step must be positive, got {dt}"
                )));
            }
        }
        if self.num_time_steps == Some(0) {
            return Err(KError::InvalidArgument(
                "number of time steps must be positive".into(),
            ));
        }
        if self.restart == Some(0) {
            return Err(KError::InvalidArgument("restart must be positive".into()));
        }
        if self.max_iterations == Some(0) {
            return Err(KError::InvalidArgument(
                "iteration budget must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Polynomial order, defaulting to the linear basis.
    pub fn degree_or_default(&self) -> usize {
        self.degree.unwrap_or(2)
    }

    /// Level cap for the sparse selection.
    pub fn max_level_or_default(&self) -> usize {
        self.max_level
            .unwrap_or_else(|| self.levels.iter().copied().max().unwrap_or(0))
    }

    /// Build the index set these options describe.
    pub fn build_grid(&self) -> Result<IndexSet, KError> {
        self.validate()?;
        Ok(if self.use_full_grid {
            full_grid_set(&self.levels)
        } else {
            sparse_grid_set(&self.levels, self.max_level_or_default())
        })
    }
}
