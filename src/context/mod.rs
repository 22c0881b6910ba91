//! Factory for the implicit time-advance solvers.

pub mod step_context;

pub use step_context::{SolverKind, StepContext};
