//! Iterative solver core: GMRES, BiCGSTAB, implicit-Euler drivers, and the
//! one-dimensional Poisson sub-solver.

pub mod bicgstab;
pub mod euler;
pub mod gmres;
pub mod poisson;

pub use bicgstab::BiCgStabSolver;
pub use euler::{bicgstab_euler, gmres_euler, ImplicitEulerOp};
pub use gmres::{default_gmres_restarts, GmresSolver};
pub use poisson::{poisson_setup, poisson_solve, PoissonBc};
