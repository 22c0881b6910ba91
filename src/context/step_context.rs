//! Solver selection and configuration for one implicit step.

use crate::config::Options;
use crate::error::KError;
use crate::kron::{Imex, KronOperators};
use crate::solver::{bicgstab_euler, gmres_euler};
use crate::utils::convergence::SolveStats;
use num_traits::Float;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SolverKind {
    Gmres,
    Bicgstab,
}

/// Configured Krylov method for the (I − Δt·K)·x = b solves of a run.
pub struct StepContext<T> {
    pub kind: SolverKind,
    pub restart: Option<usize>,
    pub tol: Option<T>,
    pub max_iterations: Option<usize>,
}

impl<T: Float + Send + Sync> StepContext<T> {
    pub fn new(kind: SolverKind) -> Self {
        Self {
            kind,
            restart: None,
            tol: None,
            max_iterations: None,
        }
    }

    /// Pull solver parameters from the options record.
    pub fn from_options(kind: SolverKind, options: &Options) -> Result<Self, KError> {
        options.validate()?;
        Ok(Self {
            kind,
            restart: options.restart,
            tol: options.tolerance.map(|t| T::from(t).unwrap()),
            max_iterations: options.max_iterations,
        })
    }

    /// One implicit solve against the operator set.
    pub fn solve_implicit(
        &self,
        ops: &KronOperators<T>,
        dt: T,
        imex: Imex,
        x: &mut [T],
        b: &[T],
    ) -> Result<SolveStats<T>, KError> {
        match self.kind {
            SolverKind::Gmres => gmres_euler(
                dt,
                imex,
                ops,
                x,
                b,
                self.restart,
                self.max_iterations,
                self.tol,
            ),
            SolverKind::Bicgstab => {
                bicgstab_euler(dt, imex, ops, x, b, self.max_iterations, self.tol)
            }
        }
    }
}
