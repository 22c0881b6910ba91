//! Scratch buffers for the directional kron sweeps.

use num_traits::Float;

/// Two alternating scratch vectors, grown on demand and reused across calls.
///
/// A workspace is exclusively written by the matvec in progress; concurrent
/// calls must use disjoint workspaces.
pub struct Workspace<T> {
    pub(crate) w1: Vec<T>,
    pub(crate) w2: Vec<T>,
}

impl<T: Float> Workspace<T> {
    pub fn new() -> Self {
        Self {
            w1: Vec::new(),
            w2: Vec::new(),
        }
    }

    pub(crate) fn ensure(&mut self, len: usize) {
        if self.w1.len() < len {
            self.w1.resize(len, T::zero());
            self.w2.resize(len, T::zero());
        }
    }

    /// Current allocation in scalar units.
    pub fn len(&self) -> usize {
        self.w1.len() + self.w2.len()
    }

    pub fn is_empty(&self) -> bool {
        self.w1.is_empty()
    }
}

impl<T: Float> Default for Workspace<T> {
    fn default() -> Self {
        Self::new()
    }
}
