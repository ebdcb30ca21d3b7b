//! Crate-wide error taxonomy.
//!
//! Structural invariants that cannot be recovered (bad array shapes, negative
//! panel areas, out-of-range indices) are surfaced as errors from
//! constructors; internal consistency between already-validated arrays is
//! guarded with `assert!`. BEM non-convergence is returned to the caller,
//! which may shrink the time step. A malformed reply from the external
//! high-order solver aborts the hybrid step.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All error conditions produced by the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Array sizes are inconsistent with the expected packing.
    #[error("shape mismatch: {what} has length {len}, expected a multiple of {stride}")]
    Shape {
        what: &'static str,
        len: usize,
        stride: usize,
    },

    /// A structural invariant does not hold.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// The BEM solve did not converge.
    #[error("linear solver did not converge: residual {residual:.3e} after {iters} iterations (tolerance {tol:.3e})")]
    Solver {
        residual: f64,
        iters: usize,
        tol: f64,
    },

    /// The external high-order solver returned malformed data.
    #[error("external solver error: {0}")]
    ExternalSolver(String),

    /// A configuration value is unusable even after clamping.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Convenience constructor for invariant violations.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Error::Invariant(msg.into())
    }
}
