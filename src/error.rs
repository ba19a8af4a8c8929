//! Error taxonomy shared by the pricers, the implied-vol solvers and the
//! volatility nodes.
//!
//! Every public numerical entry point returns [`Result`]; a failed computation
//! is always reported through one of these variants and never as a `NaN`.

use thiserror::Error;

/// Pricing and volatility lookup errors.
///
/// The enum is `Clone` so that a failed smile fit, once cached inside a node,
/// can be replayed to every subsequent query until the node is mutated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PricingError {
    /// Inputs outside the model domain: non-positive strike or underlying for a
    /// lognormal model, negative volatility or time, unknown option-type token,
    /// market price outside the no-arbitrage bounds.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An iterative routine exhausted its budget without meeting tolerance.
    #[error("{what} did not converge after {iterations} iterations (residual {residual:.3e})")]
    NoConvergence {
        /// Which routine failed (e.g. "Black implied vol")
        what: String,
        /// Iterations spent
        iterations: usize,
        /// Last absolute residual
        residual: f64,
    },

    /// Quoted delta points are not strictly increasing in strike after conversion.
    #[error("Degenerate smile: {0}")]
    DegenerateSmile(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PricingError>;

/// Shorthand for building an [`PricingError::InvalidInput`] with a formatted message.
macro_rules! invalid_input {
    ($($arg:tt)*) => {
        $crate::error::PricingError::InvalidInput(format!($($arg)*))
    };
}

pub(crate) use invalid_input;

/// Rejects non-finite outputs at the API boundary.
pub(crate) fn ensure_finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid_input!("{} evaluated to a non-finite value ({})", what, value))
    }
}
