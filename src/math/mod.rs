//! Numerical primitives consumed by the pricers and the volatility nodes.

pub mod interp;

pub use interp::{MonotoneCubic, TermVarianceCurve};

use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::{FRAC_1_SQRT_2, SQRT_2};

/// 1 / sqrt(2π)
const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Standard normal cumulative distribution function.
///
/// Evaluated through `erfc` so that the lower tail keeps full relative precision.
#[inline]
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x * FRAC_1_SQRT_2)
}

/// Standard normal probability density function.
#[inline]
pub fn norm_pdf(x: f64) -> f64 {
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Inverse of the standard normal CDF for `p` in (0, 1).
#[inline]
pub fn norm_inv(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}
