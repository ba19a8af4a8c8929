//! Black (1976) model on a forward with an explicit discount factor.
//!
//! **Call**: `df·(F·N(d1) − K·N(d2))`, **Put**: `df·(K·N(−d2) − F·N(−d1))`
//! with `d1 = ln(F/K)/(σ√t) + σ√t/2`, `d2 = d1 − σ√t`.

use super::{
    is_deterministic, lognormal_d1_d2, validate_discount, validate_lognormal, validate_vol_time,
};
use crate::error::{ensure_finite, invalid_input, Result};
use crate::math::{norm_cdf, norm_inv, norm_pdf};
use crate::types::OptionType;

fn validate(f: f64, k: f64, vol: f64, t_exp: f64, df: f64) -> Result<()> {
    validate_vol_time(vol, t_exp)?;
    validate_lognormal(f, k)?;
    validate_discount(df)
}

/// Black price of a European option.
///
/// # Errors
/// `InvalidInput` when `vol < 0`, `t_exp < 0`, `F <= 0`, `K <= 0` or `df <= 0`.
///
/// # Example
/// ```
/// use volnode_lib::{black_price, OptionType};
///
/// let c = black_price(100.0, 100.0, 0.2, 1.0, 1.0, OptionType::Call).unwrap();
/// assert!((c - 7.965_567_455_405_798).abs() < 1e-9);
/// ```
pub fn black_price(
    f: f64,
    k: f64,
    vol: f64,
    t_exp: f64,
    df: f64,
    option_type: OptionType,
) -> Result<f64> {
    validate(f, k, vol, t_exp, df)?;
    let w = option_type.sign();

    if is_deterministic(vol, t_exp) {
        return Ok(df * (w * (f - k)).max(0.0));
    }

    let (d1, d2) = lognormal_d1_d2(f, k, vol * t_exp.sqrt());
    let price = df * w * (f * norm_cdf(w * d1) - k * norm_cdf(w * d2));
    // rounding can push deep OTM prices a hair below zero
    ensure_finite(price.max(0.0), "Black price")
}

/// Cash-or-nothing digital paying 1 at expiry if in the money: `df·N(±d2)`.
pub fn black_digital(
    f: f64,
    k: f64,
    vol: f64,
    t_exp: f64,
    df: f64,
    option_type: OptionType,
) -> Result<f64> {
    validate(f, k, vol, t_exp, df)?;
    let w = option_type.sign();

    if is_deterministic(vol, t_exp) {
        return Ok(if w * (f - k) > 0.0 { df } else { 0.0 });
    }

    let (_, d2) = lognormal_d1_d2(f, k, vol * t_exp.sqrt());
    ensure_finite(df * norm_cdf(w * d2), "Black digital")
}

/// Forward delta `∂V/∂F`: `df·N(d1)` for calls, `−df·N(−d1)` for puts.
pub fn black_delta(
    f: f64,
    k: f64,
    vol: f64,
    t_exp: f64,
    df: f64,
    option_type: OptionType,
) -> Result<f64> {
    validate(f, k, vol, t_exp, df)?;
    let w = option_type.sign();

    if is_deterministic(vol, t_exp) {
        return Ok(if w * (f - k) > 0.0 { w * df } else { 0.0 });
    }

    let (d1, _) = lognormal_d1_d2(f, k, vol * t_exp.sqrt());
    ensure_finite(w * df * norm_cdf(w * d1), "Black delta")
}

/// Vega `∂V/∂σ = df·F·n(d1)·√t`, identical for calls and puts.
pub fn black_vega(f: f64, k: f64, vol: f64, t_exp: f64, df: f64) -> Result<f64> {
    validate(f, k, vol, t_exp, df)?;
    if t_exp == 0.0 {
        return Ok(0.0);
    }
    let sqrt_t = t_exp.sqrt();
    if is_deterministic(vol, t_exp) {
        // vega at zero vol is zero off the money and df·F·√t/√(2π) at the money
        return Ok(if f == k {
            df * f * sqrt_t * norm_pdf(0.0)
        } else {
            0.0
        });
    }

    let (d1, _) = lognormal_d1_d2(f, k, vol * sqrt_t);
    ensure_finite(df * f * norm_pdf(d1) * sqrt_t, "Black vega")
}

/// Strike whose undiscounted put delta magnitude `N(−d1)` equals `put_delta`
/// at volatility `vol`: `K = F·exp(σ√t·N⁻¹(δ) + σ²t/2)`.
///
/// Strikes increase with `put_delta`; `put_delta = 0.5` gives the delta-neutral
/// strike `F·e^{σ²t/2}`.
pub fn black_strike_from_delta(f: f64, put_delta: f64, vol: f64, t_exp: f64) -> Result<f64> {
    validate_vol_time(vol, t_exp)?;
    if !f.is_finite() || f <= 0.0 {
        return Err(invalid_input!("forward must be positive, got {}", f));
    }
    if !(put_delta > 0.0 && put_delta < 1.0) {
        return Err(invalid_input!("delta must lie in (0, 1), got {}", put_delta));
    }
    let std_dev = vol * t_exp.sqrt();
    ensure_finite(
        f * (std_dev * norm_inv(put_delta) + 0.5 * std_dev * std_dev).exp(),
        "strike from delta",
    )
}
