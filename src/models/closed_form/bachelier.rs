//! Bachelier (normal) model on a forward with an explicit discount factor.
//!
//! **Call**: `df·((F − K)·N(d) + σ√t·n(d))`, **Put**: `df·((K − F)·N(−d) + σ√t·n(d))`
//! with `d = (F − K)/(σ√t)`. Forward and strike may take any sign; `vol` is an
//! absolute (normal) volatility.

use super::{is_deterministic, validate_discount, validate_vol_time};
use crate::error::{ensure_finite, invalid_input, Result};
use crate::math::{norm_cdf, norm_pdf};
use crate::types::OptionType;

fn validate(f: f64, k: f64, vol: f64, t_exp: f64, df: f64) -> Result<()> {
    validate_vol_time(vol, t_exp)?;
    if !f.is_finite() || !k.is_finite() {
        return Err(invalid_input!("forward and strike must be finite, got F={} K={}", f, k));
    }
    validate_discount(df)
}

/// Bachelier price of a European option.
pub fn bachelier_price(
    f: f64,
    k: f64,
    vol: f64,
    t_exp: f64,
    df: f64,
    option_type: OptionType,
) -> Result<f64> {
    validate(f, k, vol, t_exp, df)?;
    let w = option_type.sign();
    let intrinsic = w * (f - k);

    if is_deterministic(vol, t_exp) {
        return Ok(df * intrinsic.max(0.0));
    }

    let std_dev = vol * t_exp.sqrt();
    let d = intrinsic / std_dev;
    let price = df * (intrinsic * norm_cdf(d) + std_dev * norm_pdf(d));
    ensure_finite(price.max(0.0), "Bachelier price")
}

/// Cash-or-nothing digital: `df·N(±d)`.
pub fn bachelier_digital(
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

    let d = w * (f - k) / (vol * t_exp.sqrt());
    ensure_finite(df * norm_cdf(d), "Bachelier digital")
}

/// Forward delta: `df·N(d)` for calls, `−df·N(−d)` for puts.
pub fn bachelier_delta(
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

    let d = w * (f - k) / (vol * t_exp.sqrt());
    ensure_finite(w * df * norm_cdf(d), "Bachelier delta")
}

/// Vega `df·√t·n(d)`.
pub fn bachelier_vega(f: f64, k: f64, vol: f64, t_exp: f64, df: f64) -> Result<f64> {
    validate(f, k, vol, t_exp, df)?;
    if t_exp == 0.0 {
        return Ok(0.0);
    }
    let sqrt_t = t_exp.sqrt();
    if is_deterministic(vol, t_exp) {
        return Ok(if f == k { df * sqrt_t * norm_pdf(0.0) } else { 0.0 });
    }
    let d = (f - k) / (vol * sqrt_t);
    ensure_finite(df * sqrt_t * norm_pdf(d), "Bachelier vega")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_atm_value() {
        // ATM: df·σ·√t / √(2π)
        let c = bachelier_price(0.03, 0.03, 0.01, 1.0, 1.0, OptionType::Call).unwrap();
        assert_abs_diff_eq!(c, 0.01 * 0.398_942_280_401_432_7, epsilon = 1e-15);
    }

    #[test]
    fn test_negative_forward_allowed() {
        let c = bachelier_price(-0.005, 0.0, 0.01, 2.0, 0.98, OptionType::Call).unwrap();
        let p = bachelier_price(-0.005, 0.0, 0.01, 2.0, 0.98, OptionType::Put).unwrap();
        assert!(c > 0.0 && p > c);
        assert_abs_diff_eq!(c - p, 0.98 * (-0.005), epsilon = 1e-15);
    }

    #[test]
    fn test_expired_is_intrinsic() {
        let p = bachelier_price(95.0, 100.0, 5.0, 0.0, 0.9, OptionType::Put).unwrap();
        assert_abs_diff_eq!(p, 4.5, epsilon = 1e-12);
    }

    #[test]
    fn test_delta_and_vega_match_finite_difference() {
        let (f, k, vol, t, df) = (101.0, 100.0, 8.0, 0.7, 0.96);
        let h = 1e-4;
        for option_type in [OptionType::Call, OptionType::Put] {
            let up = bachelier_price(f + h, k, vol, t, df, option_type).unwrap();
            let dn = bachelier_price(f - h, k, vol, t, df, option_type).unwrap();
            let delta = bachelier_delta(f, k, vol, t, df, option_type).unwrap();
            assert_abs_diff_eq!(delta, (up - dn) / (2.0 * h), epsilon = 1e-7);
        }
        let up = bachelier_price(f, k, vol + h, t, df, OptionType::Call).unwrap();
        let dn = bachelier_price(f, k, vol - h, t, df, OptionType::Call).unwrap();
        let vega = bachelier_vega(f, k, vol, t, df).unwrap();
        assert_abs_diff_eq!(vega, (up - dn) / (2.0 * h), epsilon = 1e-7);
    }

    #[test]
    fn test_digital_bounds() {
        let c = bachelier_digital(100.0, 100.0, 10.0, 1.0, 0.95, OptionType::Call).unwrap();
        assert_abs_diff_eq!(c, 0.475, epsilon = 1e-14);
    }
}
