// Black-Scholes-Merton on a spot with continuously compounded rate `r` and
// dividend yield `q`. Priced as Black on the forward `S·e^{(r-q)T}` with
// discount factor `e^{-rT}`, so the two lognormal families share one set of
// d1/d2 conventions.

use super::{
    is_deterministic, lognormal_d1_d2, validate_lognormal, validate_rate, validate_vol_time,
};
use crate::error::{ensure_finite, Result};
use crate::math::{norm_cdf, norm_pdf};
use crate::types::OptionType;

fn validate(spot: f64, k: f64, vol: f64, t_exp: f64, r: f64, q: f64) -> Result<()> {
    validate_vol_time(vol, t_exp)?;
    validate_lognormal(spot, k)?;
    validate_rate("rate", r)?;
    validate_rate("dividend yield", q)
}

/// Price of a European option under Black-Scholes-Merton assumptions.
#[allow(non_snake_case)]
pub fn bs_price(
    S: f64,
    K: f64,
    vol: f64,
    T: f64,
    r: f64,
    q: f64,
    option_type: OptionType,
) -> Result<f64> {
    validate(S, K, vol, T, r, q)?;
    let w = option_type.sign();
    let carry = S * (-q * T).exp();
    let df = (-r * T).exp();

    if is_deterministic(vol, T) {
        return Ok((w * (carry - K * df)).max(0.0));
    }

    let forward = carry / df;
    let (d1, d2) = lognormal_d1_d2(forward, K, vol * T.sqrt());
    let price = w * (carry * norm_cdf(w * d1) - K * df * norm_cdf(w * d2));
    ensure_finite(price.max(0.0), "Black-Scholes price")
}

/// Cash-or-nothing digital: `e^{-rT}·N(±d2)`.
#[allow(non_snake_case)]
pub fn bs_digital(
    S: f64,
    K: f64,
    vol: f64,
    T: f64,
    r: f64,
    q: f64,
    option_type: OptionType,
) -> Result<f64> {
    validate(S, K, vol, T, r, q)?;
    let w = option_type.sign();
    let df = (-r * T).exp();
    let forward = S * ((r - q) * T).exp();

    if is_deterministic(vol, T) {
        return Ok(if w * (forward - K) > 0.0 { df } else { 0.0 });
    }

    let (_, d2) = lognormal_d1_d2(forward, K, vol * T.sqrt());
    ensure_finite(df * norm_cdf(w * d2), "Black-Scholes digital")
}

/// Spot delta: `e^{-qT}·N(d1)` for calls, `−e^{-qT}·N(−d1)` for puts.
#[allow(non_snake_case)]
pub fn bs_delta(
    S: f64,
    K: f64,
    vol: f64,
    T: f64,
    r: f64,
    q: f64,
    option_type: OptionType,
) -> Result<f64> {
    validate(S, K, vol, T, r, q)?;
    let w = option_type.sign();
    let div_df = (-q * T).exp();
    let forward = S * ((r - q) * T).exp();

    if is_deterministic(vol, T) {
        return Ok(if w * (forward - K) > 0.0 { w * div_df } else { 0.0 });
    }

    let (d1, _) = lognormal_d1_d2(forward, K, vol * T.sqrt());
    ensure_finite(w * div_df * norm_cdf(w * d1), "Black-Scholes delta")
}

/// Vega `S·e^{-qT}·n(d1)·√T`.
#[allow(non_snake_case)]
pub fn bs_vega(S: f64, K: f64, vol: f64, T: f64, r: f64, q: f64) -> Result<f64> {
    validate(S, K, vol, T, r, q)?;
    if T == 0.0 {
        return Ok(0.0);
    }
    let carry = S * (-q * T).exp();
    let forward = S * ((r - q) * T).exp();
    if is_deterministic(vol, T) {
        return Ok(if forward == K {
            carry * T.sqrt() * norm_pdf(0.0)
        } else {
            0.0
        });
    }

    let (d1, _) = lognormal_d1_d2(forward, K, vol * T.sqrt());
    ensure_finite(carry * norm_pdf(d1) * T.sqrt(), "Black-Scholes vega")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::closed_form::black_price;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_textbook_value() {
        // Hull: S=42, K=40, r=10%, σ=20%, T=0.5 -> call 4.76, put 0.81
        let c = bs_price(42.0, 40.0, 0.2, 0.5, 0.1, 0.0, OptionType::Call).unwrap();
        let p = bs_price(42.0, 40.0, 0.2, 0.5, 0.1, 0.0, OptionType::Put).unwrap();
        assert_abs_diff_eq!(c, 4.759_422_392_871_535, epsilon = 1e-9);
        assert_abs_diff_eq!(p, 0.808_599_372_900_096, epsilon = 1e-9);
    }

    #[test]
    fn test_consistent_with_black_on_forward() {
        let (s, k, vol, t, r, q): (f64, f64, f64, f64, f64, f64) = (100.0, 95.0, 0.3, 1.25, 0.04, 0.015);
        let forward = s * ((r - q) * t).exp();
        let df = (-r * t).exp();
        for option_type in [OptionType::Call, OptionType::Put] {
            let bs = bs_price(s, k, vol, t, r, q, option_type).unwrap();
            let black = black_price(forward, k, vol, t, df, option_type).unwrap();
            assert_abs_diff_eq!(bs, black, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_expired_is_intrinsic() {
        let c = bs_price(120.0, 100.0, 0.4, 0.0, 0.05, 0.0, OptionType::Call).unwrap();
        assert_abs_diff_eq!(c, 20.0, epsilon = 1e-12);
        let d = bs_digital(120.0, 100.0, 0.4, 0.0, 0.05, 0.0, OptionType::Put).unwrap();
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_spot_delta_matches_finite_difference() {
        let (s, k, vol, t, r, q) = (100.0, 105.0, 0.25, 0.8, 0.03, 0.02);
        let h = 1e-4;
        for option_type in [OptionType::Call, OptionType::Put] {
            let up = bs_price(s + h, k, vol, t, r, q, option_type).unwrap();
            let dn = bs_price(s - h, k, vol, t, r, q, option_type).unwrap();
            let delta = bs_delta(s, k, vol, t, r, q, option_type).unwrap();
            assert_abs_diff_eq!(delta, (up - dn) / (2.0 * h), epsilon = 1e-7);
        }
    }

    #[test]
    fn test_vega_matches_finite_difference() {
        let h = 1e-6;
        let up = bs_price(100.0, 90.0, 0.35 + h, 1.0, 0.02, 0.0, OptionType::Put).unwrap();
        let dn = bs_price(100.0, 90.0, 0.35 - h, 1.0, 0.02, 0.0, OptionType::Put).unwrap();
        let vega = bs_vega(100.0, 90.0, 0.35, 1.0, 0.02, 0.0).unwrap();
        assert_abs_diff_eq!(vega, (up - dn) / (2.0 * h), epsilon = 1e-5);
    }
}
