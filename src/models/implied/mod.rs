//! Implied volatility for the three closed-form families.
//!
//! All solvers share the signature `(market_price, underlying, K, r, T, option_type)`:
//! Black and Bachelier discount with `df = e^{-rT}`, Black-Scholes prices off
//! the spot with zero dividend yield. Prices outside the no-arbitrage range
//! (below discounted intrinsic, or at/above the lognormal price cap) fail with
//! `InvalidInput`; an exhausted iteration budget fails with `NoConvergence`.

mod solver;

use std::f64::consts::PI;

use crate::config::SolverConfig;
use crate::error::Result;
use crate::models::closed_form::{
    bachelier_price, bachelier_vega, black_price, black_vega, bs_price, bs_vega,
};
use crate::types::OptionType;

use solver::{solve_implied_vol, ImpliedVolProblem};

/// Brenner-Subrahmanyam style seed from the option's time value:
/// `σ ≈ √(2π/T) · time_value / (df · scale)`.
fn time_value_seed(price: f64, floor: f64, df: f64, scale: f64, t_exp: f64) -> f64 {
    (2.0 * PI / t_exp).sqrt() * (price - floor).max(0.0) / (df * scale)
}

/// Black implied volatility with default solver settings.
///
/// # Example
/// ```
/// use volnode_lib::{black_implied_vol, black_price, OptionType};
///
/// let price = black_price(100.0, 100.0, 0.2, 1.0, 1.0, OptionType::Call).unwrap();
/// let vol = black_implied_vol(price, 100.0, 100.0, 0.0, 1.0, OptionType::Call).unwrap();
/// assert!((vol - 0.2).abs() < 1e-9);
/// ```
pub fn black_implied_vol(
    market_price: f64,
    f: f64,
    k: f64,
    r: f64,
    t_exp: f64,
    option_type: OptionType,
) -> Result<f64> {
    black_implied_vol_with_config(market_price, f, k, r, t_exp, option_type, &SolverConfig::default())
}

/// Black implied volatility with explicit solver settings.
pub fn black_implied_vol_with_config(
    market_price: f64,
    f: f64,
    k: f64,
    r: f64,
    t_exp: f64,
    option_type: OptionType,
    config: &SolverConfig,
) -> Result<f64> {
    let df = (-r * t_exp).exp();
    // also validates f, k, t_exp and df
    let floor = black_price(f, k, 0.0, t_exp, df, option_type)?;
    let cap = match option_type {
        OptionType::Call => df * f,
        OptionType::Put => df * k,
    };

    let price = |vol: f64| black_price(f, k, vol, t_exp, df, option_type);
    let vega = |vol: f64| black_vega(f, k, vol, t_exp, df);
    let problem = ImpliedVolProblem {
        model: "Black",
        target: market_price,
        t_exp,
        floor,
        cap: Some(cap),
        seed: time_value_seed(market_price, floor, df, f, t_exp),
        vol_high: config.vol_upper,
        price: &price,
        vega: &vega,
    };
    solve_implied_vol(&problem, config)
}

/// Black-Scholes implied volatility (spot underlying, zero dividend yield).
pub fn bs_implied_vol(
    market_price: f64,
    s: f64,
    k: f64,
    r: f64,
    t_exp: f64,
    option_type: OptionType,
) -> Result<f64> {
    bs_implied_vol_with_config(market_price, s, k, r, t_exp, option_type, &SolverConfig::default())
}

/// Black-Scholes implied volatility with explicit solver settings.
pub fn bs_implied_vol_with_config(
    market_price: f64,
    s: f64,
    k: f64,
    r: f64,
    t_exp: f64,
    option_type: OptionType,
    config: &SolverConfig,
) -> Result<f64> {
    let floor = bs_price(s, k, 0.0, t_exp, r, 0.0, option_type)?;
    let df = (-r * t_exp).exp();
    let cap = match option_type {
        OptionType::Call => s,
        OptionType::Put => k * df,
    };

    let price = |vol: f64| bs_price(s, k, vol, t_exp, r, 0.0, option_type);
    let vega = |vol: f64| bs_vega(s, k, vol, t_exp, r, 0.0);
    let problem = ImpliedVolProblem {
        model: "Black-Scholes",
        target: market_price,
        t_exp,
        floor,
        cap: Some(cap),
        seed: time_value_seed(market_price, floor, 1.0, s, t_exp),
        vol_high: config.vol_upper,
        price: &price,
        vega: &vega,
    };
    solve_implied_vol(&problem, config)
}

/// Bachelier (normal) implied volatility. The result is an absolute vol in
/// units of the underlying.
pub fn bachelier_implied_vol(
    market_price: f64,
    f: f64,
    k: f64,
    r: f64,
    t_exp: f64,
    option_type: OptionType,
) -> Result<f64> {
    bachelier_implied_vol_with_config(
        market_price,
        f,
        k,
        r,
        t_exp,
        option_type,
        &SolverConfig::default(),
    )
}

/// Bachelier implied volatility with explicit solver settings.
pub fn bachelier_implied_vol_with_config(
    market_price: f64,
    f: f64,
    k: f64,
    r: f64,
    t_exp: f64,
    option_type: OptionType,
    config: &SolverConfig,
) -> Result<f64> {
    let df = (-r * t_exp).exp();
    let floor = bachelier_price(f, k, 0.0, t_exp, df, option_type)?;
    // normal vols live on the scale of the underlying; there is no price cap
    let scale = f.abs().max(k.abs()).max(f64::EPSILON);
    let seed = time_value_seed(market_price, floor, df, 1.0, t_exp);

    let price = |vol: f64| bachelier_price(f, k, vol, t_exp, df, option_type);
    let vega = |vol: f64| bachelier_vega(f, k, vol, t_exp, df);
    let problem = ImpliedVolProblem {
        model: "Bachelier",
        target: market_price,
        t_exp,
        floor,
        cap: None,
        seed,
        vol_high: (config.vol_upper * scale).max(2.0 * seed),
        price: &price,
        vega: &vega,
    };
    solve_implied_vol(&problem, config)
}
