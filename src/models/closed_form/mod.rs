//! Closed-form European pricers: Black (lognormal forward), Black-Scholes-Merton
//! (lognormal spot with rate and dividend yield) and Bachelier (normal forward).
//!
//! Each family exposes a price, a cash-or-nothing digital, an analytic delta and
//! the vega the implied-vol solver uses as its Newton derivative. Expired
//! options (`t_exp = 0`) and zero volatility collapse to the discounted
//! intrinsic value explicitly instead of going through `d1`/`d2`.

pub mod bachelier;
pub mod black;
pub mod bs;

pub use bachelier::{bachelier_delta, bachelier_digital, bachelier_price, bachelier_vega};
pub use black::{
    black_delta, black_digital, black_price, black_strike_from_delta, black_vega,
};
pub use bs::{bs_delta, bs_digital, bs_price, bs_vega};

use crate::error::{invalid_input, Result};

/// Checks shared by every model: finite, non-negative vol and time.
pub(crate) fn validate_vol_time(vol: f64, t_exp: f64) -> Result<()> {
    if !vol.is_finite() || vol < 0.0 {
        return Err(invalid_input!("volatility must be finite and >= 0, got {}", vol));
    }
    if !t_exp.is_finite() || t_exp < 0.0 {
        return Err(invalid_input!("time to expiry must be finite and >= 0, got {}", t_exp));
    }
    Ok(())
}

/// Lognormal models need a strictly positive underlying and strike.
pub(crate) fn validate_lognormal(underlying: f64, strike: f64) -> Result<()> {
    if !underlying.is_finite() || underlying <= 0.0 {
        return Err(invalid_input!("underlying must be positive, got {}", underlying));
    }
    if !strike.is_finite() || strike <= 0.0 {
        return Err(invalid_input!("strike must be positive, got {}", strike));
    }
    Ok(())
}

pub(crate) fn validate_discount(df: f64) -> Result<()> {
    if !df.is_finite() || df <= 0.0 {
        return Err(invalid_input!("discount factor must be positive, got {}", df));
    }
    Ok(())
}

pub(crate) fn validate_rate(name: &str, rate: f64) -> Result<()> {
    if !rate.is_finite() {
        return Err(invalid_input!("{} must be finite, got {}", name, rate));
    }
    Ok(())
}

/// True when the option has no remaining optionality and must be valued at intrinsic.
///
/// Tested on the total std-dev `vol·√t`, which also catches a product that
/// underflows to zero for tiny but positive inputs.
#[inline]
pub(crate) fn is_deterministic(vol: f64, t_exp: f64) -> bool {
    vol * t_exp.sqrt() == 0.0
}

/// Lognormal `(d1, d2)` for forward `f`, strike `k` and total std-dev `vol·√t`.
#[inline]
pub(crate) fn lognormal_d1_d2(f: f64, k: f64, std_dev: f64) -> (f64, f64) {
    let d1 = (f / k).ln() / std_dev + 0.5 * std_dev;
    (d1, d1 - std_dev)
}
