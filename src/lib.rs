//! # Volnode-Lib: Closed-Form Option Pricing and Volatility Nodes
//!
//! `volnode-lib` prices European options in closed form, inverts market prices
//! into implied volatilities, and represents the per-expiry volatility a pricer
//! should use for a given strike, delta or maturity.
//!
//! ## Core Features
//!
//! - **Closed-form pricers**: Black, Black-Scholes-Merton and Bachelier price, digital, delta and vega
//! - **Implied volatility**: Newton-Raphson on vega with a bracketed Brent fallback
//! - **Volatility nodes**: flat, Samuelson term decay, 5-point delta smile, and FX composite
//! - **Typed errors**: every failure is a [`PricingError`], never a silent `NaN`
//!
//! ## Quick Start
//!
//! ```rust
//! use volnode_lib::{
//!     black_implied_vol, black_price, Accrual, Delta5Vol, NodeBase, OptionType, SmileQuotes,
//!     VolModel, VolNode,
//! };
//!
//! // Price and invert a one-year ATM Black call
//! let price = black_price(100.0, 100.0, 0.2, 1.0, 1.0, OptionType::Call)?;
//! let vol = black_implied_vol(price, 100.0, 100.0, 0.0, 1.0, OptionType::Call)?;
//! assert!((vol - 0.2).abs() < 1e-9);
//!
//! // A delta smile expiring one year after 2023-03-15 (serial 45000)
//! let base = NodeBase::new(0.20, 45000.0, 45365.0, Accrual::Act365)?;
//! let quotes = SmileQuotes { fwd: 100.0, d10_vol: 0.26, d25_vol: 0.225, d75_vol: 0.19, d90_vol: 0.195 };
//! let node: VolNode = Delta5Vol::new(base, quotes)?.into();
//!
//! let smile_vol = node.vol_by_strike(90.0, None)?;
//! let call = black_price(100.0, 90.0, smile_vol, node.time_to_expiry(), 1.0, OptionType::Call)?;
//! assert!(call > 10.0);
//! # Ok::<(), volnode_lib::PricingError>(())
//! ```
//!
//! ## Conventions
//!
//! - Dates are spreadsheet serial day numbers (`f64`); year fractions follow the node's [`Accrual`].
//! - Smile deltas are undiscounted put-delta magnitudes `N(-d1)` in `(0, 1)`.
//! - Moneyness is log-moneyness `ln(K / F)`.
//!
//! ## Configuration Presets
//!
//! The implied-vol solver ships with several presets on [`SolverConfig`]:
//! - `production()`: Tight tolerances for live pricing (the default)
//! - `fast()`: Looser tolerances for bulk scans
//! - `research()`: Near machine precision
//!
//! The library only emits `tracing` events; installing a subscriber is up to
//! the application.

// ================================================================================================
// MODULES
// ================================================================================================

pub mod config;
pub mod error;
pub mod math;
pub mod models;
pub mod types;

// ================================================================================================
// PUBLIC RE-EXPORTS
// ================================================================================================

// Errors, configuration and shared types
pub use config::{SmileConfig, SolverConfig};
pub use error::{PricingError, Result};
pub use types::{next_weekday, time_to_expiry, Accrual, OptionType};

// Closed-form pricers
pub use models::closed_form::{
    bachelier_delta, bachelier_digital, bachelier_price, bachelier_vega, black_delta,
    black_digital, black_price, black_strike_from_delta, black_vega, bs_delta, bs_digital,
    bs_price, bs_vega,
};

// Implied volatility
pub use models::implied::{
    bachelier_implied_vol, bachelier_implied_vol_with_config, black_implied_vol,
    black_implied_vol_with_config, bs_implied_vol, bs_implied_vol_with_config,
};

// Volatility nodes
pub use models::vol_node::{
    composite_vol, samuelson_factor, Delta5Vol, FlatVol, FxCompositeVol, FxVolCurve, NodeBase,
    SamuelsonDelta5Vol, SamuelsonShape, SamuelsonVol, SmileQuotes, VolModel, VolNode,
    DELTA_PILLARS,
};
