//! Solver and smile-fit configuration.
//!
//! Both structs deserialize from TOML (feature `serde`), with every field
//! optional and falling back to the production defaults.

#[cfg(feature = "serde")]
use anyhow::Context;
#[cfg(feature = "serde")]
use serde::Deserialize;

/// Implied-volatility solver settings (Newton with bracketed fallback).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct SolverConfig {
    /// Absolute price tolerance: stop when `|price(σ) - target| < price_tol`
    #[cfg_attr(feature = "serde", serde(default = "default_price_tol"))]
    pub price_tol: f64,

    /// Volatility step tolerance for the bracketing stage
    #[cfg_attr(feature = "serde", serde(default = "default_vol_tol"))]
    pub vol_tol: f64,

    /// Newton-Raphson iteration cap
    #[cfg_attr(feature = "serde", serde(default = "default_max_newton_iterations"))]
    pub max_newton_iterations: usize,

    /// Iteration cap for the bracketing fallback
    #[cfg_attr(feature = "serde", serde(default = "default_max_bracket_iterations"))]
    pub max_bracket_iterations: usize,

    /// How many times the upper vol bound may be doubled to bracket the root
    #[cfg_attr(feature = "serde", serde(default = "default_max_bracket_expansions"))]
    pub max_bracket_expansions: usize,

    /// Vega below which Newton is abandoned for the bracketing stage
    #[cfg_attr(feature = "serde", serde(default = "default_min_vega"))]
    pub min_vega: f64,

    /// Seed used when the closed-form initial guess is unusable
    #[cfg_attr(feature = "serde", serde(default = "default_initial_vol"))]
    pub initial_vol: f64,

    /// Initial upper bracket for lognormal vols. Normal vols scale it by the
    /// magnitude of the underlying.
    #[cfg_attr(feature = "serde", serde(default = "default_vol_upper"))]
    pub vol_upper: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl SolverConfig {
    /// Tight tolerances for live pricing and risk.
    pub fn production() -> Self {
        Self {
            price_tol: default_price_tol(),
            vol_tol: default_vol_tol(),
            max_newton_iterations: default_max_newton_iterations(),
            max_bracket_iterations: default_max_bracket_iterations(),
            max_bracket_expansions: default_max_bracket_expansions(),
            min_vega: default_min_vega(),
            initial_vol: default_initial_vol(),
            vol_upper: default_vol_upper(),
        }
    }

    /// Looser tolerances for bulk scans where speed matters more than the last digits.
    pub fn fast() -> Self {
        Self {
            price_tol: 1e-8,
            vol_tol: 1e-8,
            max_newton_iterations: 20,
            max_bracket_iterations: 100,
            ..Self::production()
        }
    }

    /// Near machine precision, generous budgets.
    pub fn research() -> Self {
        Self {
            price_tol: 1e-13,
            vol_tol: 1e-14,
            max_newton_iterations: 200,
            max_bracket_iterations: 1000,
            max_bracket_expansions: 30,
            ..Self::production()
        }
    }

    /// Parse a configuration from TOML text; missing keys take production defaults.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("failed to parse implied-vol solver config")
    }
}

/// Settings for the delta→strike fixed-point refinement of the 5-point smile.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct SmileConfig {
    #[cfg_attr(feature = "serde", serde(default = "default_max_refinement_iterations"))]
    pub max_refinement_iterations: usize,

    /// Relative strike tolerance: stop when `|ΔK| <= strike_tol * K`
    #[cfg_attr(feature = "serde", serde(default = "default_strike_tol"))]
    pub strike_tol: f64,
}

impl Default for SmileConfig {
    fn default() -> Self {
        Self {
            max_refinement_iterations: default_max_refinement_iterations(),
            strike_tol: default_strike_tol(),
        }
    }
}

impl SmileConfig {
    #[cfg(feature = "serde")]
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("failed to parse smile config")
    }
}

fn default_price_tol() -> f64 {
    1e-11
}

fn default_vol_tol() -> f64 {
    1e-12
}

fn default_max_newton_iterations() -> usize {
    50
}

fn default_max_bracket_iterations() -> usize {
    300
}

fn default_max_bracket_expansions() -> usize {
    20
}

fn default_min_vega() -> f64 {
    1e-12
}

fn default_initial_vol() -> f64 {
    0.2
}

fn default_vol_upper() -> f64 {
    5.0
}

fn default_max_refinement_iterations() -> usize {
    50
}

fn default_strike_tol() -> f64 {
    1e-12
}
