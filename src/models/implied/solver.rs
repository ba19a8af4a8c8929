//! Model-agnostic implied-volatility root finder.
//!
//! Newton-Raphson on the model's analytic vega from a closed-form seed; when
//! vega collapses or an iterate leaves `(0, vol_cap]`, the search switches to
//! Brent's method on a bracket `[vol_low, vol_high]` where the price is
//! monotone increasing in volatility. Brent never leaves the bracket and
//! degrades to bisection when interpolation steps stall.

use std::cell::RefCell;

use roots::{find_root_brent, Convergency};
use tracing::{debug, warn};

use crate::config::SolverConfig;
use crate::error::{invalid_input, PricingError, Result};

/// One implied-vol inversion: the target price plus the model's price and
/// vega as functions of volatility (all other inputs already bound).
pub(crate) struct ImpliedVolProblem<'a> {
    pub model: &'static str,
    pub target: f64,
    pub t_exp: f64,
    /// Price at zero volatility (discounted intrinsic)
    pub floor: f64,
    /// Supremum of the price as vol → ∞, if finite
    pub cap: Option<f64>,
    pub seed: f64,
    /// Initial upper bracket
    pub vol_high: f64,
    pub price: &'a dyn Fn(f64) -> Result<f64>,
    pub vega: &'a dyn Fn(f64) -> Result<f64>,
}

impl ImpliedVolProblem<'_> {
    fn check_bounds(&self, cfg: &SolverConfig) -> Result<Option<f64>> {
        if !self.target.is_finite() || self.target < 0.0 {
            return Err(invalid_input!(
                "{}: market price must be finite and >= 0, got {}",
                self.model,
                self.target
            ));
        }
        if self.target < self.floor - cfg.price_tol {
            return Err(invalid_input!(
                "{}: market price {} is below intrinsic value {}",
                self.model,
                self.target,
                self.floor
            ));
        }
        if self.target <= self.floor {
            return Ok(Some(0.0));
        }
        if self.t_exp == 0.0 {
            if self.target - self.floor <= cfg.price_tol {
                return Ok(Some(0.0));
            }
            return Err(invalid_input!(
                "{}: expired option must trade at intrinsic {}, got {}",
                self.model,
                self.floor,
                self.target
            ));
        }
        if let Some(cap) = self.cap {
            if self.target >= cap {
                return Err(invalid_input!(
                    "{}: market price {} is at or above the model maximum {}",
                    self.model,
                    self.target,
                    cap
                ));
            }
        }
        Ok(None)
    }

    /// Price tolerance scaled down to the option's time value, so a tiny
    /// out-of-the-money premium is matched in relative terms.
    fn price_tol(&self, cfg: &SolverConfig) -> f64 {
        cfg.price_tol * (self.target - self.floor).min(1.0)
    }
}

/// Brent stopping rule: price residual under `price_tol`, or the bracket
/// narrower than `vol_tol`.
struct VolConvergency {
    price_tol: f64,
    vol_tol: f64,
    max_iter: usize,
}

impl Convergency<f64> for VolConvergency {
    fn is_root_found(&mut self, y: f64) -> bool {
        y.abs() < self.price_tol
    }

    fn is_converged(&mut self, x1: f64, x2: f64) -> bool {
        (x1 - x2).abs() < self.vol_tol
    }

    fn is_iteration_limit_reached(&mut self, iter: usize) -> bool {
        iter >= self.max_iter
    }
}

/// Solves `price(σ) = target` for `σ >= 0`.
pub(crate) fn solve_implied_vol(problem: &ImpliedVolProblem<'_>, cfg: &SolverConfig) -> Result<f64> {
    if let Some(vol) = problem.check_bounds(cfg)? {
        return Ok(vol);
    }

    let price_tol = problem.price_tol(cfg);
    let vol_cap = problem.vol_high * 2f64.powi(cfg.max_bracket_expansions as i32);
    let mut lo = 0.0_f64;
    let mut hi: Option<f64> = None;

    let mut sigma = if problem.seed.is_finite() && problem.seed > 0.0 && problem.seed < vol_cap {
        problem.seed
    } else {
        cfg.initial_vol
    };

    for iteration in 0..cfg.max_newton_iterations {
        let diff = (problem.price)(sigma)? - problem.target;
        if diff.abs() < price_tol {
            return Ok(sigma);
        }
        // price is increasing in vol, so every evaluation tightens the bracket
        if diff < 0.0 {
            lo = lo.max(sigma);
        } else {
            hi = Some(hi.map_or(sigma, |h| h.min(sigma)));
        }

        let vega = (problem.vega)(sigma)?;
        if !(vega > cfg.min_vega) {
            debug!(
                model = problem.model,
                iteration, sigma, vega, "vega collapsed, switching to bracketing"
            );
            break;
        }
        let next = sigma - diff / vega;
        if !next.is_finite() || next <= 0.0 || next > vol_cap {
            debug!(
                model = problem.model,
                iteration, sigma, next, "Newton step left the admissible range, switching to bracketing"
            );
            break;
        }
        sigma = next;
    }

    bracket_and_solve(problem, cfg, lo, hi, vol_cap)
}

fn bracket_and_solve(
    problem: &ImpliedVolProblem<'_>,
    cfg: &SolverConfig,
    lo: f64,
    hi: Option<f64>,
    vol_cap: f64,
) -> Result<f64> {
    let price_tol = problem.price_tol(cfg);
    let mut lo = lo;
    let hi = match hi {
        Some(h) => h,
        None => {
            let mut h = problem.vol_high.max(2.0 * lo);
            let mut expansions = 0;
            loop {
                let diff = (problem.price)(h)? - problem.target;
                if diff.abs() < price_tol {
                    return Ok(h);
                }
                if diff > 0.0 {
                    break h;
                }
                lo = h;
                expansions += 1;
                if expansions > cfg.max_bracket_expansions || h >= vol_cap {
                    warn!(model = problem.model, vol = h, "could not bracket implied vol");
                    return Err(PricingError::NoConvergence {
                        what: format!("{} implied vol bracketing", problem.model),
                        iterations: expansions,
                        residual: diff.abs(),
                    });
                }
                h *= 2.0;
            }
        }
    };

    let failure: RefCell<Option<PricingError>> = RefCell::new(None);
    let objective = |sigma: f64| -> f64 {
        match (problem.price)(sigma) {
            Ok(p) => p - problem.target,
            Err(e) => {
                failure.borrow_mut().get_or_insert(e);
                f64::NAN
            }
        }
    };

    let mut convergency = VolConvergency {
        price_tol,
        vol_tol: cfg.vol_tol,
        max_iter: cfg.max_bracket_iterations,
    };
    let result = find_root_brent(lo, hi, &objective, &mut convergency);

    if let Some(err) = failure.into_inner() {
        return Err(err);
    }

    match result {
        Ok(sigma) if sigma.is_finite() && sigma >= 0.0 => Ok(sigma),
        Ok(sigma) => Err(invalid_input!(
            "{}: bracketing returned an invalid volatility {}",
            problem.model,
            sigma
        )),
        Err(e) => {
            let residual = ((problem.price)(0.5 * (lo + hi))? - problem.target).abs();
            warn!(model = problem.model, lo, hi, residual, error = ?e, "implied vol did not converge");
            Err(PricingError::NoConvergence {
                what: format!("{} implied vol", problem.model),
                iterations: cfg.max_newton_iterations + cfg.max_bracket_iterations,
                residual,
            })
        }
    }
}
