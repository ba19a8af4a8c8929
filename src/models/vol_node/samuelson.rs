//! Samuelson time decay: volatility rises as a contract approaches its
//! reference maturity.
//!
//! The instantaneous vol at time `s` is `σ_b·φ(s)` with
//! `φ(s) = 1 + α·exp(−β·(mat − s))`. The ATM quote is the term vol to node
//! expiry, which pins the base level `σ_b = atm / F(0, T)` where `F` is the
//! root-mean-square of `φ` (see [`samuelson_factor`]).

use super::{NodeBase, VolModel};
use crate::error::{ensure_finite, invalid_input, Result};

/// `−expm1(−x)/x`, the mean of `exp(−βv)` over `v ∈ [0, Δ]` with `x = βΔ`.
fn mean_decay(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0 - 0.5 * x
    } else {
        -(-x).exp_m1() / x
    }
}

/// Root-mean-square of `φ(s) = 1 + a·exp(−b·(mat − s))` over `s ∈ [t, big_t]`.
///
/// Times are in years from the valuation date. When `big_t <= t` the factor
/// collapses to `|φ(big_t)|`, the instantaneous value.
pub fn samuelson_factor(a: f64, b: f64, t: f64, big_t: f64, mat: f64) -> f64 {
    let span = (big_t - t).max(0.0);
    // log of exp(−b·(mat − big_t)); large past the reference maturity
    let ln_end = -b * (mat - big_t);
    let mean = 1.0
        + decay_term(2.0 * a, ln_end, b * span)
        + decay_term(a * a, 2.0 * ln_end, 2.0 * b * span);
    if mean <= 0.0 {
        0.0
    } else {
        mean.sqrt()
    }
}

/// `c·exp(ln_e)·mean_decay(x)`, combined in log space so a large `exp(ln_e)`
/// is offset by a small mean before anything overflows.
fn decay_term(c: f64, ln_e: f64, x: f64) -> f64 {
    if c == 0.0 {
        return 0.0;
    }
    c * (ln_e + mean_decay(x).ln()).exp()
}

/// Validated Samuelson parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamuelsonShape {
    alpha: f64,
    beta: f64,
}

fn validate_alpha(alpha: f64) -> Result<()> {
    if !alpha.is_finite() || alpha <= -1.0 {
        return Err(invalid_input!("Samuelson alpha must be finite and > -1, got {}", alpha));
    }
    Ok(())
}

fn validate_beta(beta: f64) -> Result<()> {
    if !beta.is_finite() || beta < 0.0 {
        return Err(invalid_input!("Samuelson beta must be finite and >= 0, got {}", beta));
    }
    Ok(())
}

impl SamuelsonShape {
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        validate_alpha(alpha)?;
        validate_beta(beta)?;
        Ok(Self { alpha, beta })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn set_alpha(&mut self, alpha: f64) -> Result<()> {
        validate_alpha(alpha)?;
        self.alpha = alpha;
        Ok(())
    }

    pub fn set_beta(&mut self, beta: f64) -> Result<()> {
        validate_beta(beta)?;
        self.beta = beta;
        Ok(())
    }

    fn level(&self, mat: f64) -> f64 {
        samuelson_factor(self.alpha, self.beta, 0.0, mat, mat)
    }

    /// Term vol to `t` relative to term vol to `mat`.
    pub fn term_ratio(&self, t: f64, mat: f64) -> f64 {
        samuelson_factor(self.alpha, self.beta, 0.0, t, mat) / self.level(mat)
    }

    /// Instantaneous vol at `t` relative to term vol to `mat`.
    pub fn inst_ratio(&self, t: f64, mat: f64) -> f64 {
        samuelson_factor(self.alpha, self.beta, t, t, mat) / self.level(mat)
    }
}

/// Node expiry in years; an expiry before the valuation date is rejected.
pub(super) fn node_maturity(base: &NodeBase) -> Result<f64> {
    let mat = base.time_to_expiry();
    if !(mat >= 0.0) {
        return Err(invalid_input!(
            "node expiry {} is before the valuation date {}",
            base.expiry(),
            base.today()
        ));
    }
    Ok(mat)
}

/// Valuation-date-relative time of an instantaneous-vol query (`None` = today).
pub(super) fn inst_time(base: &NodeBase, d: Option<f64>) -> Result<f64> {
    match d {
        None => Ok(0.0),
        Some(d) => base.time_to(Some(d)),
    }
}

/// ATM vol with Samuelson term structure. Strike, delta and moneyness are
/// ignored; only the queried maturity matters.
#[derive(Debug, Clone, PartialEq)]
pub struct SamuelsonVol {
    base: NodeBase,
    shape: SamuelsonShape,
}

impl SamuelsonVol {
    pub fn new(base: NodeBase, alpha: f64, beta: f64) -> Result<Self> {
        Ok(Self {
            base,
            shape: SamuelsonShape::new(alpha, beta)?,
        })
    }

    pub fn base(&self) -> &NodeBase {
        &self.base
    }

    pub fn alpha(&self) -> f64 {
        self.shape.alpha()
    }

    pub fn beta(&self) -> f64 {
        self.shape.beta()
    }

    pub fn set_atm(&mut self, atm_vol: f64) -> Result<()> {
        self.base.set_atm(atm_vol)
    }

    pub fn set_today(&mut self, today: f64) -> Result<()> {
        self.base.set_today(today)
    }

    pub fn set_expiry(&mut self, expiry: f64) -> Result<()> {
        self.base.set_expiry(expiry)
    }

    pub fn set_alpha(&mut self, alpha: f64) -> Result<()> {
        self.shape.set_alpha(alpha)
    }

    pub fn set_beta(&mut self, beta: f64) -> Result<()> {
        self.shape.set_beta(beta)
    }

    /// Term vol to `dmat` (`None` = node expiry).
    pub fn term_vol(&self, dmat: Option<f64>) -> Result<f64> {
        let mat = node_maturity(&self.base)?;
        let t = self.base.time_to(dmat)?;
        ensure_finite(
            self.base.atm_vol() * self.shape.term_ratio(t, mat),
            "Samuelson term vol",
        )
    }
}

impl VolModel for SamuelsonVol {
    fn vol_by_strike(&self, _strike: f64, dmat: Option<f64>) -> Result<f64> {
        self.term_vol(dmat)
    }

    fn vol_by_delta(&self, _delta: f64, dmat: Option<f64>) -> Result<f64> {
        self.term_vol(dmat)
    }

    fn vol_by_moneyness(&self, _ratio: f64, dmat: Option<f64>) -> Result<f64> {
        self.term_vol(dmat)
    }

    fn inst_vol(&self, d: Option<f64>) -> Result<f64> {
        let mat = node_maturity(&self.base)?;
        let t = inst_time(&self.base, d)?;
        ensure_finite(
            self.base.atm_vol() * self.shape.inst_ratio(t, mat),
            "Samuelson instantaneous vol",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Accrual;
    use approx::assert_abs_diff_eq;

    fn quadrature_rms(a: f64, b: f64, t: f64, big_t: f64, mat: f64) -> f64 {
        let n = 20_000;
        let h = (big_t - t) / n as f64;
        let sum: f64 = (0..n)
            .map(|i| {
                let s = t + (i as f64 + 0.5) * h;
                let phi = 1.0 + a * (-b * (mat - s)).exp();
                phi * phi
            })
            .sum();
        (sum / n as f64).sqrt()
    }

    #[test]
    fn test_factor_matches_quadrature() {
        for &(a, b) in &[(0.5, 2.0), (1.5, 0.3), (-0.4, 4.0)] {
            let exact = samuelson_factor(a, b, 0.1, 0.9, 1.0);
            assert_abs_diff_eq!(exact, quadrature_rms(a, b, 0.1, 0.9, 1.0), epsilon = 1e-8);
        }
    }

    #[test]
    fn test_factor_limits() {
        // no decay: constant 1 + a
        assert_abs_diff_eq!(samuelson_factor(0.5, 0.0, 0.0, 1.0, 1.0), 1.5, epsilon = 1e-15);
        // zero-length window: the instantaneous value
        let inst = 1.0 + 0.5 * (-2.0_f64 * 0.25).exp();
        assert_abs_diff_eq!(samuelson_factor(0.5, 2.0, 0.75, 0.75, 1.0), inst, epsilon = 1e-14);
        // tiny beta is continuous with beta = 0
        assert_abs_diff_eq!(
            samuelson_factor(0.5, 1e-14, 0.0, 1.0, 1.0),
            samuelson_factor(0.5, 0.0, 0.0, 1.0, 1.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_factor_past_maturity_with_steep_decay() {
        // exp(b·(big_t − mat)) alone overflows here
        assert_eq!(samuelson_factor(0.0, 50.0, 0.0, 21.0, 1.0), 1.0);
        let shape = SamuelsonShape::new(0.0, 50.0).unwrap();
        assert_eq!(shape.term_ratio(21.0, 1.0), 1.0);
        // large exponent offset by a long averaging window stays finite
        let f = samuelson_factor(0.5, 800.0, 0.0, 1.2, 1.0);
        assert!(f.is_finite() && f > 1.0, "factor {f}");
    }

    #[test]
    fn test_overflowing_term_vol_is_an_error() {
        let base = NodeBase::new(0.3, 45000.0, 45365.0, Accrual::Act365).unwrap();
        let n = SamuelsonVol::new(base, 0.5, 50.0).unwrap();
        assert!(n.vol_by_strike(100.0, Some(45000.0 + 365.0 * 40.0)).is_err());
        let flat = SamuelsonVol::new(n.base().clone(), 0.0, 50.0).unwrap();
        assert_abs_diff_eq!(
            flat.vol_by_strike(100.0, Some(45000.0 + 365.0 * 40.0)).unwrap(),
            0.3,
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(SamuelsonShape::new(-1.0, 1.0).is_err());
        assert!(SamuelsonShape::new(0.5, -0.1).is_err());
        assert!(SamuelsonShape::new(f64::NAN, 0.1).is_err());
    }

    fn node() -> SamuelsonVol {
        let base = NodeBase::new(0.3, 45000.0, 45365.0, Accrual::Act365).unwrap();
        SamuelsonVol::new(base, 0.8, 3.0).unwrap()
    }

    #[test]
    fn test_atm_recovered_at_expiry() {
        let n = node();
        assert_abs_diff_eq!(n.vol_by_strike(80.0, None).unwrap(), 0.3, epsilon = 1e-15);
        assert_abs_diff_eq!(n.vol_by_delta(0.25, Some(45365.0)).unwrap(), 0.3, epsilon = 1e-15);
    }

    #[test]
    fn test_shorter_maturity_has_lower_term_vol() {
        let n = node();
        let short = n.vol_by_moneyness(0.0, Some(45090.0)).unwrap();
        assert!(short < 0.3, "short-dated term vol {short}");
        assert!(n.vol_by_strike(100.0, Some(44990.0)).is_err());
    }

    #[test]
    fn test_inst_vol_grows_towards_expiry() {
        let n = node();
        let early = n.inst_vol(None).unwrap();
        let late = n.inst_vol(Some(45350.0)).unwrap();
        assert!(late > early);
        // term variance to expiry is the integral of instantaneous variance
        let steps = 3650;
        let h = 1.0 / steps as f64;
        let var: f64 = (0..steps)
            .map(|i| {
                let t = (i as f64 + 0.5) * h;
                (0.3 * n.shape.inst_ratio(t, 1.0)).powi(2) * h
            })
            .sum();
        assert_abs_diff_eq!(var, 0.09, epsilon = 1e-7);
    }

    #[test]
    fn test_setters_validate() {
        let mut n = node();
        n.set_alpha(0.0).unwrap();
        assert_abs_diff_eq!(n.vol_by_strike(1.0, Some(45100.0)).unwrap(), 0.3, epsilon = 1e-15);
        assert!(n.set_beta(-1.0).is_err());
        assert_eq!(n.beta(), 3.0);
    }
}
