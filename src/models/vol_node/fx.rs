//! FX at-the-money term structure and the FX composite node.
//!
//! An instrument exposed to a primary factor `P` and an FX rate `X` (a quanto or
//! composite payoff) carries the variance of the product `P·X`:
//!
//! ```text
//! σc² = σp² + σx² + 2ρ·σp·σx
//! ```
//!
//! Both legs are looked up at the queried maturity on every call, so either
//! curve may be re-marked independently.

use tracing::debug;

use super::cache::FitCache;
use super::{NodeBase, VolModel, VolNode};
use crate::error::{invalid_input, Result};
use crate::math::TermVarianceCurve;
use crate::types::{time_to_expiry, Accrual};

/// Composite vol of the product of two correlated lognormal factors, floored
/// at zero.
pub fn composite_vol(primary: f64, fx: f64, corr: f64) -> f64 {
    (primary * primary + fx * fx + 2.0 * corr * primary * fx)
        .max(0.0)
        .sqrt()
}

/// FX ATM vols quoted at serial-date tenors, interpolated in total variance.
#[derive(Debug, Clone)]
pub struct FxVolCurve {
    today: f64,
    tenors: Vec<f64>,
    atm_vols: Vec<f64>,
    accrual: Accrual,
    curve: FitCache<TermVarianceCurve>,
}

fn validate_fx_vol(vol: f64) -> Result<()> {
    if !vol.is_finite() || vol <= 0.0 {
        return Err(invalid_input!("FX ATM vol must be positive, got {}", vol));
    }
    Ok(())
}

impl FxVolCurve {
    pub fn new(today: f64, tenors: Vec<f64>, atm_vols: Vec<f64>, accrual: Accrual) -> Result<Self> {
        if !today.is_finite() {
            return Err(invalid_input!("today must be a finite serial date, got {}", today));
        }
        if tenors.len() != atm_vols.len() {
            return Err(invalid_input!(
                "FX tenors and vols differ in length ({} vs {})",
                tenors.len(),
                atm_vols.len()
            ));
        }
        if tenors.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(invalid_input!("FX tenors must be strictly increasing"));
        }
        for &vol in &atm_vols {
            validate_fx_vol(vol)?;
        }
        let fx = Self {
            today,
            tenors,
            atm_vols,
            accrual,
            curve: FitCache::default(),
        };
        fx.curve()?;
        Ok(fx)
    }

    fn curve(&self) -> Result<&TermVarianceCurve> {
        self.curve.get_or_build(|| {
            // tenors on or before today carry no remaining variance
            let (times, vols): (Vec<f64>, Vec<f64>) = self
                .tenors
                .iter()
                .zip(&self.atm_vols)
                .map(|(&d, &v)| (time_to_expiry(self.today, d, self.accrual), v))
                .filter(|&(t, _)| t > 0.0)
                .unzip();
            if times.is_empty() {
                return Err(invalid_input!(
                    "no FX tenor after the valuation date {}",
                    self.today
                ));
            }
            debug!(today = self.today, tenors = times.len(), "built FX vol curve");
            TermVarianceCurve::new(&times, &vols)
        })
    }

    pub fn today(&self) -> f64 {
        self.today
    }

    pub fn accrual(&self) -> Accrual {
        self.accrual
    }

    pub fn fx_tenors(&self) -> &[f64] {
        &self.tenors
    }

    pub fn fx_atm_vols(&self) -> &[f64] {
        &self.atm_vols
    }

    pub fn fx_atm_vol(&self, index: usize) -> Result<f64> {
        self.atm_vols.get(index).copied().ok_or_else(|| {
            invalid_input!(
                "FX vol index {} out of range ({} tenors)",
                index,
                self.atm_vols.len()
            )
        })
    }

    fn time_to(&self, date: f64) -> Result<f64> {
        if !date.is_finite() {
            return Err(invalid_input!("maturity must be a finite serial date, got {}", date));
        }
        let t = time_to_expiry(self.today, date, self.accrual);
        if t < 0.0 {
            return Err(invalid_input!(
                "maturity {} is before the valuation date {}",
                date,
                self.today
            ));
        }
        Ok(t)
    }

    /// Term FX ATM vol to serial date `dmat`.
    pub fn fx_vol_by_date(&self, dmat: f64) -> Result<f64> {
        let t = self.time_to(dmat)?;
        Ok(self.curve()?.vol(t))
    }

    /// Instantaneous FX vol at serial date `d`.
    pub fn inst_vol(&self, d: f64) -> Result<f64> {
        let t = self.time_to(d)?;
        Ok(self.curve()?.inst_vol(t))
    }

    pub fn set_fx_atm_vol(&mut self, vol: f64, index: usize) -> Result<()> {
        validate_fx_vol(vol)?;
        let len = self.atm_vols.len();
        let slot = self
            .atm_vols
            .get_mut(index)
            .ok_or_else(|| invalid_input!("FX vol index {} out of range ({} tenors)", index, len))?;
        *slot = vol;
        self.curve.invalidate();
        Ok(())
    }

    pub fn set_today(&mut self, today: f64) -> Result<()> {
        if !today.is_finite() {
            return Err(invalid_input!("today must be a finite serial date, got {}", today));
        }
        self.today = today;
        self.curve.invalidate();
        Ok(())
    }
}

/// A primary node combined with a correlated FX ATM term structure.
///
/// Both legs share one valuation date and day count. The legs are only
/// reachable mutably through the composite's setters, so a date roll always
/// moves them together.
#[derive(Debug, Clone)]
pub struct FxCompositeVol {
    primary: Box<VolNode>,
    fx: FxVolCurve,
    corr: f64,
}

fn validate_corr(corr: f64) -> Result<()> {
    if !(-1.0..=1.0).contains(&corr) {
        return Err(invalid_input!("correlation must lie in [-1, 1], got {}", corr));
    }
    Ok(())
}

impl FxCompositeVol {
    pub fn new(primary: impl Into<VolNode>, fx: FxVolCurve, corr: f64) -> Result<Self> {
        validate_corr(corr)?;
        let primary = primary.into();
        if primary.today() != fx.today() {
            return Err(invalid_input!(
                "primary valuation date {} differs from FX curve valuation date {}",
                primary.today(),
                fx.today()
            ));
        }
        if primary.accrual() != fx.accrual() {
            return Err(invalid_input!(
                "primary accrual {} differs from FX curve accrual {}",
                primary.accrual(),
                fx.accrual()
            ));
        }
        Ok(Self {
            primary: Box::new(primary),
            fx,
            corr,
        })
    }

    pub fn base(&self) -> &NodeBase {
        self.primary.base()
    }

    pub fn primary(&self) -> &VolNode {
        &self.primary
    }

    pub fn fx(&self) -> &FxVolCurve {
        &self.fx
    }

    pub fn corr(&self) -> f64 {
        self.corr
    }

    pub fn set_corr(&mut self, corr: f64) -> Result<()> {
        validate_corr(corr)?;
        self.corr = corr;
        Ok(())
    }

    pub fn set_atm(&mut self, atm_vol: f64) -> Result<()> {
        self.primary.set_atm(atm_vol)
    }

    /// Rolls both legs to the new valuation date.
    pub fn set_today(&mut self, today: f64) -> Result<()> {
        self.primary.set_today(today)?;
        self.fx.set_today(today)
    }

    pub fn set_expiry(&mut self, expiry: f64) -> Result<()> {
        self.primary.set_expiry(expiry)
    }

    /// Samuelson level of the primary leg.
    pub fn set_alpha(&mut self, alpha: f64) -> Result<()> {
        self.primary.set_alpha(alpha)
    }

    /// Samuelson decay of the primary leg.
    pub fn set_beta(&mut self, beta: f64) -> Result<()> {
        self.primary.set_beta(beta)
    }

    pub fn set_fx_atm_vol(&mut self, vol: f64, index: usize) -> Result<()> {
        self.fx.set_fx_atm_vol(vol, index)
    }

    fn fx_term_vol(&self, dmat: Option<f64>) -> Result<f64> {
        self.fx
            .fx_vol_by_date(dmat.unwrap_or_else(|| self.primary.expiry()))
    }

    fn combine(&self, primary: f64, dmat: Option<f64>) -> Result<f64> {
        Ok(composite_vol(primary, self.fx_term_vol(dmat)?, self.corr))
    }
}

impl VolModel for FxCompositeVol {
    fn vol_by_strike(&self, strike: f64, dmat: Option<f64>) -> Result<f64> {
        self.combine(self.primary.vol_by_strike(strike, dmat)?, dmat)
    }

    fn vol_by_delta(&self, delta: f64, dmat: Option<f64>) -> Result<f64> {
        self.combine(self.primary.vol_by_delta(delta, dmat)?, dmat)
    }

    fn vol_by_moneyness(&self, ratio: f64, dmat: Option<f64>) -> Result<f64> {
        self.combine(self.primary.vol_by_moneyness(ratio, dmat)?, dmat)
    }

    fn inst_vol(&self, d: Option<f64>) -> Result<f64> {
        let primary = self.primary.inst_vol(d)?;
        let fx = self.fx.inst_vol(d.unwrap_or_else(|| self.fx.today()))?;
        Ok(composite_vol(primary, fx, self.corr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PricingError;
    use crate::models::vol_node::{FlatVol, SamuelsonVol};
    use approx::assert_abs_diff_eq;

    const TODAY: f64 = 45000.0;

    fn fx_curve() -> FxVolCurve {
        FxVolCurve::new(
            TODAY,
            vec![TODAY + 91.25, TODAY + 182.5, TODAY + 365.0],
            vec![0.12, 0.10, 0.09],
            Accrual::Act365,
        )
        .unwrap()
    }

    #[test]
    fn test_composite_vol_limits() {
        assert_abs_diff_eq!(composite_vol(0.3, 0.1, 1.0), 0.4, epsilon = 1e-15);
        assert_abs_diff_eq!(composite_vol(0.3, 0.1, -1.0), 0.2, epsilon = 1e-15);
        assert_abs_diff_eq!(composite_vol(0.3, 0.4, 0.0), 0.5, epsilon = 1e-15);
        // perfectly offsetting legs
        assert!(composite_vol(0.2, 0.2, -1.0) < 1e-7);
    }

    #[test]
    fn test_fx_curve_reprices_tenors() {
        let fx = fx_curve();
        assert_abs_diff_eq!(fx.fx_vol_by_date(TODAY + 182.5).unwrap(), 0.10, epsilon = 1e-14);
        assert_eq!(fx.fx_vol_by_date(TODAY + 10.0).unwrap(), 0.12);
        assert_eq!(fx.fx_vol_by_date(TODAY + 1000.0).unwrap(), 0.09);
        assert!(fx.fx_vol_by_date(TODAY - 1.0).is_err());
    }

    #[test]
    fn test_fx_setter_bounds_and_invalidation() {
        let mut fx = fx_curve();
        assert_eq!(fx.fx_atm_vol(2), Ok(0.09));
        assert!(matches!(fx.fx_atm_vol(3), Err(PricingError::InvalidInput(_))));
        assert!(matches!(
            fx.set_fx_atm_vol(0.1, 3),
            Err(PricingError::InvalidInput(_))
        ));

        fx.set_fx_atm_vol(0.15, 2).unwrap();
        assert!(!fx.curve.is_built());
        assert_abs_diff_eq!(fx.fx_vol_by_date(TODAY + 365.0).unwrap(), 0.15, epsilon = 1e-14);
    }

    #[test]
    fn test_rolling_today_drops_expired_tenors() {
        let mut fx = fx_curve();
        fx.set_today(TODAY + 100.0).unwrap();
        // first tenor has expired, the short end is now the 6m quote
        assert_eq!(fx.fx_vol_by_date(TODAY + 101.0).unwrap(), 0.10);
        fx.set_today(TODAY + 400.0).unwrap();
        assert!(fx.fx_vol_by_date(TODAY + 500.0).is_err());
    }

    #[test]
    fn test_composite_over_flat_primary() {
        let primary = FlatVol::new(0.3, TODAY, TODAY + 182.5, Accrual::Act365).unwrap();
        let node = FxCompositeVol::new(primary, fx_curve(), -0.4).unwrap();
        let expected = composite_vol(0.3, 0.10, -0.4);
        assert_abs_diff_eq!(node.vol_by_strike(80.0, None).unwrap(), expected, epsilon = 1e-14);
        assert_abs_diff_eq!(node.vol_by_moneyness(0.0, None).unwrap(), expected, epsilon = 1e-14);
        assert!(FxCompositeVol::new(
            FlatVol::new(0.3, TODAY, TODAY + 182.5, Accrual::Act365).unwrap(),
            fx_curve(),
            1.5
        )
        .is_err());
    }

    #[test]
    fn test_composite_tracks_both_legs() {
        let base = NodeBase::new(0.25, TODAY, TODAY + 365.0, Accrual::Act365).unwrap();
        let primary = SamuelsonVol::new(base, 0.6, 2.0).unwrap();
        let mut node = FxCompositeVol::new(primary, fx_curve(), 0.3).unwrap();
        let before = node.vol_by_strike(100.0, None).unwrap();
        assert_abs_diff_eq!(before, composite_vol(0.25, 0.09, 0.3), epsilon = 1e-14);

        node.set_fx_atm_vol(0.2, 2).unwrap();
        assert_abs_diff_eq!(
            node.vol_by_strike(100.0, None).unwrap(),
            composite_vol(0.25, 0.2, 0.3),
            epsilon = 1e-14
        );

        node.set_atm(0.35).unwrap();
        assert_abs_diff_eq!(
            node.vol_by_strike(100.0, None).unwrap(),
            composite_vol(0.35, 0.2, 0.3),
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_composite_legs_share_valuation_date() {
        let primary = FlatVol::new(0.2, TODAY, TODAY + 365.0, Accrual::Act365).unwrap();
        let stale_fx = FxVolCurve::new(
            TODAY - 1000.0,
            vec![TODAY + 365.0],
            vec![0.1],
            Accrual::Act365,
        )
        .unwrap();
        assert!(matches!(
            FxCompositeVol::new(primary.clone(), stale_fx, 0.0),
            Err(PricingError::InvalidInput(_))
        ));

        let act360_fx =
            FxVolCurve::new(TODAY, vec![TODAY + 365.0], vec![0.1], Accrual::Act360).unwrap();
        assert!(matches!(
            FxCompositeVol::new(primary.clone(), act360_fx, 0.0),
            Err(PricingError::InvalidInput(_))
        ));

        let mut node = FxCompositeVol::new(primary, fx_curve(), 0.0).unwrap();
        node.set_today(TODAY + 200.0).unwrap();
        assert_eq!(node.primary().today(), TODAY + 200.0);
        assert_eq!(node.fx().today(), TODAY + 200.0);
        assert_eq!(node.base().today(), node.fx().today());
    }

    #[test]
    fn test_samuelson_setters_reach_primary() {
        let base = NodeBase::new(0.25, TODAY, TODAY + 365.0, Accrual::Act365).unwrap();
        let primary = SamuelsonVol::new(base, 0.5, 1.0).unwrap();
        let mut node = FxCompositeVol::new(primary, fx_curve(), 0.0).unwrap();
        node.set_alpha(1.5).unwrap();
        node.set_beta(3.0).unwrap();
        match node.primary() {
            VolNode::Samuelson(p) => {
                assert_eq!(p.alpha(), 1.5);
                assert_eq!(p.beta(), 3.0);
            }
            other => panic!("unexpected primary {:?}", other),
        }
        let flat = FlatVol::new(0.2, TODAY, TODAY + 365.0, Accrual::Act365).unwrap();
        let mut flat_node = FxCompositeVol::new(flat, fx_curve(), 0.0).unwrap();
        assert!(flat_node.set_alpha(1.0).is_err());
    }

    #[test]
    fn test_composite_inst_vol() {
        let primary = FlatVol::new(0.3, TODAY, TODAY + 365.0, Accrual::Act365).unwrap();
        let node = FxCompositeVol::new(primary, fx_curve(), 0.5).unwrap();
        // before the first tenor the FX curve is flat at the first quote
        assert_abs_diff_eq!(
            node.inst_vol(None).unwrap(),
            composite_vol(0.3, 0.12, 0.5),
            epsilon = 1e-14
        );
    }
}
