//! Five-point delta smile.
//!
//! The quotes are vols at the 10, 25, 75 and 90 put-delta points plus the ATM
//! vol at 50-delta. Each `(delta, vol)` pair is mapped to a strike with the
//! closed-form Black inversion
//!
//! ```text
//! K(δ, σ) = F · exp(σ√t · N⁻¹(δ) + σ²t/2)
//! ```
//!
//! where `δ` is the undiscounted put-delta magnitude `N(−d1)`. Strikes grow
//! with `δ`, so a sane smile gives `K10 < K25 < K50 < K75 < K90`. A
//! Fritsch-Carlson monotone cubic over strike → vol is fitted through the
//! five knots and held flat beyond the wings.
//!
//! The fit and the derived `omega` are cached; every setter drops them and the
//! next query refits.

use tracing::{debug, trace, warn};

use super::cache::FitCache;
use super::samuelson::{inst_time, node_maturity, SamuelsonShape};
use super::{NodeBase, VolModel};
use crate::config::SmileConfig;
use crate::error::{ensure_finite, invalid_input, PricingError, Result};
use crate::math::MonotoneCubic;
use crate::models::closed_form::black_strike_from_delta;

/// Put-delta magnitudes of the smile knots, low strike to high strike.
pub const DELTA_PILLARS: [f64; 5] = [0.10, 0.25, 0.50, 0.75, 0.90];

/// Market quotes of a delta smile (the ATM vol lives on the node base).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmileQuotes {
    pub fwd: f64,
    pub d10_vol: f64,
    pub d25_vol: f64,
    pub d75_vol: f64,
    pub d90_vol: f64,
}

impl SmileQuotes {
    fn validate(&self) -> Result<()> {
        validate_fwd(self.fwd)?;
        for (name, vol) in [
            ("10-delta vol", self.d10_vol),
            ("25-delta vol", self.d25_vol),
            ("75-delta vol", self.d75_vol),
            ("90-delta vol", self.d90_vol),
        ] {
            validate_wing_vol(name, vol)?;
        }
        Ok(())
    }

    fn pillar_vols(&self, atm_vol: f64) -> [f64; 5] {
        [self.d10_vol, self.d25_vol, atm_vol, self.d75_vol, self.d90_vol]
    }
}

fn validate_fwd(fwd: f64) -> Result<()> {
    if !fwd.is_finite() || fwd <= 0.0 {
        return Err(invalid_input!("smile forward must be positive, got {}", fwd));
    }
    Ok(())
}

fn validate_wing_vol(name: &str, vol: f64) -> Result<()> {
    if !vol.is_finite() || vol <= 0.0 {
        return Err(invalid_input!("{} must be positive, got {}", name, vol));
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct SmileFit {
    strikes: [f64; 5],
    spline: MonotoneCubic,
    omega: f64,
}

fn fit_smile(base: &NodeBase, quotes: &SmileQuotes) -> Result<SmileFit> {
    let t = base.time_to_expiry();
    if !(t > 0.0) {
        return Err(invalid_input!(
            "delta smile needs a positive time to expiry, got {} (today {}, expiry {})",
            t,
            base.today(),
            base.expiry()
        ));
    }
    let vols = quotes.pillar_vols(base.atm_vol());
    validate_wing_vol("ATM vol", base.atm_vol())?;

    let mut strikes = [0.0; 5];
    for (i, (&delta, &vol)) in DELTA_PILLARS.iter().zip(vols.iter()).enumerate() {
        strikes[i] = black_strike_from_delta(quotes.fwd, delta, vol, t)?;
    }
    if let Some(i) = strikes.windows(2).position(|w| w[1] <= w[0]) {
        return Err(PricingError::DegenerateSmile(format!(
            "{}-delta strike {:.6} is not above {}-delta strike {:.6}",
            DELTA_PILLARS[i + 1] * 100.0,
            strikes[i + 1],
            DELTA_PILLARS[i] * 100.0,
            strikes[i]
        )));
    }

    let spline = MonotoneCubic::new(&strikes, &vols)?;
    let omega = spline.tangent(2).unwrap_or(0.0) * strikes[2];
    debug!(fwd = quotes.fwd, t, ?strikes, omega, "fitted delta smile");
    Ok(SmileFit {
        strikes,
        spline,
        omega,
    })
}

/// Five-point delta smile node.
#[derive(Debug, Clone)]
pub struct Delta5Vol {
    base: NodeBase,
    quotes: SmileQuotes,
    config: SmileConfig,
    fit: FitCache<SmileFit>,
}

impl Delta5Vol {
    /// Builds the node and fits the smile; degenerate quotes fail here.
    pub fn new(base: NodeBase, quotes: SmileQuotes) -> Result<Self> {
        Self::with_smile_config(base, quotes, SmileConfig::default())
    }

    pub fn with_smile_config(
        base: NodeBase,
        quotes: SmileQuotes,
        config: SmileConfig,
    ) -> Result<Self> {
        quotes.validate()?;
        let node = Self {
            base,
            quotes,
            config,
            fit: FitCache::default(),
        };
        node.fit()?;
        Ok(node)
    }

    fn fit(&self) -> Result<&SmileFit> {
        self.fit.get_or_build(|| fit_smile(&self.base, &self.quotes))
    }

    pub fn base(&self) -> &NodeBase {
        &self.base
    }

    pub fn quotes(&self) -> &SmileQuotes {
        &self.quotes
    }

    pub fn fwd(&self) -> f64 {
        self.quotes.fwd
    }

    pub fn d10_vol(&self) -> f64 {
        self.quotes.d10_vol
    }

    pub fn d25_vol(&self) -> f64 {
        self.quotes.d25_vol
    }

    pub fn d75_vol(&self) -> f64 {
        self.quotes.d75_vol
    }

    pub fn d90_vol(&self) -> f64 {
        self.quotes.d90_vol
    }

    /// Smile slope `dσ/d ln K` at the 50-delta knot.
    pub fn omega(&self) -> Result<f64> {
        Ok(self.fit()?.omega)
    }

    /// Whether the smile fit is currently cached.
    pub fn is_fitted(&self) -> bool {
        self.fit.is_built()
    }

    /// Strikes of the 10/25/50/75/90 delta knots.
    pub fn pillar_strikes(&self) -> Result<[f64; 5]> {
        Ok(self.fit()?.strikes)
    }

    pub fn set_atm(&mut self, atm_vol: f64) -> Result<()> {
        self.base.set_atm(atm_vol)?;
        self.fit.invalidate();
        Ok(())
    }

    pub fn set_today(&mut self, today: f64) -> Result<()> {
        self.base.set_today(today)?;
        self.fit.invalidate();
        Ok(())
    }

    pub fn set_expiry(&mut self, expiry: f64) -> Result<()> {
        self.base.set_expiry(expiry)?;
        self.fit.invalidate();
        Ok(())
    }

    pub fn set_fwd(&mut self, fwd: f64) -> Result<()> {
        validate_fwd(fwd)?;
        self.quotes.fwd = fwd;
        self.fit.invalidate();
        Ok(())
    }

    pub fn set_d10_vol(&mut self, vol: f64) -> Result<()> {
        validate_wing_vol("10-delta vol", vol)?;
        self.quotes.d10_vol = vol;
        self.fit.invalidate();
        Ok(())
    }

    pub fn set_d25_vol(&mut self, vol: f64) -> Result<()> {
        validate_wing_vol("25-delta vol", vol)?;
        self.quotes.d25_vol = vol;
        self.fit.invalidate();
        Ok(())
    }

    pub fn set_d75_vol(&mut self, vol: f64) -> Result<()> {
        validate_wing_vol("75-delta vol", vol)?;
        self.quotes.d75_vol = vol;
        self.fit.invalidate();
        Ok(())
    }

    pub fn set_d90_vol(&mut self, vol: f64) -> Result<()> {
        validate_wing_vol("90-delta vol", vol)?;
        self.quotes.d90_vol = vol;
        self.fit.invalidate();
        Ok(())
    }

    /// Strike whose smile vol reproduces put delta `delta`.
    ///
    /// Starts from the ATM-vol strike and iterates `K ← K(δ, σ(K))` until the
    /// relative strike change drops below `strike_tol`.
    pub fn strike_by_delta(&self, delta: f64) -> Result<f64> {
        if !(delta > 0.0 && delta < 1.0) {
            return Err(invalid_input!("delta must lie in (0, 1), got {}", delta));
        }
        let fit = self.fit()?;
        let t = self.base.time_to_expiry();
        let fwd = self.quotes.fwd;

        let mut strike = black_strike_from_delta(fwd, delta, self.base.atm_vol(), t)?;
        let mut step = f64::INFINITY;
        for iteration in 0..self.config.max_refinement_iterations {
            let vol = fit.spline.value(strike);
            let next = black_strike_from_delta(fwd, delta, vol, t)?;
            step = (next - strike).abs();
            trace!(iteration, delta, strike = next, vol, step, "delta to strike refinement");
            strike = next;
            if step <= self.config.strike_tol * strike {
                return Ok(strike);
            }
        }

        warn!(delta, strike, step, "delta to strike refinement did not converge");
        Err(PricingError::NoConvergence {
            what: format!("strike for {delta} delta"),
            iterations: self.config.max_refinement_iterations,
            residual: step,
        })
    }

    fn smile_vol(&self, strike: f64) -> Result<f64> {
        if !strike.is_finite() || strike <= 0.0 {
            return Err(invalid_input!("strike must be positive, got {}", strike));
        }
        Ok(self.fit()?.spline.value(strike))
    }
}

impl VolModel for Delta5Vol {
    fn vol_by_strike(&self, strike: f64, dmat: Option<f64>) -> Result<f64> {
        self.base.time_to(dmat)?;
        self.smile_vol(strike)
    }

    fn vol_by_delta(&self, delta: f64, dmat: Option<f64>) -> Result<f64> {
        self.base.time_to(dmat)?;
        let strike = self.strike_by_delta(delta)?;
        self.smile_vol(strike)
    }

    /// Vol at strike `fwd · e^{ratio}`.
    fn vol_by_moneyness(&self, ratio: f64, dmat: Option<f64>) -> Result<f64> {
        if !ratio.is_finite() {
            return Err(invalid_input!("log-moneyness must be finite, got {}", ratio));
        }
        self.vol_by_strike(self.quotes.fwd * ratio.exp(), dmat)
    }

    /// The smile carries no time structure: the ATM vol.
    fn inst_vol(&self, d: Option<f64>) -> Result<f64> {
        inst_time(&self.base, d)?;
        Ok(self.base.atm_vol())
    }
}

/// Delta smile whose level follows a Samuelson term structure: the smile fitted
/// at node expiry, scaled by the ratio of term vol to `dmat` over term vol to
/// expiry.
#[derive(Debug, Clone)]
pub struct SamuelsonDelta5Vol {
    smile: Delta5Vol,
    shape: SamuelsonShape,
}

impl SamuelsonDelta5Vol {
    pub fn new(base: NodeBase, quotes: SmileQuotes, alpha: f64, beta: f64) -> Result<Self> {
        let shape = SamuelsonShape::new(alpha, beta)?;
        Ok(Self {
            smile: Delta5Vol::new(base, quotes)?,
            shape,
        })
    }

    pub fn from_smile(smile: Delta5Vol, alpha: f64, beta: f64) -> Result<Self> {
        Ok(Self {
            smile,
            shape: SamuelsonShape::new(alpha, beta)?,
        })
    }

    pub fn smile(&self) -> &Delta5Vol {
        &self.smile
    }

    /// Mutable access to the underlying smile; its setters drop the fit.
    pub fn smile_mut(&mut self) -> &mut Delta5Vol {
        &mut self.smile
    }

    pub fn base(&self) -> &NodeBase {
        self.smile.base()
    }

    pub fn alpha(&self) -> f64 {
        self.shape.alpha()
    }

    pub fn beta(&self) -> f64 {
        self.shape.beta()
    }

    pub fn set_atm(&mut self, atm_vol: f64) -> Result<()> {
        self.smile.set_atm(atm_vol)
    }

    pub fn set_today(&mut self, today: f64) -> Result<()> {
        self.smile.set_today(today)
    }

    pub fn set_expiry(&mut self, expiry: f64) -> Result<()> {
        self.smile.set_expiry(expiry)
    }

    pub fn set_alpha(&mut self, alpha: f64) -> Result<()> {
        self.shape.set_alpha(alpha)
    }

    pub fn set_beta(&mut self, beta: f64) -> Result<()> {
        self.shape.set_beta(beta)
    }

    fn term_ratio(&self, dmat: Option<f64>) -> Result<f64> {
        let base = self.smile.base();
        let mat = node_maturity(base)?;
        let t = base.time_to(dmat)?;
        ensure_finite(self.shape.term_ratio(t, mat), "Samuelson term ratio")
    }
}

impl VolModel for SamuelsonDelta5Vol {
    fn vol_by_strike(&self, strike: f64, dmat: Option<f64>) -> Result<f64> {
        Ok(self.smile.vol_by_strike(strike, None)? * self.term_ratio(dmat)?)
    }

    fn vol_by_delta(&self, delta: f64, dmat: Option<f64>) -> Result<f64> {
        Ok(self.smile.vol_by_delta(delta, None)? * self.term_ratio(dmat)?)
    }

    fn vol_by_moneyness(&self, ratio: f64, dmat: Option<f64>) -> Result<f64> {
        Ok(self.smile.vol_by_moneyness(ratio, None)? * self.term_ratio(dmat)?)
    }

    fn inst_vol(&self, d: Option<f64>) -> Result<f64> {
        let base = self.smile.base();
        let mat = node_maturity(base)?;
        let t = inst_time(base, d)?;
        ensure_finite(
            base.atm_vol() * self.shape.inst_ratio(t, mat),
            "Samuelson instantaneous vol",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Accrual;
    use approx::assert_abs_diff_eq;

    const TODAY: f64 = 45000.0;
    const EXPIRY: f64 = 45365.0;

    fn quotes() -> SmileQuotes {
        SmileQuotes {
            fwd: 100.0,
            d10_vol: 0.26,
            d25_vol: 0.225,
            d75_vol: 0.19,
            d90_vol: 0.195,
        }
    }

    fn smile() -> Delta5Vol {
        let base = NodeBase::new(0.20, TODAY, EXPIRY, Accrual::Act365).unwrap();
        Delta5Vol::new(base, quotes()).unwrap()
    }

    #[test]
    fn test_knots_are_reproduced() {
        let node = smile();
        let strikes = node.pillar_strikes().unwrap();
        let vols = [0.26, 0.225, 0.20, 0.19, 0.195];
        for (k, v) in strikes.iter().zip(vols) {
            assert_abs_diff_eq!(node.vol_by_strike(*k, None).unwrap(), v, epsilon = 1e-14);
        }
        // 50-delta knot sits at the delta-neutral strike
        assert_abs_diff_eq!(strikes[2], 100.0 * (0.5_f64 * 0.04).exp(), epsilon = 1e-10);
    }

    #[test]
    fn test_delta_lookup_recovers_quotes() {
        let node = smile();
        for (&delta, v) in DELTA_PILLARS.iter().zip([0.26, 0.225, 0.20, 0.19, 0.195]) {
            assert_abs_diff_eq!(node.vol_by_delta(delta, None).unwrap(), v, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_flat_beyond_wings() {
        let node = smile();
        assert_eq!(node.vol_by_strike(10.0, None).unwrap(), 0.26);
        assert_eq!(node.vol_by_strike(1000.0, None).unwrap(), 0.195);
        assert!(node.vol_by_strike(0.0, None).is_err());
    }

    #[test]
    fn test_moneyness_is_log_strike() {
        let node = smile();
        let by_ratio = node.vol_by_moneyness(-0.1, None).unwrap();
        let by_strike = node.vol_by_strike(100.0 * (-0.1_f64).exp(), None).unwrap();
        assert_eq!(by_ratio, by_strike);
    }

    #[test]
    fn test_put_skew_has_negative_omega() {
        let omega = smile().omega().unwrap();
        assert!(omega < 0.0, "omega {omega}");
    }

    #[test]
    fn test_mutation_drops_fit() {
        let mut node = smile();
        let k50 = node.pillar_strikes().unwrap()[2];
        assert!(node.is_fitted());

        node.set_atm(0.25).unwrap();
        assert!(!node.is_fitted());
        let k50_new = node.pillar_strikes().unwrap()[2];
        assert_abs_diff_eq!(k50_new, 100.0 * (0.5_f64 * 0.0625).exp(), epsilon = 1e-10);
        assert!(k50_new != k50);
        assert_abs_diff_eq!(node.vol_by_strike(k50_new, None).unwrap(), 0.25, epsilon = 1e-14);

        node.set_fwd(110.0).unwrap();
        assert!(!node.is_fitted());
        assert_abs_diff_eq!(node.vol_by_delta(0.25, None).unwrap(), 0.225, epsilon = 1e-10);
    }

    #[test]
    fn test_crossed_strikes_are_degenerate() {
        let base = NodeBase::new(0.20, TODAY, EXPIRY, Accrual::Act365).unwrap();
        let bad = SmileQuotes {
            d10_vol: 3.0,
            ..quotes()
        };
        assert!(matches!(
            Delta5Vol::new(base, bad),
            Err(PricingError::DegenerateSmile(_))
        ));

        // a mutation that crosses strikes fails on the next query
        let mut node = smile();
        node.set_d90_vol(0.01).unwrap();
        assert!(matches!(
            node.vol_by_strike(100.0, None),
            Err(PricingError::DegenerateSmile(_))
        ));
        node.set_d90_vol(0.195).unwrap();
        assert!(node.vol_by_strike(100.0, None).is_ok());
    }

    #[test]
    fn test_expired_node_is_rejected() {
        let base = NodeBase::new(0.20, TODAY, TODAY, Accrual::Act365).unwrap();
        assert!(matches!(
            Delta5Vol::new(base, quotes()),
            Err(PricingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_refinement_budget_exhausted() {
        let base = NodeBase::new(0.20, TODAY, EXPIRY, Accrual::Act365).unwrap();
        let config = SmileConfig {
            max_refinement_iterations: 1,
            ..SmileConfig::default()
        };
        let node = Delta5Vol::with_smile_config(base, quotes(), config).unwrap();
        assert!(matches!(
            node.strike_by_delta(0.25),
            Err(PricingError::NoConvergence { .. })
        ));
        assert!(node.strike_by_delta(1.0).is_err());
    }

    #[test]
    fn test_samuelson_smile_scales_with_maturity() {
        let base = NodeBase::new(0.20, TODAY, EXPIRY, Accrual::Act365).unwrap();
        let node = SamuelsonDelta5Vol::new(base, quotes(), 0.5, 2.0).unwrap();
        let k = 90.0;
        let at_expiry = node.vol_by_strike(k, None).unwrap();
        let smile_vol = node.smile().vol_by_strike(k, None).unwrap();
        assert_abs_diff_eq!(at_expiry, smile_vol, epsilon = 1e-15);

        let short = node.vol_by_strike(k, Some(TODAY + 91.0)).unwrap();
        let ratio = node.shape.term_ratio(91.0 / 365.0, 1.0);
        assert!(ratio < 1.0);
        assert_abs_diff_eq!(short, at_expiry * ratio, epsilon = 1e-15);
        assert_abs_diff_eq!(
            node.vol_by_delta(0.75, Some(TODAY + 91.0)).unwrap(),
            0.19 * ratio,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_samuelson_smile_inst_vol() {
        let base = NodeBase::new(0.20, TODAY, EXPIRY, Accrual::Act365).unwrap();
        let mut node = SamuelsonDelta5Vol::new(base, quotes(), 0.5, 2.0).unwrap();
        assert!(node.inst_vol(Some(EXPIRY)).unwrap() > node.inst_vol(None).unwrap());
        node.set_alpha(0.0).unwrap();
        assert_abs_diff_eq!(node.inst_vol(Some(TODAY + 30.0)).unwrap(), 0.20, epsilon = 1e-15);
    }
}
