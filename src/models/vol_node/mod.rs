//! Per-expiry volatility nodes.
//!
//! A node turns a strike, a delta or a log-moneyness into the volatility to
//! feed a closed-form pricer, and exposes the instantaneous (local-in-time)
//! volatility behind it. The variants form a closed set behind the
//! [`VolModel`] capability:
//!
//! - [`FlatVol`]: the ATM vol everywhere
//! - [`SamuelsonVol`]: ATM term vol with Samuelson time decay
//! - [`Delta5Vol`]: 5-point delta smile fitted in strike
//! - [`SamuelsonDelta5Vol`]: the smile scaled by Samuelson time decay
//! - [`FxCompositeVol`]: any of the above combined with a correlated FX ATM term structure
//!
//! Derived state (the smile fit, the FX term curve) is cached and dropped by
//! every mutator; see [`Delta5Vol`] and [`FxVolCurve`].

mod cache;
pub mod delta5;
pub mod flat;
pub mod fx;
pub mod samuelson;

pub use delta5::{Delta5Vol, SamuelsonDelta5Vol, SmileQuotes, DELTA_PILLARS};
pub use flat::FlatVol;
pub use fx::{composite_vol, FxCompositeVol, FxVolCurve};
pub use samuelson::{samuelson_factor, SamuelsonShape, SamuelsonVol};

use crate::error::{ensure_finite, invalid_input, Result};
use crate::types::{next_weekday, time_to_expiry, Accrual};

/// Volatility lookup shared by every node.
///
/// `dmat` is the serial date of the queried maturity; `None` means the node's
/// own expiry. `ratio` is log-moneyness `ln(K / fwd)`.
pub trait VolModel {
    fn vol_by_strike(&self, strike: f64, dmat: Option<f64>) -> Result<f64>;

    /// `delta` is the undiscounted put-delta magnitude in (0, 1).
    fn vol_by_delta(&self, delta: f64, dmat: Option<f64>) -> Result<f64>;

    fn vol_by_moneyness(&self, ratio: f64, dmat: Option<f64>) -> Result<f64>;

    /// Instantaneous volatility at serial date `d` (`None` = today).
    fn inst_vol(&self, d: Option<f64>) -> Result<f64>;
}

/// Quoted state common to every node: ATM vol, valuation date, expiry date
/// and day-count basis.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBase {
    atm_vol: f64,
    today: f64,
    expiry: f64,
    accrual: Accrual,
}

fn validate_vol(name: &str, vol: f64) -> Result<()> {
    if !vol.is_finite() || vol < 0.0 {
        return Err(invalid_input!("{} must be finite and >= 0, got {}", name, vol));
    }
    Ok(())
}

fn validate_date(name: &str, date: f64) -> Result<()> {
    if !date.is_finite() {
        return Err(invalid_input!("{} must be a finite serial date, got {}", name, date));
    }
    Ok(())
}

impl NodeBase {
    pub fn new(atm_vol: f64, today: f64, expiry: f64, accrual: Accrual) -> Result<Self> {
        validate_vol("ATM vol", atm_vol)?;
        validate_date("today", today)?;
        validate_date("expiry", expiry)?;
        Ok(Self {
            atm_vol,
            today,
            expiry,
            accrual,
        })
    }

    pub fn atm_vol(&self) -> f64 {
        self.atm_vol
    }

    pub fn today(&self) -> f64 {
        self.today
    }

    pub fn expiry(&self) -> f64 {
        self.expiry
    }

    pub fn accrual(&self) -> Accrual {
        self.accrual
    }

    /// Year fraction between two serial dates under this node's accrual.
    pub fn time2expiry(&self, dtoday: f64, dexp: f64) -> f64 {
        time_to_expiry(dtoday, dexp, self.accrual)
    }

    /// Year fraction from valuation date to node expiry.
    pub fn time_to_expiry(&self) -> f64 {
        self.time2expiry(self.today, self.expiry)
    }

    /// Year fraction from valuation date to `date` (`None` = node expiry).
    /// Dates before today are rejected.
    pub fn time_to(&self, date: Option<f64>) -> Result<f64> {
        let date = date.unwrap_or(self.expiry);
        validate_date("maturity", date)?;
        let t = self.time2expiry(self.today, date);
        if t < 0.0 {
            return Err(invalid_input!(
                "maturity {} is before the valuation date {}",
                date,
                self.today
            ));
        }
        Ok(t)
    }

    pub fn next_weekday(&self) -> f64 {
        next_weekday(self.today)
    }

    pub(crate) fn set_atm(&mut self, atm_vol: f64) -> Result<()> {
        validate_vol("ATM vol", atm_vol)?;
        self.atm_vol = atm_vol;
        Ok(())
    }

    pub(crate) fn set_today(&mut self, today: f64) -> Result<()> {
        validate_date("today", today)?;
        self.today = today;
        Ok(())
    }

    pub(crate) fn set_expiry(&mut self, expiry: f64) -> Result<()> {
        validate_date("expiry", expiry)?;
        self.expiry = expiry;
        Ok(())
    }
}

/// A volatility node for one expiry.
#[derive(Debug, Clone)]
pub enum VolNode {
    Flat(FlatVol),
    Samuelson(SamuelsonVol),
    Delta5(Delta5Vol),
    SamuelsonDelta5(SamuelsonDelta5Vol),
    FxComposite(FxCompositeVol),
}

macro_rules! dispatch {
    ($self:expr, $node:ident => $body:expr) => {
        match $self {
            VolNode::Flat($node) => $body,
            VolNode::Samuelson($node) => $body,
            VolNode::Delta5($node) => $body,
            VolNode::SamuelsonDelta5($node) => $body,
            VolNode::FxComposite($node) => $body,
        }
    };
}

impl VolNode {
    /// Quoted ATM vol, today and expiry of the node (of the primary factor for
    /// an FX composite).
    pub fn base(&self) -> &NodeBase {
        dispatch!(self, node => node.base())
    }

    pub fn atm_vol(&self) -> f64 {
        self.base().atm_vol()
    }

    pub fn today(&self) -> f64 {
        self.base().today()
    }

    pub fn expiry(&self) -> f64 {
        self.base().expiry()
    }

    pub fn accrual(&self) -> Accrual {
        self.base().accrual()
    }

    pub fn time_to_expiry(&self) -> f64 {
        self.base().time_to_expiry()
    }

    pub fn time2expiry(&self, dtoday: f64, dexp: f64) -> f64 {
        self.base().time2expiry(dtoday, dexp)
    }

    pub fn next_weekday(&self) -> f64 {
        self.base().next_weekday()
    }

    /// Re-marks the ATM vol; cached fits are dropped.
    pub fn set_atm(&mut self, atm_vol: f64) -> Result<()> {
        dispatch!(self, node => node.set_atm(atm_vol))
    }

    /// Rolls the valuation date; cached fits are dropped.
    pub fn set_today(&mut self, today: f64) -> Result<()> {
        dispatch!(self, node => node.set_today(today))
    }

    pub fn set_expiry(&mut self, expiry: f64) -> Result<()> {
        dispatch!(self, node => node.set_expiry(expiry))
    }

    /// Samuelson level parameter, for the variants that carry one.
    pub fn set_alpha(&mut self, alpha: f64) -> Result<()> {
        match self {
            VolNode::Samuelson(node) => node.set_alpha(alpha),
            VolNode::SamuelsonDelta5(node) => node.set_alpha(alpha),
            VolNode::FxComposite(node) => node.set_alpha(alpha),
            _ => Err(invalid_input!("node has no Samuelson alpha")),
        }
    }

    /// Samuelson decay parameter, for the variants that carry one.
    pub fn set_beta(&mut self, beta: f64) -> Result<()> {
        match self {
            VolNode::Samuelson(node) => node.set_beta(beta),
            VolNode::SamuelsonDelta5(node) => node.set_beta(beta),
            VolNode::FxComposite(node) => node.set_beta(beta),
            _ => Err(invalid_input!("node has no Samuelson beta")),
        }
    }

    /// Re-marks the `index`-th FX ATM vol of an FX composite node.
    pub fn set_fx_atm_vol(&mut self, vol: f64, index: usize) -> Result<()> {
        match self {
            VolNode::FxComposite(node) => node.set_fx_atm_vol(vol, index),
            _ => Err(invalid_input!("node has no FX vol curve")),
        }
    }
}

impl VolModel for VolNode {
    fn vol_by_strike(&self, strike: f64, dmat: Option<f64>) -> Result<f64> {
        let vol = dispatch!(self, node => node.vol_by_strike(strike, dmat))?;
        ensure_finite(vol, "volatility by strike")
    }

    fn vol_by_delta(&self, delta: f64, dmat: Option<f64>) -> Result<f64> {
        let vol = dispatch!(self, node => node.vol_by_delta(delta, dmat))?;
        ensure_finite(vol, "volatility by delta")
    }

    fn vol_by_moneyness(&self, ratio: f64, dmat: Option<f64>) -> Result<f64> {
        let vol = dispatch!(self, node => node.vol_by_moneyness(ratio, dmat))?;
        ensure_finite(vol, "volatility by moneyness")
    }

    fn inst_vol(&self, d: Option<f64>) -> Result<f64> {
        let vol = dispatch!(self, node => node.inst_vol(d))?;
        ensure_finite(vol, "instantaneous volatility")
    }
}

impl From<FlatVol> for VolNode {
    fn from(node: FlatVol) -> Self {
        VolNode::Flat(node)
    }
}

impl From<SamuelsonVol> for VolNode {
    fn from(node: SamuelsonVol) -> Self {
        VolNode::Samuelson(node)
    }
}

impl From<Delta5Vol> for VolNode {
    fn from(node: Delta5Vol) -> Self {
        VolNode::Delta5(node)
    }
}

impl From<SamuelsonDelta5Vol> for VolNode {
    fn from(node: SamuelsonDelta5Vol) -> Self {
        VolNode::SamuelsonDelta5(node)
    }
}

impl From<FxCompositeVol> for VolNode {
    fn from(node: FxCompositeVol) -> Self {
        VolNode::FxComposite(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PricingError;

    #[test]
    fn test_base_rejects_bad_quotes() {
        assert!(NodeBase::new(-0.1, 45000.0, 45100.0, Accrual::Act365).is_err());
        assert!(NodeBase::new(0.2, f64::NAN, 45100.0, Accrual::Act365).is_err());
    }

    #[test]
    fn test_time_to_rejects_past_maturity() {
        let base = NodeBase::new(0.2, 45000.0, 45365.0, Accrual::Act365).unwrap();
        assert_eq!(base.time_to(None), Ok(1.0));
        assert!((base.time_to(Some(45073.0)).unwrap() - 0.2).abs() < 1e-15);
        assert!(matches!(
            base.time_to(Some(44999.0)),
            Err(PricingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_setters_without_parameter_fail() {
        let mut node: VolNode = FlatVol::new(0.2, 45000.0, 45100.0, Accrual::Act365)
            .unwrap()
            .into();
        assert!(node.set_alpha(0.5).is_err());
        assert!(node.set_fx_atm_vol(0.1, 0).is_err());
        node.set_atm(0.25).unwrap();
        assert_eq!(node.atm_vol(), 0.25);
    }
}
