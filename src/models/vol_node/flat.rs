use super::{NodeBase, VolModel};
use crate::error::Result;
use crate::types::Accrual;

/// Constant volatility: the ATM vol for every strike, delta, maturity and date.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatVol {
    base: NodeBase,
}

impl FlatVol {
    pub fn new(atm_vol: f64, today: f64, expiry: f64, accrual: Accrual) -> Result<Self> {
        Ok(Self {
            base: NodeBase::new(atm_vol, today, expiry, accrual)?,
        })
    }

    pub fn base(&self) -> &NodeBase {
        &self.base
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
}

impl VolModel for FlatVol {
    fn vol_by_strike(&self, _strike: f64, _dmat: Option<f64>) -> Result<f64> {
        Ok(self.base.atm_vol())
    }

    fn vol_by_delta(&self, _delta: f64, _dmat: Option<f64>) -> Result<f64> {
        Ok(self.base.atm_vol())
    }

    fn vol_by_moneyness(&self, _ratio: f64, _dmat: Option<f64>) -> Result<f64> {
        Ok(self.base.atm_vol())
    }

    fn inst_vol(&self, _d: Option<f64>) -> Result<f64> {
        Ok(self.base.atm_vol())
    }
}
