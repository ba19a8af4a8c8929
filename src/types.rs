//! Option-type flag and day-count helpers.
//!
//! Dates are spreadsheet serial day numbers (`f64`, serial 0 = 1899-12-30),
//! the same representation used for `today`/`expiry` on every volatility node.

use std::fmt;
use std::str::FromStr;

use crate::error::{invalid_input, PricingError, Result};

/// European exercise side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// +1 for calls, -1 for puts.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }
}

impl FromStr for OptionType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "call" | "c" => Ok(OptionType::Call),
            "put" | "p" => Ok(OptionType::Put),
            _ => Err(invalid_input!("Invalid option type: {}", s)),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

/// Day-count basis used to turn a pair of serial dates into a year fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Accrual {
    /// Calendar days / 365
    #[default]
    Act365,
    /// Calendar days / 360
    Act360,
    /// Weekdays / 252
    Act252,
}

impl Accrual {
    /// Year fraction between two serial dates. Negative when `dexp < dtoday`.
    pub fn year_fraction(self, dtoday: f64, dexp: f64) -> f64 {
        match self {
            Accrual::Act365 => (dexp - dtoday) / 365.0,
            Accrual::Act360 => (dexp - dtoday) / 360.0,
            Accrual::Act252 => {
                if dexp >= dtoday {
                    weekdays_between(dtoday, dexp) / 252.0
                } else {
                    -weekdays_between(dexp, dtoday) / 252.0
                }
            }
        }
    }
}

impl FromStr for Accrual {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "act365" => Ok(Accrual::Act365),
            "act360" => Ok(Accrual::Act360),
            "act252" => Ok(Accrual::Act252),
            _ => Err(invalid_input!("Unknown accrual convention: {}", s)),
        }
    }
}

impl fmt::Display for Accrual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Accrual::Act365 => "act365",
            Accrual::Act360 => "act360",
            Accrual::Act252 => "act252",
        };
        f.write_str(name)
    }
}

/// Time to expiry in years under `accrual`.
pub fn time_to_expiry(dtoday: f64, dexp: f64, accrual: Accrual) -> f64 {
    accrual.year_fraction(dtoday, dexp)
}

/// Day of week for a serial date, Monday = 0 .. Sunday = 6.
fn weekday(serial: i64) -> i64 {
    // serial 0 (1899-12-30) was a Saturday
    (serial + 5).rem_euclid(7)
}

fn is_weekday(serial: i64) -> bool {
    weekday(serial) < 5
}

/// Number of weekdays in `(start, end]`. Fractional parts (intraday) are kept
/// on the final day so that act252 stays continuous in `end`.
fn weekdays_between(start: f64, end: f64) -> f64 {
    let s = start.floor() as i64;
    let e = end.floor() as i64;
    let whole_weeks = (e - s) / 7;
    let mut count = whole_weeks * 5;
    let mut day = s + whole_weeks * 7;
    while day < e {
        day += 1;
        if is_weekday(day) {
            count += 1;
        }
    }
    let intraday_end = if is_weekday(e) { end - end.floor() } else { 0.0 };
    let intraday_start = if is_weekday(s) { start - start.floor() } else { 0.0 };
    count as f64 + intraday_end - intraday_start
}

/// Next Monday-Friday serial date strictly after `dtoday`.
pub fn next_weekday(dtoday: f64) -> f64 {
    let mut day = dtoday.floor() as i64 + 1;
    while !is_weekday(day) {
        day += 1;
    }
    day as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_type_parsing() {
        assert_eq!("call".parse::<OptionType>().unwrap(), OptionType::Call);
        assert_eq!("Put".parse::<OptionType>().unwrap(), OptionType::Put);
        assert_eq!(" C ".parse::<OptionType>().unwrap(), OptionType::Call);
        assert!(matches!(
            "straddle".parse::<OptionType>(),
            Err(PricingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_accrual_parsing() {
        assert_eq!("ACT365".parse::<Accrual>().unwrap(), Accrual::Act365);
        assert_eq!("act252".parse::<Accrual>().unwrap(), Accrual::Act252);
        assert!("30/360".parse::<Accrual>().is_err());
        assert_eq!(Accrual::default().to_string(), "act365");
    }

    #[test]
    fn test_act365_year_fraction() {
        let t = time_to_expiry(45000.0, 45365.0, Accrual::Act365);
        assert!((t - 1.0).abs() < 1e-15);
        assert!(time_to_expiry(45010.0, 45000.0, Accrual::Act365) < 0.0);
    }

    #[test]
    fn test_weekday_anchor() {
        // serial 2 = Monday 1900-01-01, serial 45292 = Monday 2024-01-01
        assert_eq!(weekday(2), 0);
        assert_eq!(weekday(45292), 0);
        assert_eq!(weekday(45298), 6);
    }

    #[test]
    fn test_act252_counts_weekdays() {
        // Monday 2024-01-01 to Monday 2024-01-08: five weekdays
        let t = time_to_expiry(45292.0, 45299.0, Accrual::Act252);
        assert!((t - 5.0 / 252.0).abs() < 1e-15);
        let back = time_to_expiry(45299.0, 45292.0, Accrual::Act252);
        assert!((back + 5.0 / 252.0).abs() < 1e-15);
    }

    #[test]
    fn test_next_weekday_skips_weekend() {
        // Friday 2024-01-05 -> Monday 2024-01-08
        assert_eq!(next_weekday(45296.0), 45299.0);
        // Monday -> Tuesday
        assert_eq!(next_weekday(45292.0), 45293.0);
    }
}
