//! Fixed-point money amounts.
//!
//! Stack, pot and blind values are stored as signed hundredths so that
//! win/loss arithmetic and tolerance checks are exact. In config and JSON
//! they appear as plain decimal numbers (`1.5`). Arithmetic saturates at
//! the `i64` bounds instead of overflowing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

/// A money amount in hundredths of the table currency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Chips(i64);

impl Chips {
    pub const ZERO: Chips = Chips(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Scales by a float factor, rounding to the nearest hundredth.
    pub fn scale(self, factor: f64) -> Self {
        Self((self.0 as f64 * factor).round() as i64)
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl TryFrom<f64> for Chips {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(format!("amount must be finite, got {}", value));
        }
        let cents = (value * 100.0).round();
        if cents.abs() > i64::MAX as f64 {
            return Err(format!("amount out of range: {}", value));
        }
        Ok(Self(cents as i64))
    }
}

impl From<Chips> for f64 {
    fn from(chips: Chips) -> f64 {
        chips.as_f64()
    }
}

impl fmt::Display for Chips {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Chips {
    type Output = Chips;

    fn add(self, rhs: Chips) -> Chips {
        Chips(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Chips {
    fn add_assign(&mut self, rhs: Chips) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Chips {
    type Output = Chips;

    fn sub(self, rhs: Chips) -> Chips {
        Chips(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Chips {
    type Output = Chips;

    fn neg(self) -> Chips {
        Chips(self.0.saturating_neg())
    }
}

impl Sum for Chips {
    fn sum<I: Iterator<Item = Chips>>(iter: I) -> Chips {
        iter.fold(Chips::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Chips> for Chips {
    fn sum<I: Iterator<Item = &'a Chips>>(iter: I) -> Chips {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Chips::from_cents(150).to_string(), "1.50");
        assert_eq!(Chips::from_cents(-405).to_string(), "-4.05");
        assert_eq!(Chips::from_cents(7).to_string(), "0.07");
        assert_eq!(Chips::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_from_float_rounds_to_cents() {
        assert_eq!(Chips::try_from(1.5).unwrap(), Chips::from_cents(150));
        assert_eq!(Chips::try_from(0.1 + 0.2).unwrap(), Chips::from_cents(30));
        assert!(Chips::try_from(f64::NAN).is_err());
    }

    #[test]
    fn test_serde_as_decimal_number() {
        let json = serde_json::to_string(&Chips::from_cents(450)).unwrap();
        assert_eq!(json, "4.5");
        let back: Chips = serde_json::from_str("104").unwrap();
        assert_eq!(back, Chips::from_cents(10400));
    }

    #[test]
    fn test_sum_and_scale() {
        let total: Chips = [Chips::from_cents(400), Chips::from_cents(-400)].iter().sum();
        assert_eq!(total, Chips::ZERO);
        assert_eq!(Chips::from_cents(150).scale(1.6), Chips::from_cents(240));
    }

    #[test]
    fn test_arithmetic_saturates() {
        let huge = Chips::from_cents(i64::MAX - 10);
        let total: Chips = [huge, huge, Chips::from_cents(5)].iter().sum();
        assert_eq!(total, Chips::from_cents(i64::MAX));
        assert_eq!(Chips::from_cents(i64::MIN) - huge, Chips::from_cents(i64::MIN));
        assert_eq!(Chips::from_cents(i64::MIN).abs(), Chips::from_cents(i64::MAX));
        assert_eq!(-Chips::from_cents(i64::MIN), Chips::from_cents(i64::MAX));

        let mut running = huge;
        running += huge;
        assert_eq!(running, Chips::from_cents(i64::MAX));
    }
}
