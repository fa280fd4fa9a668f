use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error as ThisError;

/// Cents per whole currency unit.
pub const MONEY_SCALE: i64 = 100;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount is not a finite number")]
    NotFinite,
    #[error("amount out of representable range")]
    OutOfRange,
}

/// Two-decimal fixed-point currency amount.
///
/// Stored as a signed cent count so repeated wager/settlement arithmetic
/// cannot drift by sub-cent amounts. Conversion from a wire float rounds
/// to the nearest cent, halves toward positive infinity; on the wire the
/// value travels as a plain number of whole currency units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Create from a raw cent count.
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Raw cent count.
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Convert a wire float to cents, rejecting non-finite input.
    /// Halves round toward positive infinity.
    pub fn try_from_f64(value: f64) -> Result<Self, MoneyError> {
        if !value.is_finite() {
            return Err(MoneyError::NotFinite);
        }
        let cents = (value * MONEY_SCALE as f64 + 0.5).floor();
        if cents < i64::MIN as f64 || cents > i64::MAX as f64 {
            return Err(MoneyError::OutOfRange);
        }
        Ok(Money(cents as i64))
    }

    /// Whole currency units, for the wire.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / MONEY_SCALE as f64
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl std::ops::Add for Money {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl std::ops::Sub for Money {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl std::ops::Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(self.0.saturating_neg())
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let unit = MONEY_SCALE as u64;
        write!(f, "{}{}.{:02}", sign, abs / unit, abs % unit)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Money::try_from_f64(value).map_err(serde::de::Error::custom)
    }
}
