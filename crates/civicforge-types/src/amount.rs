//! CC amounts with exact decimal precision
//!
//! CivicForge balances are Civic Credits (CC). Amounts use
//! `rust_decimal::Decimal` so fractional admin fees and escrow remainders
//! survive snapshot/restore and checkpoint round-trips bit-exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A CC amount
///
/// Serializes as a decimal string (`"25.5"`), which keeps canonical
/// encodings and ledger hashes stable across platforms.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cc(pub Decimal);

impl Cc {
    /// Create an amount from whole CC
    pub fn new(value: i64) -> Self {
        Self(Decimal::from(value))
    }

    /// Create an amount from a raw decimal
    pub fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    /// The zero amount
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Multiply by a decimal rate (admin percentages, escalation multipliers)
    pub fn checked_mul_rate(self, rate: Decimal) -> Option<Self> {
        self.0.checked_mul(rate).map(Self)
    }

    /// Round up to the next whole CC
    pub fn ceil(self) -> Self {
        Self(self.0.ceil())
    }

    /// Absolute value
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Negate
    pub fn negate(self) -> Self {
        Self(-self.0)
    }

    /// The smaller of two amounts
    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// The larger of two amounts
    pub fn max(self, other: Self) -> Self {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Cc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} CC", self.0)
    }
}

impl From<i64> for Cc {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<Decimal> for Cc {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}
