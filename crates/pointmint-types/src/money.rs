//! The monetary unit: `Points`.
//!
//! A point is the smallest indivisible unit of value in the system, so all
//! arithmetic is unsigned-integer arithmetic. `Points` wraps a `u128` and
//! exposes only **checked** operations — an overflow or underflow is a
//! typed error, never a wrap or a panic.
//!
//! Serialized form is a base-10 integer **string** so the value survives
//! any runtime boundary (JSON, SQL text columns) without precision loss.

use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{PointmintError, Result};

/// A non-negative amount of points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Points(u128);

impl Points {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u128 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the sum exceeds `u128::MAX`.
    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(PointmintError::AmountOverflow)
    }

    /// Checked subtraction.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if `rhs > self`; amounts are never negative.
    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(PointmintError::AmountOverflow)
    }

    /// Checked multiplication by a unit count.
    ///
    /// # Errors
    /// Returns `AmountOverflow` on overflow.
    pub fn checked_mul(self, count: u32) -> Result<Self> {
        self.0
            .checked_mul(u128::from(count))
            .map(Self)
            .ok_or(PointmintError::AmountOverflow)
    }

    /// The supplier fee skimmed from this amount: `amount × 3 / 100`,
    /// truncating integer division. Decomposed so the multiply cannot
    /// overflow even at `u128::MAX`.
    #[must_use]
    pub fn supplier_fee(self) -> Self {
        let pct = crate::constants::SUPPLIER_FEE_PERCENT;
        Self(self.0 / 100 * pct + self.0 % 100 * pct / 100)
    }

    /// Evenly divide by a unit count, truncating. Used to spread a batch
    /// fee across the minted units.
    #[must_use]
    pub fn per_unit(self, count: u32) -> Self {
        if count == 0 {
            return Self::ZERO;
        }
        Self(self.0 / u128::from(count))
    }
}

impl From<u64> for Points {
    fn from(raw: u64) -> Self {
        Self(u128::from(raw))
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Points {
    type Err = PointmintError;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<u128>()
            .map(Self)
            .map_err(|_| PointmintError::InvalidAmount {
                reason: format!("not a base-10 integer: {s:?}"),
            })
    }
}

impl Sum for Points {
    /// Saturating sum for aggregate queries; per-operation arithmetic goes
    /// through the checked methods.
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.fold(0u128, |acc, p| acc.saturating_add(p.0)))
    }
}

// Base-10 string on the wire, matching the persisted schema.

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
