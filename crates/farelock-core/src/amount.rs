//! # Fare Amounts
//!
//! `Amount` counts indivisible base units (think wei, or cents). Fares are
//! fixed at request time and compared with integer arithmetic only.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A non-negative quantity of value in base units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Zero value.
    pub const ZERO: Amount = Amount(0);

    /// Construct from base units.
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// Base units.
    pub const fn units(&self) -> u64 {
        self.0
    }

    /// Whether no value is present.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Result<Amount, ValidationError> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or_else(|| ValidationError::AmountOverflow(format!("{self} + {other}")))
    }

    /// Checked subtraction; fails when `other > self`.
    pub fn checked_sub(self, other: Amount) -> Result<Amount, ValidationError> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or_else(|| ValidationError::AmountOverflow(format!("{self} - {other}")))
    }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Self(units)
    }
}
