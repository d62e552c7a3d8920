//! # Identifier Newtypes
//!
//! `AccountId` names a party (rider, driver, or the escrow custodian);
//! `RideId` names a ride record. Keeping them as distinct types means a ride
//! id can never be passed where an account is expected, and the "no driver
//! yet" case is an `Option<AccountId>` rather than a sentinel account.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MAX_ACCOUNT_ID_LEN: usize = 128;

/// Opaque account identifier supplied by the identity collaborator.
///
/// The core trusts the identity completely; validation only rejects values
/// that cannot be a meaningful identifier (empty, whitespace, oversized).
/// Comparison is exact, with no case folding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Construct a validated account identifier.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.is_empty()
            || raw.len() > MAX_ACCOUNT_ID_LEN
            || raw.chars().any(char::is_whitespace)
        {
            return Err(ValidationError::InvalidAccountId(raw));
        }
        Ok(Self(raw))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

/// Ride identifier. Positive, assigned monotonically from 1, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RideId(u64);

impl RideId {
    /// The first id the engine hands out.
    pub const FIRST: RideId = RideId(1);

    /// Construct a ride id, rejecting zero.
    pub fn new(raw: u64) -> Result<Self, ValidationError> {
        if raw == 0 {
            return Err(ValidationError::InvalidRideId(raw));
        }
        Ok(Self(raw))
    }

    /// The raw integer value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ride:{}", self.0)
    }
}

impl TryFrom<u64> for RideId {
    type Error = ValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RideId> for u64 {
    fn from(id: RideId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_accepts_address_like_values() {
        let id = AccountId::new("0x71C7656EC7ab88b098defB751B7401B5f6d8976F").unwrap();
        assert_eq!(id.as_str(), "0x71C7656EC7ab88b098defB751B7401B5f6d8976F");
    }

    #[test]
    fn account_id_rejects_empty_and_whitespace() {
        assert!(AccountId::new("").is_err());
        assert!(AccountId::new("alice bob").is_err());
        assert!(AccountId::new(" alice").is_err());
        assert!(AccountId::new("a".repeat(129)).is_err());
    }

    #[test]
    fn account_id_comparison_is_exact() {
        let lower = AccountId::new("0xabc").unwrap();
        let upper = AccountId::new("0xABC").unwrap();
        assert_ne!(lower, upper);
    }

    #[test]
    fn account_id_serde_validates() {
        let ok: AccountId = serde_json::from_str("\"rider-1\"").unwrap();
        assert_eq!(ok.as_str(), "rider-1");
        assert!(serde_json::from_str::<AccountId>("\"\"").is_err());
    }

    #[test]
    fn ride_id_rejects_zero() {
        assert_eq!(RideId::new(0), Err(ValidationError::InvalidRideId(0)));
        assert_eq!(RideId::new(7).unwrap().get(), 7);
        assert!(serde_json::from_str::<RideId>("0").is_err());
    }

    #[test]
    fn ride_id_display() {
        assert_eq!(RideId::new(42).unwrap().to_string(), "ride:42");
    }
}
