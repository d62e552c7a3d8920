//! # Driver Registry
//!
//! Tracks which accounts are registered drivers, whether each has been
//! verified, and the running rating totals fed by finalized rides.
//!
//! ## Invariants
//!
//! - Registration is permanent; there is no de-registration.
//! - Verification requires registration and is never revoked, so
//!   `is_verified ⇒ is_registered` holds by construction.
//! - The driver list is append-only; its order is registration order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use farelock_core::{AccountId, RideId, Timestamp};

use crate::rating::Rating;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{0} is already a registered driver")]
    AlreadyRegistered(AccountId),

    #[error("{0} is not a registered driver")]
    NotRegistered(AccountId),
}

/// A registered driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRecord {
    pub account: AccountId,
    pub name: String,
    pub is_verified: bool,
    pub total_rating_sum: u64,
    pub rating_count: u64,
    /// Rides this driver accepted, in acceptance order.
    pub ride_ids: Vec<RideId>,
    pub registered_at: Timestamp,
    pub verified_at: Option<Timestamp>,
}

impl DriverRecord {
    /// Average score ×10, rounded half up (45 means 4.5). Zero when unrated.
    pub fn average_scaled_by_10(&self) -> u64 {
        scaled_average(self.total_rating_sum, self.rating_count)
    }

    pub fn rating_summary(&self) -> DriverRatingSummary {
        DriverRatingSummary {
            is_registered: true,
            average_scaled_by_10: self.average_scaled_by_10(),
            rating_count: self.rating_count,
        }
    }
}

/// `round(10 * sum / count)` in integer arithmetic.
pub fn scaled_average(sum: u64, count: u64) -> u64 {
    if count == 0 {
        return 0;
    }
    let numerator = u128::from(sum) * 20 + u128::from(count);
    let denominator = u128::from(count) * 2;
    u64::try_from(numerator / denominator).unwrap_or(u64::MAX)
}

/// Reputation read model for any account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRatingSummary {
    pub is_registered: bool,
    pub average_scaled_by_10: u64,
    pub rating_count: u64,
}

/// Registered drivers keyed by account, plus the registration-ordered list.
#[derive(Debug, Clone, Default)]
pub struct DriverRegistry {
    records: HashMap<AccountId, DriverRecord>,
    order: Vec<AccountId>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `account` under `name`.
    pub fn register(
        &mut self,
        account: AccountId,
        name: String,
        now: Timestamp,
    ) -> Result<&DriverRecord, RegistryError> {
        if self.records.contains_key(&account) {
            return Err(RegistryError::AlreadyRegistered(account));
        }
        self.order.push(account.clone());
        let record = self.records.entry(account.clone()).or_insert(DriverRecord {
            account,
            name,
            is_verified: false,
            total_rating_sum: 0,
            rating_count: 0,
            ride_ids: Vec::new(),
            registered_at: now,
            verified_at: None,
        });
        Ok(&*record)
    }

    /// Persist a successful identity verification. Returns `true` if the
    /// flag flipped, `false` if the driver was already verified.
    pub fn verify(&mut self, account: &AccountId, now: Timestamp) -> Result<bool, RegistryError> {
        let record = self.record_mut(account)?;
        if record.is_verified {
            return Ok(false);
        }
        record.is_verified = true;
        record.verified_at = Some(now);
        Ok(true)
    }

    /// Add one rider→driver score to the driver's totals.
    pub fn record_rating(&mut self, account: &AccountId, rating: Rating) -> Result<(), RegistryError> {
        let record = self.record_mut(account)?;
        record.total_rating_sum = record.total_rating_sum.saturating_add(u64::from(rating.value()));
        record.rating_count = record.rating_count.saturating_add(1);
        Ok(())
    }

    /// Append an accepted ride to the driver's history.
    pub fn record_ride(&mut self, account: &AccountId, ride_id: RideId) -> Result<(), RegistryError> {
        self.record_mut(account)?.ride_ids.push(ride_id);
        Ok(())
    }

    pub fn is_registered(&self, account: &AccountId) -> bool {
        self.records.contains_key(account)
    }

    pub fn get(&self, account: &AccountId) -> Option<&DriverRecord> {
        self.records.get(account)
    }

    /// `(is_registered, average ×10, count)` for any account; all zero for
    /// accounts that never registered.
    pub fn rating(&self, account: &AccountId) -> DriverRatingSummary {
        self.records
            .get(account)
            .map(DriverRecord::rating_summary)
            .unwrap_or_default()
    }

    /// Registered drivers in registration order.
    pub fn list(&self) -> impl Iterator<Item = &DriverRecord> + '_ {
        self.order.iter().filter_map(|account| self.records.get(account))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn record_mut(&mut self, account: &AccountId) -> Result<&mut DriverRecord, RegistryError> {
        self.records
            .get_mut(account)
            .ok_or_else(|| RegistryError::NotRegistered(account.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::parse("2026-06-01T12:00:00Z").unwrap()
    }

    #[test]
    fn test_register_once() {
        let mut reg = DriverRegistry::new();
        reg.register(acct("dana"), "Dana".into(), now()).unwrap();
        assert_eq!(
            reg.register(acct("dana"), "Dana again".into(), now()).unwrap_err(),
            RegistryError::AlreadyRegistered(acct("dana"))
        );
        assert_eq!(reg.get(&acct("dana")).unwrap().name, "Dana");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let mut reg = DriverRegistry::new();
        for name in ["zoe", "adam", "mia"] {
            reg.register(acct(name), name.to_uppercase(), now()).unwrap();
        }
        let order: Vec<_> = reg.list().map(|d| d.account.as_str().to_string()).collect();
        assert_eq!(order, vec!["zoe", "adam", "mia"]);
    }

    #[test]
    fn test_verify_requires_registration() {
        let mut reg = DriverRegistry::new();
        assert_eq!(
            reg.verify(&acct("ghost"), now()).unwrap_err(),
            RegistryError::NotRegistered(acct("ghost"))
        );
        reg.register(acct("dana"), "Dana".into(), now()).unwrap();
        assert!(reg.verify(&acct("dana"), now()).unwrap());
        assert!(!reg.verify(&acct("dana"), now()).unwrap());
        let rec = reg.get(&acct("dana")).unwrap();
        assert!(rec.is_verified);
        assert_eq!(rec.verified_at, Some(now()));
    }

    #[test]
    fn test_rating_average_rounds_half_up() {
        assert_eq!(scaled_average(0, 0), 0);
        assert_eq!(scaled_average(9, 2), 45);
        assert_eq!(scaled_average(13, 3), 43); // 43.33
        assert_eq!(scaled_average(14, 3), 47); // 46.67
        assert_eq!(scaled_average(1, 4), 3); // 2.5
    }

    #[test]
    fn test_record_rating_accumulates() {
        let mut reg = DriverRegistry::new();
        reg.register(acct("dana"), "Dana".into(), now()).unwrap();
        reg.record_rating(&acct("dana"), Rating::new(4).unwrap()).unwrap();
        reg.record_rating(&acct("dana"), Rating::new(5).unwrap()).unwrap();
        assert_eq!(
            reg.rating(&acct("dana")),
            DriverRatingSummary {
                is_registered: true,
                average_scaled_by_10: 45,
                rating_count: 2,
            }
        );
    }

    #[test]
    fn test_unknown_account_rating_is_empty() {
        let reg = DriverRegistry::new();
        assert_eq!(reg.rating(&acct("nobody")), DriverRatingSummary::default());
    }
}
