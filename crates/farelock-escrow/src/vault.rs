//! # Escrow Vault
//!
//! Per-ride escrow holdings on top of a [`ValueTransfer`] backend.
//!
//! ## Status machine
//!
//! ```text
//! (none) ──deposit──▶ Held ──release──▶ Released (terminal)
//!                      │
//!                      └──refund───▶ Refunded (terminal)
//! ```
//!
//! Every operation checks the holding's status, then moves value, then
//! records the outcome. A failed transfer leaves the holding exactly as it
//! was. A ride can be paid out at most once.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use farelock_core::{AccountId, Amount, RideId, Timestamp};

use crate::transfer::{TransferError, ValueTransfer};

// ─── Status ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowStatus {
    /// Fare is in custody.
    Held,
    /// Paid out to the driver (terminal).
    Released,
    /// Returned to the rider (terminal).
    Refunded,
}

impl EscrowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Refunded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Held => "HELD",
            Self::Released => "RELEASED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("{0} already has an escrow holding")]
    AlreadyHeld(RideId),

    #[error("{0} has no escrow holding")]
    NoHolding(RideId),

    #[error("escrow for {ride_id} is {status}, cannot {operation}")]
    InvalidOperation {
        ride_id: RideId,
        operation: &'static str,
        status: EscrowStatus,
    },

    #[error("value transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

// ─── Holding ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowTransactionType {
    Deposit,
    Release,
    Refund,
}

/// One value movement against a holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTransaction {
    pub transaction_type: EscrowTransactionType,
    /// Payer for deposits, payee otherwise.
    pub counterparty: AccountId,
    pub amount: Amount,
    pub at: Timestamp,
}

/// Escrow state of a single ride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowHolding {
    pub ride_id: RideId,
    pub amount: Amount,
    pub status: EscrowStatus,
    pub transactions: Vec<EscrowTransaction>,
}

/// Running totals across all holdings.
///
/// `deposited == released + refunded + held` at all times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTotals {
    pub held: Amount,
    pub deposited: Amount,
    pub released: Amount,
    pub refunded: Amount,
}

impl EscrowTotals {
    /// Whether every deposited unit is either still held or paid out.
    pub fn is_conserved(&self) -> bool {
        self.released
            .checked_add(self.refunded)
            .and_then(|out| out.checked_add(self.held))
            .map(|sum| sum == self.deposited)
            .unwrap_or(false)
    }
}

#[derive(Debug, Default)]
struct VaultInner {
    holdings: HashMap<RideId, EscrowHolding>,
    totals: EscrowTotals,
}

// ─── Vault ───────────────────────────────────────────────────────────

/// All escrow holdings, serialized behind one lock.
pub struct EscrowVault {
    transfer: Arc<dyn ValueTransfer>,
    inner: Mutex<VaultInner>,
}

impl std::fmt::Debug for EscrowVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowVault")
            .field("totals", &self.totals())
            .finish_non_exhaustive()
    }
}

impl EscrowVault {
    pub fn new(transfer: Arc<dyn ValueTransfer>) -> Self {
        Self {
            transfer,
            inner: Mutex::new(VaultInner::default()),
        }
    }

    /// Collect `amount` from `payer` and hold it for `ride_id`.
    pub fn deposit(
        &self,
        ride_id: RideId,
        payer: &AccountId,
        amount: Amount,
        at: Timestamp,
    ) -> Result<(), EscrowError> {
        let mut inner = self.inner.lock();
        if inner.holdings.contains_key(&ride_id) {
            return Err(EscrowError::AlreadyHeld(ride_id));
        }
        let held = inner.totals.held.checked_add(amount).map_err(|_| overflow(payer))?;
        let deposited = inner
            .totals
            .deposited
            .checked_add(amount)
            .map_err(|_| overflow(payer))?;

        self.transfer.collect(payer, amount).map_err(|e| {
            tracing::warn!(ride_id = %ride_id, payer = %payer, error = %e, "escrow deposit failed");
            e
        })?;

        inner.totals.held = held;
        inner.totals.deposited = deposited;
        inner.holdings.insert(
            ride_id,
            EscrowHolding {
                ride_id,
                amount,
                status: EscrowStatus::Held,
                transactions: vec![EscrowTransaction {
                    transaction_type: EscrowTransactionType::Deposit,
                    counterparty: payer.clone(),
                    amount,
                    at,
                }],
            },
        );
        Ok(())
    }

    /// Pay the held amount to `payee` (the driver).
    pub fn release(
        &self,
        ride_id: RideId,
        payee: &AccountId,
        at: Timestamp,
    ) -> Result<Amount, EscrowError> {
        self.pay_out(ride_id, payee, at, Payout::Release)
    }

    /// Return the held amount to `payee` (the rider).
    pub fn refund(
        &self,
        ride_id: RideId,
        payee: &AccountId,
        at: Timestamp,
    ) -> Result<Amount, EscrowError> {
        self.pay_out(ride_id, payee, at, Payout::Refund)
    }

    fn pay_out(
        &self,
        ride_id: RideId,
        payee: &AccountId,
        at: Timestamp,
        payout: Payout,
    ) -> Result<Amount, EscrowError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let holding = inner
            .holdings
            .get_mut(&ride_id)
            .ok_or(EscrowError::NoHolding(ride_id))?;
        if holding.status != EscrowStatus::Held {
            return Err(EscrowError::InvalidOperation {
                ride_id,
                operation: payout.operation(),
                status: holding.status,
            });
        }
        let amount = holding.amount;
        let held = inner.totals.held.checked_sub(amount).map_err(|_| overflow(payee))?;
        let paid_total = match payout {
            Payout::Release => &mut inner.totals.released,
            Payout::Refund => &mut inner.totals.refunded,
        };
        let paid = paid_total.checked_add(amount).map_err(|_| overflow(payee))?;

        self.transfer.disburse(payee, amount).map_err(|e| {
            tracing::warn!(
                ride_id = %ride_id,
                payee = %payee,
                error = %e,
                "escrow {} failed",
                payout.operation()
            );
            e
        })?;

        *paid_total = paid;
        inner.totals.held = held;
        holding.status = payout.status();
        holding.transactions.push(EscrowTransaction {
            transaction_type: payout.transaction_type(),
            counterparty: payee.clone(),
            amount,
            at,
        });
        Ok(amount)
    }

    /// The holding for one ride, if it was ever funded.
    pub fn holding(&self, ride_id: RideId) -> Option<EscrowHolding> {
        self.inner.lock().holdings.get(&ride_id).cloned()
    }

    /// Amount currently held for `ride_id`; zero when none.
    pub fn held_for(&self, ride_id: RideId) -> Amount {
        self.inner
            .lock()
            .holdings
            .get(&ride_id)
            .filter(|h| h.status == EscrowStatus::Held)
            .map(|h| h.amount)
            .unwrap_or_default()
    }

    pub fn totals(&self) -> EscrowTotals {
        self.inner.lock().totals
    }
}

#[derive(Debug, Clone, Copy)]
enum Payout {
    Release,
    Refund,
}

impl Payout {
    fn operation(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Refund => "refund",
        }
    }

    fn status(self) -> EscrowStatus {
        match self {
            Self::Release => EscrowStatus::Released,
            Self::Refund => EscrowStatus::Refunded,
        }
    }

    fn transaction_type(self) -> EscrowTransactionType {
        match self {
            Self::Release => EscrowTransactionType::Release,
            Self::Refund => EscrowTransactionType::Refund,
        }
    }
}

fn overflow(account: &AccountId) -> EscrowError {
    EscrowError::Transfer(TransferError::Overflow(account.clone()))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::transfer::InMemoryLedger;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Deposit(u64, u64),
        Release(u64),
        Refund(u64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u64..8, 1u64..500).prop_map(|(r, a)| Op::Deposit(r, a)),
            (1u64..8).prop_map(Op::Release),
            (1u64..8).prop_map(Op::Refund),
        ]
    }

    proptest! {
        #[test]
        fn totals_conserved_under_any_sequence(ops in prop::collection::vec(op(), 0..40)) {
            let rider = AccountId::new("rider").unwrap();
            let driver = AccountId::new("driver").unwrap();
            let ledger = Arc::new(InMemoryLedger::new());
            ledger.credit(&rider, Amount::new(10_000)).unwrap();
            let vault = EscrowVault::new(ledger.clone());
            let now = Timestamp::parse("2026-07-01T08:00:00Z").unwrap();

            for op in ops {
                let _ = match op {
                    Op::Deposit(r, a) => vault.deposit(RideId::new(r).unwrap(), &rider, Amount::new(a), now),
                    Op::Release(r) => vault.release(RideId::new(r).unwrap(), &driver, now).map(|_| ()),
                    Op::Refund(r) => vault.refund(RideId::new(r).unwrap(), &rider, now).map(|_| ()),
                };
                let totals = vault.totals();
                prop_assert!(totals.is_conserved());
                prop_assert_eq!(ledger.custody(), totals.held);
            }

            let rider_total = ledger.balance(&rider).units() + ledger.balance(&driver).units()
                + ledger.custody().units();
            prop_assert_eq!(rider_total, 10_000);
        }
    }
}
