//! # Value Transfer
//!
//! The seam between the ride engine and whatever actually holds money.
//! Both directions are synchronous: the engine needs a definite answer
//! before it commits a transition.
//!
//! [`InMemoryLedger`] is the reference implementation. It keeps per-account
//! balances plus a custody balance for value collected from payers and not
//! yet disbursed, and can be told to refuse payments to specific accounts
//! so the abort path is testable.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use farelock_core::{AccountId, Amount};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Payer does not hold enough value.
    #[error("{account} holds {available}, needs {required}")]
    InsufficientBalance {
        account: AccountId,
        available: Amount,
        required: Amount,
    },

    /// Recipient cannot accept funds.
    #[error("{0} refused the payment")]
    Rejected(AccountId),

    /// Custody holds less than the requested disbursement.
    #[error("custody holds {available}, cannot disburse {requested}")]
    CustodyShortfall { available: Amount, requested: Amount },

    #[error("balance overflow crediting {0}")]
    Overflow(AccountId),
}

/// Moves value into and out of custody.
pub trait ValueTransfer: Send + Sync {
    /// Take `amount` from `payer` into custody.
    fn collect(&self, payer: &AccountId, amount: Amount) -> Result<(), TransferError>;

    /// Pay `amount` out of custody to `payee`.
    fn disburse(&self, payee: &AccountId, amount: Amount) -> Result<(), TransferError>;
}

#[derive(Debug, Default)]
struct LedgerInner {
    balances: HashMap<AccountId, Amount>,
    custody: Amount,
    rejecting: HashSet<AccountId>,
}

/// Account balances held in memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    inner: Mutex<LedgerInner>,
}

/// Point-in-time view of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account: AccountId,
    pub balance: Amount,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint `amount` into `account`. Returns the new balance.
    pub fn credit(&self, account: &AccountId, amount: Amount) -> Result<Amount, TransferError> {
        let mut inner = self.inner.lock();
        let current = inner.balances.get(account).copied().unwrap_or_default();
        let updated = current
            .checked_add(amount)
            .map_err(|_| TransferError::Overflow(account.clone()))?;
        inner.balances.insert(account.clone(), updated);
        Ok(updated)
    }

    pub fn balance(&self, account: &AccountId) -> Amount {
        self.inner.lock().balances.get(account).copied().unwrap_or_default()
    }

    /// Value collected and not yet disbursed.
    pub fn custody(&self) -> Amount {
        self.inner.lock().custody
    }

    /// Make every future disbursement to `account` fail.
    pub fn reject_payments_to(&self, account: &AccountId) {
        self.inner.lock().rejecting.insert(account.clone());
    }

    /// Undo [`reject_payments_to`](Self::reject_payments_to).
    pub fn accept_payments_to(&self, account: &AccountId) {
        self.inner.lock().rejecting.remove(account);
    }
}

impl ValueTransfer for InMemoryLedger {
    fn collect(&self, payer: &AccountId, amount: Amount) -> Result<(), TransferError> {
        let mut inner = self.inner.lock();
        let available = inner.balances.get(payer).copied().unwrap_or_default();
        let remaining = available
            .checked_sub(amount)
            .map_err(|_| TransferError::InsufficientBalance {
                account: payer.clone(),
                available,
                required: amount,
            })?;
        let custody = inner
            .custody
            .checked_add(amount)
            .map_err(|_| TransferError::Overflow(payer.clone()))?;
        inner.balances.insert(payer.clone(), remaining);
        inner.custody = custody;
        Ok(())
    }

    fn disburse(&self, payee: &AccountId, amount: Amount) -> Result<(), TransferError> {
        let mut inner = self.inner.lock();
        if inner.rejecting.contains(payee) {
            return Err(TransferError::Rejected(payee.clone()));
        }
        let custody = inner
            .custody
            .checked_sub(amount)
            .map_err(|_| TransferError::CustodyShortfall {
                available: inner.custody,
                requested: amount,
            })?;
        let current = inner.balances.get(payee).copied().unwrap_or_default();
        let updated = current
            .checked_add(amount)
            .map_err(|_| TransferError::Overflow(payee.clone()))?;
        inner.custody = custody;
        inner.balances.insert(payee.clone(), updated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    #[test]
    fn collect_moves_into_custody() {
        let ledger = InMemoryLedger::new();
        ledger.credit(&acct("rider"), Amount::new(100)).unwrap();
        ledger.collect(&acct("rider"), Amount::new(60)).unwrap();
        assert_eq!(ledger.balance(&acct("rider")), Amount::new(40));
        assert_eq!(ledger.custody(), Amount::new(60));
    }

    #[test]
    fn collect_without_funds_changes_nothing() {
        let ledger = InMemoryLedger::new();
        ledger.credit(&acct("rider"), Amount::new(10)).unwrap();
        let err = ledger.collect(&acct("rider"), Amount::new(60)).unwrap_err();
        assert!(matches!(err, TransferError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance(&acct("rider")), Amount::new(10));
        assert_eq!(ledger.custody(), Amount::ZERO);
    }

    #[test]
    fn rejected_payee_leaves_custody_intact() {
        let ledger = InMemoryLedger::new();
        ledger.credit(&acct("rider"), Amount::new(50)).unwrap();
        ledger.collect(&acct("rider"), Amount::new(50)).unwrap();
        ledger.reject_payments_to(&acct("driver"));
        assert_eq!(
            ledger.disburse(&acct("driver"), Amount::new(50)).unwrap_err(),
            TransferError::Rejected(acct("driver"))
        );
        assert_eq!(ledger.custody(), Amount::new(50));

        ledger.accept_payments_to(&acct("driver"));
        ledger.disburse(&acct("driver"), Amount::new(50)).unwrap();
        assert_eq!(ledger.balance(&acct("driver")), Amount::new(50));
        assert_eq!(ledger.custody(), Amount::ZERO);
    }

    #[test]
    fn disburse_beyond_custody_fails() {
        let ledger = InMemoryLedger::new();
        assert!(matches!(
            ledger.disburse(&acct("driver"), Amount::new(1)),
            Err(TransferError::CustodyShortfall { .. })
        ));
    }
}
