//! # farelock-escrow — Value Transfer and Ride Escrow
//!
//! - **Transfer** (`transfer.rs`): the [`ValueTransfer`] seam and the
//!   in-memory reference ledger.
//! - **Vault** (`vault.rs`): per-ride escrow holdings. Deposit collects the
//!   fare into custody; release pays the driver; refund pays the rider.
//!   Each holding pays out at most once.
//!
//! ## Crate Policy
//!
//! - A failed transfer never changes recorded escrow state.
//! - Totals satisfy `deposited == released + refunded + held` after every
//!   operation.

pub mod transfer;
pub mod vault;

pub use transfer::{AccountBalance, InMemoryLedger, TransferError, ValueTransfer};
pub use vault::{
    EscrowError, EscrowHolding, EscrowStatus, EscrowTotals, EscrowTransaction,
    EscrowTransactionType, EscrowVault,
};
