//! # API Route Modules
//!
//! - `rides` — lifecycle commands, refunds, ratings, per-ride reads.
//! - `drivers` — registration, verification, driver reads.
//! - `accounts` — ride indices, ledger balances, development faucet.
//! - `escrow` — vault totals.

pub mod accounts;
pub mod drivers;
pub mod escrow;
pub mod rides;
