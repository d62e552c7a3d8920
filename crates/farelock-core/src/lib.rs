#![deny(missing_docs)]
//! # farelock-core — Foundational Types for Farelock
//!
//! The leaf of the workspace dependency graph. Every other `farelock-*`
//! crate builds on the primitives defined here; this crate depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtypes for identifiers.** `AccountId` and `RideId` are distinct
//!    types. A ride id of `0` is unrepresentable; an account id is validated
//!    at construction.
//!
//! 2. **Integer money.** `Amount` counts indivisible base units. There is no
//!    floating point anywhere on a value path.
//!
//! 3. **UTC-only timestamps, injected clocks.** `Timestamp` is UTC with
//!    seconds precision. The core never reads wall time on its own; callers
//!    pass a [`Clock`].
//!
//! 4. **`CanonicalBytes` for every digest.** Event digests are computed only
//!    over JCS canonical bytes, which reject floats.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod location;
pub mod temporal;

pub use amount::Amount;
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{AccountId, RideId};
pub use location::Location;
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
