//! # farelock-state — Ride Lifecycle, Driver Registry, Rating Ledger
//!
//! The domain state of Farelock, free of locking, value transfer and I/O.
//! The engine crate composes these pieces into atomic commands.
//!
//! - **Ride** (`ride.rs`): the 8-state ride machine. Each transition checks
//!   state, then caller identity, then applies its effect.
//! - **Refund** (`refund.rs`): timeout windows for the two rider-initiated
//!   refund paths, evaluated lazily against a supplied "now".
//! - **Driver** (`driver.rs`): registration, verification and rating totals.
//! - **Rating** (`rating.rs`): per-ride write-once ratings in both directions.

pub mod driver;
pub mod rating;
pub mod refund;
pub mod ride;

// ─── Ride re-exports ────────────────────────────────────────────────

pub use ride::{Party, Ride, RideError, RideState, RideTransitionRecord, TransitionRule, TRANSITIONS};

// ─── Refund re-exports ──────────────────────────────────────────────

pub use refund::{
    RefundKind, RefundWindow, RideTimeouts, DEFAULT_ACCEPT_TIMEOUT, DEFAULT_START_TIMEOUT,
};

// ─── Driver re-exports ──────────────────────────────────────────────

pub use driver::{scaled_average, DriverRatingSummary, DriverRecord, DriverRegistry, RegistryError};

// ─── Rating re-exports ──────────────────────────────────────────────

pub use rating::{
    Rating, RatingDirection, RatingError, RatingLedger, RatingRecord, RideRatingSnapshot,
    MAX_RATING, MIN_RATING,
};
