//! # Error Types
//!
//! Leaf-level errors shared across the workspace. State machine, registry,
//! rating and transfer errors live next to the code that raises them; the
//! errors here cover construction of primitive values and canonicalization.

use thiserror::Error;

/// A primitive value failed validation at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Account identifiers must be non-empty, at most 128 characters, and
    /// contain no whitespace.
    #[error("invalid account id {0:?}: must be 1-128 non-whitespace characters")]
    InvalidAccountId(String),

    /// Ride identifiers start at 1.
    #[error("invalid ride id {0}: ride ids start at 1")]
    InvalidRideId(u64),

    /// Timestamp could not be parsed or is out of range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Arithmetic on amounts overflowed.
    #[error("amount overflow: {0}")]
    AmountOverflow(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts and coordinates must be integers.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
