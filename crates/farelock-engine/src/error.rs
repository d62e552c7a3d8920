//! # Engine Errors
//!
//! [`EngineError`] wraps the domain errors of every component the engine
//! composes. [`ErrorKind`] collapses them into the flat taxonomy callers
//! and transports map onto user-facing messages or status codes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use farelock_core::RideId;
use farelock_escrow::EscrowError;
use farelock_state::{RatingError, RegistryError, RideError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Ride(#[from] RideError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Rating(#[from] RatingError),

    #[error("escrow transfer aborted: {0}")]
    Escrow(#[from] EscrowError),

    #[error("{0} does not exist")]
    RideNotFound(RideId),

    #[error("ride id space exhausted")]
    RideIdsExhausted,
}

/// Error taxonomy of the ride engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidState,
    NotAuthorized,
    NotFound,
    AlreadyRegistered,
    NotRegistered,
    InsufficientValue,
    InvalidRating,
    AlreadyRated,
    TimeoutNotReached,
    TransferFailed,
    /// A broken engine invariant. Never caused by caller input.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidState => "INVALID_STATE",
            Self::NotAuthorized => "NOT_AUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyRegistered => "ALREADY_REGISTERED",
            Self::NotRegistered => "NOT_REGISTERED",
            Self::InsufficientValue => "INSUFFICIENT_VALUE",
            Self::InvalidRating => "INVALID_RATING",
            Self::AlreadyRated => "ALREADY_RATED",
            Self::TimeoutNotReached => "TIMEOUT_NOT_REACHED",
            Self::TransferFailed => "TRANSFER_FAILED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Ride(e) => match e {
                RideError::InvalidState { .. } => ErrorKind::InvalidState,
                RideError::NotRider { .. }
                | RideError::NotDriver { .. }
                | RideError::NotParticipant { .. } => ErrorKind::NotAuthorized,
                RideError::InsufficientValue { .. } => ErrorKind::InsufficientValue,
                RideError::TimeoutNotReached { .. } => ErrorKind::TimeoutNotReached,
                RideError::DriverUnset(_) => ErrorKind::Internal,
            },
            Self::Registry(e) => match e {
                RegistryError::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
                RegistryError::NotRegistered(_) => ErrorKind::NotRegistered,
            },
            Self::Rating(e) => match e {
                RatingError::InvalidRating(_) => ErrorKind::InvalidRating,
                RatingError::AlreadyRated { .. } => ErrorKind::AlreadyRated,
            },
            Self::Escrow(EscrowError::Transfer(_)) => ErrorKind::TransferFailed,
            Self::Escrow(_) => ErrorKind::Internal,
            Self::RideNotFound(_) => ErrorKind::NotFound,
            Self::RideIdsExhausted => ErrorKind::Internal,
        }
    }
}
