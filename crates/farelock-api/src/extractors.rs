//! # Custom Extractors & Validation
//!
//! JSON body extraction with structured errors, the [`Validate`] trait for
//! request DTOs, and path-parameter parsing into domain identifiers.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use farelock_core::{AccountId, RideId};

use crate::error::AppError;

/// Request types with business rules beyond what serde checks.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to
/// [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and run its [`Validate`] rules.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Ride id from a path segment. Id 0 never exists.
pub fn ride_id(raw: u64) -> Result<RideId, AppError> {
    RideId::new(raw).map_err(|_| AppError::NotFound(format!("ride:{raw} does not exist")))
}

/// Account id from a path segment.
pub fn account_id(raw: &str) -> Result<AccountId, AppError> {
    AccountId::new(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}
