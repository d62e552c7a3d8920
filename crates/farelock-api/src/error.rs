//! # API Error Types
//!
//! [`AppError`] implements `IntoResponse`, rendering every failure as
//! `{"error": {"code", "message", "details"?}}`. Engine errors keep their
//! taxonomy code (`INVALID_STATE`, `ALREADY_RATED`, ...) and map to an HTTP
//! status by kind. Internal errors are logged and masked.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use farelock_engine::{EngineError, ErrorKind};
use farelock_escrow::TransferError;
use farelock_state::RideError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "INVALID_STATE", "BAD_REQUEST").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Diagnostic fields for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A command or read rejected by the engine.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing caller identity (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error (500). Logged, never returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

fn engine_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidState
        | ErrorKind::AlreadyRegistered
        | ErrorKind::AlreadyRated
        | ErrorKind::TimeoutNotReached => StatusCode::CONFLICT,
        ErrorKind::NotAuthorized | ErrorKind::NotRegistered => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InsufficientValue | ErrorKind::InvalidRating => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::TransferFailed => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    /// HTTP status and machine-readable code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Engine(e) => {
                let kind = e.kind();
                (engine_status(kind), kind.as_str())
            }
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn is_internal(&self) -> bool {
        match self {
            Self::Internal(_) => true,
            Self::Engine(e) => e.kind() == ErrorKind::Internal,
            _ => false,
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        let Self::Engine(EngineError::Ride(e)) = self else {
            return None;
        };
        match e {
            RideError::InvalidState {
                current, expected, ..
            } => Some(json!({ "current": current, "expected": expected })),
            RideError::InsufficientValue { required, provided } => {
                Some(json!({ "required": required, "provided": provided }))
            }
            RideError::TimeoutNotReached {
                kind,
                now,
                eligible_at,
                ..
            } => Some(json!({ "kind": kind, "now": now, "eligible_at": eligible_at })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if self.is_internal() {
            tracing::error!(error = %self, "internal server error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<farelock_core::ValidationError> for AppError {
    fn from(err: farelock_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<TransferError> for AppError {
    fn from(err: TransferError) -> Self {
        Self::Validation(err.to_string())
    }
}
