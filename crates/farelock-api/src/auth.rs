//! # Authentication & Caller Identity
//!
//! Two separate concerns:
//!
//! - **Bearer auth** ([`auth_middleware`]): when `AUTH_TOKEN` is configured
//!   every `/v1` request must carry `Authorization: Bearer <token>`. It
//!   guards the service, not individual accounts.
//! - **Caller identity** ([`CallerIdentity`]): the account issuing a
//!   command, taken from the `X-Account-Id` header set by the upstream
//!   identity provider. The engine trusts it completely and performs every
//!   rider/driver check against it.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use farelock_core::AccountId;

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// Header carrying the caller's account.
pub const ACCOUNT_HEADER: &str = "x-account-id";

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// The account issuing the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account: AccountId,
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACCOUNT_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {ACCOUNT_HEADER} header")))?;
        let raw = raw
            .to_str()
            .map_err(|_| AppError::BadRequest(format!("{ACCOUNT_HEADER} must be ASCII")))?;
        let account = AccountId::new(raw.trim()).map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(Self { account })
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Constant-time comparison of bearer tokens.
///
/// On a length mismatch a dummy comparison keeps timing independent of the
/// provided length.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Reject requests without the configured bearer token. Passes everything
/// through when no token is configured.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());

    let Some(expected) = expected else {
        return next.run(request).await;
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(provided) if constant_time_token_eq(provided, &expected) => next.run(request).await,
            Some(_) => {
                tracing::warn!("authentication failed: invalid bearer token");
                unauthorized_response("invalid bearer token")
            }
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                unauthorized_response("authorization header must use Bearer scheme")
            }
        },
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            unauthorized_response("missing authorization header")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
