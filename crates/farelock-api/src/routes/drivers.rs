//! # Driver Registry Routes
//!
//! Registration and identity verification act on the caller's own account.
//! Reads are open to any caller.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use farelock_state::{DriverRatingSummary, DriverRecord};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{account_id, extract_validated_json, Validate};
use crate::state::AppState;

/// Register the caller as a driver.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterDriverRequest {
    /// Display name.
    pub name: String,
}

impl Validate for RegisterDriverRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DriverRatingResponse {
    pub is_registered: bool,
    /// Average score ×10, rounded half up (45 means 4.5).
    pub average_scaled_by_10: u64,
    pub rating_count: u64,
}

impl From<DriverRatingSummary> for DriverRatingResponse {
    fn from(summary: DriverRatingSummary) -> Self {
        Self {
            is_registered: summary.is_registered,
            average_scaled_by_10: summary.average_scaled_by_10,
            rating_count: summary.rating_count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DriverResponse {
    #[schema(value_type = Object)]
    pub driver: DriverRecord,
    pub rating: DriverRatingResponse,
}

impl From<DriverRecord> for DriverResponse {
    fn from(driver: DriverRecord) -> Self {
        let rating = driver.rating_summary().into();
        Self { driver, rating }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DriverListResponse {
    pub count: usize,
    #[schema(value_type = Vec<Object>)]
    pub drivers: Vec<DriverRecord>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/drivers", post(register_driver).get(list_drivers))
        .route("/v1/drivers/verify", post(verify_identity))
        .route("/v1/drivers/{account}", get(get_driver))
}

/// POST /v1/drivers — Register the caller as a driver.
#[utoipa::path(
    post,
    path = "/v1/drivers",
    request_body = RegisterDriverRequest,
    responses(
        (status = 201, description = "Driver registered", body = DriverResponse),
        (status = 409, description = "Already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Empty name", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
pub(crate) async fn register_driver(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<RegisterDriverRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DriverResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let record = state.engine.register_driver(&caller.account, req.name.trim())?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// POST /v1/drivers/verify — Record a successful identity verification for
/// the caller.
#[utoipa::path(
    post,
    path = "/v1/drivers/verify",
    responses(
        (status = 200, description = "Driver verified", body = DriverResponse),
        (status = 403, description = "Caller is not a registered driver", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
pub(crate) async fn verify_identity(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<DriverResponse>, AppError> {
    let record = state.engine.verify_identity(&caller.account)?;
    Ok(Json(record.into()))
}

/// GET /v1/drivers — Registered drivers in registration order.
#[utoipa::path(
    get,
    path = "/v1/drivers",
    responses((status = 200, description = "All drivers", body = DriverListResponse)),
    tag = "drivers"
)]
pub(crate) async fn list_drivers(State(state): State<AppState>) -> Json<DriverListResponse> {
    let drivers = state.engine.drivers();
    Json(DriverListResponse {
        count: drivers.len(),
        drivers,
    })
}

/// GET /v1/drivers/{account} — One driver with their rating summary.
#[utoipa::path(
    get,
    path = "/v1/drivers/{account}",
    params(("account" = String, Path, description = "Driver account")),
    responses(
        (status = 200, description = "Driver found", body = DriverResponse),
        (status = 404, description = "Not a registered driver", body = crate::error::ErrorBody),
    ),
    tag = "drivers"
)]
pub(crate) async fn get_driver(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> Result<Json<DriverResponse>, AppError> {
    let account = account_id(&account)?;
    state
        .engine
        .driver(&account)
        .map(|record| Json(record.into()))
        .ok_or_else(|| AppError::NotFound(format!("{account} is not a registered driver")))
}
