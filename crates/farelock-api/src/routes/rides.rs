//! # Ride Routes
//!
//! Lifecycle commands, refund claims, ratings and per-ride reads. Every
//! command is issued as the account named by `X-Account-Id`; the engine
//! decides whether that account is the rider, the driver, or neither.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use farelock_core::{Amount, Location};
use farelock_engine::{EngineError, JournalEntry, RideEvent, RideReceipt, RideView};
use farelock_state::{RefundWindow, Ride, RideRatingSnapshot};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_json, ride_id};
use crate::state::AppState;

// ── DTOs ────────────────────────────────────────────────────────────────────

/// Request a new ride.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RequestRideRequest {
    /// Fare in base units, fixed for the life of the ride.
    pub amount: u64,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub pickup: Location,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub destination: Location,
}

/// Fund an accepted ride.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FundRideRequest {
    /// Value offered. Must cover the fare; any excess is not collected.
    pub amount: u64,
}

/// Submit a rating.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RateRequest {
    /// Score from 1 to 5.
    pub rating: u8,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RideResponse {
    #[schema(value_type = Object)]
    pub ride: Ride,
}

/// A committed command: the ride afterwards and the event it emitted.
#[derive(Debug, Serialize, ToSchema)]
pub struct RideCommandResponse {
    #[schema(value_type = Object)]
    pub ride: Ride,
    #[schema(value_type = Object)]
    pub event: RideEvent,
}

impl From<RideReceipt> for RideCommandResponse {
    fn from(receipt: RideReceipt) -> Self {
        Self {
            ride: receipt.ride,
            event: receipt.event,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefundStatusResponse {
    pub ride_id: u64,
    /// `{"status": "NOT_APPLICABLE" | "PENDING" | "ELIGIBLE", ...}`
    #[schema(value_type = Object)]
    pub refund: RefundWindow,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RideRatingResponse {
    pub ride_id: u64,
    pub rider_rated_driver: bool,
    pub driver_rated_rider: bool,
    /// Score the rider gave the driver; 0 when unrated.
    pub rider_rating: u8,
    /// Score the driver gave the rider; 0 when unrated.
    pub driver_rating: u8,
}

impl RideRatingResponse {
    fn new(ride_id: u64, snapshot: RideRatingSnapshot) -> Self {
        Self {
            ride_id,
            rider_rated_driver: snapshot.rider_rated_driver,
            driver_rated_rider: snapshot.driver_rated_rider,
            rider_rating: snapshot.rider_rating,
            driver_rating: snapshot.driver_rating,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RideViewResponse {
    #[schema(value_type = Object)]
    pub view: RideView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RideEventsResponse {
    pub ride_id: u64,
    #[schema(value_type = Vec<Object>)]
    pub events: Vec<JournalEntry>,
}

// ── Router ──────────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/rides", post(request_ride))
        .route("/v1/rides/{id}", get(get_ride))
        .route("/v1/rides/{id}/accept", post(accept_ride))
        .route("/v1/rides/{id}/fund", post(fund_ride))
        .route("/v1/rides/{id}/start", post(start_ride))
        .route("/v1/rides/{id}/complete", post(complete_ride))
        .route("/v1/rides/{id}/confirm", post(confirm_arrival))
        .route("/v1/rides/{id}/cancel", post(cancel_ride))
        .route("/v1/rides/{id}/refund", get(refund_status))
        .route("/v1/rides/{id}/refund/not-funded", post(claim_refund_not_funded))
        .route("/v1/rides/{id}/refund/not-started", post(claim_refund_not_started))
        .route("/v1/rides/{id}/rating", get(get_rating))
        .route("/v1/rides/{id}/rating/driver", post(rate_driver))
        .route("/v1/rides/{id}/rating/rider", post(rate_rider))
        .route("/v1/rides/{id}/view", get(view_ride))
        .route("/v1/rides/{id}/events", get(ride_events))
}

/// Count the command outcome and convert the receipt.
fn committed(
    op: &'static str,
    result: Result<RideReceipt, EngineError>,
) -> Result<Json<RideCommandResponse>, AppError> {
    let outcome = if result.is_ok() { "committed" } else { "rejected" };
    metrics::counter!("farelock_ride_commands_total", "op" => op, "outcome" => outcome).increment(1);
    Ok(Json(result?.into()))
}

// ── Commands ────────────────────────────────────────────────────────────────

/// POST /v1/rides — Request a ride as the caller.
#[utoipa::path(
    post,
    path = "/v1/rides",
    request_body = RequestRideRequest,
    responses(
        (status = 201, description = "Ride requested", body = RideCommandResponse),
        (status = 400, description = "Malformed body or caller", body = crate::error::ErrorBody),
    ),
    tag = "rides"
)]
pub(crate) async fn request_ride(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<RequestRideRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RideCommandResponse>), AppError> {
    let req = extract_json(body)?;
    let result = state.engine.request_ride(
        &caller.account,
        Amount::new(req.amount),
        req.pickup,
        req.destination,
    );
    Ok((StatusCode::CREATED, committed("request_ride", result)?))
}

/// POST /v1/rides/{id}/accept — Accept as a registered driver.
#[utoipa::path(
    post,
    path = "/v1/rides/{id}/accept",
    params(("id" = u64, Path, description = "Ride id")),
    responses(
        (status = 200, description = "Ride accepted", body = RideCommandResponse),
        (status = 403, description = "Caller is not a registered driver", body = crate::error::ErrorBody),
        (status = 409, description = "Ride is not REQUESTED", body = crate::error::ErrorBody),
    ),
    tag = "rides"
)]
pub(crate) async fn accept_ride(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    caller: CallerIdentity,
) -> Result<Json<RideCommandResponse>, AppError> {
    committed("accept_ride", state.engine.accept_ride(ride_id(id)?, &caller.account))
}

/// POST /v1/rides/{id}/fund — Escrow the fare as the rider.
#[utoipa::path(
    post,
    path = "/v1/rides/{id}/fund",
    params(("id" = u64, Path, description = "Ride id")),
    request_body = FundRideRequest,
    responses(
        (status = 200, description = "Fare escrowed", body = RideCommandResponse),
        (status = 402, description = "Value transfer failed", body = crate::error::ErrorBody),
        (status = 422, description = "Offered value below the fare", body = crate::error::ErrorBody),
    ),
    tag = "rides"
)]
pub(crate) async fn fund_ride(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    caller: CallerIdentity,
    body: Result<Json<FundRideRequest>, JsonRejection>,
) -> Result<Json<RideCommandResponse>, AppError> {
    let req = extract_json(body)?;
    committed(
        "fund_ride",
        state
            .engine
            .fund_ride(ride_id(id)?, &caller.account, Amount::new(req.amount)),
    )
}

/// POST /v1/rides/{id}/start — Start the trip as the driver.
#[utoipa::path(
    post,
    path = "/v1/rides/{id}/start",
    params(("id" = u64, Path, description = "Ride id")),
    responses((status = 200, description = "Ride started", body = RideCommandResponse)),
    tag = "rides"
)]
pub(crate) async fn start_ride(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    caller: CallerIdentity,
) -> Result<Json<RideCommandResponse>, AppError> {
    committed("start_ride", state.engine.start_ride(ride_id(id)?, &caller.account))
}

/// POST /v1/rides/{id}/complete — Report arrival as the driver.
#[utoipa::path(
    post,
    path = "/v1/rides/{id}/complete",
    params(("id" = u64, Path, description = "Ride id")),
    responses((status = 200, description = "Ride completed by driver", body = RideCommandResponse)),
    tag = "rides"
)]
pub(crate) async fn complete_ride(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    caller: CallerIdentity,
) -> Result<Json<RideCommandResponse>, AppError> {
    committed("complete_ride", state.engine.complete_ride(ride_id(id)?, &caller.account))
}

/// POST /v1/rides/{id}/confirm — Confirm arrival as the rider; pays the driver.
#[utoipa::path(
    post,
    path = "/v1/rides/{id}/confirm",
    params(("id" = u64, Path, description = "Ride id")),
    responses(
        (status = 200, description = "Ride finalized", body = RideCommandResponse),
        (status = 402, description = "Payout failed", body = crate::error::ErrorBody),
    ),
    tag = "rides"
)]
pub(crate) async fn confirm_arrival(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    caller: CallerIdentity,
) -> Result<Json<RideCommandResponse>, AppError> {
    committed("confirm_arrival", state.engine.confirm_arrival(ride_id(id)?, &caller.account))
}

/// POST /v1/rides/{id}/cancel — Cancel before the trip starts.
#[utoipa::path(
    post,
    path = "/v1/rides/{id}/cancel",
    params(("id" = u64, Path, description = "Ride id")),
    responses(
        (status = 200, description = "Ride cancelled", body = RideCommandResponse),
        (status = 409, description = "Ride already started or closed", body = crate::error::ErrorBody),
    ),
    tag = "rides"
)]
pub(crate) async fn cancel_ride(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    caller: CallerIdentity,
) -> Result<Json<RideCommandResponse>, AppError> {
    committed("cancel_ride", state.engine.cancel_ride(ride_id(id)?, &caller.account))
}

/// POST /v1/rides/{id}/refund/not-funded — Reclaim a ride the rider never funded.
#[utoipa::path(
    post,
    path = "/v1/rides/{id}/refund/not-funded",
    params(("id" = u64, Path, description = "Ride id")),
    responses(
        (status = 200, description = "Ride refunded", body = RideCommandResponse),
        (status = 409, description = "Timeout not reached or wrong state", body = crate::error::ErrorBody),
    ),
    tag = "rides"
)]
pub(crate) async fn claim_refund_not_funded(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    caller: CallerIdentity,
) -> Result<Json<RideCommandResponse>, AppError> {
    committed(
        "claim_refund_not_funded",
        state.engine.claim_refund_not_funded(ride_id(id)?, &caller.account),
    )
}

/// POST /v1/rides/{id}/refund/not-started — Recover an escrowed fare the driver never started.
#[utoipa::path(
    post,
    path = "/v1/rides/{id}/refund/not-started",
    params(("id" = u64, Path, description = "Ride id")),
    responses(
        (status = 200, description = "Ride refunded", body = RideCommandResponse),
        (status = 409, description = "Timeout not reached or wrong state", body = crate::error::ErrorBody),
    ),
    tag = "rides"
)]
pub(crate) async fn claim_refund_not_started(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    caller: CallerIdentity,
) -> Result<Json<RideCommandResponse>, AppError> {
    committed(
        "claim_refund_not_started",
        state.engine.claim_refund_not_started(ride_id(id)?, &caller.account),
    )
}

/// POST /v1/rides/{id}/rating/driver — Rider rates the driver.
#[utoipa::path(
    post,
    path = "/v1/rides/{id}/rating/driver",
    params(("id" = u64, Path, description = "Ride id")),
    request_body = RateRequest,
    responses(
        (status = 200, description = "Rating recorded", body = RideRatingResponse),
        (status = 409, description = "Already rated or ride not finalized", body = crate::error::ErrorBody),
        (status = 422, description = "Rating out of range", body = crate::error::ErrorBody),
    ),
    tag = "rides"
)]
pub(crate) async fn rate_driver(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    caller: CallerIdentity,
    body: Result<Json<RateRequest>, JsonRejection>,
) -> Result<Json<RideRatingResponse>, AppError> {
    let req = extract_json(body)?;
    let snapshot = state.engine.rate_driver(ride_id(id)?, &caller.account, req.rating)?;
    Ok(Json(RideRatingResponse::new(id, snapshot)))
}

/// POST /v1/rides/{id}/rating/rider — Driver rates the rider.
#[utoipa::path(
    post,
    path = "/v1/rides/{id}/rating/rider",
    params(("id" = u64, Path, description = "Ride id")),
    request_body = RateRequest,
    responses(
        (status = 200, description = "Rating recorded", body = RideRatingResponse),
        (status = 409, description = "Already rated or ride not finalized", body = crate::error::ErrorBody),
    ),
    tag = "rides"
)]
pub(crate) async fn rate_rider(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    caller: CallerIdentity,
    body: Result<Json<RateRequest>, JsonRejection>,
) -> Result<Json<RideRatingResponse>, AppError> {
    let req = extract_json(body)?;
    let snapshot = state.engine.rate_rider(ride_id(id)?, &caller.account, req.rating)?;
    Ok(Json(RideRatingResponse::new(id, snapshot)))
}

// ── Reads ───────────────────────────────────────────────────────────────────

/// GET /v1/rides/{id} — Full ride record.
#[utoipa::path(
    get,
    path = "/v1/rides/{id}",
    params(("id" = u64, Path, description = "Ride id")),
    responses(
        (status = 200, description = "Ride found", body = RideResponse),
        (status = 404, description = "No such ride", body = crate::error::ErrorBody),
    ),
    tag = "rides"
)]
pub(crate) async fn get_ride(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<RideResponse>, AppError> {
    let ride = state.engine.ride(ride_id(id)?)?;
    Ok(Json(RideResponse { ride }))
}

/// GET /v1/rides/{id}/refund — Refund eligibility right now.
#[utoipa::path(
    get,
    path = "/v1/rides/{id}/refund",
    params(("id" = u64, Path, description = "Ride id")),
    responses((status = 200, description = "Refund window", body = RefundStatusResponse)),
    tag = "rides"
)]
pub(crate) async fn refund_status(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<RefundStatusResponse>, AppError> {
    let refund = state.engine.refund_status(ride_id(id)?)?;
    Ok(Json(RefundStatusResponse { ride_id: id, refund }))
}

/// GET /v1/rides/{id}/rating — Both rating directions for a ride.
#[utoipa::path(
    get,
    path = "/v1/rides/{id}/rating",
    params(("id" = u64, Path, description = "Ride id")),
    responses((status = 200, description = "Ride ratings", body = RideRatingResponse)),
    tag = "rides"
)]
pub(crate) async fn get_rating(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<RideRatingResponse>, AppError> {
    let snapshot = state.engine.ride_rating(ride_id(id)?)?;
    Ok(Json(RideRatingResponse::new(id, snapshot)))
}

/// GET /v1/rides/{id}/view — What the caller may do with this ride.
#[utoipa::path(
    get,
    path = "/v1/rides/{id}/view",
    params(("id" = u64, Path, description = "Ride id")),
    responses((status = 200, description = "Advisory view", body = RideViewResponse)),
    tag = "rides"
)]
pub(crate) async fn view_ride(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    caller: CallerIdentity,
) -> Result<Json<RideViewResponse>, AppError> {
    let view = state.engine.view(ride_id(id)?, &caller.account)?;
    Ok(Json(RideViewResponse { view }))
}

/// GET /v1/rides/{id}/events — Journal entries for a ride.
#[utoipa::path(
    get,
    path = "/v1/rides/{id}/events",
    params(("id" = u64, Path, description = "Ride id")),
    responses((status = 200, description = "Ride events in order", body = RideEventsResponse)),
    tag = "rides"
)]
pub(crate) async fn ride_events(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<RideEventsResponse>, AppError> {
    let ride = ride_id(id)?;
    state.engine.ride(ride)?;
    Ok(Json(RideEventsResponse {
        ride_id: id,
        events: state.journal.for_ride(ride),
    }))
}
