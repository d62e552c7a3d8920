//! # OpenAPI Document
//!
//! Every utoipa-annotated handler assembled into one OpenAPI 3.1 document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Farelock Ride Escrow API",
        version = "0.1.0",
        description = "Ride lifecycle, fare escrow, refund timeouts, driver registry and two-way ratings."
    ),
    paths(
        // Rides
        crate::routes::rides::request_ride,
        crate::routes::rides::get_ride,
        crate::routes::rides::accept_ride,
        crate::routes::rides::fund_ride,
        crate::routes::rides::start_ride,
        crate::routes::rides::complete_ride,
        crate::routes::rides::confirm_arrival,
        crate::routes::rides::cancel_ride,
        crate::routes::rides::refund_status,
        crate::routes::rides::claim_refund_not_funded,
        crate::routes::rides::claim_refund_not_started,
        crate::routes::rides::get_rating,
        crate::routes::rides::rate_driver,
        crate::routes::rides::rate_rider,
        crate::routes::rides::view_ride,
        crate::routes::rides::ride_events,
        // Drivers
        crate::routes::drivers::register_driver,
        crate::routes::drivers::verify_identity,
        crate::routes::drivers::list_drivers,
        crate::routes::drivers::get_driver,
        // Accounts
        crate::routes::accounts::account_rides,
        crate::routes::accounts::balance,
        crate::routes::accounts::credit,
        // Escrow
        crate::routes::escrow::escrow_totals,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::rides::RequestRideRequest,
        crate::routes::rides::FundRideRequest,
        crate::routes::rides::RateRequest,
        crate::routes::rides::RideResponse,
        crate::routes::rides::RideCommandResponse,
        crate::routes::rides::RefundStatusResponse,
        crate::routes::rides::RideRatingResponse,
        crate::routes::rides::RideViewResponse,
        crate::routes::rides::RideEventsResponse,
        crate::routes::drivers::RegisterDriverRequest,
        crate::routes::drivers::DriverResponse,
        crate::routes::drivers::DriverRatingResponse,
        crate::routes::drivers::DriverListResponse,
        crate::routes::accounts::AccountRole,
        crate::routes::accounts::AccountRidesResponse,
        crate::routes::accounts::BalanceResponse,
        crate::routes::accounts::CreditRequest,
        crate::routes::escrow::EscrowResponse,
    )),
    tags(
        (name = "rides", description = "Ride lifecycle, refunds and ratings"),
        (name = "drivers", description = "Driver registry"),
        (name = "accounts", description = "Per-account indices and balances"),
        (name = "escrow", description = "Escrow vault totals"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
