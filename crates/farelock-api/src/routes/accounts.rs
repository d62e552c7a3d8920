//! # Account Routes
//!
//! Per-account ride indices and ledger balances. `credit` is a development
//! faucet for the in-memory ledger; a deployment backed by a real value
//! transfer collaborator would not mount it.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use farelock_core::Amount;

use crate::error::AppError;
use crate::extractors::{account_id, extract_validated_json, Validate};
use crate::state::AppState;

/// Which side of the ride the account is on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    #[default]
    Rider,
    Driver,
}

#[derive(Debug, Deserialize)]
pub struct RidesQuery {
    #[serde(default)]
    pub role: AccountRole,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountRidesResponse {
    pub account: String,
    pub role: AccountRole,
    /// Ride ids, oldest first.
    pub ride_ids: Vec<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub account: String,
    pub balance: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreditRequest {
    pub amount: u64,
}

impl Validate for CreditRequest {
    fn validate(&self) -> Result<(), String> {
        if self.amount == 0 {
            return Err("amount must be positive".to_string());
        }
        Ok(())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/accounts/{account}/rides", get(account_rides))
        .route("/v1/accounts/{account}/balance", get(balance))
        .route("/v1/accounts/{account}/credit", post(credit))
}

/// GET /v1/accounts/{account}/rides — Rides requested (`role=rider`) or
/// accepted (`role=driver`) by an account.
#[utoipa::path(
    get,
    path = "/v1/accounts/{account}/rides",
    params(
        ("account" = String, Path, description = "Account"),
        ("role" = Option<AccountRole>, Query, description = "rider (default) or driver"),
    ),
    responses((status = 200, description = "Ride ids", body = AccountRidesResponse)),
    tag = "accounts"
)]
pub(crate) async fn account_rides(
    State(state): State<AppState>,
    Path(account): Path<String>,
    query: Result<Query<RidesQuery>, QueryRejection>,
) -> Result<Json<AccountRidesResponse>, AppError> {
    let account = account_id(&account)?;
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let ids = match query.role {
        AccountRole::Rider => state.engine.rides_for_rider(&account),
        AccountRole::Driver => state.engine.rides_for_driver(&account),
    };
    Ok(Json(AccountRidesResponse {
        account: account.to_string(),
        role: query.role,
        ride_ids: ids.into_iter().map(|id| id.get()).collect(),
    }))
}

/// GET /v1/accounts/{account}/balance — Ledger balance.
#[utoipa::path(
    get,
    path = "/v1/accounts/{account}/balance",
    params(("account" = String, Path, description = "Account")),
    responses((status = 200, description = "Balance", body = BalanceResponse)),
    tag = "accounts"
)]
pub(crate) async fn balance(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> Result<Json<BalanceResponse>, AppError> {
    let account = account_id(&account)?;
    Ok(Json(BalanceResponse {
        balance: state.ledger.balance(&account).units(),
        account: account.to_string(),
    }))
}

/// POST /v1/accounts/{account}/credit — Add funds to an account.
#[utoipa::path(
    post,
    path = "/v1/accounts/{account}/credit",
    params(("account" = String, Path, description = "Account")),
    request_body = CreditRequest,
    responses(
        (status = 200, description = "New balance", body = BalanceResponse),
        (status = 422, description = "Zero amount or balance overflow", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn credit(
    State(state): State<AppState>,
    Path(account): Path<String>,
    body: Result<Json<CreditRequest>, JsonRejection>,
) -> Result<Json<BalanceResponse>, AppError> {
    let account = account_id(&account)?;
    let req = extract_validated_json(body)?;
    let balance = state.ledger.credit(&account, Amount::new(req.amount))?;
    tracing::info!(account = %account, amount = req.amount, "account credited");
    Ok(Json(BalanceResponse {
        account: account.to_string(),
        balance: balance.units(),
    }))
}
