//! # Escrow Routes

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Vault totals plus the ledger's custody balance.
#[derive(Debug, Serialize, ToSchema)]
pub struct EscrowResponse {
    /// Currently held across all rides.
    pub held: u64,
    pub deposited: u64,
    pub released: u64,
    pub refunded: u64,
    /// `deposited == released + refunded + held`.
    pub conserved: bool,
    /// Value the ledger holds on the vault's behalf. Equals `held`.
    pub custody: u64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/escrow", get(escrow_totals))
}

/// GET /v1/escrow — Escrow balance and lifetime flows.
#[utoipa::path(
    get,
    path = "/v1/escrow",
    responses((status = 200, description = "Escrow totals", body = EscrowResponse)),
    tag = "escrow"
)]
pub(crate) async fn escrow_totals(State(state): State<AppState>) -> Json<EscrowResponse> {
    let totals = state.engine.escrow_totals();
    Json(EscrowResponse {
        held: totals.held.units(),
        deposited: totals.deposited.units(),
        released: totals.released.units(),
        refunded: totals.refunded.units(),
        conserved: totals.is_conserved(),
        custody: state.ledger.custody().units(),
    })
}
