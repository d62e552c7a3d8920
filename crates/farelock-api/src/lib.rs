//! # farelock-api — HTTP Surface
//!
//! Axum service over the ride engine. Handlers translate requests into
//! engine commands and map engine errors onto structured responses; no
//! lifecycle rules live here.
//!
//! ## Routes
//!
//! - `/v1/rides/*` — request, accept, fund, start, complete, confirm,
//!   cancel, refund claims, ratings, advisory view, event history
//! - `/v1/drivers/*` — registration, identity verification, driver reads
//! - `/v1/accounts/*` — ride indices, balances, development faucet
//! - `/v1/escrow` — vault totals
//! - `/openapi.json` — generated OpenAPI document
//! - `/health/*`, `/metrics` — unauthenticated probes and scrape endpoint
//!
//! ## Caller Identity
//!
//! The acting account is taken from the `X-Account-Id` header. When
//! `AUTH_TOKEN` is set every `/v1` request must also carry a matching
//! bearer token.
//!
//! ## Middleware Stack (Tower)
//!
//! TraceLayer → MetricsLayer → AuthLayer

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::header;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::auth::AuthConfig;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the application router.
///
/// Health probes and `/metrics` are mounted outside the auth middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = state.metrics.clone();

    let api = Router::new()
        .merge(routes::rides::router())
        .merge(routes::drivers::router())
        .merge(routes::accounts::router())
        .merge(routes::escrow::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .with_state(state.clone());

    let probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(render_metrics))
        .with_state(state);

    Router::new().merge(probes).merge(api)
}

/// Liveness probe.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. The engine is in-memory, so ready once constructed.
async fn readiness() -> &'static str {
    "ready"
}

async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
