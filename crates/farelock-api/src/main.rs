//! # farelock-api — Binary Entry Point
//!
//! Starts the HTTP server. Configuration comes from the environment:
//! `PORT` (default 8080), `AUTH_TOKEN`, the `FARELOCK_*` timeout variables
//! read by `EngineConfig::from_env`, `RUST_LOG`, and `FARELOCK_LOG_JSON`
//! to switch log output to JSON lines.

use farelock_api::{AppConfig, AppState};
use farelock_engine::EngineConfig;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_logs = std::env::var("FARELOCK_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");
    if json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = AppConfig::from_env();
    let engine_config = EngineConfig::from_env().map_err(|e| {
        tracing::error!("invalid engine configuration: {e}");
        e
    })?;
    tracing::info!(?config, ?engine_config, "configuration loaded");

    let prometheus = PrometheusBuilder::new().install_recorder()?;
    let port = config.port;
    let state = AppState::with_config(config, engine_config).with_prometheus(prometheus);
    let app = farelock_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("farelock API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
