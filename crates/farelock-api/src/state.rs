//! # Application State
//!
//! Shared handles passed to every handler through Axum's `State`
//! extractor. The engine does its own locking, so the state is a bundle of
//! `Arc`s and cheap to clone per request.

use std::sync::Arc;

use farelock_core::{Clock, SystemClock};
use farelock_engine::{EngineConfig, EventJournal, RideEngine, TracingSink};
use farelock_escrow::InMemoryLedger;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::middleware::metrics::ApiMetrics;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Server configuration.
///
/// Custom `Debug` redacts the auth token.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token. If `None`, bearer authentication is disabled.
    pub auth_token: Option<String>,
}

impl AppConfig {
    /// Read `PORT` and `AUTH_TOKEN` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`. An unparsable port falls back
    /// to the default; an empty token disables auth.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let auth_token = lookup("AUTH_TOKEN").filter(|t| !t.trim().is_empty());
        Self { port, auth_token }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            auth_token: None,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Handles shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RideEngine>,
    /// In-memory value-transfer collaborator behind the engine's vault.
    pub ledger: Arc<InMemoryLedger>,
    /// Hash-chained record of every committed command.
    pub journal: Arc<EventJournal>,
    pub metrics: ApiMetrics,
    pub config: AppConfig,
}

impl AppState {
    /// Default configuration, system clock.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), EngineConfig::default())
    }

    pub fn with_config(config: AppConfig, engine_config: EngineConfig) -> Self {
        Self::with_clock(config, engine_config, Arc::new(SystemClock))
    }

    /// Build the state around an explicit clock.
    pub fn with_clock(config: AppConfig, engine_config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        let journal = Arc::new(EventJournal::new());
        let engine = RideEngine::new(engine_config, clock, ledger.clone())
            .with_sink(Arc::new(TracingSink))
            .with_sink(journal.clone());
        Self {
            engine: Arc::new(engine),
            ledger,
            journal,
            metrics: ApiMetrics::new(),
            config,
        }
    }

    /// Serve `/metrics` from an installed Prometheus recorder.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = self.metrics.with_prometheus(handle);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .field("journal_len", &self.journal.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn config_defaults() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.port, 8080);
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn config_reads_port_and_token() {
        let config = AppConfig::from_lookup(lookup(&[("PORT", "9090"), ("AUTH_TOKEN", "s3cret")]));
        assert_eq!(config.port, 9090);
        assert_eq!(config.auth_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn bad_port_and_blank_token_fall_back() {
        let config = AppConfig::from_lookup(lookup(&[("PORT", "eighty"), ("AUTH_TOKEN", "  ")]));
        assert_eq!(config.port, 8080);
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let config = AppConfig {
            port: 1,
            auth_token: Some("hunter2".into()),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn state_wires_journal_to_engine() {
        let state = AppState::new();
        let account = farelock_core::AccountId::new("d1").unwrap();
        state.engine.register_driver(&account, "D").unwrap();
        assert_eq!(state.journal.len(), 1);
    }
}
