//! # Request Metrics
//!
//! Every request is counted twice: in process-local atomic counters, and
//! through the `metrics` facade (`farelock_http_requests_total`,
//! `farelock_http_request_duration_seconds`) labelled by method, matched
//! route and status. When a Prometheus recorder is installed, `/metrics`
//! renders its snapshot; otherwise it renders the local counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::PrometheusHandle;

/// Shared metrics state.
#[derive(Clone, Default)]
pub struct ApiMetrics {
    request_count: Arc<AtomicU64>,
    error_count: Arc<AtomicU64>,
    prometheus: Option<PrometheusHandle>,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render from `handle` instead of the local counters.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Responses with a 4xx or 5xx status.
    pub fn errors(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Prometheus text exposition.
    pub fn render(&self) -> String {
        match &self.prometheus {
            Some(handle) => handle.render(),
            None => format!(
                "# TYPE farelock_http_requests_total counter\n\
                 farelock_http_requests_total {}\n\
                 # TYPE farelock_http_errors_total counter\n\
                 farelock_http_errors_total {}\n",
                self.requests(),
                self.errors()
            ),
        }
    }
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .field("prometheus", &self.prometheus.is_some())
            .finish()
    }
}

/// Count the request and record its latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().as_str().to_owned();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let failed = status.is_client_error() || status.is_server_error();
    if let Some(m) = metrics {
        m.request_count.fetch_add(1, Ordering::Relaxed);
        if failed {
            m.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    let labels = [
        ("method", method),
        ("route", route),
        ("status", status.as_u16().to_string()),
    ];
    metrics::counter!("farelock_http_requests_total", &labels).increment(1);
    metrics::histogram!("farelock_http_request_duration_seconds", &labels)
        .record(started.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[tokio::test]
    async fn counts_requests_and_errors() {
        let metrics = ApiMetrics::new();
        let app = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/bad", get(|| async { StatusCode::CONFLICT }))
            .layer(from_fn(metrics_middleware))
            .layer(axum::Extension(metrics.clone()));

        for uri in ["/ok", "/bad", "/ok"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            app.clone().oneshot(request).await.unwrap();
        }
        assert_eq!(metrics.requests(), 3);
        assert_eq!(metrics.errors(), 1);
        assert!(metrics.render().contains("farelock_http_requests_total 3"));
    }
}
