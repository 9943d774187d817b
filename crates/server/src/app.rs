use axum::{
    middleware as axum_middleware,
    routing::{any, get},
    Router,
};
use crest_core::{
    metrics::MetricsCollector, proxy::ProxyEngine, runtime::CrestRuntime,
    upstream::HealthReporter,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::{middleware, router};

/// Shared state of the proxy listener.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProxyEngine>,
    pub health: Arc<HealthReporter>,
    pub max_body_bytes: usize,
}

impl AppState {
    #[must_use]
    pub fn from_runtime(runtime: &CrestRuntime) -> Self {
        Self {
            engine: runtime.proxy_engine().clone(),
            health: runtime.health_reporter().clone(),
            max_body_bytes: runtime.config().server.max_body_bytes,
        }
    }
}

/// The proxy listener: `/healthz` for any method, plus a fallback that forwards
/// everything else.
pub fn create_app(state: AppState) -> Router {
    let (set_request_id, propagate_request_id) = middleware::create_request_id_layers();
    let max_body_bytes = state.max_body_bytes;

    Router::new()
        .route("/healthz", any(router::handle_health))
        .fallback(router::handle_proxy)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(axum_middleware::from_fn(middleware::access_log))
        .layer(propagate_request_id)
        .layer(set_request_id)
}

/// The metrics listener, serving only `/metrics`.
pub fn create_metrics_app(metrics: Arc<MetricsCollector>) -> Router {
    Router::new().route("/metrics", get(router::handle_metrics)).with_state(metrics)
}
