use axum::{
    body::{to_bytes, Body},
    extract::{Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use crest_core::metrics::MetricsCollector;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::app::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct HealthQuery {
    /// Present to ask for readiness instead of liveness. `false` and `0` count as absent.
    pub ready: Option<String>,
}

impl HealthQuery {
    #[must_use]
    pub fn wants_readiness(&self) -> bool {
        self.ready.as_deref().is_some_and(|v| v != "false" && v != "0")
    }
}

/// `GET /healthz`: liveness, or readiness with `?ready`.
///
/// Answers 200 with a short summary, or 503 with the failure reason.
pub async fn handle_health(
    State(state): State<AppState>,
    Query(query): Query<HealthQuery>,
) -> Response {
    let health = &state.health;
    let deadline = health.probe_deadline();
    let probe = if query.wants_readiness() { "readiness" } else { "liveness" };

    let outcome = if query.wants_readiness() {
        health.check_readiness(deadline).await.map(|age| format!("ready: head age {age:?}"))
    } else {
        health
            .check_liveness(deadline)
            .await
            .map(|head| format!("live: head block {}", head.block_number))
    };

    match outcome {
        Ok(summary) => (StatusCode::OK, summary).into_response(),
        Err(failure) => {
            warn!(probe, reason = %failure, "health probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, failure.to_string()).into_response()
        }
    }
}

/// `GET /metrics` on the metrics listener.
pub async fn handle_metrics(State(metrics): State<Arc<MetricsCollector>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.get_prometheus_metrics(),
    )
}

/// Every path other than `/healthz`: buffered and forwarded to the best set.
pub async fn handle_proxy(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    // Reading fails when the body exceeds the limit or the client goes away.
    let body = match to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, limit = state.max_body_bytes, "failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large or unreadable")
                .into_response();
        }
    };

    match state.engine.forward(http::Request::from_parts(parts, body)).await {
        Ok(response) => response.map(Body::from).into_response(),
        Err(e) => (e.status_code(), e.to_string()).into_response(),
    }
}
