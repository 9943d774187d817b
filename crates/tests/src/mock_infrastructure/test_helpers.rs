//! Fixtures shared by the integration tests.

use axum::{body::Body, Router};
use crest_core::{config::AppConfig, runtime::CrestRuntime};
use http::{header, Request};
use serde_json::json;
use server::{create_app, AppState};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the epoch, as a node would report a just-mined block.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

/// Defaults with the given upstreams, poller and probes tightened for tests.
#[must_use]
pub fn test_config(endpoints: &[String]) -> AppConfig {
    let mut config = AppConfig::default();
    config.upstreams.endpoints = endpoints.to_vec();
    config.server.bind_address = "127.0.0.1".to_string();
    config.poller.interval_ms = 100;
    config.poller.cycle_timeout_ms = 1_000;
    config.heads.freshness_window_ms = 50;
    config.health.probe_timeout_ms = 1_000;
    config
}

/// A runtime without the background poller; tests drive cycles themselves.
///
/// # Panics
///
/// Panics if the configuration is rejected.
#[must_use]
pub fn test_runtime(config: AppConfig) -> CrestRuntime {
    CrestRuntime::builder().with_config(config).build().expect("test config should be valid")
}

#[must_use]
pub fn test_app(runtime: &CrestRuntime) -> Router {
    create_app(AppState::from_runtime(runtime))
}

/// A JSON-RPC POST to `uri` calling `method` without params.
///
/// # Panics
///
/// Panics if `uri` is not a valid request target.
#[must_use]
pub fn rpc_request(uri: &str, method: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "jsonrpc": "2.0", "id": 1, "method": method }).to_string()))
        .expect("valid request")
}

/// Reads a response body as UTF-8.
///
/// # Panics
///
/// Panics if the body cannot be read or is not UTF-8.
pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
