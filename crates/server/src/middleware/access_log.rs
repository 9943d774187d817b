use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

use super::request_id::request_id;

/// Logs one line per request once the response is ready.
///
/// Must sit inside the request id layers so the id is already assigned.
pub async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let id = request_id(request.headers()).unwrap_or("-").to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        request_id = %id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency = ?started.elapsed(),
        "request served"
    );

    response
}
