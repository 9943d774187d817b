//! End-to-end forwarding through the axum app to mock nodes.

use axum::body::Body;
use crest_core::upstream::BestSet;
use http::{header, Request, StatusCode};
use mockito::Matcher;
use serde_json::json;
use server::middleware::X_REQUEST_ID;
use tower::ServiceExt;

use crate::mock_infrastructure::{
    body_text, rpc_request, test_app, test_config, test_runtime, RpcMockBuilder,
};

#[tokio::test]
async fn test_forwards_to_base_path_with_query_and_host() {
    let mut node = RpcMockBuilder::new().await;
    let host = node.host_with_port();
    let forwarded = node
        .server_mut()
        .mock("POST", "/v3/key/rpc")
        .match_query(Matcher::UrlEncoded("x".into(), "1".into()))
        .match_header("host", host.as_str())
        .match_header("x-request-id", "req-42")
        .match_body(Matcher::Regex(r#""method"\s*:\s*"eth_chainId""#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#)
        .expect(1)
        .create_async()
        .await;
    let runtime = test_runtime(test_config(&[format!("{}/v3/key", node.url())]));

    let mut request = rpc_request("/rpc?x=1", "eth_chainId");
    request.headers_mut().insert(X_REQUEST_ID.clone(), "req-42".parse().unwrap());
    let response = test_app(&runtime).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[&X_REQUEST_ID], "req-42");
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert!(body_text(response).await.contains("\"result\":\"0x1\""));
    forwarded.assert_async().await;
}

#[tokio::test]
async fn test_round_robin_over_initial_set() {
    let mut a = RpcMockBuilder::new().await;
    let mut b = RpcMockBuilder::new().await;
    let _a = a.mock_method("/", "eth_chainId", &json!("0x1"), "a", 2);
    let _b = b.mock_method("/", "eth_chainId", &json!("0x1"), "b", 2);
    let runtime = test_runtime(test_config(&[a.url(), b.url()]));
    let app = test_app(&runtime);

    let mut served_by = Vec::new();
    for _ in 0..4 {
        let response = app.clone().oneshot(rpc_request("/", "eth_chainId")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        served_by.push(response.headers()["x-node"].to_str().unwrap().to_string());
    }

    assert_ne!(served_by[0], served_by[1]);
    assert_eq!(served_by[0], served_by[2]);
    assert_eq!(served_by[1], served_by[3]);
}

#[tokio::test]
async fn test_empty_best_set_is_service_unavailable() {
    let mut node = RpcMockBuilder::new().await;
    let untouched = node.mock_method("/", "eth_chainId", &json!("0x1"), "node", 0);
    let runtime = test_runtime(test_config(&[node.url()]));
    runtime.components().publisher().publish(BestSet::empty());

    let response = test_app(&runtime).oneshot(rpc_request("/", "eth_chainId")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_text(response).await, "No upstream available");
    untouched.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let runtime = test_runtime(test_config(&["http://127.0.0.1:1".to_string()]));

    let response = test_app(&runtime).oneshot(rpc_request("/", "eth_chainId")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_upstream_error_status_passes_through() {
    let mut node = RpcMockBuilder::new().await;
    let _limited = node
        .server_mut()
        .mock("POST", "/")
        .with_status(429)
        .with_header("retry-after", "1")
        .with_body("slow down")
        .create_async()
        .await;
    let runtime = test_runtime(test_config(&[node.url()]));

    let response = test_app(&runtime).oneshot(rpc_request("/", "eth_chainId")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "1");
    assert_eq!(body_text(response).await, "slow down");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut node = RpcMockBuilder::new().await;
    let untouched = node.mock_method("/", "eth_chainId", &json!("0x1"), "node", 0);
    let mut config = test_config(&[node.url()]);
    config.server.max_body_bytes = 16;
    let runtime = test_runtime(config);

    let response = test_app(&runtime).oneshot(rpc_request("/", "eth_chainId")).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    untouched.assert_async().await;
}

#[tokio::test]
async fn test_non_post_methods_are_forwarded() {
    let mut node = RpcMockBuilder::new().await;
    let status = node
        .server_mut()
        .mock("GET", "/status")
        .with_status(200)
        .with_body("fine")
        .expect(1)
        .create_async()
        .await;
    let runtime = test_runtime(test_config(&[node.url()]));

    let request = Request::get("/status").body(Body::empty()).unwrap();
    let response = test_app(&runtime).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(&X_REQUEST_ID));
    assert_eq!(body_text(response).await, "fine");
    status.assert_async().await;
}
