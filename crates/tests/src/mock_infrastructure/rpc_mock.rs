//! mockito-backed Ethereum node.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

/// A fake node answering head polls and proxied calls.
///
/// Head polls are matched on any path so the node also works behind a base path.
pub struct RpcMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl RpcMockBuilder {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// `host:port` as it should appear in a forwarded `Host` header.
    #[must_use]
    pub fn host_with_port(&self) -> String {
        self.server.host_with_port()
    }

    pub fn server_mut(&mut self) -> &mut ServerGuard {
        &mut self.server
    }

    fn head_poll_matcher() -> Matcher {
        Matcher::Regex(
            r#""method"\s*:\s*"eth_getBlockByNumber".*"params"\s*:\s*\["latest""#.to_string(),
        )
    }

    /// Answers `eth_getBlockByNumber("latest")` with the given head.
    pub fn mock_latest_block(&mut self, number: u64, timestamp: u64) -> &mut Self {
        let mock = self
            .server
            .mock("POST", Matcher::Any)
            .match_body(Self::head_poll_matcher())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": {
                        "number": format!("0x{number:x}"),
                        "timestamp": format!("0x{timestamp:x}"),
                        "hash": format!("0x{number:064x}"),
                    }
                })
                .to_string(),
            )
            .create();

        self.mocks.push(mock);
        self
    }

    /// Same as [`mock_latest_block`](Self::mock_latest_block) but expecting exactly `hits`
    /// polls. The returned mock can be asserted.
    pub fn expect_latest_block(&mut self, number: u64, timestamp: u64, hits: usize) -> Mock {
        self.server
            .mock("POST", Matcher::Any)
            .match_body(Self::head_poll_matcher())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": {
                        "number": format!("0x{number:x}"),
                        "timestamp": format!("0x{timestamp:x}"),
                    }
                })
                .to_string(),
            )
            .expect(hits)
            .create()
    }

    /// Answers head polls with a JSON-RPC error object.
    pub fn mock_rpc_error(&mut self, code: i64, message: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", Matcher::Any)
            .match_body(Self::head_poll_matcher())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": { "code": code, "message": message }
                })
                .to_string(),
            )
            .create();

        self.mocks.push(mock);
        self
    }

    /// Answers head polls with a bare HTTP error status.
    pub fn mock_server_error(&mut self, status: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", Matcher::Any)
            .match_body(Self::head_poll_matcher())
            .with_status(status)
            .with_body("upstream failure")
            .create();

        self.mocks.push(mock);
        self
    }

    /// Answers a proxied call to `method` on `path`, tagging the response with
    /// `x-node: <name>`. Expects exactly `hits` calls.
    pub fn mock_method(
        &mut self,
        path: &str,
        method: &str,
        result: &Value,
        name: &str,
        hits: usize,
    ) -> Mock {
        self.server
            .mock("POST", path)
            .match_body(Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#)))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("x-node", name)
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
            .expect(hits)
            .create()
    }
}
