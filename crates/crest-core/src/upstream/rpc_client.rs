use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::time::{timeout_at, Instant};

use crate::{
    upstream::{http_client::classify_network_error, UpstreamError},
    utils::parse_hex_quantity,
};

/// Chain head as reported by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHead {
    pub number: u64,
    /// Chain-reported timestamp, in the unit configured by `heads.block_time_unit_ms`.
    pub timestamp: u64,
}

/// Source of the latest block for one upstream.
///
/// Implemented by [`RpcClient`] for real nodes; tests substitute scripted sources.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Fetches the latest block header, giving up at `deadline`.
    async fn fetch_latest_block(&self, deadline: Instant) -> Result<BlockHead, UpstreamError>;
}

#[derive(Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<HeaderFields>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct HeaderFields {
    number: String,
    timestamp: String,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i32,
    message: String,
}

/// JSON-RPC client that asks a node for `eth_getBlockByNumber("latest", false)`.
pub struct RpcClient {
    client: Client,
    url: Arc<str>,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Creates a client for `url` sharing the given connection pool.
    #[must_use]
    pub fn new(client: Client, url: impl Into<Arc<str>>) -> Self {
        Self { client, url: url.into(), next_id: AtomicU64::new(1) }
    }

    fn decode(envelope: RpcEnvelope) -> Result<BlockHead, UpstreamError> {
        if let Some(error) = envelope.error {
            return Err(UpstreamError::RpcError(error.code, error.message));
        }

        let header = envelope
            .result
            .ok_or_else(|| UpstreamError::InvalidResponse("latest block not found".to_string()))?;

        let number = parse_hex_quantity(&header.number).ok_or_else(|| {
            UpstreamError::InvalidResponse(format!("invalid block number: {}", header.number))
        })?;
        let timestamp = parse_hex_quantity(&header.timestamp).ok_or_else(|| {
            UpstreamError::InvalidResponse(format!("invalid block timestamp: {}", header.timestamp))
        })?;

        Ok(BlockHead { number, timestamp })
    }
}

#[async_trait]
impl BlockSource for RpcClient {
    async fn fetch_latest_block(&self, deadline: Instant) -> Result<BlockHead, UpstreamError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "eth_getBlockByNumber",
            "params": ["latest", false],
        });

        let response = timeout_at(deadline, self.client.post(&*self.url).json(&body).send())
            .await
            .map_err(|_| UpstreamError::Timeout)?
            .map_err(|e| classify_network_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::HttpError(
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status").to_string(),
            ));
        }

        let envelope: RpcEnvelope = timeout_at(deadline, response.json())
            .await
            .map_err(|_| UpstreamError::Timeout)?
            .map_err(|e| {
                if e.is_decode() {
                    UpstreamError::InvalidResponse(format!("malformed JSON-RPC response: {e}"))
                } else {
                    classify_network_error(&e)
                }
            })?;

        Self::decode(envelope)
    }
}
