use thiserror::Error;

/// Failure talking to a single upstream node.
///
/// These never abort a polling cycle: the head tracker falls back to its cached
/// snapshot and the failure only surfaces in logs and metrics.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// Request did not complete before the caller's deadline.
    #[error("Request timeout")]
    Timeout,

    /// Failed to establish a connection to the upstream endpoint.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// HTTP-level error occurred (non-2xx status code).
    ///
    /// First field is the HTTP status code, second is the error message.
    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    /// JSON-RPC error object returned by the node.
    #[error("RPC error {0}: {1}")]
    RpcError(i32, String),

    /// Response could not be parsed or was missing required fields.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl UpstreamError {
    /// Whether the node could not be reached at all, as opposed to answering badly.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionFailed(_))
    }
}

/// The best set was empty when a request arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No upstream available")]
pub struct NoUpstreamAvailable;
