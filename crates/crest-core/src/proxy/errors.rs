use http::StatusCode;
use std::sync::Arc;

use crate::upstream::{NoUpstreamAvailable, UpstreamError};

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    NoUpstreamAvailable(#[from] NoUpstreamAvailable),

    /// The chosen upstream failed at the transport level. Upstream HTTP error
    /// statuses are not errors; they are passed through as responses.
    #[error("Upstream {upstream} failed: {source}")]
    Transport { upstream: Arc<str>, source: UpstreamError },
}

impl ProxyError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NoUpstreamAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Transport { source: UpstreamError::Timeout, .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Transport { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}
