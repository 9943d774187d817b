use reqwest::{Client, ClientBuilder};
use std::time::Duration;

use crate::upstream::UpstreamError;

/// Connection settings shared by the head RPC clients and the proxy transports.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Idle connections kept per upstream host.
    pub pool_max_idle_per_host: usize,
    /// How long an idle pooled connection is kept open.
    pub pool_idle_timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Refuse plain `http` URLs. Set for the `https` transport.
    pub https_only: bool,
    pub user_agent: &'static str,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 10_000,
            pool_idle_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            https_only: false,
            user_agent: concat!("crest/", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    #[must_use]
    pub fn https() -> Self {
        Self { https_only: true, ..Self::default() }
    }
}

/// Builds a pooled reqwest client.
///
/// Redirects are never followed: the proxy hands 3xx responses back to the caller
/// untouched, and a node redirecting a head query is treated as an HTTP error.
///
/// # Errors
///
/// Returns [`UpstreamError::ConnectionFailed`] if the TLS backend or client cannot be built.
pub fn build_http_client(config: &HttpClientConfig) -> Result<Client, UpstreamError> {
    ClientBuilder::new()
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .connect_timeout(config.connect_timeout)
        .use_rustls_tls()
        .https_only(config.https_only)
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(config.user_agent)
        .tcp_keepalive(Duration::from_secs(30))
        .tcp_nodelay(true)
        .build()
        .map_err(|e| {
            tracing::error!(error = %e, "failed to build http client");
            UpstreamError::ConnectionFailed(format!("HTTP client build failed: {e}"))
        })
}

/// Maps a reqwest error to an [`UpstreamError`] without leaking resolved addresses.
#[must_use]
pub fn classify_network_error(error: &reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::Timeout
    } else if error.is_connect() {
        UpstreamError::ConnectionFailed("connection refused or unreachable".to_string())
    } else if error.is_body() || error.is_decode() {
        UpstreamError::InvalidResponse("response body error".to_string())
    } else if error.is_redirect() {
        UpstreamError::HttpError(0, "unexpected redirect".to_string())
    } else {
        UpstreamError::ConnectionFailed("network error".to_string())
    }
}
