use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use reqwest::Client;
use std::sync::Arc;

use crate::upstream::{
    build_http_client, http_client::classify_network_error, HttpClientConfig, Scheme,
    UpstreamError,
};

/// Sends an already rewritten request and returns the upstream's response as is.
#[async_trait]
pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// Returns [`UpstreamError`] only for transport failures. Non-2xx responses are `Ok`.
    async fn round_trip(&self, request: Request<Bytes>) -> Result<Response<Bytes>, UpstreamError>;
}

/// [`Transport`] over a pooled reqwest client.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns [`UpstreamError::ConnectionFailed`] if the client cannot be built.
    pub fn with_config(config: &HttpClientConfig) -> Result<Self, UpstreamError> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn round_trip(&self, request: Request<Bytes>) -> Result<Response<Bytes>, UpstreamError> {
        let (parts, body) = request.into_parts();

        let response = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .send()
            .await
            .map_err(|e| classify_network_error(&e))?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| classify_network_error(&e))?;

        let mut out = Response::new(body);
        *out.status_mut() = status;
        *out.version_mut() = version;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

/// One transport per outbound scheme.
#[derive(Clone)]
pub struct TransportSet {
    http: Arc<dyn Transport>,
    https: Arc<dyn Transport>,
}

impl TransportSet {
    #[must_use]
    pub fn new(http: Arc<dyn Transport>, https: Arc<dyn Transport>) -> Self {
        Self { http, https }
    }

    /// Plain and TLS transports with the default pool settings. The TLS one refuses
    /// plain-text URLs.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::ConnectionFailed`] if either client cannot be built.
    pub fn from_defaults() -> Result<Self, UpstreamError> {
        Ok(Self::new(
            Arc::new(HttpTransport::with_config(&HttpClientConfig::default())?),
            Arc::new(HttpTransport::with_config(&HttpClientConfig::https())?),
        ))
    }

    #[must_use]
    pub fn for_scheme(&self, scheme: Scheme) -> &Arc<dyn Transport> {
        match scheme {
            Scheme::Http => &self.http,
            Scheme::Https => &self.https,
        }
    }
}
