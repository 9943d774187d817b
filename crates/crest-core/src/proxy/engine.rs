use bytes::Bytes;
use http::{header, HeaderValue, Request, Response};
use std::{sync::Arc, time::Instant};
use tracing::{debug, warn};

use crate::{
    metrics::MetricsCollector,
    proxy::{errors::ProxyError, headers::strip_hop_by_hop, transport::TransportSet},
    upstream::UpstreamRouter,
};

/// Forwards client requests to an upstream from the current best set.
pub struct ProxyEngine {
    router: Arc<UpstreamRouter>,
    transports: TransportSet,
    metrics: Arc<MetricsCollector>,
}

impl ProxyEngine {
    #[must_use]
    pub fn new(
        router: Arc<UpstreamRouter>,
        transports: TransportSet,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self { router, transports, metrics }
    }

    /// Picks an upstream, rewrites the request to point at it and sends it through
    /// the transport for the upstream's scheme.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::NoUpstreamAvailable`] if the best set is empty; nothing is sent
    /// - [`ProxyError::InvalidRequest`] if the request URI cannot be rewritten
    /// - [`ProxyError::Transport`] if the upstream could not be reached
    pub async fn forward(&self, request: Request<Bytes>) -> Result<Response<Bytes>, ProxyError> {
        let upstream = self.router.select_upstream().inspect_err(|_| {
            self.metrics.record_no_upstream();
            warn!(uri = %request.uri(), "no upstream available");
        })?;

        let (mut parts, body) = request.into_parts();
        let destination = upstream.destination();

        parts.uri = destination.rewrite(&parts.uri).map_err(|e| {
            ProxyError::InvalidRequest(format!("cannot rewrite request URI: {e}"))
        })?;

        strip_hop_by_hop(&mut parts.headers);
        parts.headers.remove(header::CONTENT_LENGTH);
        let host = HeaderValue::from_str(destination.authority())
            .map_err(|e| ProxyError::InvalidRequest(format!("invalid upstream host: {e}")))?;
        parts.headers.insert(header::HOST, host);

        debug!(
            upstream = %upstream.id(),
            method = %parts.method,
            url = %parts.uri,
            "forwarding request"
        );

        let started = Instant::now();
        let transport = self.transports.for_scheme(destination.scheme());
        match transport.round_trip(Request::from_parts(parts, body)).await {
            Ok(mut response) => {
                strip_hop_by_hop(response.headers_mut());
                self.metrics.record_request(
                    upstream.id(),
                    response.status().as_u16(),
                    started.elapsed(),
                );
                Ok(response)
            }
            Err(source) => {
                warn!(upstream = %upstream.id(), error = %source, "upstream request failed");
                let error = ProxyError::Transport { upstream: Arc::clone(upstream.id()), source };
                self.metrics.record_request(
                    upstream.id(),
                    error.status_code().as_u16(),
                    started.elapsed(),
                );
                Err(error)
            }
        }
    }

    #[must_use]
    pub fn router(&self) -> &Arc<UpstreamRouter> {
        &self.router
    }

    #[must_use]
    pub fn metrics_collector(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }
}
