use std::sync::Arc;

use crate::{
    metrics::MetricsCollector,
    proxy::ProxyEngine,
    upstream::{BestSetPublisher, HealthReporter, HeadPoller, UpstreamRouter},
};

/// Every shared component of a running instance.
#[derive(Clone)]
pub struct CrestComponents {
    metrics_collector: Arc<MetricsCollector>,
    publisher: Arc<BestSetPublisher>,
    router: Arc<UpstreamRouter>,
    poller: HeadPoller,
    health_reporter: Arc<HealthReporter>,
    proxy_engine: Arc<ProxyEngine>,
}

impl CrestComponents {
    #[must_use]
    pub fn new(
        metrics_collector: Arc<MetricsCollector>,
        publisher: Arc<BestSetPublisher>,
        router: Arc<UpstreamRouter>,
        poller: HeadPoller,
        health_reporter: Arc<HealthReporter>,
        proxy_engine: Arc<ProxyEngine>,
    ) -> Self {
        Self {
            metrics_collector,
            publisher,
            router,
            poller,
            health_reporter,
            proxy_engine,
        }
    }

    #[must_use]
    pub fn metrics_collector(&self) -> &Arc<MetricsCollector> {
        &self.metrics_collector
    }

    #[must_use]
    pub fn publisher(&self) -> &Arc<BestSetPublisher> {
        &self.publisher
    }

    #[must_use]
    pub fn router(&self) -> &Arc<UpstreamRouter> {
        &self.router
    }

    /// The poller driving the best set. Runs in the background only when enabled on
    /// the builder.
    #[must_use]
    pub fn poller(&self) -> &HeadPoller {
        &self.poller
    }

    #[must_use]
    pub fn health_reporter(&self) -> &Arc<HealthReporter> {
        &self.health_reporter
    }

    #[must_use]
    pub fn proxy_engine(&self) -> &Arc<ProxyEngine> {
        &self.proxy_engine
    }
}
