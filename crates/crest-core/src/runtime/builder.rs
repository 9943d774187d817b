use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    config::{AppConfig, ConfigurationError},
    metrics::MetricsCollector,
    proxy::{ProxyEngine, TransportSet},
    upstream::{
        build_http_client, BestSetPublisher, HealthReporter, HeadPoller, HttpClientConfig,
        UpstreamError, UpstreamRegistry, UpstreamRouter,
    },
};

use super::{lifecycle::CrestRuntime, CrestComponents};

/// Errors that can occur during runtime initialization.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("No configuration provided")]
    MissingConfig,

    #[error("Configuration validation failed: {0}")]
    ConfigValidation(#[from] ConfigurationError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] UpstreamError),
}

const SHUTDOWN_CHANNEL_CAPACITY: usize = 16;

#[derive(Clone, Default)]
struct RuntimeOptions {
    enable_poller: bool,
}

/// Builder for a [`CrestRuntime`].
///
/// ```no_run
/// # use crest_core::{config::AppConfig, runtime::CrestRuntimeBuilder};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let runtime = CrestRuntimeBuilder::new()
///     .with_config(AppConfig::load()?)
///     .enable_poller()
///     .build()?;
/// # runtime.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct CrestRuntimeBuilder {
    config: Option<AppConfig>,
    transports: Option<TransportSet>,
    options: RuntimeOptions,
}

impl CrestRuntimeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { config: None, transports: None, options: RuntimeOptions::default() }
    }

    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replaces the default per-scheme transports used for proxied requests.
    #[must_use]
    pub fn with_transports(mut self, transports: TransportSet) -> Self {
        self.transports = Some(transports);
        self
    }

    /// Runs the head poller in the background once built.
    #[must_use]
    pub fn enable_poller(mut self) -> Self {
        self.options.enable_poller = true;
        self
    }

    /// Validates the configuration and assembles every component.
    ///
    /// Must be called inside a tokio runtime when the poller is enabled.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::MissingConfig`] if no configuration was given
    /// - [`RuntimeError::ConfigValidation`] if the configuration is invalid
    /// - [`RuntimeError::HttpClient`] if an HTTP client cannot be built
    pub fn build(self) -> Result<CrestRuntime, RuntimeError> {
        let config = self.config.ok_or(RuntimeError::MissingConfig)?;
        config.validate()?;
        debug!("Configuration validated");

        let (shutdown_tx, _) = broadcast::channel(SHUTDOWN_CHANNEL_CAPACITY);

        let metrics_collector = Arc::new(MetricsCollector::new());
        debug!("Metrics collector initialized");

        let client =
            build_http_client(&HttpClientConfig::default()).map_err(RuntimeError::HttpClient)?;
        let registry = UpstreamRegistry::from_endpoints(
            &config.upstreams.endpoints,
            &client,
            config.freshness_window(),
        )?;
        debug!(upstreams = registry.len(), "Upstream registry initialized");

        // Until the first cycle completes, every upstream is eligible.
        let publisher = Arc::new(BestSetPublisher::new(registry.all().to_vec()));
        metrics_collector.record_best_set(registry.len(), None);
        let router = Arc::new(UpstreamRouter::new(publisher.clone()));

        let poller = HeadPoller::new(
            registry.clone(),
            publisher.clone(),
            metrics_collector.clone(),
            config.poller_settings(),
        );

        let primary = registry.primary(config.health.primary_upstream.as_deref())?;
        info!(primary = %primary.id(), "Health probes follow primary upstream");
        let health_reporter = Arc::new(HealthReporter::new(
            primary,
            config.block_time_unit(),
            config.healthy_duration(),
            config.probe_timeout(),
        ));

        let transports = match self.transports {
            Some(transports) => transports,
            None => TransportSet::from_defaults().map_err(RuntimeError::HttpClient)?,
        };
        let proxy_engine =
            Arc::new(ProxyEngine::new(router.clone(), transports, metrics_collector.clone()));
        debug!("Proxy engine initialized");

        let components = CrestComponents::new(
            metrics_collector,
            publisher,
            router,
            poller,
            health_reporter,
            proxy_engine,
        );
        let runtime =
            CrestRuntime::new(components, shutdown_tx, config, self.options.enable_poller);

        info!("Crest runtime initialization complete");

        Ok(runtime)
    }
}

impl Default for CrestRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
