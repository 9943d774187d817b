use std::sync::Arc;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, error, info};

use crate::{
    config::AppConfig,
    metrics::MetricsCollector,
    proxy::ProxyEngine,
    upstream::{HealthReporter, UpstreamRouter},
};

use super::{builder::CrestRuntimeBuilder, CrestComponents};

/// Owns the components and the background poller task.
///
/// [`shutdown`](Self::shutdown) broadcasts on the shutdown channel and waits for the
/// poller to finish its current cycle.
pub struct CrestRuntime {
    components: CrestComponents,
    shutdown_tx: broadcast::Sender<()>,
    config: AppConfig,
    poller_task: Option<JoinHandle<()>>,
}

impl CrestRuntime {
    #[must_use]
    pub fn builder() -> CrestRuntimeBuilder {
        CrestRuntimeBuilder::new()
    }

    pub(super) fn new(
        components: CrestComponents,
        shutdown_tx: broadcast::Sender<()>,
        config: AppConfig,
        enable_poller: bool,
    ) -> Self {
        let poller_task = if enable_poller {
            let handle = components.poller().start_with_shutdown(shutdown_tx.subscribe());
            debug!(
                interval_ms = config.poller.interval_ms,
                cycle_timeout_ms = config.poller.cycle_timeout_ms,
                "Head poller task started"
            );
            Some(handle)
        } else {
            None
        };

        Self { components, shutdown_tx, config, poller_task }
    }

    #[must_use]
    pub fn components(&self) -> &CrestComponents {
        &self.components
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn proxy_engine(&self) -> &Arc<ProxyEngine> {
        self.components.proxy_engine()
    }

    #[must_use]
    pub fn router(&self) -> &Arc<UpstreamRouter> {
        self.components.router()
    }

    #[must_use]
    pub fn health_reporter(&self) -> &Arc<HealthReporter> {
        self.components.health_reporter()
    }

    #[must_use]
    pub fn metrics_collector(&self) -> &Arc<MetricsCollector> {
        self.components.metrics_collector()
    }

    /// A receiver that fires when the runtime shuts down.
    #[must_use]
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Stops the poller and waits for it.
    pub async fn shutdown(self) {
        info!("Initiating Crest runtime shutdown");
        if let Err(e) = self.shutdown_tx.send(()) {
            debug!(error = %e, "Shutdown signal had no receivers");
        }

        if let Some(poller_task) = self.poller_task {
            match poller_task.await {
                Ok(()) => debug!("Head poller task completed"),
                Err(e) if e.is_cancelled() => debug!("Head poller task cancelled"),
                Err(e) => error!(error = %e, "Head poller task failed"),
            }
        }

        info!("Crest runtime shutdown complete");
    }
}
