use futures::future::join_all;
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{interval, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    metrics::MetricsCollector,
    upstream::{
        best_set::{BestSet, BestSetPublisher},
        registry::UpstreamRegistry,
        Upstream,
    },
};

/// Timing for the polling loop.
#[derive(Debug, Clone, Copy)]
pub struct PollerSettings {
    /// Time between cycle starts.
    pub interval: Duration,
    /// Deadline shared by every head fetch in one cycle.
    pub cycle_timeout: Duration,
    /// Length of one unit of a block timestamp.
    pub block_time_unit: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            cycle_timeout: Duration::from_secs(2),
            block_time_unit: Duration::from_secs(1),
        }
    }
}

/// Periodically polls every upstream for its head and publishes the best set.
///
/// Each cycle fetches all heads concurrently under one deadline. An upstream whose
/// fetch fails still counts with its last known block, if it ever reported one;
/// an upstream that never answered is left out.
#[derive(Clone)]
pub struct HeadPoller {
    registry: UpstreamRegistry,
    publisher: Arc<BestSetPublisher>,
    metrics: Arc<MetricsCollector>,
    settings: PollerSettings,
}

impl HeadPoller {
    #[must_use]
    pub fn new(
        registry: UpstreamRegistry,
        publisher: Arc<BestSetPublisher>,
        metrics: Arc<MetricsCollector>,
        settings: PollerSettings,
    ) -> Self {
        Self { registry, publisher, metrics, settings }
    }

    #[must_use]
    pub fn start_with_shutdown(
        &self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let poller = self.clone();

        tokio::spawn(async move {
            let mut ticker = interval(poller.settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        poller.poll_once().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("head poller shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Runs one polling cycle and returns the published best set.
    pub async fn poll_once(&self) -> Arc<BestSet> {
        let deadline = Instant::now() + self.settings.cycle_timeout;
        let upstreams = self.registry.all();

        let results = join_all(upstreams.iter().map(|u| u.head().get_head(deadline))).await;

        let now = SystemTime::now();
        let observed: Vec<Option<u64>> = upstreams
            .iter()
            .zip(results)
            .map(|(upstream, result)| {
                let snapshot = match result {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        warn!(
                            upstream = %upstream.id(),
                            error = %e.source,
                            fallback_block = ?e.last_known.map(|s| s.block_number),
                            "head fetch failed"
                        );
                        self.metrics.record_head_fetch_error(upstream.id());
                        e.last_known
                    }
                }?;

                self.metrics.record_head(
                    upstream.id(),
                    snapshot.staleness_seconds(self.settings.block_time_unit, now),
                    snapshot.block_number,
                );
                Some(snapshot.block_number)
            })
            .collect();

        let next = select_best(upstreams, &observed);
        self.metrics.record_best_set(next.len(), next.block_number());

        let previous = self.publisher.current();
        if previous.member_ids() != next.member_ids() {
            if next.is_empty() {
                warn!("no upstream reported a head, requests will be rejected");
            } else {
                info!(
                    block_number = ?next.block_number(),
                    members = ?next.member_ids(),
                    "best set changed"
                );
            }
        } else {
            debug!(block_number = ?next.block_number(), members = next.len(), "best set unchanged");
        }

        self.publisher.publish(next)
    }
}

/// The upstreams whose observed block equals the highest observed block, in registry order.
///
/// `observed[i]` is the block for `upstreams[i]`, `None` if it has none. Returns an
/// empty set when nothing was observed.
#[must_use]
pub fn select_best(upstreams: &[Arc<Upstream>], observed: &[Option<u64>]) -> BestSet {
    let Some(max_block) = observed.iter().flatten().copied().max() else {
        return BestSet::empty();
    };

    let members = upstreams
        .iter()
        .zip(observed)
        .filter(|(_, block)| **block == Some(max_block))
        .map(|(upstream, _)| Arc::clone(upstream))
        .collect();

    BestSet::new(Some(max_block), members)
}
