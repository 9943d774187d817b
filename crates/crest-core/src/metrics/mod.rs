//! Prometheus metrics.
//!
//! All recording goes through the `metrics` facade and is lock-free. The
//! Prometheus recorder is installed once per process; later collectors share its
//! handle, so tests may build as many collectors as they like.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `crest_head_duration_seconds` | gauge | `upstream` |
//! | `crest_head_number` | gauge | `upstream` |
//! | `crest_head_fetch_errors_total` | counter | `upstream` |
//! | `crest_best_set_size` | gauge | |
//! | `crest_best_block_number` | gauge | |
//! | `crest_requests_total` | counter | `upstream`, `status` |
//! | `crest_request_duration_seconds` | histogram | `upstream` |
//! | `crest_no_upstream_total` | counter | |

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::{sync::OnceLock, time::Duration};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn init_prometheus_recorder() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "using fallback Prometheus recorder, metrics may not be globally visible"
                );
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

pub struct MetricsCollector {
    prometheus_handle: PrometheusHandle,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self { prometheus_handle: init_prometheus_recorder() }
    }

    /// Records one upstream's head for the cycle.
    ///
    /// `staleness_seconds` is wall clock minus block time and may be negative.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_head(&self, upstream: &str, staleness_seconds: Option<f64>, block_number: u64) {
        if let Some(staleness) = staleness_seconds {
            gauge!("crest_head_duration_seconds", "upstream" => upstream.to_string())
                .set(staleness);
        }
        gauge!("crest_head_number", "upstream" => upstream.to_string()).set(block_number as f64);
    }

    pub fn record_head_fetch_error(&self, upstream: &str) {
        counter!("crest_head_fetch_errors_total", "upstream" => upstream.to_string()).increment(1);
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn record_best_set(&self, size: usize, block_number: Option<u64>) {
        gauge!("crest_best_set_size").set(size as f64);
        if let Some(block) = block_number {
            gauge!("crest_best_block_number").set(block as f64);
        }
    }

    pub fn record_request(&self, upstream: &str, status: u16, latency: Duration) {
        counter!(
            "crest_requests_total",
            "upstream" => upstream.to_string(),
            "status" => status.to_string()
        )
        .increment(1);
        histogram!("crest_request_duration_seconds", "upstream" => upstream.to_string())
            .record(latency.as_secs_f64());
    }

    pub fn record_no_upstream(&self) {
        counter!("crest_no_upstream_total").increment(1);
    }

    /// Prometheus text exposition of everything recorded so far.
    #[must_use]
    pub fn get_prometheus_metrics(&self) -> String {
        self.prometheus_handle.render()
    }
}
