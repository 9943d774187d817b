//! Per-upstream cache of the most recently observed chain head.
//!
//! A [`HeadTracker`] answers "what block is this node at?" without hitting the node
//! more than once per freshness window. Refreshes of the same upstream are
//! serialized: a caller arriving while a fetch is in flight waits for it (bounded
//! by its own deadline) and then reuses the result.
//!
//! Failed fetches never clear the cache. The caller gets the error together with
//! the last snapshot that was observed, so it can decide whether a stale head is
//! still useful.

use arc_swap::ArcSwapOption;
use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use tokio::{
    sync::Mutex,
    time::{timeout_at, Instant},
};

use crate::upstream::{rpc_client::BlockSource, UpstreamError};

/// A chain head observed at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadSnapshot {
    pub block_number: u64,
    /// Chain-reported timestamp in units of `block_time_unit`.
    pub block_timestamp: u64,
    pub captured_at: Instant,
}

impl HeadSnapshot {
    /// Whether the snapshot is younger than `window` at `now`.
    #[must_use]
    pub fn is_fresh(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.captured_at) < window
    }

    /// Wall-clock time of the block, or `None` if `block_timestamp * unit` overflows.
    #[must_use]
    pub fn head_time(&self, unit: Duration) -> Option<SystemTime> {
        let nanos = unit.as_nanos().checked_mul(u128::from(self.block_timestamp))?;
        let secs = u64::try_from(nanos / 1_000_000_000).ok()?;
        #[allow(clippy::cast_possible_truncation)]
        let subsec = (nanos % 1_000_000_000) as u32;
        UNIX_EPOCH.checked_add(Duration::new(secs, subsec))
    }

    /// Signed seconds between the block time and `now`. Negative when the node's
    /// clock runs ahead of ours.
    #[must_use]
    pub fn staleness_seconds(&self, unit: Duration, now: SystemTime) -> Option<f64> {
        let head_time = self.head_time(unit)?;
        Some(match now.duration_since(head_time) {
            Ok(age) => age.as_secs_f64(),
            Err(ahead) => -ahead.duration().as_secs_f64(),
        })
    }
}

/// A head refresh failed. Carries the previous snapshot, if there ever was one.
#[derive(Debug, Clone, Error)]
#[error("head fetch failed: {source}")]
pub struct HeadFetchError {
    pub last_known: Option<HeadSnapshot>,
    pub source: UpstreamError,
}

pub struct HeadTracker {
    source: Arc<dyn BlockSource>,
    freshness_window: Duration,
    latest: ArcSwapOption<HeadSnapshot>,
    /// Held for the duration of a network refresh.
    refresh: Mutex<()>,
}

impl HeadTracker {
    #[must_use]
    pub fn new(source: Arc<dyn BlockSource>, freshness_window: Duration) -> Self {
        Self { source, freshness_window, latest: ArcSwapOption::empty(), refresh: Mutex::new(()) }
    }

    /// Returns the current head, fetching it if the cached snapshot is stale.
    ///
    /// # Errors
    ///
    /// Returns [`HeadFetchError`] if the fetch fails or `deadline` passes first,
    /// including while waiting on another caller's in-flight refresh.
    pub async fn get_head(&self, deadline: Instant) -> Result<HeadSnapshot, HeadFetchError> {
        if let Some(snapshot) = self.fresh_snapshot() {
            return Ok(snapshot);
        }

        let Ok(_guard) = timeout_at(deadline, self.refresh.lock()).await else {
            return Err(self.failure(UpstreamError::Timeout));
        };

        // Another caller may have refreshed while we waited.
        if let Some(snapshot) = self.fresh_snapshot() {
            return Ok(snapshot);
        }

        match timeout_at(deadline, self.source.fetch_latest_block(deadline)).await {
            Ok(Ok(head)) => {
                let snapshot = HeadSnapshot {
                    block_number: head.number,
                    block_timestamp: head.timestamp,
                    captured_at: Instant::now(),
                };
                self.latest.store(Some(Arc::new(snapshot)));
                Ok(snapshot)
            }
            Ok(Err(e)) => Err(self.failure(e)),
            Err(_) => Err(self.failure(UpstreamError::Timeout)),
        }
    }

    /// The last successfully fetched snapshot, fresh or not.
    #[must_use]
    pub fn last_known(&self) -> Option<HeadSnapshot> {
        self.latest.load().as_deref().copied()
    }

    #[must_use]
    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    fn fresh_snapshot(&self) -> Option<HeadSnapshot> {
        self.last_known().filter(|s| s.is_fresh(Instant::now(), self.freshness_window))
    }

    fn failure(&self, source: UpstreamError) -> HeadFetchError {
        HeadFetchError { last_known: self.last_known(), source }
    }
}
