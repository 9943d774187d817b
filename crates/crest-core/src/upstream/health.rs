use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};
use thiserror::Error;
use tokio::time::Instant;

use crate::upstream::{head_tracker::HeadSnapshot, Upstream, UpstreamError};

/// Why a liveness or readiness probe failed.
#[derive(Debug, Clone, Error)]
pub enum HealthCheckFailure {
    /// The latest head fetch failed, even if an older head is cached.
    #[error("upstream {upstream} unreachable: {source}")]
    Unreachable { upstream: Arc<str>, source: UpstreamError },

    /// Readiness cannot be judged without a current head.
    #[error("readiness indeterminate, head of {upstream} unavailable: {source}")]
    Indeterminate { upstream: Arc<str>, source: UpstreamError },

    /// The head block is older than the readiness threshold.
    #[error("head block {block_number} is {age:?} old, threshold {threshold:?}")]
    HeadTooOld { block_number: u64, age: Duration, threshold: Duration },

    /// `timestamp * block_time_unit` does not fit in a system time.
    #[error("head block {block_number} has out-of-range timestamp {timestamp}")]
    InvalidTimestamp { block_number: u64, timestamp: u64 },
}

/// Liveness and readiness derived from the primary upstream's head.
///
/// Both checks recompute from scratch on every call and never touch the best set.
pub struct HealthReporter {
    primary: Arc<Upstream>,
    block_time_unit: Duration,
    healthy_duration: Duration,
    probe_timeout: Duration,
}

impl HealthReporter {
    #[must_use]
    pub fn new(
        primary: Arc<Upstream>,
        block_time_unit: Duration,
        healthy_duration: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self { primary, block_time_unit, healthy_duration, probe_timeout }
    }

    #[must_use]
    pub fn primary(&self) -> &Arc<Upstream> {
        &self.primary
    }

    /// Deadline for a probe started now.
    #[must_use]
    pub fn probe_deadline(&self) -> Instant {
        Instant::now() + self.probe_timeout
    }

    /// Live iff the primary's head can be obtained.
    ///
    /// # Errors
    ///
    /// Returns [`HealthCheckFailure::Unreachable`] if the head fetch fails.
    pub async fn check_liveness(
        &self,
        deadline: Instant,
    ) -> Result<HeadSnapshot, HealthCheckFailure> {
        self.primary.head().get_head(deadline).await.map_err(|e| {
            HealthCheckFailure::Unreachable {
                upstream: Arc::clone(self.primary.id()),
                source: e.source,
            }
        })
    }

    /// Ready iff the primary's head block is younger than the healthy duration.
    /// Returns the head age on success.
    ///
    /// # Errors
    ///
    /// Returns [`HealthCheckFailure::Indeterminate`] if the head cannot be fetched and
    /// [`HealthCheckFailure::HeadTooOld`] if it is too old.
    pub async fn check_readiness(&self, deadline: Instant) -> Result<Duration, HealthCheckFailure> {
        self.check_readiness_at(deadline, SystemTime::now()).await
    }

    /// [`check_readiness`](Self::check_readiness) against a fixed wall clock.
    ///
    /// # Errors
    ///
    /// See [`check_readiness`](Self::check_readiness).
    pub async fn check_readiness_at(
        &self,
        deadline: Instant,
        now: SystemTime,
    ) -> Result<Duration, HealthCheckFailure> {
        let snapshot = self.primary.head().get_head(deadline).await.map_err(|e| {
            HealthCheckFailure::Indeterminate {
                upstream: Arc::clone(self.primary.id()),
                source: e.source,
            }
        })?;

        self.judge_readiness(&snapshot, now)
    }

    fn judge_readiness(
        &self,
        snapshot: &HeadSnapshot,
        now: SystemTime,
    ) -> Result<Duration, HealthCheckFailure> {
        let head_time = snapshot.head_time(self.block_time_unit).ok_or(
            HealthCheckFailure::InvalidTimestamp {
                block_number: snapshot.block_number,
                timestamp: snapshot.block_timestamp,
            },
        )?;

        // A head from the future counts as brand new.
        let age = now.duration_since(head_time).unwrap_or_default();
        if age < self.healthy_duration {
            Ok(age)
        } else {
            Err(HealthCheckFailure::HeadTooOld {
                block_number: snapshot.block_number,
                age,
                threshold: self.healthy_duration,
            })
        }
    }
}
