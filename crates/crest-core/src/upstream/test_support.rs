use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::time::Instant;

use crate::upstream::{
    rpc_client::{BlockHead, BlockSource},
    Upstream, UpstreamError,
};

/// Block source that replays a fixed script of `(delay, response)` steps.
/// Once the script runs out every call times out.
pub struct ScriptedSource {
    calls: AtomicUsize,
    steps: Mutex<VecDeque<(Duration, Result<BlockHead, UpstreamError>)>>,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<BlockHead, UpstreamError>>) -> Arc<Self> {
        Self::with_delay(responses, Duration::ZERO)
    }

    pub fn with_delay(
        responses: Vec<Result<BlockHead, UpstreamError>>,
        delay: Duration,
    ) -> Arc<Self> {
        Self::with_steps(responses.into_iter().map(|r| (delay, r)).collect())
    }

    pub fn with_steps(steps: Vec<(Duration, Result<BlockHead, UpstreamError>)>) -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), steps: Mutex::new(steps.into()) })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockSource for ScriptedSource {
    async fn fetch_latest_block(&self, _deadline: Instant) -> Result<BlockHead, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        let Some((delay, response)) = step else {
            return Err(UpstreamError::Timeout);
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

pub fn head(number: u64) -> Result<BlockHead, UpstreamError> {
    Ok(BlockHead { number, timestamp: 1_700_000_000 + number })
}

pub fn test_upstream(address: &str, source: Arc<ScriptedSource>) -> Arc<Upstream> {
    Arc::new(Upstream::new(address, source, Duration::from_secs(1)).unwrap())
}
