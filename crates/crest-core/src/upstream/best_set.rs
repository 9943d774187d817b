//! The set of upstreams currently at the highest observed block.
//!
//! The poller is the only writer; every proxied request reads. Both go through
//! [`ArcSwap`], so a reader always holds one complete generation and a publish
//! never waits on readers.

use arc_swap::ArcSwap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::upstream::Upstream;

/// Immutable snapshot of the best set.
#[derive(Debug, Clone)]
pub struct BestSet {
    generation: u64,
    block_number: Option<u64>,
    members: Vec<Arc<Upstream>>,
}

impl BestSet {
    /// A set whose members all sit at `block_number`. The generation is assigned on publish.
    #[must_use]
    pub fn new(block_number: Option<u64>, members: Vec<Arc<Upstream>>) -> Self {
        Self { generation: 0, block_number, members }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(None, Vec::new())
    }

    /// Increases by one with every publish. The startup set is generation 0.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The shared block height, or `None` for the startup set and the empty set.
    #[must_use]
    pub fn block_number(&self) -> Option<u64> {
        self.block_number
    }

    #[must_use]
    pub fn members(&self) -> &[Arc<Upstream>] {
        &self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member ids in order, for logging.
    #[must_use]
    pub fn member_ids(&self) -> Vec<&str> {
        self.members.iter().map(|u| u.id().as_ref()).collect()
    }
}

pub struct BestSetPublisher {
    current: ArcSwap<BestSet>,
    generation: AtomicU64,
}

impl BestSetPublisher {
    /// Starts with every registered upstream so traffic flows before the first poll completes.
    #[must_use]
    pub fn new(initial: Vec<Arc<Upstream>>) -> Self {
        Self {
            current: ArcSwap::from_pointee(BestSet::new(None, initial)),
            generation: AtomicU64::new(0),
        }
    }

    /// Replaces the current set in full and returns the published value.
    pub fn publish(&self, mut set: BestSet) -> Arc<BestSet> {
        set.generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let set = Arc::new(set);
        self.current.store(Arc::clone(&set));
        set
    }

    #[must_use]
    pub fn current(&self) -> Arc<BestSet> {
        self.current.load_full()
    }
}
