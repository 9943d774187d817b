use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::upstream::{best_set::BestSetPublisher, NoUpstreamAvailable, Upstream};

/// Round-robin selection over the current best set.
///
/// The cursor is shared across generations, so rotation restarts at an arbitrary
/// member after the set is replaced.
pub struct UpstreamRouter {
    best_set: Arc<BestSetPublisher>,
    cursor: AtomicUsize,
}

impl UpstreamRouter {
    #[must_use]
    pub fn new(best_set: Arc<BestSetPublisher>) -> Self {
        Self { best_set, cursor: AtomicUsize::new(0) }
    }

    /// Picks the next upstream.
    ///
    /// # Errors
    ///
    /// Returns [`NoUpstreamAvailable`] when no upstream produced a head in the last cycle.
    pub fn select_upstream(&self) -> Result<Arc<Upstream>, NoUpstreamAvailable> {
        let set = self.best_set.current();
        let members = set.members();
        if members.is_empty() {
            return Err(NoUpstreamAvailable);
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % members.len();
        tracing::trace!(index, generation = set.generation(), "selected upstream");
        Ok(Arc::clone(&members[index]))
    }
}
