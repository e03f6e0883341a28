use std::sync::Arc;

use tracing::debug;

use crate::api::SlotDataSource;
use crate::state::{Claim, SlotCache, SlotId};

/// Keeps the next few slots warm in the cache.
pub struct PrefetchCoordinator {
    cache: SlotCache,
    source: Arc<dyn SlotDataSource>,
    window: u64,
}

impl PrefetchCoordinator {
    pub fn new(cache: SlotCache, source: Arc<dyn SlotDataSource>, window: u64) -> Self {
        Self {
            cache,
            source,
            window,
        }
    }

    /// Start background fetches for `from+1 ..= from+window`, skipping slots
    /// already cached or in flight. Returns how many were started.
    ///
    /// Never blocks and never reports failures; a later call covering the same
    /// slots retries them.
    pub fn prefetch_ahead(&self, from: SlotId) -> usize {
        let mut started = 0;

        for slot in (1..=self.window).filter_map(|offset| from.checked_add(offset)) {
            let pending = match self.cache.claim(slot) {
                Claim::Owner(pending) => pending,
                Claim::Cached(_) | Claim::InFlight(_) => continue,
            };

            let source = Arc::clone(&self.source);
            tokio::spawn(async move {
                let result = source.fetch_snapshot(slot).await;
                if let Err(err) = pending.complete(result) {
                    debug!(slot, %err, "prefetch failed");
                }
            });
            started += 1;
        }

        started
    }
}
