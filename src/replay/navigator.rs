use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::PrefetchCoordinator;
use crate::api::{LatestSlot, SlotDataSource};
use crate::events::Event;
use crate::state::{SlotCache, SlotId, SlotSnapshot};

/// Result of a move.
#[derive(Debug, Clone)]
pub struct Navigation {
    /// The new current slot
    pub slot: SlotId,
    /// Set on a cache hit. `None` means a fetch was started and its result
    /// will arrive as `Event::SlotLoaded`.
    pub snapshot: Option<Arc<SlotSnapshot>>,
}

/// Tracks the current slot and moves between slots.
///
/// Moves are synchronous; anything that needs the network is spawned and
/// reports back on the event channel.
pub struct SlotNavigator {
    current: SlotId,
    cache: SlotCache,
    source: Arc<dyn SlotDataSource>,
    prefetch: PrefetchCoordinator,
    events: mpsc::Sender<Event>,
    /// Re-query the live head every this many forward moves
    resync_every: u64,
    forward_moves: u64,
    live_head: Option<LatestSlot>,
}

impl SlotNavigator {
    pub fn new(
        cache: SlotCache,
        source: Arc<dyn SlotDataSource>,
        prefetch: PrefetchCoordinator,
        events: mpsc::Sender<Event>,
        resync_every: u64,
    ) -> Self {
        Self {
            current: 0,
            cache,
            source,
            prefetch,
            events,
            resync_every: resync_every.max(1),
            forward_moves: 0,
            live_head: None,
        }
    }

    pub fn current(&self) -> SlotId {
        self.current
    }

    #[cfg(test)]
    pub fn live_head(&self) -> Option<LatestSlot> {
        self.live_head
    }

    pub fn set_live_head(&mut self, latest: LatestSlot) {
        self.live_head = Some(latest);
    }

    /// Current slot is beyond the last known replayable slot.
    pub fn is_past_live_head(&self) -> bool {
        self.live_head.is_some_and(|head| self.current > head.slot)
    }

    /// Move forward one slot. No upper bound: past the live head just shows
    /// an empty slot.
    pub fn next(&mut self) -> Navigation {
        self.current = self.current.saturating_add(1);
        self.forward_moves += 1;

        if self.forward_moves % self.resync_every == 0 {
            self.resync();
        }
        self.load()
    }

    /// Move back one slot. `None` at slot 0.
    pub fn previous(&mut self) -> Option<Navigation> {
        if self.current == 0 {
            return None;
        }
        self.current -= 1;
        Some(self.load())
    }

    /// Go straight to `slot`.
    pub fn jump(&mut self, slot: SlotId) -> Navigation {
        self.current = slot;
        self.load()
    }

    fn load(&self) -> Navigation {
        let slot = self.current;
        let snapshot = self.cache.get(slot);

        if snapshot.is_none() {
            let cache = self.cache.clone();
            let source = Arc::clone(&self.source);
            let events = self.events.clone();

            tokio::spawn(async move {
                let outcome = cache.fetch_or_wait(slot, source.as_ref()).await;
                if events.send(Event::SlotLoaded { slot, outcome }).await.is_err() {
                    debug!(slot, "event loop gone, dropping slot result");
                }
            });
        }

        self.prefetch.prefetch_ahead(slot);
        Navigation { slot, snapshot }
    }

    /// Fire-and-forget refresh of the live head.
    fn resync(&self) {
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        debug!(slot = self.current, "resyncing live head");

        tokio::spawn(async move {
            match source.fetch_latest().await {
                Ok(latest) => {
                    let _ = events.send(Event::LiveHead(latest)).await;
                }
                Err(err) => warn!(%err, "live head resync failed"),
            }
        });
    }
}
