use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::trace;

use crate::api::SlotDataSource;
use crate::error::FetchError;
use crate::state::{SlotId, SlotSnapshot};

/// Result of fetching one slot, as seen by every interested caller.
pub type FetchOutcome = Result<Arc<SlotSnapshot>, FetchError>;

type Completion = watch::Receiver<Option<FetchOutcome>>;

/// Bounded slot snapshot cache with in-flight fetch deduplication.
///
/// Eviction is FIFO by insertion order, not access recency. Cheap to clone;
/// clones share the same storage.
#[derive(Clone)]
pub struct SlotCache {
    shared: Arc<Mutex<CacheInner>>,
    wait_timeout: Duration,
}

struct CacheInner {
    capacity: usize,
    entries: HashMap<SlotId, Arc<SlotSnapshot>>,
    /// Insertion order, oldest first
    order: VecDeque<SlotId>,
    /// Slots being fetched → channel their outcome is published on
    pending: HashMap<SlotId, Completion>,
}

impl CacheInner {
    fn insert(&mut self, snapshot: Arc<SlotSnapshot>) -> Arc<SlotSnapshot> {
        let slot = snapshot.slot();
        if let Some(existing) = self.entries.get(&slot) {
            return Arc::clone(existing);
        }

        self.entries.insert(slot, Arc::clone(&snapshot));
        self.order.push_back(slot);

        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    trace!(slot = oldest, "evicted");
                }
                None => break,
            }
        }
        snapshot
    }
}

/// What a caller gets when it asks to fetch a slot.
pub enum Claim {
    /// Already cached
    Cached(Arc<SlotSnapshot>),
    /// Someone else is fetching it; wait on them
    InFlight(Waiter),
    /// Caller now owns the fetch and must complete it
    Owner(PendingFetch),
}

impl SlotCache {
    pub fn new(capacity: usize, wait_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Mutex::new(CacheInner {
                capacity: capacity.max(1),
                entries: HashMap::new(),
                order: VecDeque::new(),
                pending: HashMap::new(),
            })),
            wait_timeout,
        }
    }

    pub fn get(&self, slot: SlotId) -> Option<Arc<SlotSnapshot>> {
        self.shared.lock().entries.get(&slot).cloned()
    }

    #[cfg(test)]
    pub fn contains(&self, slot: SlotId) -> bool {
        self.shared.lock().entries.contains_key(&slot)
    }

    #[cfg(test)]
    pub fn is_pending(&self, slot: SlotId) -> bool {
        self.shared.lock().pending.contains_key(&slot)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.shared.lock().entries.len()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.shared.lock().capacity
    }

    #[cfg(test)]
    /// Store a snapshot. If the slot is already cached the existing entry is
    /// kept (and returned) and its eviction position does not change.
    pub fn insert(&self, snapshot: SlotSnapshot) -> Arc<SlotSnapshot> {
        self.shared.lock().insert(Arc::new(snapshot))
    }

    /// Look up a slot and, if it is neither cached nor being fetched, register
    /// the caller as the one fetching it. Never blocks.
    pub fn claim(&self, slot: SlotId) -> Claim {
        let mut inner = self.shared.lock();

        if let Some(snapshot) = inner.entries.get(&slot) {
            return Claim::Cached(Arc::clone(snapshot));
        }

        if let Some(rx) = inner.pending.get(&slot) {
            return Claim::InFlight(Waiter {
                slot,
                rx: rx.clone(),
            });
        }

        let (tx, rx) = watch::channel(None);
        inner.pending.insert(slot, rx);

        Claim::Owner(PendingFetch {
            slot,
            shared: Arc::clone(&self.shared),
            tx,
            settled: false,
        })
    }

    /// Get a slot, fetching it from `source` unless it is cached or another
    /// caller is already fetching it, in which case we wait for their result.
    pub async fn fetch_or_wait(&self, slot: SlotId, source: &dyn SlotDataSource) -> FetchOutcome {
        match self.claim(slot) {
            Claim::Cached(snapshot) => {
                trace!(slot, "cache hit");
                Ok(snapshot)
            }
            Claim::InFlight(waiter) => waiter.wait(self.wait_timeout).await,
            Claim::Owner(pending) => {
                let result = source.fetch_snapshot(slot).await;
                pending.complete(result)
            }
        }
    }
}

/// Registration for a fetch in progress.
///
/// Dropping it without calling [`PendingFetch::complete`] clears the pending
/// mark and releases waiters with [`FetchError::Abandoned`].
pub struct PendingFetch {
    slot: SlotId,
    shared: Arc<Mutex<CacheInner>>,
    tx: watch::Sender<Option<FetchOutcome>>,
    settled: bool,
}

impl PendingFetch {
    #[cfg(test)]
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Publish the fetch result: cache it on success, clear the pending mark,
    /// then wake every waiter with the same outcome.
    pub fn complete(mut self, result: Result<SlotSnapshot, FetchError>) -> FetchOutcome {
        let outcome = {
            let mut inner = self.shared.lock();
            let outcome = result.map(|snapshot| inner.insert(Arc::new(snapshot)));
            inner.pending.remove(&self.slot);
            outcome
        };
        self.settled = true;

        // No receivers left is fine: nobody is waiting.
        let _ = self.tx.send(Some(outcome.clone()));
        outcome
    }
}

impl Drop for PendingFetch {
    fn drop(&mut self) {
        if !self.settled {
            self.shared.lock().pending.remove(&self.slot);
        }
    }
}

/// Handle on someone else's in-flight fetch.
pub struct Waiter {
    slot: SlotId,
    rx: Completion,
}

impl Waiter {
    /// Wait for the owner's outcome, giving up after `limit`.
    pub async fn wait(mut self, limit: Duration) -> FetchOutcome {
        let slot = self.slot;
        match timeout(limit, self.rx.wait_for(Option::is_some)).await {
            Ok(Ok(value)) => value.clone().unwrap_or(Err(FetchError::Abandoned(slot))),
            Ok(Err(_)) => Err(FetchError::Abandoned(slot)),
            Err(_) => Err(FetchError::WaitTimeout(slot)),
        }
    }
}
