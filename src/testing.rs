//! Test doubles shared across modules.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::api::{LatestSlot, SlotDataSource};
use crate::error::FetchError;
use crate::render::{Frame, Renderer, StatusKind};
use crate::state::{Bid, SlotId, SlotSnapshot};

/// Bid with a fixed color and label derived from the key.
pub fn bid(key: &str, value: f64, offset: f64) -> Bid {
    Bid {
        builder_key: key.to_string(),
        builder_label: key.to_uppercase(),
        color: "#38bdf8".to_string(),
        value,
        arrival_offset_secs: offset,
        is_winning: false,
        block_hash: None,
    }
}

/// Snapshot with `bids` bids spread over the first seconds of the slot.
pub fn snapshot(slot: SlotId, bids: usize) -> SlotSnapshot {
    let bids = (0..bids)
        .map(|i| bid(&format!("builder-{}", i % 3), 0.01 * (i + 1) as f64, i as f64))
        .collect();
    SlotSnapshot::new(slot, bids, vec!["flashbots".to_string()], None)
}

/// Let spawned tasks (and any paused-clock timers) run to completion.
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}

/// In-memory slot source with call counting.
pub struct MockSource {
    delay: Duration,
    latest: SlotId,
    missing: HashSet<SlotId>,
    failing: HashSet<SlotId>,
    /// Remaining `fetch_latest` calls that should fail
    latest_failures: AtomicUsize,
    latest_calls: AtomicUsize,
    calls: Mutex<HashMap<SlotId, usize>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            latest: 1_000,
            missing: HashSet::new(),
            failing: HashSet::new(),
            latest_failures: AtomicUsize::new(0),
            latest_calls: AtomicUsize::new(0),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_latest(mut self, slot: SlotId) -> Self {
        self.latest = slot;
        self
    }

    /// Slot answers `NotFound`.
    pub fn missing(mut self, slot: SlotId) -> Self {
        self.missing.insert(slot);
        self
    }

    /// Slot answers a transport error.
    pub fn failing(mut self, slot: SlotId) -> Self {
        self.failing.insert(slot);
        self
    }

    /// First `n` `fetch_latest` calls fail.
    pub fn failing_latest(self, n: usize) -> Self {
        self.latest_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn snapshot_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    pub fn calls_for(&self, slot: SlotId) -> usize {
        self.calls.lock().get(&slot).copied().unwrap_or(0)
    }

    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SlotDataSource for MockSource {
    async fn fetch_latest(&self) -> Result<LatestSlot, FetchError> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failed = self
            .latest_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(FetchError::Transport("connection refused".to_string()));
        }

        Ok(LatestSlot {
            slot: self.latest,
            head_offset: 100,
        })
    }

    async fn fetch_snapshot(&self, slot: SlotId) -> Result<SlotSnapshot, FetchError> {
        *self.calls.lock().entry(slot).or_insert(0) += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failing.contains(&slot) {
            return Err(FetchError::Transport("connection reset".to_string()));
        }
        if self.missing.contains(&slot) {
            return Err(FetchError::NotFound(slot));
        }
        Ok(snapshot(slot, 3))
    }
}

/// What a renderer was shown, flattened so it outlives the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub slot: SlotId,
    pub loading: bool,
    pub visible: usize,
    pub elapsed_secs: f64,
    pub headline: Option<String>,
    pub past_live_head: bool,
}

/// Renderer that keeps everything it was given.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub frames: Vec<FrameRecord>,
    pub statuses: Vec<(String, StatusKind)>,
}

impl RecordingRenderer {
    pub fn last_frame(&self) -> Option<&FrameRecord> {
        self.frames.last()
    }

    pub fn errors(&self) -> usize {
        self.statuses
            .iter()
            .filter(|(_, kind)| *kind == StatusKind::Error)
            .count()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, frame: &Frame<'_>) {
        self.frames.push(FrameRecord {
            slot: frame.slot,
            loading: frame.loading,
            visible: frame.window.len(),
            elapsed_secs: frame.playback.elapsed_secs,
            headline: frame.window.headline().map(|h| h.bid().builder_key.clone()),
            past_live_head: frame.past_live_head,
        });
    }

    fn status(&mut self, text: &str, kind: StatusKind) {
        self.statuses.push((text.to_string(), kind));
    }
}
