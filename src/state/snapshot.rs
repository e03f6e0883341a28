use chrono::{DateTime, Utc};

/// Slot number. Slots are 12 seconds on mainnet.
pub type SlotId = u64;

/// Mainnet beacon genesis in milliseconds.
pub const GENESIS_MS: i64 = 1_606_824_023_000;

/// Slot length in milliseconds.
pub const SLOT_MS: i64 = 12_000;

/// Wall-clock start of a slot.
pub fn slot_start_ms(slot: SlotId) -> i64 {
    let slot = i64::try_from(slot).unwrap_or(i64::MAX);
    GENESIS_MS.saturating_add(slot.saturating_mul(SLOT_MS))
}

/// Seconds between slot start and `timestamp_ms`. Negative when the bid
/// was seen before the slot began.
pub fn seconds_in_slot(slot: SlotId, timestamp_ms: i64) -> f64 {
    timestamp_ms.saturating_sub(slot_start_ms(slot)) as f64 / 1000.0
}

/// Slot start as a UTC datetime.
pub fn slot_start_time(slot: SlotId) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(slot_start_ms(slot))
}

/// A single builder bid as replayed.
#[derive(Debug, Clone, PartialEq)]
pub struct Bid {
    pub builder_key: String,
    pub builder_label: String,
    /// Display color token (e.g. "#38bdf8")
    pub color: String,
    /// Bid value in ETH
    pub value: f64,
    /// Seconds after slot start this bid was first seen, never negative
    pub arrival_offset_secs: f64,
    pub is_winning: bool,
    pub block_hash: Option<String>,
}

/// All bid/relay data for one slot.
///
/// Immutable after construction. Shared as `Arc<SlotSnapshot>` between the
/// cache and whoever is displaying it.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSnapshot {
    slot: SlotId,
    bids: Vec<Bid>,
    relays: Vec<String>,
    winning_block_hash: Option<String>,
}

impl SlotSnapshot {
    /// Build a snapshot. Bids stay in the given (arrival) order.
    ///
    /// Only the first bid flagged as winning keeps the flag; a slot has at
    /// most one delivered payload.
    pub fn new(
        slot: SlotId,
        mut bids: Vec<Bid>,
        relays: Vec<String>,
        winning_block_hash: Option<String>,
    ) -> Self {
        let mut seen_winner = false;
        for bid in bids.iter_mut() {
            if bid.is_winning {
                if seen_winner {
                    bid.is_winning = false;
                }
                seen_winner = true;
            }
            if bid.arrival_offset_secs < 0.0 || bid.arrival_offset_secs.is_nan() {
                bid.arrival_offset_secs = 0.0;
            }
        }

        Self {
            slot,
            bids,
            relays,
            winning_block_hash,
        }
    }

    /// Placeholder shown for slots with no data or a failed fetch.
    pub fn empty(slot: SlotId) -> Self {
        Self::new(slot, Vec::new(), Vec::new(), None)
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    pub fn relays(&self) -> &[String] {
        &self.relays
    }

    pub fn winning_block_hash(&self) -> Option<&str> {
        self.winning_block_hash.as_deref()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }
}
