mod dashboard;

pub use dashboard::HttpSlotSource;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::state::{SlotId, SlotSnapshot};

/// Newest slot that is safe to replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestSlot {
    /// Already offset back from the live chain head
    pub slot: SlotId,
    /// How many slots behind head `slot` is
    pub head_offset: u64,
}

/// Where slot data comes from.
#[async_trait]
pub trait SlotDataSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<LatestSlot, FetchError>;

    async fn fetch_snapshot(&self, slot: SlotId) -> Result<SlotSnapshot, FetchError>;
}
