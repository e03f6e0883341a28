use std::time::Duration;

use tracing::info;

use crate::api::{LatestSlot, SlotDataSource};
use crate::render::{Renderer, StatusKind};

/// Find the slot to start replaying from, retrying every `retry_delay`
/// until the source answers.
pub async fn await_latest(
    source: &dyn SlotDataSource,
    retry_delay: Duration,
    renderer: &mut dyn Renderer,
) -> LatestSlot {
    let mut attempt: u32 = 1;

    loop {
        info!("[bootstrap] fetching latest slot (attempt {})", attempt);

        match source.fetch_latest().await {
            Ok(latest) => {
                renderer.status(
                    &format!(
                        "Connected: replaying from slot {} ({} behind head)",
                        latest.slot, latest.head_offset
                    ),
                    StatusKind::Connected,
                );
                return latest;
            }
            Err(e) => {
                renderer.status(
                    &format!(
                        "Failed to reach data source: {}. Retrying in {}s...",
                        e,
                        retry_delay.as_secs()
                    ),
                    StatusKind::Error,
                );
            }
        }

        tokio::time::sleep(retry_delay).await;
        attempt = attempt.saturating_add(1);
    }
}
