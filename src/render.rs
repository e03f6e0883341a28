use tracing::{debug, info, warn};

use crate::replay::{Headline, VisibilityWindow};
use crate::state::{slot_start_time, PlaybackState, SlotId};

/// Coarse status for connectivity/progress feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Connected,
    Error,
}

/// First 10 characters of a block hash, for display.
pub fn short_hash(hash: &str) -> String {
    let prefix: String = hash.chars().take(10).collect();
    format!("{}...", prefix)
}

/// Everything a display needs for one update. Read-only.
#[derive(Debug)]
pub struct Frame<'a> {
    pub slot: SlotId,
    pub playback: PlaybackState,
    /// Slot data has not arrived yet
    pub loading: bool,
    /// Slot is beyond the last known replayable slot
    pub past_live_head: bool,
    pub window: VisibilityWindow<'a>,
    pub relays: &'a [String],
}

/// Display collaborator driven by the replay engine.
pub trait Renderer {
    fn render(&mut self, frame: &Frame<'_>);

    fn status(&mut self, text: &str, kind: StatusKind);
}

/// Logs a line whenever what is on screen meaningfully changes.
#[derive(Debug, Default)]
pub struct ConsoleRenderer {
    /// (slot, loading, visible bids, playing) of the last printed frame
    last: Option<(SlotId, bool, usize, bool)>,
}

impl Renderer for ConsoleRenderer {
    fn render(&mut self, frame: &Frame<'_>) {
        let key = (
            frame.slot,
            frame.loading,
            frame.window.len(),
            frame.playback.is_playing,
        );
        if self.last == Some(key) {
            return;
        }
        self.last = Some(key);

        let started = slot_start_time(frame.slot)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_default();

        if frame.loading {
            info!("slot {} ({}) loading...", frame.slot, started);
            return;
        }

        let stats = frame.window.stats();
        let headline = match frame.window.headline() {
            Some(headline) => {
                let bid = headline.bid();
                debug!(builder = %bid.builder_key, color = %bid.color, "headline builder");
                match headline {
                    Headline::Delivered(_) => format!(
                        "delivered {} {:.4} ETH{}",
                        bid.builder_label,
                        bid.value,
                        bid.block_hash
                            .as_deref()
                            .map(|h| format!(" in {}", short_hash(h)))
                            .unwrap_or_default(),
                    ),
                    Headline::Leading(_) => {
                        format!("leading {} {:.4} ETH", bid.builder_label, bid.value)
                    }
                }
            }
            None => "no bids yet".to_string(),
        };

        let mode = if frame.playback.is_transitioning {
            "[advancing] "
        } else if !frame.playback.is_playing {
            "[paused] "
        } else {
            ""
        };

        info!(
            "slot {} ({}) {}{:>5.1}s left | {} bids from {} builders, max {:.4} ETH | {} | relays: {}{}",
            frame.slot,
            started,
            mode,
            frame.playback.remaining_secs,
            stats.bid_count,
            stats.builder_count,
            stats.max_value,
            headline,
            frame.relays.join(", "),
            if frame.past_live_head { " (past live head)" } else { "" },
        );
    }

    fn status(&mut self, text: &str, kind: StatusKind) {
        match kind {
            StatusKind::Connected => info!("{}", text),
            StatusKind::Error => warn!("{}", text),
        }
    }
}
