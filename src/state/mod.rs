mod builders;
mod cache;
mod playback;
mod snapshot;

pub use builders::{fallback_label, BuilderPalette, BUILDER_COLORS};
pub use cache::{Claim, FetchOutcome, SlotCache};
pub use playback::{PlaybackClock, PlaybackState, Tick};
pub use snapshot::{seconds_in_slot, slot_start_time, Bid, SlotId, SlotSnapshot};
