use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::events::Event;

/// Spawns the playback timer. Sends `Event::Tick` every `period`.
///
/// Late ticks are skipped and ticks are dropped when the loop is behind, so
/// playback never fast-forwards to catch up.
pub fn spawn(period: Duration, tx: mpsc::Sender<Event>) {
    tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately
        timer.tick().await;

        loop {
            timer.tick().await;
            match tx.try_send(Event::Tick) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => debug!("event loop busy, dropping tick"),
                Err(TrySendError::Closed(_)) => break,
            }
        }
    });
}
