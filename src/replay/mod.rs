mod navigator;
mod prefetch;
mod window;

pub use navigator::{Navigation, SlotNavigator};
pub use prefetch::PrefetchCoordinator;
pub use window::{Headline, VisibilityWindow};

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::api::LatestSlot;
use crate::events::{Command, Event};
use crate::render::{short_hash, Frame, Renderer, StatusKind};
use crate::state::{FetchOutcome, PlaybackClock, SlotId, SlotSnapshot, Tick};

/// Owns the replay: navigator, clock, and what is on screen.
///
/// All state changes happen in [`ReplayEngine::handle`], called from a single
/// event loop.
pub struct ReplayEngine<R: Renderer> {
    navigator: SlotNavigator,
    clock: PlaybackClock,
    /// Snapshot for the current slot; `None` while it is loading
    current: Option<Arc<SlotSnapshot>>,
    renderer: R,
}

impl<R: Renderer> ReplayEngine<R> {
    pub fn new(navigator: SlotNavigator, clock: PlaybackClock, renderer: R) -> Self {
        Self {
            navigator,
            clock,
            current: None,
            renderer,
        }
    }

    /// Begin replay at the latest replayable slot.
    pub fn start(&mut self, latest: LatestSlot) {
        self.navigator.set_live_head(latest);
        let navigation = self.navigator.jump(latest.slot);
        self.show(navigation);
    }

    /// Apply one event. Returns false when the replay should stop.
    pub fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Tick => self.on_tick(),
            Event::SlotLoaded { slot, outcome } => self.on_loaded(slot, outcome),
            Event::LiveHead(latest) => {
                debug!(slot = latest.slot, "live head updated");
                self.navigator.set_live_head(latest);
            }
            Event::Command(command) => return self.on_command(command),
            Event::Shutdown => return false,
        }
        true
    }

    /// Drain events until shutdown or the channel closes.
    pub async fn run(&mut self, mut events: mpsc::Receiver<Event>) {
        while let Some(event) = events.recv().await {
            if !self.handle(event) {
                info!("replay stopped");
                break;
            }
        }
    }

    #[cfg(test)]
    pub fn current_slot(&self) -> SlotId {
        self.navigator.current()
    }

    #[cfg(test)]
    pub fn current_snapshot(&self) -> Option<&Arc<SlotSnapshot>> {
        self.current.as_ref()
    }

    #[cfg(test)]
    pub fn playback(&self) -> crate::state::PlaybackState {
        self.clock.playback()
    }

    #[cfg(test)]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    fn on_tick(&mut self) {
        match self.clock.tick() {
            Tick::Ignored => {}
            Tick::Advanced => self.render(),
            Tick::SlotExpired => {
                let navigation = self.navigator.next();
                self.show(navigation);
            }
        }
    }

    fn on_command(&mut self, command: Command) -> bool {
        match command {
            Command::Next => {
                let navigation = self.navigator.next();
                self.show(navigation);
            }
            Command::Previous => {
                if let Some(navigation) = self.navigator.previous() {
                    self.show(navigation);
                }
            }
            Command::Jump(slot) => {
                let navigation = self.navigator.jump(slot);
                self.show(navigation);
            }
            Command::Pause => {
                self.clock.pause();
                self.render();
            }
            Command::Resume => {
                self.clock.resume();
                self.render();
            }
            Command::Toggle => {
                self.clock.toggle();
                self.render();
            }
            Command::Quit => return false,
        }
        true
    }

    /// Switch display to a new slot. The window restarts in the same step.
    fn show(&mut self, navigation: Navigation) {
        self.clock.slot_changed();

        match navigation.snapshot {
            Some(snapshot) => {
                self.current = Some(snapshot);
                self.clock.advance_complete();
            }
            // Never show the previous slot's bids under the new slot number,
            // and hold the countdown until this one arrives
            None => {
                self.current = None;
                self.clock.begin_load();
            }
        }
        self.render();
    }

    fn on_loaded(&mut self, slot: SlotId, outcome: FetchOutcome) {
        if slot != self.navigator.current() {
            debug!(slot, current = self.navigator.current(), "discarding stale slot result");
            return;
        }

        let snapshot = match outcome {
            Ok(snapshot) => {
                let delivered = snapshot
                    .winning_block_hash()
                    .map(|h| format!(", delivered {}", short_hash(h)))
                    .unwrap_or_default();
                self.renderer.status(
                    &format!("Slot {}: {} bids{}", slot, snapshot.bids().len(), delivered),
                    StatusKind::Connected,
                );
                snapshot
            }
            Err(err) if err.is_not_found() => {
                self.renderer
                    .status(&format!("Slot {}: no bids", slot), StatusKind::Connected);
                Arc::new(SlotSnapshot::empty(slot))
            }
            Err(err) => {
                self.renderer
                    .status(&format!("Slot {}: {}", slot, err), StatusKind::Error);
                Arc::new(SlotSnapshot::empty(slot))
            }
        };

        self.current = Some(snapshot);
        self.clock.advance_complete();
        self.render();
    }

    fn render(&mut self) {
        let playback = self.clock.playback();
        let past_live_head = self.navigator.is_past_live_head();

        let frame = match &self.current {
            Some(snapshot) => Frame {
                slot: snapshot.slot(),
                playback,
                loading: false,
                past_live_head,
                window: VisibilityWindow::at(snapshot, playback.elapsed_secs),
                relays: snapshot.relays(),
            },
            None => Frame {
                slot: self.navigator.current(),
                playback,
                loading: true,
                past_live_head,
                window: VisibilityWindow::empty(),
                relays: &[],
            },
        };
        self.renderer.render(&frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::state::SlotCache;
    use crate::testing::{settle, snapshot, MockSource, RecordingRenderer};
    use std::time::Duration;

    struct Harness {
        engine: ReplayEngine<RecordingRenderer>,
        cache: SlotCache,
        source: Arc<MockSource>,
        rx: mpsc::Receiver<Event>,
    }

    fn harness(source: MockSource) -> Harness {
        let cache = SlotCache::new(100, Duration::from_secs(10));
        let source = Arc::new(source);
        let (tx, rx) = mpsc::channel(256);
        let prefetch = PrefetchCoordinator::new(cache.clone(), source.clone(), 5);
        let navigator = SlotNavigator::new(cache.clone(), source.clone(), prefetch, tx, 10);
        let engine = ReplayEngine::new(navigator, PlaybackClock::default(), RecordingRenderer::default());
        Harness {
            engine,
            cache,
            source,
            rx,
        }
    }

    impl Harness {
        /// Feed every queued event into the engine.
        async fn pump(&mut self) {
            settle().await;
            while let Ok(event) = self.rx.try_recv() {
                self.engine.handle(event);
            }
        }

        fn ticks(&mut self, n: usize) {
            for _ in 0..n {
                self.engine.handle(Event::Tick);
            }
        }
    }

    fn latest(slot: SlotId) -> LatestSlot {
        LatestSlot {
            slot,
            head_offset: 100,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_loads_latest() {
        let mut h = harness(MockSource::new());
        h.engine.start(latest(500));

        assert!(h.engine.current_snapshot().is_none());
        assert!(h.engine.renderer().last_frame().unwrap().loading);

        h.pump().await;
        assert_eq!(h.engine.current_slot(), 500);
        assert_eq!(h.engine.current_snapshot().unwrap().slot(), 500);
        assert_eq!(h.engine.renderer().last_frame().unwrap().slot, 500);
        assert!(!h.engine.renderer().last_frame().unwrap().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bids_revealed_as_time_passes() {
        let mut h = harness(MockSource::new());
        h.engine.start(latest(500));
        h.pump().await;

        // Fixture bids arrive at 0s, 1s, 2s
        h.ticks(5);
        assert_eq!(h.engine.renderer().last_frame().unwrap().visible, 1);
        h.ticks(10);
        assert_eq!(h.engine.renderer().last_frame().unwrap().visible, 2);
        h.ticks(10);
        assert_eq!(h.engine.renderer().last_frame().unwrap().visible, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_advances_exactly_once() {
        let mut h = harness(MockSource::new());
        h.engine.start(latest(500));
        h.pump().await;

        // 501 was prefetched, so the advance is served from cache
        h.ticks(120);
        assert_eq!(h.engine.current_slot(), 501);
        assert_eq!(h.engine.playback().elapsed_secs, 0.0);
        assert_eq!(h.engine.playback().remaining_secs, 12.0);
        assert!(!h.engine.playback().is_transitioning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_dropped_while_advance_in_flight() {
        let mut h = harness(MockSource::new().with_delay(Duration::from_millis(500)));
        h.cache.insert(snapshot(500, 3));
        h.engine.handle(Event::Command(Command::Jump(500)));

        // 501 is still being prefetched, so the advance has to wait on it
        h.ticks(120);
        assert_eq!(h.engine.current_slot(), 501);
        assert!(h.engine.playback().is_transitioning);
        assert!(h.engine.current_snapshot().is_none());

        h.ticks(200);
        assert_eq!(h.engine.current_slot(), 501);
        assert_eq!(h.engine.playback().elapsed_secs, 0.0);

        h.pump().await;
        assert!(!h.engine.playback().is_transitioning);
        assert_eq!(h.engine.current_snapshot().unwrap().slot(), 501);
        // Waited on the prefetch instead of fetching again
        assert_eq!(h.source.calls_for(501), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_held_while_slot_loads() {
        let mut h = harness(MockSource::new().with_delay(Duration::from_secs(13)));
        h.engine.handle(Event::Command(Command::Jump(700)));

        // Longer than the whole slot window
        h.ticks(150);
        assert_eq!(h.engine.current_slot(), 700);
        assert_eq!(h.engine.playback().elapsed_secs, 0.0);
        assert!(h.engine.playback().is_transitioning);
        assert!(h.engine.renderer().last_frame().unwrap().loading);

        tokio::time::sleep(Duration::from_secs(13)).await;
        h.pump().await;
        assert_eq!(h.engine.current_snapshot().unwrap().slot(), 700);
        assert!(!h.engine.playback().is_transitioning);

        // Bids replay from the start of the window
        h.ticks(5);
        let frame = h.engine.renderer().last_frame().unwrap();
        assert_eq!(frame.slot, 700);
        assert_eq!(frame.visible, 1);
        assert_eq!(frame.elapsed_secs, 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_navigation_resets_window() {
        let mut h = harness(MockSource::new());
        h.engine.start(latest(500));
        h.pump().await;
        h.ticks(60);
        assert_eq!(h.engine.playback().elapsed_secs, 6.0);

        h.engine.handle(Event::Command(Command::Next));
        assert_eq!(h.engine.current_slot(), 501);
        assert_eq!(h.engine.playback().remaining_secs, 12.0);

        h.engine.handle(Event::Command(Command::Previous));
        assert_eq!(h.engine.current_slot(), 500);
        assert_eq!(h.engine.playback().elapsed_secs, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_result_does_not_clobber() {
        let mut h = harness(MockSource::new());
        h.engine.start(latest(500));
        h.pump().await;

        h.engine.handle(Event::Command(Command::Jump(900)));
        // A late answer for a slot we already left
        h.engine.handle(Event::SlotLoaded {
            slot: 500,
            outcome: Ok(Arc::new(snapshot(500, 9))),
        });

        assert_eq!(h.engine.current_slot(), 900);
        assert!(h.engine.current_snapshot().is_none());

        h.pump().await;
        assert_eq!(h.engine.current_snapshot().unwrap().slot(), 900);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_slot_shows_empty_and_keeps_going() {
        let mut h = harness(MockSource::new().failing(700));
        h.engine.handle(Event::Command(Command::Jump(700)));
        h.pump().await;

        let current = h.engine.current_snapshot().unwrap();
        assert_eq!(current.slot(), 700);
        assert!(current.is_empty());
        assert_eq!(h.engine.renderer().errors(), 1);

        h.engine.handle(Event::Command(Command::Next));
        h.pump().await;
        assert_eq!(h.engine.current_snapshot().unwrap().slot(), 701);
        assert!(!h.engine.current_snapshot().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_an_error() {
        let mut h = harness(MockSource::new().missing(800));
        h.engine.handle(Event::Command(Command::Jump(800)));
        h.pump().await;

        assert!(h.engine.current_snapshot().unwrap().is_empty());
        assert_eq!(h.engine.renderer().errors(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_resume() {
        let mut h = harness(MockSource::new());
        h.engine.start(latest(500));
        h.pump().await;
        h.ticks(40);

        h.engine.handle(Event::Command(Command::Pause));
        h.ticks(200);
        assert_eq!(h.engine.current_slot(), 500);
        assert_eq!(h.engine.playback().elapsed_secs, 4.0);
        assert!(!h.engine.playback().is_playing);

        h.engine.handle(Event::Command(Command::Toggle));
        assert!(h.engine.playback().is_playing);
        assert_eq!(h.engine.playback().remaining_secs, 12.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_head_and_quit() {
        let mut h = harness(MockSource::new());
        h.engine.start(latest(500));
        assert!(h.engine.handle(Event::LiveHead(latest(499))));
        h.pump().await;
        assert!(h.engine.renderer().last_frame().unwrap().past_live_head);

        assert!(!h.engine.handle(Event::Command(Command::Quit)));
        assert!(!h.engine.handle(Event::Shutdown));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_names_delivered_block() {
        let mut h = harness(MockSource::new());
        h.engine.handle(Event::Command(Command::Jump(10)));
        h.engine.handle(Event::SlotLoaded {
            slot: 10,
            outcome: Ok(Arc::new(SlotSnapshot::new(
                10,
                vec![],
                vec![],
                Some("0xdeadbeefcafe".to_string()),
            ))),
        });

        let (text, kind) = h.engine.renderer().statuses.last().unwrap();
        assert_eq!(text, "Slot 10: 0 bids, delivered 0xdeadbeef...");
        assert_eq!(*kind, StatusKind::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_outcome_variants() {
        let mut h = harness(MockSource::new());
        h.engine.handle(Event::Command(Command::Jump(10)));
        h.engine.handle(Event::SlotLoaded {
            slot: 10,
            outcome: Err(FetchError::WaitTimeout(10)),
        });

        assert!(h.engine.current_snapshot().unwrap().is_empty());
        assert_eq!(h.engine.renderer().errors(), 1);
        assert_eq!(h.source.snapshot_calls(), 0);
        assert_eq!(h.cache.len(), 0);
        assert!(h.engine.playback().is_playing);
    }
}
