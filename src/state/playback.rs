use std::time::Duration;

/// Default replay window per slot.
pub const SLOT_DURATION: Duration = Duration::from_secs(12);

/// Default tick period.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Where the countdown is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    /// Paused; ticks are ignored
    Idle,
    /// Counting down
    Running,
    /// Countdown expired and a slot advance is in flight; ticks are ignored
    Transitioning,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Clock was not running
    Ignored,
    /// Elapsed time moved forward
    Advanced,
    /// Countdown hit zero; caller must advance the slot
    SlotExpired,
}

/// Read-only view of playback for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub elapsed_secs: f64,
    pub remaining_secs: f64,
    pub is_playing: bool,
    pub is_transitioning: bool,
}

/// Fixed-period countdown over one slot's replay window.
///
/// Elapsed time is the sum of tick periods, not wall-clock time: missed ticks
/// are never caught up.
#[derive(Debug)]
pub struct PlaybackClock {
    state: ClockState,
    slot_duration: Duration,
    tick: Duration,
    elapsed: Duration,
    playing: bool,
    /// Set from expiry or `begin_load` until `advance_complete`, survives
    /// pause/resume
    advance_in_flight: bool,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(SLOT_DURATION, TICK_INTERVAL, true)
    }
}

impl PlaybackClock {
    pub fn new(slot_duration: Duration, tick: Duration, autoplay: bool) -> Self {
        Self {
            state: if autoplay { ClockState::Running } else { ClockState::Idle },
            slot_duration,
            tick,
            elapsed: Duration::ZERO,
            playing: autoplay,
            advance_in_flight: false,
        }
    }

    /// Advance by one tick period.
    pub fn tick(&mut self) -> Tick {
        if self.state != ClockState::Running {
            return Tick::Ignored;
        }

        self.elapsed = (self.elapsed + self.tick).min(self.slot_duration);

        if self.elapsed >= self.slot_duration {
            self.state = ClockState::Transitioning;
            self.advance_in_flight = true;
            Tick::SlotExpired
        } else {
            Tick::Advanced
        }
    }

    /// Restart the window. Must happen together with every slot id change.
    pub fn slot_changed(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    /// The new slot has to be fetched before it can be shown. Ticks are
    /// ignored until `advance_complete`.
    pub fn begin_load(&mut self) {
        self.advance_in_flight = true;
        if self.playing {
            self.state = ClockState::Transitioning;
        }
    }

    /// The pending slot (expiry advance or load) has arrived.
    pub fn advance_complete(&mut self) {
        if !self.advance_in_flight {
            return;
        }
        self.advance_in_flight = false;
        self.state = if self.playing {
            ClockState::Running
        } else {
            ClockState::Idle
        };
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.state = ClockState::Idle;
    }

    /// Resume always restarts the full window.
    pub fn resume(&mut self) {
        self.playing = true;
        self.elapsed = Duration::ZERO;
        self.state = if self.advance_in_flight {
            ClockState::Transitioning
        } else {
            ClockState::Running
        };
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.resume();
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> ClockState {
        self.state
    }

    #[cfg(test)]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_transitioning(&self) -> bool {
        self.state == ClockState::Transitioning
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn remaining_secs(&self) -> f64 {
        self.slot_duration.saturating_sub(self.elapsed).as_secs_f64()
    }

    pub fn playback(&self) -> PlaybackState {
        PlaybackState {
            elapsed_secs: self.elapsed_secs(),
            remaining_secs: self.remaining_secs(),
            is_playing: self.playing,
            is_transitioning: self.is_transitioning(),
        }
    }
}
