use crate::api::LatestSlot;
use crate::state::{FetchOutcome, SlotId};

/// Everything the replay loop reacts to. Background tasks only talk to the
/// engine through these.
#[derive(Debug)]
pub enum Event {
    // Playback timer fired (every tick period)
    Tick,

    // A slot fetch started by navigation finished
    SlotLoaded { slot: SlotId, outcome: FetchOutcome },

    // Fresh live upper bound from a resync
    LiveHead(LatestSlot),

    // User input
    Command(Command),

    // Ctrl+C or stdin closed
    Shutdown,
}

/// User controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    Jump(SlotId),
    Pause,
    Resume,
    Toggle,
    Quit,
}

impl Command {
    /// Parse one line of console input.
    ///
    /// Empty line or "space" toggles play/pause.
    pub fn parse(line: &str) -> Option<Command> {
        let mut parts = line.split_whitespace();
        let head = match parts.next() {
            Some(head) => head.to_ascii_lowercase(),
            None => return Some(Command::Toggle),
        };

        let command = match head.as_str() {
            "n" | "next" => Command::Next,
            "p" | "prev" | "previous" => Command::Previous,
            "j" | "jump" => Command::Jump(parts.next()?.parse().ok()?),
            "pause" => Command::Pause,
            "play" | "resume" => Command::Resume,
            "space" | "toggle" => Command::Toggle,
            "q" | "quit" | "exit" => Command::Quit,
            _ => return None,
        };

        if parts.next().is_some() {
            return None;
        }
        Some(command)
    }
}
