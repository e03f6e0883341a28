use thiserror::Error;

use crate::state::SlotId;

/// Everything that can go wrong while getting a slot's data.
///
/// `Clone` because a single in-flight fetch broadcasts its outcome to every
/// waiter registered on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),

    /// Slot has no data upstream. Displayed as an empty slot, not an error.
    #[error("slot {0} has no data")]
    NotFound(SlotId),

    #[error("timed out waiting for in-flight fetch of slot {0}")]
    WaitTimeout(SlotId),

    /// The fetch we were waiting on was dropped before it finished.
    #[error("in-flight fetch of slot {0} was abandoned")]
    Abandoned(SlotId),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
