//! Mute state types.

use std::fmt;

/// A volume known to give audible input. Never 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedVolume(u8);

impl SavedVolume {
    pub const FULL: SavedVolume = SavedVolume(100);

    /// Builds a saved volume from a live reading. A reading of 0 would
    /// restore a silent microphone, so it becomes full volume instead.
    pub fn from_reading(level: u8) -> Self {
        match level.min(100) {
            0 => Self::FULL,
            level => SavedVolume(level),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for SavedVolume {
    fn default() -> Self {
        Self::FULL
    }
}

impl fmt::Display for SavedVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the microphone looks like to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicState {
    /// Input is audible
    Live,
    /// Input is silenced
    Muted,
}

/// The process-wide mute state, owned by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuteState {
    pub is_muted: bool,
    pub saved_volume: SavedVolume,
    /// Set while a toggle is in flight or settling
    pub is_toggling: bool,
}

impl MuteState {
    /// Derives the startup state from the system input volume: 0 means the
    /// user left the microphone muted.
    pub fn from_startup_volume(level: u8) -> Self {
        Self {
            is_muted: level == 0,
            saved_volume: SavedVolume::from_reading(level),
            is_toggling: false,
        }
    }

    pub fn mic_state(&self) -> MicState {
        if self.is_muted {
            MicState::Muted
        } else {
            MicState::Live
        }
    }
}
