//! Playback status as tracked by the client, and the commands that change it.
//!
//! The media engine never reports volume back, so the client keeps its own
//! book: every command the user issues is applied here as well as sent to the
//! player.

use serde::{Deserialize, Serialize};

pub const MAX_VOLUME: u8 = 100;

/// Commands understood by the playback actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerCommand {
    VolumeUp,
    VolumeDown,
    ToggleMute,
    TogglePause,
    Quit,
}

impl PlayerCommand {
    /// Single-byte control token for the media engine's stdin.
    pub fn token(self) -> u8 {
        match self {
            PlayerCommand::VolumeUp => b'0',
            PlayerCommand::VolumeDown => b'9',
            PlayerCommand::ToggleMute => b'm',
            PlayerCommand::TogglePause => b' ',
            PlayerCommand::Quit => b'q',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub volume: u8,
    pub muted: bool,
    pub playing: bool,
}

impl PlaybackStatus {
    pub fn new(volume: u8) -> Self {
        Self {
            volume: volume.min(MAX_VOLUME),
            muted: false,
            playing: true,
        }
    }

    /// Status after `cmd`, with volume moving by `step` and clamped to 0..=100.
    pub fn apply(self, cmd: PlayerCommand, step: u8) -> Self {
        let mut next = self;
        match cmd {
            PlayerCommand::VolumeUp => {
                next.volume = self.volume.saturating_add(step).min(MAX_VOLUME);
            }
            PlayerCommand::VolumeDown => {
                next.volume = self.volume.saturating_sub(step);
            }
            PlayerCommand::ToggleMute => next.muted = !self.muted,
            PlayerCommand::TogglePause => next.playing = !self.playing,
            PlayerCommand::Quit => next.playing = false,
        }
        next
    }
}

impl Default for PlaybackStatus {
    fn default() -> Self {
        Self::new(MAX_VOLUME)
    }
}
