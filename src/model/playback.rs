//! Playback-related types and state management

use std::time::Instant;

use super::track::Track;
use super::types::AuthStatus;

pub const DEFAULT_VOLUME_PERCENT: u8 = 50;

/// Transport state of the playback session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransportState {
    /// Nothing loaded
    #[default]
    Empty,
    /// Tracks loaded, nothing playing
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    pub fn is_playing(self) -> bool {
        self == TransportState::Playing
    }
}

/// Timing state for smooth progress bar updates between device reports
#[derive(Clone, Debug)]
pub struct PlaybackTiming {
    pub position_ms: u64,
    pub last_update: Instant,
    pub is_playing: bool,
    pub duration_ms: u64,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            position_ms: 0,
            last_update: Instant::now(),
            is_playing: false,
            duration_ms: 0,
        }
    }
}

impl PlaybackTiming {
    pub fn current_position_ms(&self) -> u64 {
        if self.is_playing && self.duration_ms > 0 {
            let elapsed = self.last_update.elapsed().as_millis() as u64;
            self.position_ms.saturating_add(elapsed).min(self.duration_ms)
        } else if self.duration_ms > 0 {
            self.position_ms.min(self.duration_ms)
        } else {
            self.position_ms
        }
    }

    pub fn update_position(&mut self, position_ms: u64) {
        self.position_ms = position_ms;
        self.last_update = Instant::now();
    }

    pub fn set_playing(&mut self, is_playing: bool) {
        self.position_ms = self.current_position_ms();
        self.is_playing = is_playing;
        self.last_update = Instant::now();
    }

    pub fn reset(&mut self, duration_ms: u64) {
        self.position_ms = 0;
        self.duration_ms = duration_ms;
        self.is_playing = false;
        self.last_update = Instant::now();
    }
}

/// Complete playback information for rendering the UI
#[derive(Clone, Debug)]
pub struct PlaybackInfo {
    pub track: Option<Track>,
    pub state: TransportState,
    pub progress_ms: u64,
    pub duration_ms: u64,
    pub volume: u8,
    pub provider: String,
    pub auth: AuthStatus,
}

impl Default for PlaybackInfo {
    fn default() -> Self {
        Self {
            track: None,
            state: TransportState::Empty,
            progress_ms: 0,
            duration_ms: 0,
            volume: DEFAULT_VOLUME_PERCENT,
            provider: String::new(),
            auth: AuthStatus::Unauthenticated,
        }
    }
}

impl PlaybackInfo {
    /// Whole seconds played, floored
    pub fn progress_seconds(&self) -> u64 {
        self.progress_ms / 1000
    }

    /// Whole seconds of the track, floored
    pub fn duration_seconds(&self) -> u64 {
        self.duration_ms / 1000
    }
}
