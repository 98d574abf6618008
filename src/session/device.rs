//! Contract between the playback session and an audio output device

/// Tags one `SetSource`. Every event about that source echoes the tag, so
/// reports about a replaced source can be told apart from current ones.
pub type SourceId = u64;

/// Commands the session issues to the device
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceCommand {
    SetSource { id: SourceId, url: String },
    Play,
    Pause,
    Stop,
    /// Volume in percent, 0..=100
    SetVolume(u8),
    Seek(u64),
}

/// Transport state as the device reports it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceState {
    Playing,
    Paused,
    /// The source ran out or was never loaded
    Stopped,
}

/// Events the device reports back
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceEvent {
    PositionChanged { source: SourceId, position_ms: u64 },
    DurationChanged { source: SourceId, duration_ms: u64 },
    StateChanged { source: SourceId, state: DeviceState },
    /// `source` is `None` for failures of the device itself (no output)
    Error { source: Option<SourceId>, message: String },
}

/// Anything that can take transport commands. Events travel back on a
/// separate channel wired up by whoever builds the device.
pub trait OutputDevice: Send + Sync {
    fn send(&mut self, command: DeviceCommand);
}
