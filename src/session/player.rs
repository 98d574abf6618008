//! Playback session state machine.
//!
//! Owns the queue, the transport state and the output device. Stream
//! resolution is asynchronous, so `play` does not talk to the provider itself:
//! it hands out a [`PlayRequest`] that the caller resolves and feeds back
//! through [`PlaybackSession::complete_play`].

use crate::error::SessionError;
use crate::model::{Queue, Track, TransportState, DEFAULT_VOLUME_PERCENT};

use super::device::{DeviceCommand, DeviceEvent, DeviceState, OutputDevice, SourceId};

/// A pending stream resolution for the track under the cursor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayRequest {
    pub generation: u64,
    pub index: usize,
    pub track: Track,
}

/// Which queue entry the device currently holds a source for
#[derive(Clone, Debug, PartialEq, Eq)]
struct LoadedSource {
    id: SourceId,
    index: usize,
    track_id: String,
}

pub struct PlaybackSession {
    queue: Queue,
    state: TransportState,
    device: Box<dyn OutputDevice>,
    loaded: Option<LoadedSource>,
    volume: u8,
    position_ms: u64,
    duration_ms: u64,
    play_generation: u64,
}

impl PlaybackSession {
    pub fn new(device: Box<dyn OutputDevice>) -> Self {
        Self::with_volume(device, DEFAULT_VOLUME_PERCENT)
    }

    pub fn with_volume(mut device: Box<dyn OutputDevice>, volume: u8) -> Self {
        let volume = volume.min(100);
        device.send(DeviceCommand::SetVolume(volume));
        Self {
            queue: Queue::new(),
            state: TransportState::Empty,
            device,
            loaded: None,
            volume,
            position_ms: 0,
            duration_ms: 0,
            play_generation: 0,
        }
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current()
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Replaces the queue. Never starts playback.
    pub fn load(&mut self, tracks: Vec<Track>) {
        self.release_source();
        self.queue.replace(tracks);
        self.state = if self.queue.is_empty() {
            TransportState::Empty
        } else {
            TransportState::Stopped
        };
        tracing::debug!(len = self.queue.len(), state = ?self.state, "Queue loaded");
    }

    /// Empties the queue and stops the device
    pub fn clear(&mut self) {
        self.release_source();
        self.queue.clear();
        self.state = TransportState::Empty;
    }

    /// Moves the cursor to the first track with `id` and plays it. An unknown
    /// id changes nothing.
    pub fn select(&mut self, track_id: &str) -> Option<PlayRequest> {
        if !self.queue.select(track_id) {
            tracing::debug!(track_id, "Select ignored, id not in queue");
            return None;
        }
        self.play()
    }

    /// Starts the track under the cursor. Resumes in place when the device
    /// is paused on that same track, otherwise asks for stream resolution.
    pub fn play(&mut self) -> Option<PlayRequest> {
        let index = self.queue.current_index()?;
        let track = self.queue.current()?.clone();

        if self.state == TransportState::Paused && self.holds_source(index, &track) {
            self.device.send(DeviceCommand::Play);
            self.state = TransportState::Playing;
            return None;
        }

        self.play_generation += 1;
        Some(PlayRequest {
            generation: self.play_generation,
            index,
            track,
        })
    }

    /// Applies the sources resolved for `request`.
    ///
    /// Results for superseded requests are dropped. No sources leaves the
    /// state untouched and reports the track as unplayable.
    pub fn complete_play(&mut self, request: &PlayRequest, sources: &[String]) -> Result<(), SessionError> {
        if !self.is_current(request) {
            tracing::debug!(generation = request.generation, "Dropping stale stream result");
            return Ok(());
        }

        let Some(url) = sources.first() else {
            return Err(SessionError::StreamUnresolvable {
                title: request.track.title.clone(),
            });
        };

        self.device.send(DeviceCommand::SetSource {
            id: request.generation,
            url: url.clone(),
        });
        self.device.send(DeviceCommand::Play);
        self.loaded = Some(LoadedSource {
            id: request.generation,
            index: request.index,
            track_id: request.track.id.clone(),
        });
        self.position_ms = 0;
        self.duration_ms = request.track.duration_ms;
        self.state = TransportState::Playing;
        Ok(())
    }

    /// Whether `request` still describes the track the user asked for last
    pub fn is_current(&self, request: &PlayRequest) -> bool {
        request.generation == self.play_generation
            && self.queue.current_index() == Some(request.index)
            && self.queue.current().map(|t| t.id.as_str()) == Some(request.track.id.as_str())
    }

    pub fn pause(&mut self) {
        if self.state == TransportState::Playing {
            self.device.send(DeviceCommand::Pause);
            self.state = TransportState::Paused;
        }
    }

    pub fn toggle(&mut self) -> Option<PlayRequest> {
        if self.state == TransportState::Playing {
            self.pause();
            None
        } else {
            self.play()
        }
    }

    pub fn next(&mut self) -> Option<PlayRequest> {
        if self.queue.advance() { self.play() } else { None }
    }

    pub fn prev(&mut self) -> Option<PlayRequest> {
        if self.queue.retreat() { self.play() } else { None }
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        self.device.send(DeviceCommand::SetVolume(self.volume));
    }

    /// Seeks within the loaded source, clamped to the known duration
    pub fn seek(&mut self, position_ms: u64) {
        if self.loaded.is_none() {
            return;
        }
        let target = if self.duration_ms > 0 {
            position_ms.min(self.duration_ms)
        } else {
            position_ms
        };
        self.device.send(DeviceCommand::Seek(target));
        self.position_ms = target;
    }

    /// The source the device was last told to load, if it still holds one
    pub fn loaded_source(&self) -> Option<SourceId> {
        self.loaded.as_ref().map(|loaded| loaded.id)
    }

    /// Folds a device report into the session. Never moves the cursor.
    ///
    /// Reports about a source other than the loaded one are late arrivals
    /// from a replaced source and are dropped.
    pub fn on_device_event(&mut self, event: DeviceEvent) -> Option<SessionError> {
        let source = match &event {
            DeviceEvent::PositionChanged { source, .. }
            | DeviceEvent::DurationChanged { source, .. }
            | DeviceEvent::StateChanged { source, .. } => Some(*source),
            DeviceEvent::Error { source, .. } => *source,
        };
        if let Some(source) = source {
            if self.loaded_source() != Some(source) {
                tracing::trace!(source, loaded = ?self.loaded_source(), "Dropping report for replaced source");
                return None;
            }
        }

        match event {
            DeviceEvent::PositionChanged { position_ms, .. } => {
                self.position_ms = position_ms;
            }
            DeviceEvent::DurationChanged { duration_ms, .. } => {
                self.duration_ms = duration_ms;
            }
            DeviceEvent::StateChanged { state, .. } => match state {
                DeviceState::Playing => self.state = TransportState::Playing,
                DeviceState::Paused => self.state = TransportState::Paused,
                DeviceState::Stopped => {
                    self.loaded = None;
                    self.position_ms = 0;
                    self.state = TransportState::Stopped;
                }
            },
            DeviceEvent::Error { message, .. } => {
                tracing::warn!(error = %message, "Output device failed");
                self.loaded = None;
                if !self.queue.is_empty() {
                    self.state = TransportState::Stopped;
                }
                return Some(SessionError::Device(message));
            }
        }
        None
    }

    fn holds_source(&self, index: usize, track: &Track) -> bool {
        self.loaded
            .as_ref()
            .is_some_and(|loaded| loaded.index == index && loaded.track_id == track.id)
    }

    /// Stops the device and invalidates pending stream resolutions
    fn release_source(&mut self) {
        if self.loaded.take().is_some() || self.state.is_playing() {
            self.device.send(DeviceCommand::Stop);
        }
        self.play_generation += 1;
        self.position_ms = 0;
        self.duration_ms = 0;
    }
}
