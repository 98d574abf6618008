//! Model module - Application state and data types
//!
//! This module contains the normalized records and all display state.
//! It is organized into submodules by responsibility:
//!
//! - `track`: Track/Playlist/Artist records every provider produces
//! - `queue`: Ordered queue with the playback cursor
//! - `types`: UI state (sections, auth status, content views)
//! - `playback`: Transport state and progress timing
//! - `app_model`: Shared display model written by the session controller

mod track;
mod queue;
mod types;
mod playback;
mod app_model;

pub use track::{format_duration, Artist, Playlist, SearchItem, SearchKind, StreamSource, Track};

pub use queue::Queue;

pub use types::{ActiveSection, AuthStatus, ContentState, ContentView, LibraryItem, UiState};

pub use playback::{PlaybackInfo, TransportState, DEFAULT_VOLUME_PERCENT};

pub use app_model::AppModel;
