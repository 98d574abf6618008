//! View module - UI rendering
//!
//! This module handles all UI rendering for the application using ratatui.
//! It is organized into submodules by component type:
//!
//! - `utils`: Shared helpers (scrollable lists, truncation)
//! - `layout`: Main layout structure (top bar, sidebar)
//! - `tracks`: Queue and search result pane
//! - `progress`: Progress bar rendering
//! - `overlays`: Modal overlays (error, status, help, credential prompt)

mod utils;
mod layout;
mod tracks;
mod progress;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::model::{ContentState, PlaybackInfo, UiState};

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, playback: &PlaybackInfo, ui_state: &UiState, content_state: &ContentState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Search bar + provider
                Constraint::Min(0),    // Sidebar + track pane
                Constraint::Length(3), // Progress bar with playback info
            ])
            .split(frame.area());

        layout::render_top_bar(frame, chunks[0], ui_state, playback);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30), // Library + Playlists
                Constraint::Percentage(70), // Tracks
            ])
            .split(chunks[1]);

        layout::render_sidebar(frame, main_chunks[0], ui_state);
        tracks::render_track_pane(frame, main_chunks[1], ui_state, content_state);
        progress::render_progress_bar(frame, chunks[2], playback);

        if let Some(ref message) = ui_state.status_message {
            overlays::render_status_line(frame, main_chunks[1], message);
        }

        if ui_state.error_message.is_some() {
            overlays::render_error_notification(frame, ui_state);
        }

        if let Some(ref credential) = ui_state.credential_input {
            overlays::render_credential_prompt(frame, &playback.provider, credential);
        }

        if ui_state.show_help_popup {
            overlays::render_help_popup(frame);
        }
    }
}
