//! Shared display model.
//!
//! The session controller is the only writer of session-derived fields
//! (transport, progress, queue view, playlists, auth). The terminal loop only
//! touches UI-local fields such as selection and text input.

use std::time::Instant;
use tokio::sync::Mutex;

use super::playback::{PlaybackInfo, PlaybackTiming, TransportState};
use super::track::{Playlist, SearchItem, SearchKind, Track};
use super::types::{ActiveSection, AuthStatus, ContentState, ContentView, LibraryItem, UiState};

const STATUS_TTL_SECS: u64 = 5;

/// Main application model containing all display state
pub struct AppModel {
    playback: Mutex<PlaybackInfo>,
    playback_timing: Mutex<PlaybackTiming>,
    ui_state: Mutex<UiState>,
    content_state: Mutex<ContentState>,
    should_quit: Mutex<bool>,
}

impl AppModel {
    pub fn new() -> Self {
        Self {
            playback: Mutex::new(PlaybackInfo::default()),
            playback_timing: Mutex::new(PlaybackTiming::default()),
            ui_state: Mutex::new(UiState::default()),
            content_state: Mutex::new(ContentState::default()),
            should_quit: Mutex::new(false),
        }
    }

    // ========================================================================
    // Session-derived state (written by the controller)
    // ========================================================================

    pub async fn set_provider(&self, name: &str, auth: AuthStatus) {
        let mut playback = self.playback.lock().await;
        playback.provider = name.to_string();
        playback.auth = auth;
    }

    pub async fn set_transport_state(&self, state: TransportState) {
        self.playback.lock().await.state = state;
        self.playback_timing.lock().await.set_playing(state.is_playing());
    }

    pub async fn set_current_track(&self, track: Option<Track>) {
        let duration_ms = track.as_ref().map(|t| t.duration_ms).unwrap_or(0);
        self.playback.lock().await.track = track;
        self.playback_timing.lock().await.reset(duration_ms);
    }

    pub async fn update_playback_position(&self, position_ms: u64) {
        self.playback_timing.lock().await.update_position(position_ms);
    }

    pub async fn set_duration(&self, duration_ms: u64) {
        self.playback_timing.lock().await.duration_ms = duration_ms;
    }

    pub async fn set_volume(&self, volume: u8) {
        self.playback.lock().await.volume = volume;
    }

    pub async fn get_volume(&self) -> u8 {
        self.playback.lock().await.volume
    }

    pub async fn get_playback_info(&self) -> PlaybackInfo {
        let mut info = self.playback.lock().await.clone();
        let timing = self.playback_timing.lock().await;
        info.progress_ms = timing.current_position_ms();
        info.duration_ms = timing.duration_ms;
        info
    }

    pub async fn set_queue_view(&self, title: &str, tracks: Vec<Track>, current_index: Option<usize>) {
        let mut state = self.content_state.lock().await;
        state.view = ContentView::Queue {
            title: title.to_string(),
            tracks,
            current_index,
        };
        state.is_loading = false;
        drop(state);

        self.ui_state.lock().await.track_selected = current_index.unwrap_or(0);
    }

    pub async fn set_queue_cursor(&self, index: Option<usize>) {
        let mut state = self.content_state.lock().await;
        if let ContentView::Queue { current_index, .. } = &mut state.view {
            *current_index = index;
        }
    }

    pub async fn set_search_results(&self, query: &str, kind: SearchKind, items: Vec<SearchItem>) {
        let mut state = self.content_state.lock().await;
        state.view = ContentView::SearchResults {
            query: query.to_string(),
            kind,
            items,
        };
        state.is_loading = false;
        drop(state);

        let mut ui_state = self.ui_state.lock().await;
        ui_state.track_selected = 0;
        ui_state.active_section = ActiveSection::Tracks;
    }

    pub async fn clear_content(&self) {
        *self.content_state.lock().await = ContentState::default();
        self.ui_state.lock().await.track_selected = 0;
    }

    pub async fn set_content_loading(&self, loading: bool) {
        self.content_state.lock().await.is_loading = loading;
    }

    pub async fn get_content_state(&self) -> ContentState {
        self.content_state.lock().await.clone()
    }

    pub async fn set_playlists(&self, playlists: Vec<Playlist>) {
        let mut state = self.ui_state.lock().await;
        state.playlists = playlists;
        state.playlist_selected = 0;
    }

    pub async fn set_error(&self, message: String) {
        self.ui_state.lock().await.error_message = Some(message);
    }

    pub async fn clear_error(&self) {
        self.ui_state.lock().await.error_message = None;
    }

    pub async fn has_error(&self) -> bool {
        self.ui_state.lock().await.error_message.is_some()
    }

    pub async fn set_status(&self, message: String) {
        let mut state = self.ui_state.lock().await;
        state.status_message = Some(message);
        state.status_timestamp = Some(Instant::now());
    }

    pub async fn auto_clear_old_status(&self) {
        let mut state = self.ui_state.lock().await;
        if let Some(timestamp) = state.status_timestamp {
            if timestamp.elapsed().as_secs() > STATUS_TTL_SECS {
                state.status_message = None;
                state.status_timestamp = None;
            }
        }
    }

    // ========================================================================
    // UI-local state (written by the terminal loop)
    // ========================================================================

    pub async fn should_quit(&self) -> bool {
        *self.should_quit.lock().await
    }

    pub async fn set_should_quit(&self, quit: bool) {
        *self.should_quit.lock().await = quit;
    }

    pub async fn get_ui_state(&self) -> UiState {
        self.ui_state.lock().await.clone()
    }

    pub async fn cycle_section_forward(&self) {
        let mut state = self.ui_state.lock().await;
        state.active_section = state.active_section.next();
    }

    pub async fn focus_section(&self, section: ActiveSection) {
        self.ui_state.lock().await.active_section = section;
    }

    pub async fn cycle_section_backward(&self) {
        let mut state = self.ui_state.lock().await;
        state.active_section = state.active_section.prev();
    }

    pub async fn move_selection_up(&self) {
        let mut state = self.ui_state.lock().await;
        match state.active_section {
            ActiveSection::Library => {
                state.library_selected = state.library_selected.saturating_sub(1);
            }
            ActiveSection::Playlists => {
                state.playlist_selected = state.playlist_selected.saturating_sub(1);
            }
            ActiveSection::Tracks => {
                state.track_selected = state.track_selected.saturating_sub(1);
            }
            ActiveSection::Search => {}
        }
    }

    pub async fn move_selection_down(&self) {
        let content_len = self.content_state.lock().await.view.len();
        let mut state = self.ui_state.lock().await;
        match state.active_section {
            ActiveSection::Library => {
                if state.library_selected + 1 < LibraryItem::ALL.len() {
                    state.library_selected += 1;
                }
            }
            ActiveSection::Playlists => {
                if state.playlist_selected + 1 < state.playlists.len() {
                    state.playlist_selected += 1;
                }
            }
            ActiveSection::Tracks => {
                if state.track_selected + 1 < content_len {
                    state.track_selected += 1;
                }
            }
            ActiveSection::Search => {}
        }
    }

    pub async fn append_to_search(&self, c: char) {
        self.ui_state.lock().await.search_query.push(c);
    }

    pub async fn backspace_search(&self) {
        self.ui_state.lock().await.search_query.pop();
    }

    pub async fn clear_search(&self) {
        self.ui_state.lock().await.search_query.clear();
    }

    pub async fn cycle_search_kind(&self) {
        let mut state = self.ui_state.lock().await;
        state.search_kind = state.search_kind.next();
    }

    pub async fn open_credential_prompt(&self) {
        self.ui_state.lock().await.credential_input = Some(String::new());
    }

    pub async fn close_credential_prompt(&self) -> Option<String> {
        self.ui_state.lock().await.credential_input.take()
    }

    pub async fn is_credential_prompt_open(&self) -> bool {
        self.ui_state.lock().await.credential_input.is_some()
    }

    pub async fn append_to_credential(&self, c: char) {
        if let Some(input) = self.ui_state.lock().await.credential_input.as_mut() {
            input.push(c);
        }
    }

    pub async fn backspace_credential(&self) {
        if let Some(input) = self.ui_state.lock().await.credential_input.as_mut() {
            input.pop();
        }
    }

    pub async fn show_help_popup(&self) {
        self.ui_state.lock().await.show_help_popup = true;
    }

    pub async fn hide_help_popup(&self) {
        self.ui_state.lock().await.show_help_popup = false;
    }

    pub async fn is_help_popup_open(&self) -> bool {
        self.ui_state.lock().await.show_help_popup
    }
}

impl Default for AppModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_view_moves_selection_to_cursor() {
        let model = AppModel::new();
        let tracks = vec![Track::new("1", "A"), Track::new("2", "B")];
        model.set_queue_view("Liked", tracks, Some(1)).await;

        assert_eq!(model.get_ui_state().await.track_selected, 1);
        assert_eq!(model.get_content_state().await.view.len(), 2);
    }

    #[tokio::test]
    async fn test_track_selection_stays_within_content() {
        let model = AppModel::new();
        model.set_queue_view("Wave", vec![Track::new("1", "A"), Track::new("2", "B")], Some(0)).await;
        model.cycle_section_forward().await;
        model.cycle_section_forward().await;

        for _ in 0..5 {
            model.move_selection_down().await;
        }
        assert_eq!(model.get_ui_state().await.track_selected, 1);
    }

    #[tokio::test]
    async fn test_search_results_focus_track_pane() {
        let model = AppModel::new();
        model
            .set_search_results("test", SearchKind::Track, vec![SearchItem::Track(Track::new("1", "A"))])
            .await;
        assert_eq!(model.get_ui_state().await.active_section, ActiveSection::Tracks);
    }

    #[tokio::test]
    async fn test_credential_prompt_collects_input() {
        let model = AppModel::new();
        model.open_credential_prompt().await;
        for c in "tok".chars() {
            model.append_to_credential(c).await;
        }
        model.backspace_credential().await;
        assert_eq!(model.close_credential_prompt().await.as_deref(), Some("to"));
        assert!(!model.is_credential_prompt_open().await);
    }
}
