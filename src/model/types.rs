//! Core type definitions for the application

use std::time::Instant;

use super::track::{Playlist, SearchItem, SearchKind, Track};

/// Which section of the UI is currently active/focused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveSection {
    Search,
    Library,
    Playlists,
    Tracks,
}

impl ActiveSection {
    pub fn next(self) -> Self {
        match self {
            ActiveSection::Search => ActiveSection::Library,
            ActiveSection::Library => ActiveSection::Playlists,
            ActiveSection::Playlists => ActiveSection::Tracks,
            ActiveSection::Tracks => ActiveSection::Search,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ActiveSection::Search => ActiveSection::Tracks,
            ActiveSection::Library => ActiveSection::Search,
            ActiveSection::Playlists => ActiveSection::Library,
            ActiveSection::Tracks => ActiveSection::Playlists,
        }
    }
}

/// The pseudo-playlists every provider offers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LibraryItem {
    Wave,
    Liked,
}

impl LibraryItem {
    pub const ALL: [LibraryItem; 2] = [LibraryItem::Wave, LibraryItem::Liked];

    pub fn name(self) -> &'static str {
        match self {
            LibraryItem::Wave => "My Wave",
            LibraryItem::Liked => "Liked tracks",
        }
    }
}

/// Authorization state of the active provider
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AuthStatus {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

impl AuthStatus {
    pub fn label(self) -> &'static str {
        match self {
            AuthStatus::Unauthenticated => "authorization required",
            AuthStatus::Authenticating => "authorizing...",
            AuthStatus::Authenticated => "authorized",
        }
    }
}

/// What the track pane currently shows
#[derive(Clone, Debug, Default)]
pub enum ContentView {
    #[default]
    Empty,
    Queue {
        title: String,
        tracks: Vec<Track>,
        current_index: Option<usize>,
    },
    SearchResults {
        query: String,
        kind: SearchKind,
        items: Vec<SearchItem>,
    },
}

impl ContentView {
    pub fn len(&self) -> usize {
        match self {
            ContentView::Empty => 0,
            ContentView::Queue { tracks, .. } => tracks.len(),
            ContentView::SearchResults { items, .. } => items.len(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ContentState {
    pub view: ContentView,
    pub is_loading: bool,
}

/// UI state for the application
#[derive(Clone)]
pub struct UiState {
    pub active_section: ActiveSection,
    pub search_query: String,
    pub search_kind: SearchKind,
    pub library_selected: usize,
    pub playlists: Vec<Playlist>,
    pub playlist_selected: usize,
    pub track_selected: usize,
    pub error_message: Option<String>,
    pub status_message: Option<String>,
    pub status_timestamp: Option<Instant>,
    pub show_help_popup: bool,
    /// Credential being typed into the authorization prompt
    pub credential_input: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            active_section: ActiveSection::Library,
            search_query: String::new(),
            search_kind: SearchKind::Track,
            library_selected: 0,
            playlists: vec![],
            playlist_selected: 0,
            track_selected: 0,
            error_message: None,
            status_message: None,
            status_timestamp: None,
            show_help_popup: false,
            credential_input: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_cycle_round_trips() {
        let start = ActiveSection::Search;
        let mut section = start;
        for _ in 0..4 {
            section = section.next();
        }
        assert_eq!(section, start);
        assert_eq!(ActiveSection::Search.prev(), ActiveSection::Tracks);
    }

    #[test]
    fn test_content_len() {
        assert_eq!(ContentView::Empty.len(), 0);
        let view = ContentView::Queue {
            title: "Liked".into(),
            tracks: vec![Track::new("1", "A"), Track::new("2", "B")],
            current_index: Some(0),
        };
        assert_eq!(view.len(), 2);
    }
}
