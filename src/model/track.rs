//! Normalized records shared by every provider

/// What an adapter learned about a track's audio when it mapped the native record
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum StreamSource {
    /// The backend never serves audio for this track
    #[default]
    Unavailable,
    /// Candidate URLs were part of the native record (preview, stream link)
    Direct(Vec<String>),
    /// The provider has to ask its backend for a (signed) URL
    Deferred,
}

/// A playable track as seen by the queue and the UI.
///
/// `id` is only unique within the provider that produced the track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub duration_ms: u64,
    pub stream: StreamSource,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artists: Vec::new(),
            album: None,
            duration_ms: 0,
            stream: StreamSource::Unavailable,
        }
    }

    pub fn with_artists<I, S>(mut self, artists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artists = artists.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_stream(mut self, stream: StreamSource) -> Self {
        self.stream = stream;
        self
    }

    pub fn artists_display(&self) -> String {
        self.artists.join(", ")
    }
}

/// A user playlist. Its tracks are fetched lazily through the owning provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub owner: Option<String>,
    pub track_count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SearchKind {
    #[default]
    Track,
    Artist,
    Playlist,
}

impl SearchKind {
    pub fn next(self) -> Self {
        match self {
            SearchKind::Track => SearchKind::Artist,
            SearchKind::Artist => SearchKind::Playlist,
            SearchKind::Playlist => SearchKind::Track,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SearchKind::Track => "track",
            SearchKind::Artist => "artist",
            SearchKind::Playlist => "playlist",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchItem {
    Track(Track),
    Artist(Artist),
    Playlist(Playlist),
}

impl SearchItem {
    pub fn into_track(self) -> Option<Track> {
        match self {
            SearchItem::Track(track) => Some(track),
            _ => None,
        }
    }
}

/// Formats milliseconds as `m:ss`, flooring to whole seconds
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{}:{:02}", minutes, seconds)
}
