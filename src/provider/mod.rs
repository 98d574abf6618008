//! Provider module - Backend adapters behind one capability contract
//!
//! - `error`: adapter-internal error type (never crosses the trait)
//! - `yandex`, `spotify`, `soundcloud`, `lastfm`: one adapter per backend
//!
//! The session only ever sees `Arc<dyn Provider>`. Every operation degrades to
//! an empty result instead of failing; only `authenticate` reports pass/fail.

pub mod error;
pub mod lastfm;
pub mod soundcloud;
pub mod spotify;
pub mod yandex;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{Playlist, SearchItem, SearchKind, StreamSource, Track};
use error::ProviderError;

/// Items requested per list or search call
pub(crate) const PAGE_LIMIT: u32 = 50;

/// The capability contract every backend satisfies
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Accepts or rejects a credential. Never fails: network errors and empty
    /// credentials return `false`.
    async fn authenticate(&self, credential: &str) -> bool;

    async fn get_my_wave(&self) -> Vec<Track> {
        Vec::new()
    }

    async fn get_liked_tracks(&self) -> Vec<Track> {
        Vec::new()
    }

    async fn get_playlists(&self) -> Vec<Playlist> {
        Vec::new()
    }

    async fn playlist_tracks(&self, _playlist: &Playlist) -> Vec<Track> {
        Vec::new()
    }

    async fn search(&self, query: &str, kind: SearchKind) -> Vec<SearchItem>;

    /// Candidate stream URLs ordered by preference. Empty means no audio.
    async fn resolve_stream(&self, track: &Track) -> Vec<String> {
        direct_sources(track)
    }
}

/// URLs already carried by the track record
pub(crate) fn direct_sources(track: &Track) -> Vec<String> {
    match &track.stream {
        StreamSource::Direct(urls) => urls.clone(),
        StreamSource::Unavailable | StreamSource::Deferred => Vec::new(),
    }
}

/// The registered backends, in front-end cycling order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Yandex,
    Spotify,
    SoundCloud,
    LastFm,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Yandex,
        ProviderKind::Spotify,
        ProviderKind::SoundCloud,
        ProviderKind::LastFm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Yandex => "Yandex",
            ProviderKind::Spotify => "Spotify",
            ProviderKind::SoundCloud => "SoundCloud",
            ProviderKind::LastFm => "Last.fm",
        }
    }

    /// Case-insensitive lookup by display name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("lastfm") {
            return Some(ProviderKind::LastFm);
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Key under which the credential of this backend is persisted
    pub fn credential_key(self) -> String {
        self.name().to_lowercase()
    }

    /// The backend after this one, wrapping around
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Creates fresh provider instances on every switch
pub trait ProviderFactory: Send + Sync {
    fn create(&self, kind: ProviderKind) -> Arc<dyn Provider>;
}

/// Factory for the real network-backed adapters
#[derive(Clone, Default)]
pub struct DefaultProviders {
    http: reqwest::Client,
}

impl DefaultProviders {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProviderFactory for DefaultProviders {
    fn create(&self, kind: ProviderKind) -> Arc<dyn Provider> {
        match kind {
            ProviderKind::Yandex => Arc::new(yandex::YandexProvider::new(self.http.clone())),
            ProviderKind::Spotify => Arc::new(spotify::SpotifyProvider::new()),
            ProviderKind::SoundCloud => {
                Arc::new(soundcloud::SoundCloudProvider::new(self.http.clone()))
            }
            ProviderKind::LastFm => Arc::new(lastfm::LastFmProvider::new(self.http.clone())),
        }
    }
}

/// Turns an adapter result into the trait-level "empty on failure" shape.
///
/// An unauthenticated call is expected (the user has not entered a credential
/// yet) and is not logged as a failure.
pub(crate) fn degrade<T>(
    provider: ProviderKind,
    operation: &'static str,
    result: error::Result<Vec<T>>,
) -> Vec<T> {
    match result {
        Err(ProviderError::NotAuthenticated) => {
            tracing::debug!(provider = %provider, operation, "Skipped, not authenticated");
            Vec::new()
        }
        result => {
            crate::log_api_result!(provider, operation, result);
            match result {
                Ok(items) => {
                    tracing::debug!(provider = %provider, operation, count = items.len(), "Mapped items");
                    items
                }
                Err(_) => Vec::new(),
            }
        }
    }
}

/// Maps an error status (or an unreadable body) onto `ProviderError::Api`
pub(crate) async fn check_status(response: reqwest::Response) -> error::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status: status.as_u16(),
        message,
    })
}
