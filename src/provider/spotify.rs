//! Spotify adapter on top of rspotify.
//!
//! Credential: a bearer access token. Spotify only hands out 30-second
//! previews to third-party players, so `preview_url` is the stream source.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use rspotify::{
    model::{
        ArtistId, FullTrack, PlayableItem, PlaylistId, RecommendationsAttribute, SearchResult, SearchType,
        SimplifiedPlaylist, SimplifiedTrack, TimeRange,
    },
    prelude::*,
    AuthCodeSpotify, Config, Token,
};
use tokio::sync::RwLock;

use super::error::{ProviderError, Result};
use super::{degrade, Provider, ProviderKind, PAGE_LIMIT};
use crate::model::{Artist, Playlist, SearchItem, SearchKind, StreamSource, Track};
use crate::log_api_request;

const WAVE_SEEDS: usize = 5;
const WAVE_LIMIT: u32 = 20;
const PLAYLIST_TRACK_LIMIT: usize = 100;
/// Access tokens from the Spotify authorization flow live one hour
const TOKEN_LIFETIME_SECS: i64 = 3600;

pub struct SpotifyProvider {
    client: RwLock<Option<Arc<AuthCodeSpotify>>>,
}

impl SpotifyProvider {
    pub fn new() -> Self {
        Self {
            client: RwLock::new(None),
        }
    }

    async fn client(&self) -> Result<Arc<AuthCodeSpotify>> {
        self.client.read().await.clone().ok_or(ProviderError::NotAuthenticated)
    }

    async fn fetch_wave(&self) -> Result<Vec<Track>> {
        let client = self.client().await?;
        log_api_request!(ProviderKind::Spotify, "top_tracks", limit = WAVE_SEEDS);
        let top = client
            .current_user_top_tracks_manual(Some(TimeRange::MediumTerm), Some(WAVE_SEEDS as u32), None)
            .await?;

        let seeds: Vec<_> = top.items.into_iter().filter_map(|t| t.id).take(WAVE_SEEDS).collect();
        if seeds.is_empty() {
            return Ok(Vec::new());
        }

        log_api_request!(ProviderKind::Spotify, "recommendations", seeds = seeds.len());
        let recommendations = client
            .recommendations(
                std::iter::empty::<RecommendationsAttribute>(),
                None::<Vec<ArtistId<'_>>>,
                None::<Vec<&str>>,
                Some(seeds),
                None,
                Some(WAVE_LIMIT),
            )
            .await?;
        Ok(recommendations.tracks.into_iter().filter_map(map_simplified_track).collect())
    }

    async fn fetch_liked(&self) -> Result<Vec<Track>> {
        let client = self.client().await?;
        log_api_request!(ProviderKind::Spotify, "saved_tracks", limit = PAGE_LIMIT);
        let saved: Vec<_> = client
            .current_user_saved_tracks(None)
            .take(PAGE_LIMIT as usize)
            .try_collect()
            .await?;
        Ok(saved.into_iter().filter_map(|s| map_full_track(s.track)).collect())
    }

    async fn fetch_playlists(&self) -> Result<Vec<Playlist>> {
        let client = self.client().await?;
        log_api_request!(ProviderKind::Spotify, "playlists", limit = PAGE_LIMIT);
        let playlists: Vec<_> = client
            .current_user_playlists()
            .take(PAGE_LIMIT as usize)
            .try_collect()
            .await?;
        Ok(playlists.into_iter().filter_map(map_playlist).collect())
    }

    async fn fetch_playlist_tracks(&self, playlist: &Playlist) -> Result<Vec<Track>> {
        let client = self.client().await?;
        let id = PlaylistId::from_id(playlist.id.as_str())?;
        log_api_request!(ProviderKind::Spotify, "playlist_items", playlist = %playlist.id);
        let items: Vec<_> = client
            .playlist_items(id, None, None)
            .take(PLAYLIST_TRACK_LIMIT)
            .try_collect()
            .await?;

        Ok(items
            .into_iter()
            .filter_map(|item| match item.track {
                Some(PlayableItem::Track(track)) => map_full_track(track),
                _ => None,
            })
            .collect())
    }

    async fn fetch_search(&self, query: &str, kind: SearchKind) -> Result<Vec<SearchItem>> {
        let client = self.client().await?;
        let search_type = match kind {
            SearchKind::Track => SearchType::Track,
            SearchKind::Artist => SearchType::Artist,
            SearchKind::Playlist => SearchType::Playlist,
        };
        log_api_request!(ProviderKind::Spotify, "search", query = query, kind = kind.label());
        let result = client
            .search(query, search_type, None, None, Some(PAGE_LIMIT), None)
            .await?;

        let items = match result {
            SearchResult::Tracks(page) => page
                .items
                .into_iter()
                .filter_map(map_full_track)
                .map(SearchItem::Track)
                .collect(),
            SearchResult::Artists(page) => page
                .items
                .into_iter()
                .filter(|artist| !artist.name.is_empty())
                .map(|artist| {
                    SearchItem::Artist(Artist {
                        id: artist.id.id().to_string(),
                        name: artist.name,
                    })
                })
                .collect(),
            SearchResult::Playlists(page) => page
                .items
                .into_iter()
                .filter_map(map_playlist)
                .map(SearchItem::Playlist)
                .collect(),
            _ => Vec::new(),
        };
        Ok(items)
    }
}

impl Default for SpotifyProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for SpotifyProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Spotify
    }

    async fn authenticate(&self, credential: &str) -> bool {
        let access_token = credential.trim();
        if access_token.is_empty() {
            *self.client.write().await = None;
            return false;
        }

        let spotify = AuthCodeSpotify::with_config(
            Default::default(),
            Default::default(),
            Config {
                token_cached: false,
                token_refreshing: false,
                ..Default::default()
            },
        );
        let token = Token {
            access_token: access_token.to_string(),
            expires_in: chrono::Duration::seconds(TOKEN_LIFETIME_SECS),
            expires_at: Some(chrono::Utc::now() + chrono::Duration::seconds(TOKEN_LIFETIME_SECS)),
            scopes: HashSet::new(),
            refresh_token: None,
        };
        match spotify.token.lock().await {
            Ok(mut guard) => *guard = Some(token),
            Err(_) => {
                tracing::error!("rspotify token lock poisoned");
                return false;
            }
        }

        log_api_request!(ProviderKind::Spotify, "me");
        let result = spotify.me().await;
        crate::log_api_result!(ProviderKind::Spotify, "authenticate", result);
        match result {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Spotify authorized");
                *self.client.write().await = Some(Arc::new(spotify));
                true
            }
            Err(_) => {
                *self.client.write().await = None;
                false
            }
        }
    }

    async fn get_my_wave(&self) -> Vec<Track> {
        degrade(ProviderKind::Spotify, "wave", self.fetch_wave().await)
    }

    async fn get_liked_tracks(&self) -> Vec<Track> {
        degrade(ProviderKind::Spotify, "liked_tracks", self.fetch_liked().await)
    }

    async fn get_playlists(&self) -> Vec<Playlist> {
        degrade(ProviderKind::Spotify, "playlists", self.fetch_playlists().await)
    }

    async fn playlist_tracks(&self, playlist: &Playlist) -> Vec<Track> {
        degrade(
            ProviderKind::Spotify,
            "playlist_tracks",
            self.fetch_playlist_tracks(playlist).await,
        )
    }

    async fn search(&self, query: &str, kind: SearchKind) -> Vec<SearchItem> {
        degrade(ProviderKind::Spotify, "search", self.fetch_search(query, kind).await)
    }
}

// ============================================================================
// Mapping
// ============================================================================

/// Fields shared by full and simplified rspotify tracks
struct TrackParts {
    id: Option<String>,
    name: String,
    artists: Vec<String>,
    album: Option<String>,
    duration_ms: i64,
    preview_url: Option<String>,
}

fn build_track(parts: TrackParts) -> Option<Track> {
    let id = parts.id.filter(|id| !id.is_empty())?;
    if parts.name.is_empty() {
        return None;
    }

    let stream = match parts.preview_url {
        Some(url) if !url.is_empty() => StreamSource::Direct(vec![url]),
        _ => StreamSource::Unavailable,
    };
    let mut track = Track::new(id, parts.name)
        .with_artists(parts.artists)
        .with_duration_ms(parts.duration_ms.max(0) as u64)
        .with_stream(stream);
    if let Some(album) = parts.album.filter(|a| !a.is_empty()) {
        track = track.with_album(album);
    }
    Some(track)
}

fn map_full_track(track: FullTrack) -> Option<Track> {
    build_track(TrackParts {
        id: track.id.as_ref().map(|id| id.id().to_string()),
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        album: Some(track.album.name),
        duration_ms: track.duration.num_milliseconds(),
        preview_url: track.preview_url,
        name: track.name,
    })
}

fn map_simplified_track(track: SimplifiedTrack) -> Option<Track> {
    build_track(TrackParts {
        id: track.id.as_ref().map(|id| id.id().to_string()),
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        album: track.album.map(|album| album.name),
        duration_ms: track.duration.num_milliseconds(),
        preview_url: track.preview_url,
        name: track.name,
    })
}

fn map_playlist(playlist: SimplifiedPlaylist) -> Option<Playlist> {
    if playlist.name.is_empty() {
        return None;
    }
    Some(Playlist {
        id: playlist.id.id().to_string(),
        title: playlist.name,
        owner: playlist
            .owner
            .display_name
            .or_else(|| Some(playlist.owner.id.id().to_string())),
        track_count: playlist.tracks.total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(id: Option<&str>, name: &str, preview: Option<&str>) -> TrackParts {
        TrackParts {
            id: id.map(String::from),
            name: name.to_string(),
            artists: vec!["Artist".to_string()],
            album: Some("Album".to_string()),
            duration_ms: 215_000,
            preview_url: preview.map(String::from),
        }
    }

    #[test]
    fn test_preview_url_becomes_direct_source() {
        let track = build_track(parts(Some("abc"), "Song", Some("https://p.scdn.co/mp3-preview/1"))).unwrap();
        assert_eq!(
            track.stream,
            StreamSource::Direct(vec!["https://p.scdn.co/mp3-preview/1".to_string()])
        );
        assert_eq!(track.album.as_deref(), Some("Album"));
        assert_eq!(track.duration_ms, 215_000);
    }

    #[test]
    fn test_missing_preview_means_no_audio() {
        let track = build_track(parts(Some("abc"), "Song", None)).unwrap();
        assert_eq!(track.stream, StreamSource::Unavailable);
    }

    #[test]
    fn test_local_tracks_without_id_are_dropped() {
        assert!(build_track(parts(None, "Local file", None)).is_none());
        assert!(build_track(parts(Some("abc"), "", None)).is_none());
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected_without_network() {
        let provider = SpotifyProvider::new();
        assert!(!provider.authenticate("").await);
        assert!(!provider.authenticate("   ").await);
    }

    #[tokio::test]
    async fn test_unauthenticated_calls_degrade_to_empty() {
        let provider = SpotifyProvider::new();
        assert!(provider.get_my_wave().await.is_empty());
        assert!(provider.get_liked_tracks().await.is_empty());
        assert!(provider.get_playlists().await.is_empty());
        assert!(provider.search("test", SearchKind::Artist).await.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_stream_uses_preview() {
        let provider = SpotifyProvider::new();
        let track = Track::new("1", "Song").with_stream(StreamSource::Direct(vec!["https://preview".into()]));
        assert_eq!(provider.resolve_stream(&track).await, vec!["https://preview".to_string()]);
    }
}
