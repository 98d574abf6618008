//! Last.fm adapter.
//!
//! Credential: an API key. Last.fm is a metadata catalog: tracks and artists
//! can be searched but nothing can be played.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;

use super::error::{ProviderError, Result};
use super::{check_status, degrade, Provider, ProviderKind, PAGE_LIMIT};
use crate::model::{Artist, SearchItem, SearchKind, StreamSource, Track};
use crate::log_api_request;

const DEFAULT_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0";

pub struct LastFmProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: RwLock<Option<String>>,
}

impl LastFmProvider {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: RwLock::new(None),
        }
    }

    /// Calls a Last.fm method. Errors can arrive with a 200 status, so the
    /// body is checked for an `error` field before decoding.
    async fn call<T: DeserializeOwned>(&self, api_key: &str, params: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("api_key", api_key), ("format", "json")])
            .send()
            .await?;
        let body: Value = check_status(response).await?.json().await?;
        if let Some(code) = body.get("error") {
            return Err(ProviderError::Api {
                status: code.as_u64().unwrap_or(0) as u16,
                message: body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        Ok(serde_json::from_value(body)?)
    }

    async fn api_key(&self) -> Result<String> {
        self.api_key.read().await.clone().ok_or(ProviderError::NotAuthenticated)
    }

    async fn fetch_search(&self, query: &str, kind: SearchKind) -> Result<Vec<SearchItem>> {
        let api_key = self.api_key().await?;
        log_api_request!(ProviderKind::LastFm, "search", query = query, kind = kind.label());
        match kind {
            SearchKind::Track => {
                let params = [
                    ("method", "track.search".to_string()),
                    ("track", query.to_string()),
                    ("limit", PAGE_LIMIT.to_string()),
                ];
                let response: TrackSearch = self.call(&api_key, &params).await?;
                Ok(response
                    .results
                    .trackmatches
                    .track
                    .into_iter()
                    .filter_map(map_track)
                    .map(SearchItem::Track)
                    .collect())
            }
            SearchKind::Artist => {
                let params = [
                    ("method", "artist.search".to_string()),
                    ("artist", query.to_string()),
                    ("limit", PAGE_LIMIT.to_string()),
                ];
                let response: ArtistSearch = self.call(&api_key, &params).await?;
                Ok(response
                    .results
                    .artistmatches
                    .artist
                    .into_iter()
                    .filter_map(map_artist)
                    .map(SearchItem::Artist)
                    .collect())
            }
            SearchKind::Playlist => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl Provider for LastFmProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LastFm
    }

    async fn authenticate(&self, credential: &str) -> bool {
        let api_key = credential.trim();
        if api_key.is_empty() {
            *self.api_key.write().await = None;
            return false;
        }

        log_api_request!(ProviderKind::LastFm, "chart.gettoptracks");
        let params = [
            ("method", "chart.gettoptracks".to_string()),
            ("limit", "1".to_string()),
        ];
        let result = self.call::<Value>(api_key, &params).await;
        crate::log_api_result!(ProviderKind::LastFm, "authenticate", result);
        let accepted = result.is_ok();
        *self.api_key.write().await = accepted.then(|| api_key.to_string());
        accepted
    }

    async fn search(&self, query: &str, kind: SearchKind) -> Vec<SearchItem> {
        degrade(ProviderKind::LastFm, "search", self.fetch_search(query, kind).await)
    }

    async fn resolve_stream(&self, _track: &Track) -> Vec<String> {
        Vec::new()
    }
}

#[derive(Deserialize)]
struct TrackSearch {
    results: TrackResults,
}

#[derive(Deserialize)]
struct TrackResults {
    trackmatches: TrackMatches,
}

#[derive(Deserialize)]
struct TrackMatches {
    #[serde(default)]
    track: Vec<NativeTrack>,
}

#[derive(Deserialize, Debug)]
struct NativeTrack {
    name: Option<String>,
    artist: Option<String>,
    mbid: Option<String>,
}

#[derive(Deserialize)]
struct ArtistSearch {
    results: ArtistResults,
}

#[derive(Deserialize)]
struct ArtistResults {
    artistmatches: ArtistMatches,
}

#[derive(Deserialize)]
struct ArtistMatches {
    #[serde(default)]
    artist: Vec<NativeArtist>,
}

#[derive(Deserialize, Debug)]
struct NativeArtist {
    name: Option<String>,
    mbid: Option<String>,
}

/// Many records have an empty MusicBrainz id; the name stands in for it
fn record_id(mbid: Option<String>, name: &str) -> String {
    mbid.filter(|id| !id.is_empty()).unwrap_or_else(|| name.to_string())
}

fn map_track(native: NativeTrack) -> Option<Track> {
    let title = native.name.filter(|n| !n.is_empty())?;
    Some(
        Track::new(record_id(native.mbid, &title), title)
            .with_artists(native.artist.filter(|a| !a.is_empty()))
            .with_stream(StreamSource::Unavailable),
    )
}

fn map_artist(native: NativeArtist) -> Option<Artist> {
    let name = native.name.filter(|n| !n.is_empty())?;
    Some(Artist {
        id: record_id(native.mbid, &name),
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn authenticated(server: &MockServer) -> LastFmProvider {
        Mock::given(method("GET"))
            .and(query_param("method", "chart.gettoptracks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tracks": {"track": []}})))
            .mount(server)
            .await;
        let provider = LastFmProvider::with_base_url(reqwest::Client::new(), server.uri());
        assert!(provider.authenticate("key").await);
        provider
    }

    #[test]
    fn test_empty_mbid_falls_back_to_name() {
        let track = map_track(NativeTrack {
            name: Some("Believe".into()),
            artist: Some("Cher".into()),
            mbid: Some(String::new()),
        })
        .unwrap();
        assert_eq!(track.id, "Believe");
        assert_eq!(track.stream, StreamSource::Unavailable);
        assert_eq!(track.duration_ms, 0);
    }

    #[tokio::test]
    async fn test_error_body_rejects_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"error": 10, "message": "Invalid API key"})),
            )
            .mount(&server)
            .await;

        let provider = LastFmProvider::with_base_url(reqwest::Client::new(), server.uri());
        assert!(!provider.authenticate("bad").await);
        assert!(provider.search("test", SearchKind::Track).await.is_empty());
    }

    #[tokio::test]
    async fn test_track_search_maps_matches() {
        let server = MockServer::start().await;
        let provider = authenticated(&server).await;
        Mock::given(method("GET"))
            .and(query_param("method", "track.search"))
            .and(query_param("track", "test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": {"trackmatches": {"track": [
                    {"name": "Test Song", "artist": "Someone", "mbid": "abc-123"},
                    {"name": "", "artist": "Nobody"}
                ]}}
            })))
            .mount(&server)
            .await;

        let items = provider.search("test", SearchKind::Track).await;
        assert_eq!(items.len(), 1);
        let track = items.into_iter().next().and_then(SearchItem::into_track).unwrap();
        assert_eq!(track.id, "abc-123");
        assert!(provider.resolve_stream(&track).await.is_empty());
    }

    #[tokio::test]
    async fn test_playlist_search_is_unsupported() {
        let server = MockServer::start().await;
        let provider = authenticated(&server).await;
        assert!(provider.search("test", SearchKind::Playlist).await.is_empty());
        assert!(provider.get_liked_tracks().await.is_empty());
    }
}
