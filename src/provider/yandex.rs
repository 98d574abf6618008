//! Yandex Music adapter.
//!
//! Credential: OAuth token, sent as `Authorization: OAuth <token>`.
//! Streams are not part of track records; each play asks `download-info` for
//! a signed mp3 location.

use async_trait::async_trait;
use md5::{Digest, Md5};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;

use super::error::{ProviderError, Result};
use super::{check_status, degrade, Provider, ProviderKind, PAGE_LIMIT};
use crate::model::{Artist, Playlist, SearchItem, SearchKind, StreamSource, Track};
use crate::log_api_request;

const DEFAULT_BASE_URL: &str = "https://api.music.yandex.net";
const SIGN_SALT: &str = "XGRlBW9FXlekgbPrRHuSiA";
const WAVE_STATION: &str = "user:onyourwave";

#[derive(Clone, Debug)]
struct YandexSession {
    token: String,
    uid: u64,
}

pub struct YandexProvider {
    http: reqwest::Client,
    base_url: String,
    session: RwLock<Option<YandexSession>>,
}

impl YandexProvider {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: RwLock::new(None),
        }
    }

    async fn session(&self) -> Result<YandexSession> {
        self.session.read().await.clone().ok_or(ProviderError::NotAuthenticated)
    }

    async fn get<T: DeserializeOwned>(&self, token: &str, endpoint: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("OAuth {}", token))
            .query(query)
            .send()
            .await?;
        let envelope: Envelope<T> = check_status(response).await?.json().await?;
        Ok(envelope.result)
    }

    async fn fetch_account(&self, token: &str) -> Result<u64> {
        log_api_request!(ProviderKind::Yandex, "account_status");
        let status: AccountStatus = self.get(token, "account/status", &[]).await?;
        status
            .account
            .uid
            .ok_or_else(|| ProviderError::Parse("account has no uid".to_string()))
    }

    async fn fetch_wave(&self) -> Result<Vec<Track>> {
        let session = self.session().await?;
        log_api_request!(ProviderKind::Yandex, "wave", station = WAVE_STATION);
        let endpoint = format!("rotor/station/{}/tracks", WAVE_STATION);
        let wave: WaveResult = self
            .get(&session.token, &endpoint, &[("settings2", "true".to_string())])
            .await?;
        Ok(wave
            .sequence
            .into_iter()
            .filter_map(|item| item.track)
            .filter_map(map_track)
            .collect())
    }

    async fn fetch_liked(&self) -> Result<Vec<Track>> {
        let session = self.session().await?;
        log_api_request!(ProviderKind::Yandex, "liked_tracks", uid = session.uid);
        let endpoint = format!("users/{}/likes/tracks", session.uid);
        let likes: LikesResult = self.get(&session.token, &endpoint, &[]).await?;

        let ids: Vec<String> = likes
            .library
            .tracks
            .iter()
            .filter_map(|short| id_string(&short.id))
            .take(PAGE_LIMIT as usize)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Likes only carry ids; the full records come from a second request
        let url = format!("{}/tracks", self.base_url);
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("OAuth {}", session.token))
            .form(&[("track-ids", ids.join(","))])
            .send()
            .await?;
        let tracks: Envelope<Vec<NativeTrack>> = check_status(response).await?.json().await?;
        Ok(tracks.result.into_iter().filter_map(map_track).collect())
    }

    async fn fetch_playlists(&self) -> Result<Vec<Playlist>> {
        let session = self.session().await?;
        log_api_request!(ProviderKind::Yandex, "playlists", uid = session.uid);
        let endpoint = format!("users/{}/playlists/list", session.uid);
        let playlists: Vec<NativePlaylist> = self.get(&session.token, &endpoint, &[]).await?;
        Ok(playlists
            .into_iter()
            .filter_map(|p| map_playlist(p, session.uid))
            .take(PAGE_LIMIT as usize)
            .collect())
    }

    async fn fetch_playlist_tracks(&self, playlist: &Playlist) -> Result<Vec<Track>> {
        let session = self.session().await?;
        let (uid, kind) = playlist
            .id
            .split_once(':')
            .ok_or_else(|| ProviderError::InvalidId(playlist.id.clone()))?;
        log_api_request!(ProviderKind::Yandex, "playlist_tracks", playlist = %playlist.id);
        let endpoint = format!("users/{}/playlists/{}", uid, kind);
        let detail: PlaylistResult = self.get(&session.token, &endpoint, &[]).await?;
        Ok(detail
            .tracks
            .into_iter()
            .filter_map(|item| item.track)
            .filter_map(map_track)
            .collect())
    }

    async fn fetch_search(&self, query: &str, kind: SearchKind) -> Result<Vec<SearchItem>> {
        let session = self.session().await?;
        log_api_request!(ProviderKind::Yandex, "search", query = query, kind = kind.label());
        let params = [
            ("text", query.to_string()),
            ("type", kind.label().to_string()),
            ("page", "0".to_string()),
        ];
        let result: SearchResult = self.get(&session.token, "search", &params).await?;
        Ok(map_search(result, kind, session.uid))
    }

    async fn fetch_stream(&self, track: &Track) -> Result<Vec<String>> {
        let session = self.session().await?;
        log_api_request!(ProviderKind::Yandex, "download_info", track = %track.id);
        let endpoint = format!("tracks/{}/download-info", track.id);
        let mut infos: Vec<DownloadInfo> = self.get(&session.token, &endpoint, &[]).await?;

        infos.retain(|info| info.codec == "mp3");
        infos.sort_by(|a, b| b.bitrate_in_kbps.cmp(&a.bitrate_in_kbps));

        // Best bitrate first; a candidate that fails only costs its own slot
        for info in infos {
            match self.fetch_signed_url(&session.token, &info).await {
                Ok(url) => return Ok(vec![url]),
                Err(e) => tracing::warn!(
                    track = %track.id,
                    bitrate = info.bitrate_in_kbps,
                    error = %e,
                    "Skipping download candidate"
                ),
            }
        }
        Ok(Vec::new())
    }

    async fn fetch_signed_url(&self, token: &str, info: &DownloadInfo) -> Result<String> {
        let response = self
            .http
            .get(&info.download_info_url)
            .header(AUTHORIZATION, format!("OAuth {}", token))
            .send()
            .await?;
        let xml = check_status(response).await?.text().await?;
        signed_stream_url(&xml)
    }
}

#[async_trait]
impl Provider for YandexProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Yandex
    }

    async fn authenticate(&self, credential: &str) -> bool {
        let token = credential.trim();
        if token.is_empty() {
            *self.session.write().await = None;
            return false;
        }

        let result = self.fetch_account(token).await;
        crate::log_api_result!(ProviderKind::Yandex, "authenticate", result);
        match result {
            Ok(uid) => {
                *self.session.write().await = Some(YandexSession {
                    token: token.to_string(),
                    uid,
                });
                true
            }
            Err(_) => {
                *self.session.write().await = None;
                false
            }
        }
    }

    async fn get_my_wave(&self) -> Vec<Track> {
        degrade(ProviderKind::Yandex, "wave", self.fetch_wave().await)
    }

    async fn get_liked_tracks(&self) -> Vec<Track> {
        degrade(ProviderKind::Yandex, "liked_tracks", self.fetch_liked().await)
    }

    async fn get_playlists(&self) -> Vec<Playlist> {
        degrade(ProviderKind::Yandex, "playlists", self.fetch_playlists().await)
    }

    async fn playlist_tracks(&self, playlist: &Playlist) -> Vec<Track> {
        degrade(
            ProviderKind::Yandex,
            "playlist_tracks",
            self.fetch_playlist_tracks(playlist).await,
        )
    }

    async fn search(&self, query: &str, kind: SearchKind) -> Vec<SearchItem> {
        degrade(ProviderKind::Yandex, "search", self.fetch_search(query, kind).await)
    }

    async fn resolve_stream(&self, track: &Track) -> Vec<String> {
        match track.stream {
            StreamSource::Deferred => {
                degrade(ProviderKind::Yandex, "resolve_stream", self.fetch_stream(track).await)
            }
            _ => super::direct_sources(track),
        }
    }
}

// ============================================================================
// Native shapes
// ============================================================================

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct AccountStatus {
    account: Account,
}

#[derive(Deserialize)]
struct Account {
    uid: Option<u64>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct NativeTrack {
    id: Option<Value>,
    title: Option<String>,
    #[serde(default)]
    artists: Vec<NativeArtist>,
    #[serde(default)]
    albums: Vec<NativeAlbum>,
    duration_ms: Option<u64>,
    available: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct NativeArtist {
    id: Option<Value>,
    name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct NativeAlbum {
    title: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct NativePlaylist {
    kind: Option<u64>,
    title: Option<String>,
    track_count: Option<u32>,
    owner: Option<NativeOwner>,
}

#[derive(Deserialize, Debug)]
struct NativeOwner {
    uid: Option<u64>,
    login: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct WaveResult {
    #[serde(default)]
    sequence: Vec<TrackItem>,
}

#[derive(Deserialize)]
struct TrackItem {
    track: Option<NativeTrack>,
}

#[derive(Deserialize)]
struct LikesResult {
    library: LikesLibrary,
}

#[derive(Deserialize)]
struct LikesLibrary {
    #[serde(default)]
    tracks: Vec<TrackShort>,
}

#[derive(Deserialize)]
struct TrackShort {
    id: Value,
}

#[derive(Deserialize)]
struct PlaylistResult {
    #[serde(default)]
    tracks: Vec<TrackItem>,
}

#[derive(Deserialize)]
struct SearchResult {
    tracks: Option<SearchBlock<NativeTrack>>,
    artists: Option<SearchBlock<NativeArtist>>,
    playlists: Option<SearchBlock<NativePlaylist>>,
}

#[derive(Deserialize)]
struct SearchBlock<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct DownloadInfo {
    codec: String,
    bitrate_in_kbps: Option<u32>,
    download_info_url: String,
}

// ============================================================================
// Mapping
// ============================================================================

/// Yandex sends ids as either strings or numbers
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn map_track(native: NativeTrack) -> Option<Track> {
    let id = native.id.as_ref().and_then(id_string)?;
    let title = native.title.filter(|t| !t.is_empty())?;

    let stream = if native.available == Some(false) {
        StreamSource::Unavailable
    } else {
        StreamSource::Deferred
    };

    let mut track = Track::new(id, title)
        .with_artists(native.artists.into_iter().filter_map(|a| a.name))
        .with_duration_ms(native.duration_ms.unwrap_or(0))
        .with_stream(stream);
    if let Some(album) = native.albums.into_iter().find_map(|a| a.title) {
        track = track.with_album(album);
    }
    Some(track)
}

fn map_artist(native: NativeArtist) -> Option<Artist> {
    Some(Artist {
        id: native.id.as_ref().and_then(id_string)?,
        name: native.name.filter(|n| !n.is_empty())?,
    })
}

/// Playlists are addressed by owner uid and kind, joined as `uid:kind`
fn map_playlist(native: NativePlaylist, fallback_uid: u64) -> Option<Playlist> {
    let kind = native.kind?;
    let title = native.title.filter(|t| !t.is_empty())?;
    let (uid, owner) = match native.owner {
        Some(owner) => (owner.uid.unwrap_or(fallback_uid), owner.name.or(owner.login)),
        None => (fallback_uid, None),
    };
    Some(Playlist {
        id: format!("{}:{}", uid, kind),
        title,
        owner,
        track_count: native.track_count.unwrap_or(0),
    })
}

fn map_search(result: SearchResult, kind: SearchKind, uid: u64) -> Vec<SearchItem> {
    match kind {
        SearchKind::Track => result
            .tracks
            .map(|block| block.results)
            .unwrap_or_default()
            .into_iter()
            .filter_map(map_track)
            .map(SearchItem::Track)
            .collect(),
        SearchKind::Artist => result
            .artists
            .map(|block| block.results)
            .unwrap_or_default()
            .into_iter()
            .filter_map(map_artist)
            .map(SearchItem::Artist)
            .collect(),
        SearchKind::Playlist => result
            .playlists
            .map(|block| block.results)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| map_playlist(p, uid))
            .map(SearchItem::Playlist)
            .collect(),
    }
}

/// Text of the first `<tag>` element. Only handles the flat download-info
/// document: no attributes on the tag, no entities, no nesting.
fn xml_tag<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;
    Some(xml[start..end].trim())
}

/// Builds the signed mp3 URL from a download-info XML document
fn signed_stream_url(xml: &str) -> Result<String> {
    let field = |tag: &str| {
        xml_tag(xml, tag).ok_or_else(|| ProviderError::Parse(format!("download info has no <{}>", tag)))
    };
    let host = field("host")?;
    let path = field("path")?;
    let ts = field("ts")?;
    let s = field("s")?;

    let mut hasher = Md5::new();
    hasher.update(SIGN_SALT.as_bytes());
    hasher.update(path.trim_start_matches('/').as_bytes());
    hasher.update(s.as_bytes());
    let sign = format!("{:x}", hasher.finalize());

    Ok(format!("https://{}/get-mp3/{}/{}{}", host, sign, ts, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn native_track(value: Value) -> NativeTrack {
        serde_json::from_value(value).unwrap()
    }

    async fn authenticated(server: &MockServer) -> YandexProvider {
        Mock::given(method("GET"))
            .and(path("/account/status"))
            .and(header("Authorization", "OAuth good-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"result": {"account": {"uid": 42}}})),
            )
            .mount(server)
            .await;

        let provider = YandexProvider::with_base_url(reqwest::Client::new(), server.uri());
        assert!(provider.authenticate("good-token").await);
        provider
    }

    #[test]
    fn test_map_track_accepts_numeric_ids() {
        let track = map_track(native_track(json!({
            "id": 123,
            "title": "Song",
            "artists": [{"id": 1, "name": "A"}, {"id": 2, "name": "B"}],
            "albums": [{"title": "Album"}],
            "durationMs": 185000
        })))
        .unwrap();

        assert_eq!(track.id, "123");
        assert_eq!(track.artists, vec!["A", "B"]);
        assert_eq!(track.album.as_deref(), Some("Album"));
        assert_eq!(track.duration_ms, 185_000);
        assert_eq!(track.stream, StreamSource::Deferred);
    }

    #[test]
    fn test_map_track_drops_partial_records() {
        assert!(map_track(native_track(json!({"title": "No id"}))).is_none());
        assert!(map_track(native_track(json!({"id": "1"}))).is_none());

        let unavailable = map_track(native_track(json!({"id": "1", "title": "T", "available": false}))).unwrap();
        assert_eq!(unavailable.stream, StreamSource::Unavailable);
        assert_eq!(unavailable.duration_ms, 0);
    }

    #[test]
    fn test_map_playlist_uses_owner_uid() {
        let native: NativePlaylist = serde_json::from_value(json!({
            "kind": 1003,
            "title": "Road",
            "trackCount": 12,
            "owner": {"uid": 7, "login": "someone"}
        }))
        .unwrap();
        let playlist = map_playlist(native, 42).unwrap();
        assert_eq!(playlist.id, "7:1003");
        assert_eq!(playlist.owner.as_deref(), Some("someone"));
        assert_eq!(playlist.track_count, 12);
    }

    #[test]
    fn test_signed_stream_url() {
        let xml = "<?xml version=\"1.0\"?><download-info><host>s1.example.net</host>\
                   <path>/rmusic/abc</path><ts>0005f1</ts><region>-1</region><s>secret</s></download-info>";
        let url = signed_stream_url(xml).unwrap();

        let expected_sign = format!("{:x}", Md5::digest(format!("{}rmusic/abcsecret", SIGN_SALT).as_bytes()));
        assert_eq!(
            url,
            format!("https://s1.example.net/get-mp3/{}/0005f1/rmusic/abc", expected_sign)
        );
        assert!(signed_stream_url("<download-info></download-info>").is_err());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_bad_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/account/status"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let provider = YandexProvider::with_base_url(reqwest::Client::new(), server.uri());
        assert!(!provider.authenticate("bad-token").await);
        assert!(!provider.authenticate("").await);
        assert!(provider.get_liked_tracks().await.is_empty());
    }

    #[tokio::test]
    async fn test_wave_maps_station_sequence() {
        let server = MockServer::start().await;
        let provider = authenticated(&server).await;

        Mock::given(method("GET"))
            .and(path("/rotor/station/user:onyourwave/tracks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"sequence": [
                    {"track": {"id": "1", "title": "One", "artists": [{"name": "X"}]}},
                    {"track": {"title": "Broken"}},
                    {"track": {"id": "3", "title": "Three"}}
                ]}
            })))
            .mount(&server)
            .await;

        let tracks = provider.get_my_wave().await;
        let ids: Vec<_> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_liked_tracks_fetches_full_records() {
        let server = MockServer::start().await;
        let provider = authenticated(&server).await;

        Mock::given(method("GET"))
            .and(path("/users/42/likes/tracks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"library": {"uid": 42, "tracks": [{"id": "10", "albumId": "5"}, {"id": "11"}]}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/tracks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [{"id": "10", "title": "Ten"}, {"id": "11", "title": "Eleven"}]
            })))
            .mount(&server)
            .await;

        let tracks = provider.get_liked_tracks().await;
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].title, "Eleven");
    }

    #[tokio::test]
    async fn test_search_artist_kind() {
        let server = MockServer::start().await;
        let provider = authenticated(&server).await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("text", "test"))
            .and(query_param("type", "artist"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"artists": {"results": [{"id": 5, "name": "Artist"}]}}
            })))
            .mount(&server)
            .await;

        let items = provider.search("test", SearchKind::Artist).await;
        assert_eq!(
            items,
            vec![SearchItem::Artist(Artist {
                id: "5".into(),
                name: "Artist".into()
            })]
        );
    }

    #[tokio::test]
    async fn test_server_error_degrades_to_empty() {
        let server = MockServer::start().await;
        let provider = authenticated(&server).await;

        Mock::given(method("GET"))
            .and(path("/users/42/playlists/list"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(provider.get_playlists().await.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_stream_signs_download_info() {
        let server = MockServer::start().await;
        let provider = authenticated(&server).await;

        Mock::given(method("GET"))
            .and(path("/tracks/77/download-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    {"codec": "aac", "bitrateInKbps": 256, "downloadInfoUrl": format!("{}/info/aac", server.uri())},
                    {"codec": "mp3", "bitrateInKbps": 320, "downloadInfoUrl": format!("{}/info/mp3", server.uri())}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/info/mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<download-info><host>cdn.test</host><path>/p/q</path><ts>ab</ts><s>k</s></download-info>",
            ))
            .mount(&server)
            .await;

        let track = Track::new("77", "Song").with_stream(StreamSource::Deferred);
        let urls = provider.resolve_stream(&track).await;
        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with("https://cdn.test/get-mp3/"));
        assert!(urls[0].ends_with("/ab/p/q"));
    }

    #[tokio::test]
    async fn test_resolve_stream_skips_failing_candidate() {
        let server = MockServer::start().await;
        let provider = authenticated(&server).await;

        Mock::given(method("GET"))
            .and(path("/tracks/78/download-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    {"codec": "mp3", "bitrateInKbps": 192, "downloadInfoUrl": format!("{}/info/192", server.uri())},
                    {"codec": "mp3", "bitrateInKbps": 320, "downloadInfoUrl": format!("{}/info/320", server.uri())}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/info/320"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/info/192"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<download-info><host>cdn.test</host><path>/low</path><ts>cd</ts><s>k</s></download-info>",
            ))
            .mount(&server)
            .await;

        let track = Track::new("78", "Song").with_stream(StreamSource::Deferred);
        let urls = provider.resolve_stream(&track).await;
        assert_eq!(urls.len(), 1);
        assert!(urls[0].ends_with("/cd/low"));
    }

    #[tokio::test]
    async fn test_resolve_stream_empty_when_every_candidate_fails() {
        let server = MockServer::start().await;
        let provider = authenticated(&server).await;

        Mock::given(method("GET"))
            .and(path("/tracks/79/download-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    {"codec": "mp3", "bitrateInKbps": 320, "downloadInfoUrl": format!("{}/info/bad", server.uri())}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/info/bad"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<download-info></download-info>"))
            .mount(&server)
            .await;

        let track = Track::new("79", "Song").with_stream(StreamSource::Deferred);
        assert!(provider.resolve_stream(&track).await.is_empty());
    }
}
