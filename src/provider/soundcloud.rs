//! SoundCloud adapter.
//!
//! Credential: an API client id, appended to every request. Only track search
//! is available; stream URLs come with the track records.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::error::{ProviderError, Result};
use super::{check_status, degrade, Provider, ProviderKind, PAGE_LIMIT};
use crate::model::{SearchItem, SearchKind, StreamSource, Track};
use crate::log_api_request;

const DEFAULT_BASE_URL: &str = "https://api.soundcloud.com";

pub struct SoundCloudProvider {
    http: reqwest::Client,
    base_url: String,
    client_id: RwLock<Option<String>>,
}

impl SoundCloudProvider {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: RwLock::new(None),
        }
    }

    async fn query_tracks(&self, client_id: &str, query: &str, limit: u32) -> Result<Vec<NativeTrack>> {
        let url = format!("{}/tracks", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("q", query), ("client_id", client_id)])
            .query(&[("limit", limit)])
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn fetch_tracks(&self, query: &str) -> Result<Vec<SearchItem>> {
        let client_id = self
            .client_id
            .read()
            .await
            .clone()
            .ok_or(ProviderError::NotAuthenticated)?;
        log_api_request!(ProviderKind::SoundCloud, "search", query = query);
        let tracks = self.query_tracks(&client_id, query, PAGE_LIMIT).await?;
        Ok(tracks
            .into_iter()
            .filter_map(|t| map_track(t, &client_id))
            .map(SearchItem::Track)
            .collect())
    }
}

#[async_trait]
impl Provider for SoundCloudProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SoundCloud
    }

    async fn authenticate(&self, credential: &str) -> bool {
        let client_id = credential.trim();
        if client_id.is_empty() {
            *self.client_id.write().await = None;
            return false;
        }

        log_api_request!(ProviderKind::SoundCloud, "probe");
        let result = self.query_tracks(client_id, "test", 1).await;
        crate::log_api_result!(ProviderKind::SoundCloud, "authenticate", result);
        let accepted = result.is_ok();
        *self.client_id.write().await = accepted.then(|| client_id.to_string());
        accepted
    }

    async fn search(&self, query: &str, kind: SearchKind) -> Vec<SearchItem> {
        match kind {
            SearchKind::Track => degrade(ProviderKind::SoundCloud, "search", self.fetch_tracks(query).await),
            SearchKind::Artist | SearchKind::Playlist => Vec::new(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct NativeTrack {
    id: Option<u64>,
    title: Option<String>,
    duration: Option<u64>,
    user: Option<NativeUser>,
    stream_url: Option<String>,
    streamable: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct NativeUser {
    username: Option<String>,
}

/// Appends `client_id` to the stream URL, keeping any query it already has
fn with_client_id(url: &str, client_id: &str) -> Option<String> {
    let mut url = reqwest::Url::parse(url).ok()?;
    url.query_pairs_mut().append_pair("client_id", client_id);
    Some(url.to_string())
}

fn map_track(native: NativeTrack, client_id: &str) -> Option<Track> {
    let id = native.id?;
    let title = native.title.filter(|t| !t.is_empty())?;

    let stream = match native.stream_url {
        Some(url) if native.streamable != Some(false) => match with_client_id(&url, client_id) {
            Some(url) => StreamSource::Direct(vec![url]),
            None => StreamSource::Unavailable,
        },
        _ => StreamSource::Unavailable,
    };

    Some(
        Track::new(id.to_string(), title)
            .with_artists(native.user.and_then(|u| u.username))
            .with_duration_ms(native.duration.unwrap_or(0))
            .with_stream(stream),
    )
}
