//! Queue loading, search, playlists and provider switching

use crate::model::{LibraryItem, Playlist, SearchItem, SearchKind, Track};
use crate::session::AuthAttempt;
use super::{SessionController, WorkerResult};

impl SessionController {
    /// Bumps the load generation. Results of earlier loads become stale.
    fn next_load(&mut self) -> (u64, u64) {
        self.load_generation += 1;
        (self.switchboard.epoch(), self.load_generation)
    }

    fn is_current_load(&self, epoch: u64, generation: u64) -> bool {
        epoch == self.switchboard.epoch() && generation == self.load_generation
    }

    async fn mark_loading(&self) {
        self.model.lock().await.set_content_loading(true).await;
    }

    pub(super) async fn load_wave(&mut self) {
        let (epoch, generation) = self.next_load();
        let provider = self.switchboard.provider();
        tracing::debug!(provider = %self.switchboard.kind(), "Loading wave");
        self.mark_loading().await;
        self.spawn_worker(async move {
            let tracks = provider.get_my_wave().await;
            WorkerResult::Tracks {
                epoch,
                generation,
                title: LibraryItem::Wave.name().to_string(),
                tracks,
            }
        });
    }

    pub(super) async fn load_liked(&mut self) {
        let (epoch, generation) = self.next_load();
        let provider = self.switchboard.provider();
        tracing::debug!(provider = %self.switchboard.kind(), "Loading liked tracks");
        self.mark_loading().await;
        self.spawn_worker(async move {
            let tracks = provider.get_liked_tracks().await;
            WorkerResult::Tracks {
                epoch,
                generation,
                title: LibraryItem::Liked.name().to_string(),
                tracks,
            }
        });
    }

    pub(super) async fn load_playlist(&mut self, playlist: Playlist) {
        let (epoch, generation) = self.next_load();
        let provider = self.switchboard.provider();
        tracing::debug!(playlist = %playlist.id, "Loading playlist");
        self.mark_loading().await;
        self.spawn_worker(async move {
            let tracks = provider.playlist_tracks(&playlist).await;
            WorkerResult::Tracks {
                epoch,
                generation,
                title: playlist.title,
                tracks,
            }
        });
    }

    /// Track searches fill the queue; artist and playlist searches are only
    /// listed
    pub(super) async fn search(&mut self, query: String, kind: SearchKind) {
        let query = query.trim().to_string();
        if query.is_empty() {
            return;
        }

        let (epoch, generation) = self.next_load();
        let provider = self.switchboard.provider();
        tracing::debug!(query = %query, kind = kind.label(), "Searching");
        self.mark_loading().await;
        self.spawn_worker(async move {
            let items = provider.search(&query, kind).await;
            match kind {
                SearchKind::Track => WorkerResult::Tracks {
                    epoch,
                    generation,
                    title: format!("Search: {}", query),
                    tracks: items.into_iter().filter_map(SearchItem::into_track).collect(),
                },
                SearchKind::Artist | SearchKind::Playlist => WorkerResult::SearchItems {
                    epoch,
                    generation,
                    query,
                    kind,
                    items,
                },
            }
        });
    }

    pub(super) async fn refresh_playlists(&mut self) {
        let epoch = self.switchboard.epoch();
        let provider = self.switchboard.provider();
        self.spawn_worker(async move {
            let playlists = provider.get_playlists().await;
            WorkerResult::Playlists { epoch, playlists }
        });
    }

    pub(super) async fn apply_tracks(&mut self, epoch: u64, generation: u64, title: String, tracks: Vec<Track>) {
        if !self.is_current_load(epoch, generation) {
            tracing::debug!(epoch, generation, "Dropping stale track list");
            return;
        }

        tracing::info!(title = %title, count = tracks.len(), "Queue replaced");
        let empty = tracks.is_empty();
        self.session.load(tracks);
        self.queue_title = title;
        self.publish_queue().await;
        self.publish_transport().await;

        if empty {
            let message = format!("{}: nothing to play", self.queue_title);
            self.model.lock().await.set_status(message).await;
        }
    }

    pub(super) async fn apply_search_items(
        &mut self,
        epoch: u64,
        generation: u64,
        query: &str,
        kind: SearchKind,
        items: Vec<SearchItem>,
    ) {
        if !self.is_current_load(epoch, generation) {
            tracing::debug!(epoch, generation, "Dropping stale search result");
            return;
        }
        tracing::info!(query, kind = kind.label(), count = items.len(), "Search finished");
        self.model.lock().await.set_search_results(query, kind, items).await;
    }

    pub(super) async fn apply_playlists(&mut self, epoch: u64, playlists: Vec<Playlist>) {
        if epoch != self.switchboard.epoch() {
            return;
        }
        self.model.lock().await.set_playlists(playlists).await;
    }

    // ========================================================================
    // Provider switching and authorization
    // ========================================================================

    pub(super) async fn switch_provider(&mut self, name: &str) {
        match self.switchboard.switch_to(name) {
            Ok(attempt) => {
                self.reset_for_new_provider().await;
                match attempt {
                    Some(attempt) => self.spawn_auth(attempt),
                    None => self.report_auth_required().await,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Provider switch aborted");
                self.model.lock().await.set_error(e.to_string()).await;
            }
        }
    }

    pub(super) async fn authenticate(&mut self, name: &str, credential: &str) {
        match self.switchboard.authenticate(name, credential) {
            Ok((attempt, switched)) => {
                if switched {
                    self.reset_for_new_provider().await;
                } else {
                    self.publish_provider().await;
                }
                self.spawn_auth(attempt);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Authorization aborted");
                self.model.lock().await.set_error(e.to_string()).await;
            }
        }
    }

    pub(super) fn spawn_auth(&self, attempt: AuthAttempt) {
        let AuthAttempt {
            epoch,
            provider,
            credential,
        } = attempt;
        self.spawn_worker(async move {
            let accepted = provider.authenticate(&credential).await;
            WorkerResult::Auth {
                epoch,
                credential,
                accepted,
            }
        });
    }

    pub(super) async fn apply_auth(&mut self, epoch: u64, credential: &str, accepted: bool) {
        let Some(accepted) = self.switchboard.finish_auth(epoch, credential, accepted) else {
            return;
        };
        self.publish_provider().await;
        if accepted {
            let message = format!("Authorized with {}", self.switchboard.kind());
            self.model.lock().await.set_status(message).await;
            self.refresh_playlists().await;
        } else {
            self.report_auth_required().await;
        }
    }

    /// Queue, playlists and content belong to the previous provider
    async fn reset_for_new_provider(&mut self) {
        self.session.clear();
        self.queue_title.clear();
        {
            let model = self.model.lock().await;
            model.clear_content().await;
            model.set_playlists(Vec::new()).await;
        }
        self.publish_provider().await;
        self.publish_transport().await;
    }
}
