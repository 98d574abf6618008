//! Transport intents and stream resolution

use crate::session::PlayRequest;
use super::{SessionController, WorkerResult};

impl SessionController {
    pub(super) async fn select(&mut self, track_id: &str) {
        let request = self.session.select(track_id);
        self.after_transport(request).await;
    }

    pub(super) async fn toggle(&mut self) {
        let request = self.session.toggle();
        self.after_transport(request).await;
    }

    pub(super) async fn next(&mut self) {
        let request = self.session.next();
        self.after_transport(request).await;
    }

    pub(super) async fn prev(&mut self) {
        let request = self.session.prev();
        self.after_transport(request).await;
    }

    pub(super) async fn set_volume(&mut self, volume: u8) {
        self.session.set_volume(volume);
        tracing::debug!(volume = self.session.volume(), "Volume changed");
        self.model.lock().await.set_volume(self.session.volume()).await;
    }

    pub(super) async fn seek(&mut self, position_ms: u64) {
        self.session.seek(position_ms);
        self.model
            .lock()
            .await
            .update_playback_position(self.session.position_ms())
            .await;
    }

    async fn after_transport(&mut self, request: Option<PlayRequest>) {
        if let Some(request) = request {
            let message = format!("Loading \"{}\"...", request.track.title);
            self.model.lock().await.set_status(message).await;
            self.resolve_stream(request);
        }
        self.publish_transport().await;
    }

    fn resolve_stream(&self, request: PlayRequest) {
        let epoch = self.switchboard.epoch();
        let provider = self.switchboard.provider();
        tracing::debug!(track = %request.track.id, generation = request.generation, "Resolving stream");
        self.spawn_worker(async move {
            let sources = provider.resolve_stream(&request.track).await;
            WorkerResult::Stream {
                epoch,
                request,
                sources,
            }
        });
    }

    pub(super) async fn apply_stream(&mut self, epoch: u64, request: PlayRequest, sources: Vec<String>) {
        if epoch != self.switchboard.epoch() {
            tracing::debug!(epoch, "Dropping stream result from replaced provider");
            return;
        }

        match self.session.complete_play(&request, &sources) {
            Ok(()) => {
                if self.session.is_current(&request) {
                    tracing::info!(track = %request.track.title, sources = sources.len(), "Playing");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot play track");
                self.model.lock().await.set_error(e.to_string()).await;
            }
        }
        self.publish_transport().await;
    }
}
