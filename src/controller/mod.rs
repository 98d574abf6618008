//! Controller module - Intents, background work and the session task
//!
//! Everything that changes the session flows through one channel of
//! [`SessionEvent`]s: intents from the terminal, reports from the output
//! device and results from background workers. A single [`SessionController`]
//! task owns the switchboard and the playback session and applies those
//! events one at a time. It is organized into submodules by responsibility:
//!
//! - `input`: Key event handling (turns keys into intents)
//! - `navigation`: Loading queues, search, playlists and provider switches
//! - `playback`: Transport intents and stream resolution
//! - `player_events`: Output device reports

mod input;
mod navigation;
mod playback;
mod player_events;

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

use crate::model::{AppModel, Playlist, SearchItem, SearchKind, Track};
use crate::session::{DeviceEvent, PlayRequest, PlaybackSession, Switchboard};

/// Something the user asked for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    LoadWave,
    LoadLiked,
    LoadPlaylist(Playlist),
    Search { query: String, kind: SearchKind },
    Select(String),
    Toggle,
    Next,
    Prev,
    SetVolume(u8),
    Seek(u64),
    SwitchProvider(String),
    Authenticate { provider: String, credential: String },
    RefreshPlaylists,
    Shutdown,
}

/// Outcome of a provider call made off the session task. Each one carries the
/// provider epoch it was started under.
#[derive(Debug)]
pub enum WorkerResult {
    Tracks {
        epoch: u64,
        generation: u64,
        title: String,
        tracks: Vec<Track>,
    },
    SearchItems {
        epoch: u64,
        generation: u64,
        query: String,
        kind: SearchKind,
        items: Vec<SearchItem>,
    },
    Playlists {
        epoch: u64,
        playlists: Vec<Playlist>,
    },
    Stream {
        epoch: u64,
        request: PlayRequest,
        sources: Vec<String>,
    },
    Auth {
        epoch: u64,
        credential: String,
        accepted: bool,
    },
}

#[derive(Debug)]
pub enum SessionEvent {
    Intent(Intent),
    Device(DeviceEvent),
    Worker(WorkerResult),
}

/// Handle the terminal side uses to read the model and send intents
#[derive(Clone)]
pub struct AppController {
    pub(crate) model: Arc<Mutex<AppModel>>,
    events: UnboundedSender<SessionEvent>,
}

impl AppController {
    pub fn new(model: Arc<Mutex<AppModel>>, events: UnboundedSender<SessionEvent>) -> Self {
        Self { model, events }
    }

    pub fn send_intent(&self, intent: Intent) {
        if self.events.send(SessionEvent::Intent(intent)).is_err() {
            tracing::warn!("Session controller is not running, intent dropped");
        }
    }
}

/// Single owner of the session state
pub struct SessionController {
    model: Arc<Mutex<AppModel>>,
    switchboard: Switchboard,
    session: PlaybackSession,
    events: UnboundedSender<SessionEvent>,
    load_generation: u64,
    queue_title: String,
}

impl SessionController {
    pub fn new(
        model: Arc<Mutex<AppModel>>,
        switchboard: Switchboard,
        session: PlaybackSession,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            model,
            switchboard,
            session,
            events,
            load_generation: 0,
            queue_title: String::new(),
        }
    }

    /// Applies events until a shutdown intent arrives or every sender is gone
    pub async fn run(mut self, mut receiver: UnboundedReceiver<SessionEvent>) {
        self.start().await;
        while let Some(event) = receiver.recv().await {
            if self.handle_event(event).await.is_break() {
                break;
            }
        }
        tracing::info!("Session controller stopped");
    }

    /// Publishes the initial state and logs in with the stored credential
    pub async fn start(&mut self) {
        {
            let model = self.model.lock().await;
            model.set_volume(self.session.volume()).await;
        }
        let attempt = self.switchboard.stored_attempt();
        self.publish_provider().await;
        match attempt {
            Some(attempt) => self.spawn_auth(attempt),
            None => self.report_auth_required().await,
        }
    }

    pub async fn handle_event(&mut self, event: SessionEvent) -> ControlFlow<()> {
        match event {
            SessionEvent::Intent(intent) => return self.handle_intent(intent).await,
            SessionEvent::Device(event) => self.handle_device_event(event).await,
            SessionEvent::Worker(result) => self.handle_worker_result(result).await,
        }
        ControlFlow::Continue(())
    }

    async fn handle_intent(&mut self, intent: Intent) -> ControlFlow<()> {
        match intent {
            Intent::LoadWave => self.load_wave().await,
            Intent::LoadLiked => self.load_liked().await,
            Intent::LoadPlaylist(playlist) => self.load_playlist(playlist).await,
            Intent::Search { query, kind } => self.search(query, kind).await,
            Intent::Select(track_id) => self.select(&track_id).await,
            Intent::Toggle => self.toggle().await,
            Intent::Next => self.next().await,
            Intent::Prev => self.prev().await,
            Intent::SetVolume(volume) => self.set_volume(volume).await,
            Intent::Seek(position_ms) => self.seek(position_ms).await,
            Intent::SwitchProvider(name) => self.switch_provider(&name).await,
            Intent::Authenticate { provider, credential } => self.authenticate(&provider, &credential).await,
            Intent::RefreshPlaylists => self.refresh_playlists().await,
            Intent::Shutdown => {
                tracing::info!("Shutdown requested");
                self.session.clear();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn handle_worker_result(&mut self, result: WorkerResult) {
        match result {
            WorkerResult::Tracks {
                epoch,
                generation,
                title,
                tracks,
            } => self.apply_tracks(epoch, generation, title, tracks).await,
            WorkerResult::SearchItems {
                epoch,
                generation,
                query,
                kind,
                items,
            } => self.apply_search_items(epoch, generation, &query, kind, items).await,
            WorkerResult::Playlists { epoch, playlists } => self.apply_playlists(epoch, playlists).await,
            WorkerResult::Stream {
                epoch,
                request,
                sources,
            } => self.apply_stream(epoch, request, sources).await,
            WorkerResult::Auth {
                epoch,
                credential,
                accepted,
            } => self.apply_auth(epoch, &credential, accepted).await,
        }
    }

    /// Runs a provider call on a background task and feeds its result back
    /// into the session channel
    fn spawn_worker<F>(&self, task: F)
    where
        F: Future<Output = WorkerResult> + Send + 'static,
    {
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = task.await;
            if events.send(SessionEvent::Worker(result)).is_err() {
                tracing::debug!("Session closed, dropping worker result");
            }
        });
    }

    // ========================================================================
    // Publishing to the display model
    // ========================================================================

    async fn publish_provider(&self) {
        let model = self.model.lock().await;
        model
            .set_provider(self.switchboard.kind().name(), self.switchboard.auth_status())
            .await;
    }

    async fn publish_queue(&self) {
        let queue = self.session.queue();
        let model = self.model.lock().await;
        model
            .set_queue_view(&self.queue_title, queue.tracks().to_vec(), queue.current_index())
            .await;
    }

    async fn publish_transport(&self) {
        let model = self.model.lock().await;
        let current = self.session.current_track().cloned();
        if model.get_playback_info().await.track != current {
            model.set_current_track(current).await;
        }
        model.set_transport_state(self.session.state()).await;
        model.update_playback_position(self.session.position_ms()).await;
        if self.session.duration_ms() > 0 {
            model.set_duration(self.session.duration_ms()).await;
        }
        model.set_queue_cursor(self.session.queue().current_index()).await;
    }

    async fn report_auth_required(&self) {
        let message = self.switchboard.auth_error().to_string();
        self.model.lock().await.set_status(message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use crate::model::{AuthStatus, ContentView, StreamSource, TransportState};
    use crate::provider::{MockProvider, Provider, ProviderFactory, ProviderKind};
    use crate::session::{DeviceCommand, DeviceState, MemoryCredentials, RecordingDevice};

    /// Hands out prepared mocks; backends without one get a bare mock
    struct PreparedFactory {
        providers: std::sync::Mutex<HashMap<ProviderKind, Arc<dyn Provider>>>,
    }

    impl ProviderFactory for PreparedFactory {
        fn create(&self, kind: ProviderKind) -> Arc<dyn Provider> {
            if let Some(provider) = self.providers.lock().unwrap().remove(&kind) {
                return provider;
            }
            let mut provider = MockProvider::new();
            provider.expect_kind().return_const(kind);
            Arc::new(provider)
        }
    }

    struct Harness {
        controller: SessionController,
        receiver: UnboundedReceiver<SessionEvent>,
        device: RecordingDevice,
        model: Arc<Mutex<AppModel>>,
    }

    impl Harness {
        fn new(providers: Vec<(ProviderKind, MockProvider)>, credentials: MemoryCredentials) -> Self {
            let providers = providers
                .into_iter()
                .map(|(kind, mock)| (kind, Arc::new(mock) as Arc<dyn Provider>))
                .collect();
            let factory = PreparedFactory {
                providers: std::sync::Mutex::new(providers),
            };
            let switchboard = Switchboard::new(Box::new(factory), Box::new(credentials), ProviderKind::Yandex);
            let device = RecordingDevice::default();
            let session = PlaybackSession::new(Box::new(device.clone()));
            let model = Arc::new(Mutex::new(AppModel::new()));
            let (events, receiver) = tokio::sync::mpsc::unbounded_channel();
            let controller = SessionController::new(model.clone(), switchboard, session, events);
            device.clear();
            Self {
                controller,
                receiver,
                device,
                model,
            }
        }

        async fn intent(&mut self, intent: Intent) {
            let _ = self.controller.handle_event(SessionEvent::Intent(intent)).await;
        }

        /// Delivers the next background result to the controller
        async fn pump(&mut self) {
            let event = tokio::time::timeout(Duration::from_secs(1), self.receiver.recv())
                .await
                .expect("worker result in time")
                .expect("channel open");
            let _ = self.controller.handle_event(event).await;
        }

        async fn error_message(&self) -> Option<String> {
            self.model.lock().await.get_ui_state().await.error_message
        }

        async fn queue_ids(&self) -> Vec<String> {
            self.controller
                .session
                .queue()
                .tracks()
                .iter()
                .map(|t| t.id.clone())
                .collect()
        }
    }

    fn track(id: &str, url: Option<&str>) -> Track {
        let stream = match url {
            Some(url) => StreamSource::Direct(vec![url.to_string()]),
            None => StreamSource::Unavailable,
        };
        Track::new(id, format!("Track {}", id)).with_stream(stream)
    }

    fn yandex_mock() -> MockProvider {
        let mut provider = MockProvider::new();
        provider.expect_kind().return_const(ProviderKind::Yandex);
        provider
    }

    #[tokio::test]
    async fn test_select_plays_resolved_url() {
        let mut provider = yandex_mock();
        provider
            .expect_get_my_wave()
            .returning(|| vec![track("1", Some("https://a")), track("2", Some("https://b"))]);
        provider
            .expect_resolve_stream()
            .returning(|track| crate::provider::direct_sources(track));
        let mut harness = Harness::new(vec![(ProviderKind::Yandex, provider)], MemoryCredentials::default());

        harness.intent(Intent::LoadWave).await;
        harness.pump().await;
        assert_eq!(harness.controller.session.state(), TransportState::Stopped);

        harness.intent(Intent::Select("2".into())).await;
        harness.pump().await;

        let source = harness.controller.session.loaded_source().expect("source loaded");
        assert_eq!(
            harness.device.commands(),
            vec![
                DeviceCommand::SetSource {
                    id: source,
                    url: "https://b".into(),
                },
                DeviceCommand::Play
            ]
        );
        let info = harness.model.lock().await.get_playback_info().await;
        assert_eq!(info.state, TransportState::Playing);
        assert_eq!(info.track.map(|t| t.id), Some("2".to_string()));
    }

    #[tokio::test]
    async fn test_unresolvable_stream_warns_once() {
        let mut provider = yandex_mock();
        provider.expect_get_liked_tracks().returning(|| vec![track("1", None)]);
        provider.expect_resolve_stream().times(1).returning(|_| Vec::new());
        let mut harness = Harness::new(vec![(ProviderKind::Yandex, provider)], MemoryCredentials::default());

        harness.intent(Intent::LoadLiked).await;
        harness.pump().await;
        harness.intent(Intent::Toggle).await;
        harness.pump().await;

        assert_eq!(harness.controller.session.state(), TransportState::Stopped);
        assert_eq!(
            harness.error_message().await.as_deref(),
            Some("No stream available for \"Track 1\"")
        );
        assert!(harness.device.commands().is_empty());
    }

    #[tokio::test]
    async fn test_older_load_never_replaces_newer() {
        let mut provider = yandex_mock();
        provider.expect_get_my_wave().returning(|| vec![track("w", None)]);
        provider
            .expect_get_liked_tracks()
            .returning(|| vec![track("l1", None), track("l2", None)]);
        let mut harness = Harness::new(vec![(ProviderKind::Yandex, provider)], MemoryCredentials::default());

        harness.intent(Intent::LoadWave).await;
        harness.intent(Intent::LoadLiked).await;
        harness.pump().await;
        harness.pump().await;

        assert_eq!(harness.queue_ids().await, vec!["l1", "l2"]);
    }

    #[tokio::test]
    async fn test_switch_clears_queue_and_drops_old_results() {
        let mut provider = yandex_mock();
        provider.expect_get_my_wave().returning(|| vec![track("1", None)]);
        let mut harness = Harness::new(vec![(ProviderKind::Yandex, provider)], MemoryCredentials::default());

        harness.intent(Intent::LoadWave).await;
        harness.pump().await;
        assert_eq!(harness.queue_ids().await, vec!["1"]);

        harness.intent(Intent::LoadWave).await;
        harness.intent(Intent::SwitchProvider("Spotify".into())).await;
        assert_eq!(harness.controller.session.state(), TransportState::Empty);

        harness.pump().await;
        assert!(harness.queue_ids().await.is_empty());

        let info = harness.model.lock().await.get_playback_info().await;
        assert_eq!(info.provider, "Spotify");
        assert_eq!(info.auth, AuthStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_unknown_provider_keeps_current() {
        let mut harness = Harness::new(vec![(ProviderKind::Yandex, yandex_mock())], MemoryCredentials::default());
        harness.intent(Intent::SwitchProvider("Tidal".into())).await;

        assert_eq!(harness.controller.switchboard.kind(), ProviderKind::Yandex);
        assert_eq!(harness.error_message().await.as_deref(), Some("Unknown provider: Tidal"));
    }

    #[tokio::test]
    async fn test_invalid_credential_leaves_queue() {
        let mut provider = yandex_mock();
        provider.expect_get_my_wave().returning(|| vec![track("1", None)]);
        provider.expect_authenticate().returning(|_| false);
        let credentials = MemoryCredentials::default();
        let mut harness = Harness::new(vec![(ProviderKind::Yandex, provider)], credentials.clone());

        harness.intent(Intent::LoadWave).await;
        harness.pump().await;
        harness
            .intent(Intent::Authenticate {
                provider: "Yandex".into(),
                credential: "bad".into(),
            })
            .await;
        harness.pump().await;

        assert_eq!(harness.queue_ids().await, vec!["1"]);
        assert_eq!(harness.controller.switchboard.auth_status(), AuthStatus::Unauthenticated);
        assert!(credentials.get(ProviderKind::Yandex).is_none());
    }

    #[tokio::test]
    async fn test_accepted_credential_loads_playlists() {
        let mut provider = yandex_mock();
        provider.expect_authenticate().returning(|credential| credential == "good");
        provider.expect_get_playlists().returning(|| {
            vec![Playlist {
                id: "1:3".into(),
                title: "Road".into(),
                owner: None,
                track_count: 4,
            }]
        });
        let credentials = MemoryCredentials::with(ProviderKind::Yandex, "good");
        let mut harness = Harness::new(vec![(ProviderKind::Yandex, provider)], credentials);

        harness.controller.start().await;
        harness.pump().await;
        harness.pump().await;

        let ui_state = harness.model.lock().await.get_ui_state().await;
        assert_eq!(ui_state.playlists.len(), 1);
        assert_eq!(harness.controller.switchboard.auth_status(), AuthStatus::Authenticated);
    }

    #[tokio::test]
    async fn test_artist_search_without_support_is_empty() {
        let mut provider = yandex_mock();
        provider.expect_search().returning(|_, _| Vec::new());
        let mut harness = Harness::new(vec![(ProviderKind::Yandex, provider)], MemoryCredentials::default());

        harness
            .intent(Intent::Search {
                query: "test".into(),
                kind: SearchKind::Artist,
            })
            .await;
        harness.pump().await;

        let content = harness.model.lock().await.get_content_state().await;
        assert!(matches!(content.view, ContentView::SearchResults { ref items, .. } if items.is_empty()));
        assert!(harness.error_message().await.is_none());
    }

    #[tokio::test]
    async fn test_track_search_replaces_queue() {
        let mut provider = yandex_mock();
        provider
            .expect_search()
            .returning(|_, _| vec![SearchItem::Track(track("s1", None))]);
        let mut harness = Harness::new(vec![(ProviderKind::Yandex, provider)], MemoryCredentials::default());

        harness
            .intent(Intent::Search {
                query: "test".into(),
                kind: SearchKind::Track,
            })
            .await;
        harness.pump().await;

        assert_eq!(harness.queue_ids().await, vec!["s1"]);
        assert_eq!(harness.controller.session.state(), TransportState::Stopped);
    }

    #[tokio::test]
    async fn test_end_of_track_does_not_advance() {
        let mut provider = yandex_mock();
        provider
            .expect_get_my_wave()
            .returning(|| vec![track("1", Some("https://a")), track("2", Some("https://b"))]);
        provider
            .expect_resolve_stream()
            .returning(|track| crate::provider::direct_sources(track));
        let mut harness = Harness::new(vec![(ProviderKind::Yandex, provider)], MemoryCredentials::default());

        harness.intent(Intent::LoadWave).await;
        harness.pump().await;
        harness.intent(Intent::Toggle).await;
        harness.pump().await;

        let source = harness.controller.session.loaded_source().expect("source loaded");
        let _ = harness
            .controller
            .handle_event(SessionEvent::Device(DeviceEvent::StateChanged {
                source,
                state: DeviceState::Stopped,
            }))
            .await;

        assert_eq!(harness.controller.session.state(), TransportState::Stopped);
        assert_eq!(harness.controller.session.queue().current_index(), Some(0));
        assert_eq!(harness.device.commands().len(), 2);
    }

    #[tokio::test]
    async fn test_controller_runs_as_spawned_task() {
        let harness = Harness::new(vec![(ProviderKind::Yandex, yandex_mock())], MemoryCredentials::default());
        let events = harness.controller.events.clone();
        let task = tokio::spawn(harness.controller.run(harness.receiver));

        events.send(SessionEvent::Intent(Intent::Shutdown)).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("controller stops in time")
            .expect("controller task completes");
    }

    #[tokio::test]
    async fn test_shutdown_breaks_loop() {
        let mut harness = Harness::new(vec![(ProviderKind::Yandex, yandex_mock())], MemoryCredentials::default());
        let flow = harness
            .controller
            .handle_event(SessionEvent::Intent(Intent::Shutdown))
            .await;
        assert!(flow.is_break());
    }
}
