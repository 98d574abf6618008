//! Key event handling

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::model::{ActiveSection, ContentView, LibraryItem, SearchItem, SearchKind};
use crate::provider::ProviderKind;
use super::{AppController, Intent};

const VOLUME_STEP: u8 = 5;
const SEEK_STEP_MS: u64 = 10_000;

impl AppController {
    pub async fn handle_key_event(&self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        let model = self.model.lock().await;

        // Errors block all other interactions until dismissed
        if model.has_error().await {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                model.clear_error().await;
            }
            return;
        }

        if model.is_help_popup_open().await {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('H')) {
                model.hide_help_popup().await;
            }
            return;
        }

        if model.is_credential_prompt_open().await {
            match key.code {
                KeyCode::Enter => {
                    let credential = model.close_credential_prompt().await.unwrap_or_default();
                    let provider = model.get_playback_info().await.provider;
                    drop(model);
                    self.send_intent(Intent::Authenticate { provider, credential });
                }
                KeyCode::Esc => {
                    model.close_credential_prompt().await;
                }
                KeyCode::Backspace => model.backspace_credential().await,
                KeyCode::Char(c) => model.append_to_credential(c).await,
                _ => {}
            }
            return;
        }

        let ui_state = model.get_ui_state().await;

        if ui_state.active_section == ActiveSection::Search {
            match key.code {
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        model.cycle_section_backward().await;
                    } else {
                        model.cycle_section_forward().await;
                    }
                    return;
                }
                KeyCode::BackTab => {
                    model.cycle_section_backward().await;
                    return;
                }
                KeyCode::Enter => {
                    let query = ui_state.search_query.trim().to_string();
                    drop(model);
                    if !query.is_empty() {
                        self.send_intent(Intent::Search {
                            query,
                            kind: ui_state.search_kind,
                        });
                    }
                    return;
                }
                KeyCode::Esc => {
                    model.clear_search().await;
                    return;
                }
                KeyCode::Backspace => {
                    model.backspace_search().await;
                    return;
                }
                KeyCode::Char(c) => {
                    // Ctrl+Q still quits while typing, Ctrl+K cycles the kind
                    if key.modifiers.contains(KeyModifiers::CONTROL) {
                        match c {
                            'q' | 'Q' => model.set_should_quit(true).await,
                            'k' | 'K' => model.cycle_search_kind().await,
                            _ => {}
                        }
                        return;
                    }
                    model.append_to_search(c).await;
                    return;
                }
                _ => {}
            }
        }

        if ui_state.active_section == ActiveSection::Tracks {
            match key.code {
                KeyCode::Enter => {
                    let content = model.get_content_state().await;
                    drop(model);
                    if let Some(intent) = content_intent(&content.view, ui_state.track_selected) {
                        self.send_intent(intent);
                    }
                    return;
                }
                KeyCode::Left | KeyCode::Right => {
                    let info = model.get_playback_info().await;
                    drop(model);
                    let target = if key.code == KeyCode::Left {
                        info.progress_ms.saturating_sub(SEEK_STEP_MS)
                    } else {
                        info.progress_ms.saturating_add(SEEK_STEP_MS)
                    };
                    self.send_intent(Intent::Seek(target));
                    return;
                }
                _ => {}
            }
        }

        // Global keybindings
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                model.set_should_quit(true).await;
            }
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    model.cycle_section_backward().await;
                } else {
                    model.cycle_section_forward().await;
                }
            }
            KeyCode::BackTab => {
                model.cycle_section_backward().await;
            }
            KeyCode::Up => {
                model.move_selection_up().await;
            }
            KeyCode::Down => {
                model.move_selection_down().await;
            }
            KeyCode::Enter => match ui_state.active_section {
                ActiveSection::Library => {
                    drop(model);
                    match LibraryItem::ALL.get(ui_state.library_selected) {
                        Some(LibraryItem::Wave) => self.send_intent(Intent::LoadWave),
                        Some(LibraryItem::Liked) => self.send_intent(Intent::LoadLiked),
                        None => {}
                    }
                }
                ActiveSection::Playlists => {
                    drop(model);
                    if let Some(playlist) = ui_state.playlists.get(ui_state.playlist_selected) {
                        self.send_intent(Intent::LoadPlaylist(playlist.clone()));
                    }
                }
                _ => {}
            },
            KeyCode::Char(' ') => {
                drop(model);
                self.send_intent(Intent::Toggle);
            }
            KeyCode::Char('n') | KeyCode::Char('N') => {
                drop(model);
                self.send_intent(Intent::Next);
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                drop(model);
                self.send_intent(Intent::Prev);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let volume = model.get_volume().await.saturating_add(VOLUME_STEP).min(100);
                drop(model);
                self.send_intent(Intent::SetVolume(volume));
            }
            KeyCode::Char('-') => {
                let volume = model.get_volume().await.saturating_sub(VOLUME_STEP);
                drop(model);
                self.send_intent(Intent::SetVolume(volume));
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                let current = model.get_playback_info().await.provider;
                drop(model);
                let next = ProviderKind::from_name(&current)
                    .map(ProviderKind::next)
                    .unwrap_or(ProviderKind::Yandex);
                self.send_intent(Intent::SwitchProvider(next.name().to_string()));
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                model.open_credential_prompt().await;
            }
            KeyCode::Char('k') | KeyCode::Char('K') => {
                model.cycle_search_kind().await;
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                drop(model);
                self.send_intent(Intent::RefreshPlaylists);
            }
            KeyCode::Char('/') => {
                model.focus_section(ActiveSection::Search).await;
            }
            KeyCode::Char('h') | KeyCode::Char('H') => {
                model.show_help_popup().await;
            }
            _ => {}
        }
    }
}

/// What activating the selected row of the track pane means
fn content_intent(view: &ContentView, selected: usize) -> Option<Intent> {
    match view {
        ContentView::Empty => None,
        ContentView::Queue { tracks, .. } => tracks.get(selected).map(|t| Intent::Select(t.id.clone())),
        ContentView::SearchResults { items, .. } => match items.get(selected)? {
            SearchItem::Track(track) => Some(Intent::Select(track.id.clone())),
            SearchItem::Playlist(playlist) => Some(Intent::LoadPlaylist(playlist.clone())),
            SearchItem::Artist(artist) => Some(Intent::Search {
                query: artist.name.clone(),
                kind: SearchKind::Track,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
    use tokio::sync::Mutex;

    use crate::controller::SessionEvent;
    use crate::model::{AppModel, Artist, Playlist, Track};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn controller() -> (AppController, UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = unbounded_channel();
        let model = Arc::new(Mutex::new(AppModel::new()));
        (AppController::new(model, events), receiver)
    }

    fn next_intent(receiver: &mut UnboundedReceiver<SessionEvent>) -> Option<Intent> {
        match receiver.try_recv().ok()? {
            SessionEvent::Intent(intent) => Some(intent),
            _ => None,
        }
    }

    #[test]
    fn test_content_intent_per_item() {
        let queue = ContentView::Queue {
            title: "Liked".into(),
            tracks: vec![Track::new("1", "A"), Track::new("2", "B")],
            current_index: Some(0),
        };
        assert_eq!(content_intent(&queue, 1), Some(Intent::Select("2".into())));
        assert_eq!(content_intent(&queue, 5), None);

        let results = ContentView::SearchResults {
            query: "x".into(),
            kind: SearchKind::Artist,
            items: vec![SearchItem::Artist(Artist {
                id: "9".into(),
                name: "Band".into(),
            })],
        };
        assert_eq!(
            content_intent(&results, 0),
            Some(Intent::Search {
                query: "Band".into(),
                kind: SearchKind::Track
            })
        );
    }

    #[tokio::test]
    async fn test_space_toggles() {
        let (controller, mut receiver) = controller();
        controller.handle_key_event(press(KeyCode::Char(' '))).await;
        assert_eq!(next_intent(&mut receiver), Some(Intent::Toggle));
    }

    #[tokio::test]
    async fn test_enter_on_library_loads_wave() {
        let (controller, mut receiver) = controller();
        controller.handle_key_event(press(KeyCode::Enter)).await;
        assert_eq!(next_intent(&mut receiver), Some(Intent::LoadWave));

        controller.handle_key_event(press(KeyCode::Down)).await;
        controller.handle_key_event(press(KeyCode::Enter)).await;
        assert_eq!(next_intent(&mut receiver), Some(Intent::LoadLiked));
    }

    #[tokio::test]
    async fn test_enter_on_playlist_loads_it() {
        let (controller, mut receiver) = controller();
        let playlist = Playlist {
            id: "p".into(),
            title: "Mix".into(),
            owner: None,
            track_count: 3,
        };
        controller.model.lock().await.set_playlists(vec![playlist.clone()]).await;
        controller.handle_key_event(press(KeyCode::Tab)).await;
        controller.handle_key_event(press(KeyCode::Enter)).await;
        assert_eq!(next_intent(&mut receiver), Some(Intent::LoadPlaylist(playlist)));
    }

    #[tokio::test]
    async fn test_volume_keys_step_and_clamp() {
        let (controller, mut receiver) = controller();
        controller.model.lock().await.set_volume(98).await;
        controller.handle_key_event(press(KeyCode::Char('+'))).await;
        assert_eq!(next_intent(&mut receiver), Some(Intent::SetVolume(100)));

        controller.handle_key_event(press(KeyCode::Char('-'))).await;
        assert_eq!(next_intent(&mut receiver), Some(Intent::SetVolume(93)));
    }

    #[tokio::test]
    async fn test_provider_cycle_key() {
        let (controller, mut receiver) = controller();
        controller
            .model
            .lock()
            .await
            .set_provider("Last.fm", crate::model::AuthStatus::Authenticated)
            .await;
        controller.handle_key_event(press(KeyCode::Char('s'))).await;
        assert_eq!(next_intent(&mut receiver), Some(Intent::SwitchProvider("Yandex".into())));
    }

    #[tokio::test]
    async fn test_credential_prompt_submits_for_active_provider() {
        let (controller, mut receiver) = controller();
        controller
            .model
            .lock()
            .await
            .set_provider("Spotify", crate::model::AuthStatus::Unauthenticated)
            .await;

        controller.handle_key_event(press(KeyCode::Char('a'))).await;
        for c in "tok".chars() {
            controller.handle_key_event(press(KeyCode::Char(c))).await;
        }
        // Keys typed into the prompt never reach the global bindings
        assert_eq!(next_intent(&mut receiver), None);

        controller.handle_key_event(press(KeyCode::Enter)).await;
        assert_eq!(
            next_intent(&mut receiver),
            Some(Intent::Authenticate {
                provider: "Spotify".into(),
                credential: "tok".into()
            })
        );
    }

    #[tokio::test]
    async fn test_search_enter_sends_query_with_kind() {
        let (controller, mut receiver) = controller();
        controller.handle_key_event(press(KeyCode::Char('/'))).await;
        controller.handle_key_event(press(KeyCode::Char('k'))).await;
        controller.model.lock().await.cycle_search_kind().await;
        controller.handle_key_event(press(KeyCode::Enter)).await;
        assert_eq!(
            next_intent(&mut receiver),
            Some(Intent::Search {
                query: "k".into(),
                kind: SearchKind::Artist
            })
        );
    }
}
