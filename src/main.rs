mod audio;
mod config;
mod controller;
mod error;
mod logging;
mod model;
mod provider;
mod session;
mod view;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Mutex};

use audio::AudioBackend;
use config::{AppConfig, PersistedCredentials, WindowGeometry};
use controller::{AppController, Intent, SessionController, SessionEvent};
use model::AppModel;
use provider::DefaultProviders;
use session::{PlaybackSession, Switchboard};
use view::AppView;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = logging::init_logging() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== polyplay starting ===");

    let config_path = AppConfig::default_path();
    let config = match &config_path {
        Some(path) => AppConfig::load_from(path),
        None => {
            tracing::warn!("No config directory, settings will not be saved");
            AppConfig::default()
        }
    };

    let (events, receiver) = mpsc::unbounded_channel();

    let device_events = events.clone();
    let audio = AudioBackend::spawn(
        move |event| {
            let _ = device_events.send(SessionEvent::Device(event));
        },
        Handle::current(),
    )?;

    let session = PlaybackSession::with_volume(Box::new(audio), config.volume);
    let switchboard = Switchboard::new(
        Box::new(DefaultProviders::new()),
        Box::new(PersistedCredentials::new(config_path.clone(), config.clone())),
        config.provider_kind(),
    );

    let model = Arc::new(Mutex::new(AppModel::new()));
    let session_controller = SessionController::new(model.clone(), switchboard, session, events.clone());
    let session_task = tokio::spawn(session_controller.run(receiver));

    let controller = AppController::new(model.clone(), events);

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, model.clone(), controller.clone()).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        tracing::error!(error = ?err, "Application error");
    }

    controller.send_intent(Intent::Shutdown);
    if let Err(e) = session_task.await {
        tracing::warn!(error = %e, "Session task ended abnormally");
    }

    if let Some(path) = &config_path {
        save_settings(path, &model).await;
    }

    tracing::info!("polyplay shutting down");
    Ok(())
}

/// Persists provider, volume and window size. Credentials were written as
/// they were accepted, so the file on disk is the base.
async fn save_settings(path: &std::path::Path, model: &Arc<Mutex<AppModel>>) {
    let playback = model.lock().await.get_playback_info().await;
    let mut config = AppConfig::load_from(path);
    if !playback.provider.is_empty() {
        config.provider = playback.provider;
    }
    config.volume = playback.volume;
    if let Ok((columns, rows)) = terminal::size() {
        config.window = Some(WindowGeometry { columns, rows });
    }
    if let Err(e) = config.save_to(path) {
        tracing::warn!(error = %e, "Failed to save settings");
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: Arc<Mutex<AppModel>>,
    controller: AppController,
) -> io::Result<()> {
    loop {
        let (playback, ui_state, content_state, should_quit) = {
            let model_guard = model.lock().await;

            model_guard.auto_clear_old_status().await;

            (
                model_guard.get_playback_info().await,
                model_guard.get_ui_state().await,
                model_guard.get_content_state().await,
                model_guard.should_quit().await,
            )
        };

        terminal.draw(|f| {
            AppView::render(f, &playback, &ui_state, &content_state);
        })?;

        if should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                controller.handle_key_event(key).await;
            }
        }
    }

    Ok(())
}
