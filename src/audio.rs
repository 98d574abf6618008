//! rodio output device.
//!
//! The output stream is not `Send`, so it lives on a dedicated thread. The
//! thread takes [`DeviceCommand`]s over a std channel, downloads and decodes
//! each source, and samples the sink to report position and end of track.

use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, Sink, Source};
use tokio::runtime::Handle;

use crate::session::{DeviceCommand, DeviceEvent, DeviceState, OutputDevice, SourceId};

const TICK: Duration = Duration::from_millis(250);

pub struct AudioBackend {
    commands: Sender<DeviceCommand>,
}

impl AudioBackend {
    /// Spawns the audio thread. `on_event` is called from that thread.
    pub fn spawn<F>(on_event: F, runtime: Handle) -> Result<Self>
    where
        F: Fn(DeviceEvent) + Send + 'static,
    {
        let (commands, receiver) = mpsc::channel();
        let http = reqwest::Client::new();

        thread::Builder::new()
            .name("audio".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(output) => output,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to open audio output");
                        on_event(DeviceEvent::Error {
                            source: None,
                            message: format!("No audio output: {}", e),
                        });
                        return;
                    }
                };
                tracing::info!("Audio output opened");

                let mut worker = AudioWorker {
                    handle,
                    loaded: None,
                    volume: 1.0,
                    last_position_ms: None,
                    http,
                    runtime,
                };
                worker.run(receiver, &on_event);
                tracing::debug!("Audio thread exiting");
            })
            .context("spawning audio thread")?;

        Ok(Self { commands })
    }
}

impl OutputDevice for AudioBackend {
    fn send(&mut self, command: DeviceCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Audio thread is gone, command dropped");
        }
    }
}

/// The sink playing one `SetSource`
struct LoadedSink {
    id: SourceId,
    sink: Sink,
}

struct AudioWorker {
    handle: rodio::OutputStreamHandle,
    loaded: Option<LoadedSink>,
    volume: f32,
    last_position_ms: Option<u64>,
    http: reqwest::Client,
    runtime: Handle,
}

impl AudioWorker {
    fn run(&mut self, receiver: Receiver<DeviceCommand>, on_event: &dyn Fn(DeviceEvent)) {
        loop {
            match receiver.recv_timeout(TICK) {
                Ok(command) => {
                    let source = match &command {
                        DeviceCommand::SetSource { id, .. } => Some(*id),
                        _ => self.loaded.as_ref().map(|loaded| loaded.id),
                    };
                    if let Err(e) = self.apply(command, on_event) {
                        tracing::warn!(?source, error = %e, "Audio command failed");
                        on_event(DeviceEvent::Error {
                            source,
                            message: e.to_string(),
                        });
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.sample(on_event);
        }
    }

    fn apply(&mut self, command: DeviceCommand, on_event: &dyn Fn(DeviceEvent)) -> Result<()> {
        match command {
            DeviceCommand::SetSource { id, url } => {
                self.stop();
                let bytes = self.fetch(&url)?;
                let source = Decoder::new(Cursor::new(bytes)).context("decoding audio")?;
                if let Some(duration) = source.total_duration() {
                    on_event(DeviceEvent::DurationChanged {
                        source: id,
                        duration_ms: duration.as_millis() as u64,
                    });
                }

                let sink = Sink::try_new(&self.handle).context("creating audio sink")?;
                sink.pause();
                sink.set_volume(self.volume);
                sink.append(source);
                self.loaded = Some(LoadedSink { id, sink });
                self.last_position_ms = None;
                tracing::debug!(source = id, url = %url, "Source loaded");
            }
            DeviceCommand::Play => {
                if let Some(loaded) = &self.loaded {
                    loaded.sink.play();
                    on_event(DeviceEvent::StateChanged {
                        source: loaded.id,
                        state: DeviceState::Playing,
                    });
                }
            }
            DeviceCommand::Pause => {
                if let Some(loaded) = &self.loaded {
                    loaded.sink.pause();
                    on_event(DeviceEvent::StateChanged {
                        source: loaded.id,
                        state: DeviceState::Paused,
                    });
                }
            }
            DeviceCommand::Stop => self.stop(),
            DeviceCommand::SetVolume(percent) => {
                self.volume = f32::from(percent.min(100)) / 100.0;
                if let Some(loaded) = &self.loaded {
                    loaded.sink.set_volume(self.volume);
                }
            }
            DeviceCommand::Seek(ms) => {
                if let Some(loaded) = &self.loaded {
                    loaded
                        .sink
                        .try_seek(Duration::from_millis(ms))
                        .map_err(|e| anyhow::anyhow!("Seek failed: {}", e))?;
                    on_event(DeviceEvent::PositionChanged {
                        source: loaded.id,
                        position_ms: ms,
                    });
                    self.last_position_ms = Some(ms);
                }
            }
        }
        Ok(())
    }

    /// Reports position while playing and end of track once the sink drains
    fn sample(&mut self, on_event: &dyn Fn(DeviceEvent)) {
        let Some(loaded) = &self.loaded else {
            return;
        };
        let source = loaded.id;

        if loaded.sink.empty() {
            self.loaded = None;
            self.last_position_ms = None;
            on_event(DeviceEvent::StateChanged {
                source,
                state: DeviceState::Stopped,
            });
            return;
        }

        if !loaded.sink.is_paused() {
            let position_ms = loaded.sink.get_pos().as_millis() as u64;
            if self.last_position_ms != Some(position_ms) {
                self.last_position_ms = Some(position_ms);
                on_event(DeviceEvent::PositionChanged { source, position_ms });
            }
        }
    }

    fn stop(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            loaded.sink.stop();
        }
        self.last_position_ms = None;
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let http = self.http.clone();
        self.runtime.block_on(async move {
            let response = http
                .get(url)
                .send()
                .await
                .context("requesting audio")?
                .error_for_status()
                .context("requesting audio")?;
            let bytes = response.bytes().await.context("downloading audio")?;
            Ok(bytes.to_vec())
        })
    }
}
