//! Output device reports

use crate::session::{DeviceEvent, DeviceState};
use super::SessionController;

impl SessionController {
    pub(super) async fn handle_device_event(&mut self, event: DeviceEvent) {
        match &event {
            DeviceEvent::PositionChanged { source, position_ms } => {
                tracing::trace!(source, position_ms, "Device position")
            }
            DeviceEvent::DurationChanged { source, duration_ms } => {
                tracing::debug!(source, duration_ms, "Device duration")
            }
            DeviceEvent::StateChanged { source, state } => tracing::debug!(source, ?state, "Device state"),
            DeviceEvent::Error { source, message } => tracing::warn!(?source, error = %message, "Device error"),
        }

        let error = self.session.on_device_event(event.clone());
        let model = self.model.lock().await;
        match event {
            DeviceEvent::PositionChanged { .. } => {
                model.update_playback_position(self.session.position_ms()).await;
            }
            DeviceEvent::DurationChanged { .. } => {
                model.set_duration(self.session.duration_ms()).await;
            }
            DeviceEvent::StateChanged { state, .. } => {
                model.set_transport_state(self.session.state()).await;
                if state == DeviceState::Stopped {
                    model.update_playback_position(self.session.position_ms()).await;
                }
            }
            DeviceEvent::Error { .. } => {
                model.set_transport_state(self.session.state()).await;
            }
        }

        if let Some(error) = error {
            model.set_error(error.to_string()).await;
        }
    }
}
