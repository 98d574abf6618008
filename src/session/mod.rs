//! Session module - The playback core
//!
//! - `device`: commands and events exchanged with the output device
//! - `player`: queue/transport state machine
//! - `switchboard`: active provider, authentication and epochs
//!
//! Nothing in here spawns tasks or touches the network; the controller drives
//! both halves and carries results between them.

mod device;
mod player;
mod switchboard;

pub use device::{DeviceCommand, DeviceEvent, DeviceState, OutputDevice, SourceId};
pub use player::{PlayRequest, PlaybackSession};
pub use switchboard::{AuthAttempt, CredentialStore, Switchboard};

#[cfg(test)]
pub(crate) use player::tests::RecordingDevice;
#[cfg(test)]
pub(crate) use switchboard::tests::MemoryCredentials;
