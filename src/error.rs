//! User-visible session errors.
//!
//! Backend failures never reach this level as errors: adapters turn them into
//! empty results. What remains are the conditions the user has to see.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The provider rejected the credential (or none is stored)
    #[error("Authorization required for {provider}")]
    AuthFailure { provider: String },

    /// The active provider returned no playable source for the track
    #[error("No stream available for \"{title}\"")]
    StreamUnresolvable { title: String },

    /// A switch or authorization named a provider that is not registered
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// The output device reported a failure
    #[error("Playback failed: {0}")]
    Device(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SessionError::StreamUnresolvable {
            title: "Song".to_string(),
        };
        assert_eq!(error.to_string(), "No stream available for \"Song\"");
        assert_eq!(
            SessionError::UnknownProvider("Tidal".into()).to_string(),
            "Unknown provider: Tidal"
        );
    }
}
