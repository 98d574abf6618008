//! Error types for provider adapters.
//!
//! These never cross the [`Provider`](super::Provider) trait: every adapter
//! converts them into empty results (or `false` for authentication) at its
//! boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// A call was made before a credential was accepted
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Transport-level failure talking to the backend
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with an error status or error body
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response did not have the expected shape
    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Spotify client error: {0}")]
    Spotify(#[from] rspotify::ClientError),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}

impl From<serde_json::Error> for ProviderError {
    fn from(error: serde_json::Error) -> Self {
        ProviderError::Parse(error.to_string())
    }
}

impl From<rspotify::model::IdError> for ProviderError {
    fn from(error: rspotify::model::IdError) -> Self {
        ProviderError::InvalidId(error.to_string())
    }
}

/// Result type for adapter-internal operations
pub type Result<T> = std::result::Result<T, ProviderError>;
