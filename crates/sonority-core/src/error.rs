//! Error types for Sonority core.

use thiserror::Error;

use crate::speaker::SpeakerType;

/// Core error type for speaker management operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed directive: {0}")]
    Parse(String),

    #[error("Speakers of type {0} do not report consistent settings")]
    InconsistentGroup(SpeakerType),

    #[error("No speakers registered for type {0}")]
    NoSpeakers(SpeakerType),

    #[error("Speaker rejected {operation} for type {speaker_type}")]
    EndpointRejected { speaker_type: SpeakerType, operation: &'static str },

    #[error("Speaker settings unavailable: {0}")]
    EndpointUnavailable(String),

    #[error("Context update failed: {0}")]
    ContextUpdate(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Speaker manager is shut down")]
    Shutdown,

    #[error("Failed to start worker thread: {0}")]
    Worker(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Sonority core operations.
pub type Result<T> = std::result::Result<T, Error>;
