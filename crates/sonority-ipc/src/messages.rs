//! IPC message types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sonority_core::{Directive, SpeakerType};

use crate::events::EventType;

/// Request envelope sent from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique request ID for matching responses
    pub id: u64,
    /// The method to invoke
    pub method: Method,
}

/// Response envelope sent from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this is responding to
    pub id: u64,
    /// Result of the request
    pub result: Result<Value, ErrorInfo>,
}

impl Response {
    #[must_use]
    pub fn ok(id: u64, value: Value) -> Self {
        Self { id, result: Ok(value) }
    }

    #[must_use]
    pub fn error(id: u64, error: ErrorInfo) -> Self {
        Self { id, result: Err(error) }
    }
}

/// Error information in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code
    pub code: i32,
    /// Human-readable error message
    pub message: String,
}

impl ErrorInfo {
    /// The request was malformed or named something unknown
    pub const BAD_REQUEST: i32 = 400;
    /// The speaker type has no registered speakers
    pub const NOT_FOUND: i32 = 404;
    /// The speakers of a type disagree
    pub const CONFLICT: i32 = 409;
    /// The operation failed inside the manager
    pub const INTERNAL: i32 = 500;
    /// The daemon is shutting down
    pub const UNAVAILABLE: i32 = 503;

    /// Create a new error.
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Methods that can be invoked via IPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Method {
    // Protocol directives
    /// Pre-handle and handle a directive, responding with its final state
    Directive { directive: Directive },
    /// Cancel a directive that has not started handling
    CancelDirective { message_id: String },

    // Local control
    /// Set the volume of a speaker type (0 - 100)
    SetVolume {
        speaker_type: SpeakerType,
        volume: i32,
        #[serde(default)]
        force_no_notifications: bool,
    },
    /// Change the volume of a speaker type by a delta
    AdjustVolume {
        speaker_type: SpeakerType,
        delta: i32,
        #[serde(default)]
        force_no_notifications: bool,
    },
    /// Set the mute state of a speaker type
    SetMute {
        speaker_type: SpeakerType,
        mute: bool,
        #[serde(default)]
        force_no_notifications: bool,
    },

    // Queries
    /// Get the settings shared by a speaker type
    GetSpeakerSettings { speaker_type: SpeakerType },
    /// Get advertised capabilities and handled directives
    GetCapabilities,

    // Events
    /// Subscribe to events (an empty subscription receives everything)
    Subscribe { events: Vec<EventType> },
    /// Unsubscribe from events
    Unsubscribe { events: Vec<EventType> },

    // Daemon control
    /// Request daemon shutdown
    Shutdown,
}
