//! IPC event types (server to client).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sonority_core::{EventMessage, ExceptionErrorType, SpeakerSettings, SpeakerType, Source};

/// Event sent from daemon to subscribed clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type
    pub event: EventType,
    /// Event data
    pub data: Value,
}

/// Types of events that can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Outbound `VolumeChanged` protocol event
    VolumeChanged,
    /// Outbound `MuteChanged` protocol event
    MuteChanged,
    /// Local observer notification
    SettingsChanged,
    /// A directive could not be processed
    ExceptionEncountered,
}

/// Local observer notification data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsChangedData {
    pub source: Source,
    pub speaker_type: SpeakerType,
    pub volume: u8,
    pub mute: bool,
}

/// Directive failure report data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionData {
    pub unparsed_directive: String,
    pub error_type: ExceptionErrorType,
    pub message: String,
}

impl Event {
    /// Wrap an outbound protocol event, typed by its name.
    ///
    /// Returns `None` for an event name this interface does not define.
    #[must_use]
    pub fn protocol(message: &EventMessage) -> Option<Self> {
        let event = match message.header.name.as_str() {
            "VolumeChanged" => EventType::VolumeChanged,
            "MuteChanged" => EventType::MuteChanged,
            _ => return None,
        };
        let data = serde_json::to_value(message).ok()?;
        Some(Self { event, data })
    }

    #[must_use]
    pub fn settings_changed(source: Source, speaker_type: &SpeakerType, settings: &SpeakerSettings) -> Self {
        let data = SettingsChangedData {
            source,
            speaker_type: speaker_type.clone(),
            volume: settings.volume,
            mute: settings.mute,
        };
        Self { event: EventType::SettingsChanged, data: serde_json::to_value(data).unwrap_or_default() }
    }

    #[must_use]
    pub fn exception(unparsed_directive: &str, error_type: ExceptionErrorType, message: &str) -> Self {
        let data = ExceptionData {
            unparsed_directive: unparsed_directive.to_string(),
            error_type,
            message: message.to_string(),
        };
        Self { event: EventType::ExceptionEncountered, data: serde_json::to_value(data).unwrap_or_default() }
    }
}
