//! Outbound protocol events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::directive::SPEAKER_NAMESPACE;
use crate::speaker::SpeakerSettings;

/// Names of the events reporting a completed settings change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    VolumeChanged,
    MuteChanged,
}

impl EventName {
    /// Wire name of the event.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VolumeChanged => "VolumeChanged",
            Self::MuteChanged => "MuteChanged",
        }
    }
}

/// Header of an outbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHeader {
    pub namespace: String,
    pub name: String,
    pub message_id: String,
}

/// Payload shared by `VolumeChanged` and `MuteChanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsChangedPayload {
    pub volume: u8,
    pub mute: bool,
}

impl From<SpeakerSettings> for SettingsChangedPayload {
    fn from(settings: SpeakerSettings) -> Self {
        Self { volume: settings.volume, mute: settings.mute }
    }
}

/// A complete outbound event, including the context it was sent with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    pub header: EventHeader,
    pub payload: SettingsChangedPayload,
    /// Context snapshot at the time of sending
    pub context: Value,
}

impl EventMessage {
    /// Build a settings-changed event with a fresh message id.
    #[must_use]
    pub fn settings_changed(name: EventName, settings: SpeakerSettings, context: Value) -> Self {
        Self {
            header: EventHeader {
                namespace: SPEAKER_NAMESPACE.to_string(),
                name: name.as_str().to_string(),
                message_id: uuid::Uuid::new_v4().to_string(),
            },
            payload: settings.into(),
            context,
        }
    }
}

/// Transmits outbound events to the remote protocol.
pub trait MessageSender: Send + Sync {
    fn send_event(&self, event: EventMessage);
}
