//! Context state written for the transport layer.
//!
//! The transport reads this state when it assembles outbound protocol
//! messages. The speaker manager only writes to it.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::directive::SPEAKER_NAMESPACE;
use crate::error::{Error, Result};
use crate::speaker::{SpeakerSettings, SpeakerType};

/// Name of the context state published for each speaker type.
pub const VOLUME_STATE: &str = "VolumeState";

/// Payload of a `VolumeState` context entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeState {
    pub volume: u8,
    pub mute: bool,
}

impl From<SpeakerSettings> for VolumeState {
    fn from(settings: SpeakerSettings) -> Self {
        Self { volume: settings.volume, mute: settings.mute }
    }
}

/// Store of per-type volume state.
pub trait ContextManager: Send + Sync {
    /// Record the latest state for a speaker type.
    ///
    /// # Errors
    /// Returns an error if the store refuses the update.
    fn set_volume_state(&self, speaker_type: &SpeakerType, state: VolumeState) -> Result<()>;

    /// Snapshot of every recorded state, as attached to outbound events.
    fn context(&self) -> Value;
}

/// In-process context store.
#[derive(Debug, Default)]
pub struct InMemoryContextStore {
    states: RwLock<BTreeMap<SpeakerType, VolumeState>>,
}

impl InMemoryContextStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded state for a speaker type, if any.
    #[must_use]
    pub fn volume_state(&self, speaker_type: &SpeakerType) -> Option<VolumeState> {
        self.states.read().get(speaker_type).copied()
    }
}

impl ContextManager for InMemoryContextStore {
    fn set_volume_state(&self, speaker_type: &SpeakerType, state: VolumeState) -> Result<()> {
        if state.volume > crate::speaker::MAX_VOLUME {
            return Err(Error::ContextUpdate(format!("volume {} out of range", state.volume)));
        }
        debug!(speaker_type = %speaker_type, volume = state.volume, mute = state.mute, "Context updated");
        self.states.write().insert(speaker_type.clone(), state);
        Ok(())
    }

    fn context(&self) -> Value {
        let states: Vec<Value> = self
            .states
            .read()
            .iter()
            .map(|(speaker_type, state)| {
                json!({
                    "header": {
                        "namespace": SPEAKER_NAMESPACE,
                        "name": VOLUME_STATE,
                        "speakerType": speaker_type,
                    },
                    "payload": state,
                })
            })
            .collect();
        Value::Array(states)
    }
}
