//! Software speaker endpoints.

use parking_lot::Mutex;
use sonority_core::{Result, SpeakerEndpoint, SpeakerSettings, SpeakerType};
use tracing::debug;

use crate::config::SpeakerConfig;

/// Speaker that holds its settings in memory.
pub struct SoftwareSpeaker {
    name: String,
    speaker_type: SpeakerType,
    settings: Mutex<SpeakerSettings>,
}

impl SoftwareSpeaker {
    #[must_use]
    pub fn new(config: &SpeakerConfig) -> Self {
        Self {
            name: config.name.clone(),
            speaker_type: config.speaker_type.clone(),
            settings: Mutex::new(SpeakerSettings::new(config.volume, config.mute)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl SpeakerEndpoint for SoftwareSpeaker {
    fn speaker_type(&self) -> SpeakerType {
        self.speaker_type.clone()
    }

    fn settings(&self) -> Result<SpeakerSettings> {
        Ok(*self.settings.lock())
    }

    fn set_volume(&self, volume: u8) -> bool {
        debug!(speaker = %self.name, volume, "Speaker volume");
        self.settings.lock().volume = volume;
        true
    }

    fn set_mute(&self, mute: bool) -> bool {
        debug!(speaker = %self.name, mute, "Speaker mute");
        self.settings.lock().mute = mute;
        true
    }
}
