//! Local observers of speaker setting changes.

use serde::{Deserialize, Serialize};

use crate::speaker::{SpeakerSettings, SpeakerType};

/// Provenance of a settings change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Requested by a remote directive
    Directive,
    /// Requested through the local API
    #[default]
    LocalApi,
}

/// Listener notified after every successful, non-suppressed change.
///
/// Notifications are delivered from the manager's worker thread, after the
/// change has been applied to every speaker in the group.
pub trait SpeakerManagerObserver: Send + Sync {
    /// Called with the settings now shared by every speaker of `speaker_type`.
    fn on_speaker_settings_changed(
        &self,
        source: Source,
        speaker_type: &SpeakerType,
        settings: &SpeakerSettings,
    );
}
