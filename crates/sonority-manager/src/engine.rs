//! Volume and mute state machine.
//!
//! Every method here runs on the manager's worker thread, one at a time.
//! Mutations are applied to each speaker of a group in registration order;
//! if any speaker refuses, the speakers already changed are restored to the
//! settings they reported before the operation started.

use std::sync::Arc;

use sonority_core::speaker::{adjusted_volume, clamp_volume};
use sonority_core::{
    Error, EventName, ParsedPayload, Result, SpeakerEndpoint, SpeakerOperation, SpeakerSettings,
    SpeakerType, Source,
};
use tracing::{debug, error, info, warn};

use crate::consistency;
use crate::fanout::NotificationFanout;
use crate::registry::SpeakerRegistry;

/// Result of a mutation: the group's new settings, or `None` when the type
/// has no speakers and nothing was changed.
pub type ChangeOutcome = Result<Option<SpeakerSettings>>;

/// Owns the speaker groups and applies changes to them.
pub struct VolumeMuteEngine {
    registry: SpeakerRegistry,
    fanout: NotificationFanout,
    min_unmute_volume: u8,
}

impl VolumeMuteEngine {
    #[must_use]
    pub fn new(registry: SpeakerRegistry, fanout: NotificationFanout, min_unmute_volume: u8) -> Self {
        Self { registry, fanout, min_unmute_volume }
    }

    /// Add a speaker to the group it reports.
    pub fn add_speaker(&mut self, speaker: Arc<dyn SpeakerEndpoint>) {
        let speaker_type = speaker.speaker_type();
        self.registry.register(speaker_type, speaker);
    }

    #[must_use]
    pub fn registry(&self) -> &SpeakerRegistry {
        &self.registry
    }

    /// Release every speaker reference.
    pub fn release_speakers(&mut self) {
        info!(count = self.registry.len(), "Releasing speakers");
        self.registry.clear();
    }

    /// Run the operation carried by a parsed directive.
    pub fn apply(&self, speaker_type: &SpeakerType, payload: ParsedPayload, source: Source) -> ChangeOutcome {
        let force = payload.force_no_notifications;
        match payload.operation {
            SpeakerOperation::SetVolume { volume } => {
                self.set_volume(speaker_type, i32::from(volume), force, source)
            }
            SpeakerOperation::AdjustVolume { delta } => {
                self.adjust_volume(speaker_type, i32::from(delta), force, source)
            }
            SpeakerOperation::SetMute { mute } => self.set_mute(speaker_type, mute, force, source),
        }
    }

    /// Set every speaker of the group to `volume`, clamped to `0..=100`.
    ///
    /// # Errors
    /// Fails if a speaker refuses the value or the group disagrees afterwards;
    /// the group is restored to its previous settings in both cases.
    pub fn set_volume(
        &self,
        speaker_type: &SpeakerType,
        volume: i32,
        force_no_notifications: bool,
        source: Source,
    ) -> ChangeOutcome {
        let volume = clamp_volume(volume);
        if self.is_empty_group(speaker_type) {
            return Ok(None);
        }

        let applied = self.apply_to_group(speaker_type, "set_volume", |s| s.set_volume(volume))?;
        let settings = self.settled(speaker_type, &applied)?;
        info!(speaker_type = %speaker_type, volume = settings.volume, ?source, "Volume set");

        self.publish(speaker_type, settings, EventName::VolumeChanged, force_no_notifications, source);
        Ok(Some(settings))
    }

    /// Change the group's volume by `delta`, clamping the result to `0..=100`.
    ///
    /// # Errors
    /// Fails with [`Error::InconsistentGroup`] if the speakers disagree on a
    /// baseline, or as [`Self::set_volume`] does.
    pub fn adjust_volume(
        &self,
        speaker_type: &SpeakerType,
        delta: i32,
        force_no_notifications: bool,
        source: Source,
    ) -> ChangeOutcome {
        let baseline = match consistency::validate(&self.registry, speaker_type) {
            Ok(settings) => settings,
            Err(Error::NoSpeakers(_)) => {
                debug!(speaker_type = %speaker_type, "No speakers to adjust");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let target = adjusted_volume(baseline.volume, delta);
        debug!(speaker_type = %speaker_type, baseline = baseline.volume, delta, target, "Adjusting volume");
        self.set_volume(speaker_type, i32::from(target), force_no_notifications, source)
    }

    /// Mute or unmute every speaker of the group.
    ///
    /// Unmuting a group whose volume is below the minimum unmute volume also
    /// raises the volume to that minimum. Only one `MuteChanged` notification
    /// is published, carrying the final settings.
    ///
    /// # Errors
    /// Fails if the group disagrees before unmuting, or if any speaker refuses
    /// the mute or volume change; the group is restored in the latter case.
    pub fn set_mute(
        &self,
        speaker_type: &SpeakerType,
        mute: bool,
        force_no_notifications: bool,
        source: Source,
    ) -> ChangeOutcome {
        if self.is_empty_group(speaker_type) {
            return Ok(None);
        }

        let before = if mute { None } else { Some(consistency::validate(&self.registry, speaker_type)?) };

        let applied = self.apply_to_group(speaker_type, "set_mute", |s| s.set_mute(mute))?;

        if let Some(before) = before
            && before.volume < self.min_unmute_volume
        {
            let floor = self.min_unmute_volume;
            debug!(speaker_type = %speaker_type, from = before.volume, to = floor, "Restoring volume on unmute");
            // The raised volume is reported by the MuteChanged notification below.
            if let Err(e) = self.apply_to_group(speaker_type, "restore_volume", |s| s.set_volume(floor)) {
                applied.roll_back();
                return Err(e);
            }
        }

        let settings = self.settled(speaker_type, &applied)?;
        info!(speaker_type = %speaker_type, mute = settings.mute, volume = settings.volume, ?source, "Mute set");

        self.publish(speaker_type, settings, EventName::MuteChanged, force_no_notifications, source);
        Ok(Some(settings))
    }

    /// Settings shared by the group.
    ///
    /// # Errors
    /// Fails with [`Error::NoSpeakers`], [`Error::EndpointUnavailable`], or
    /// [`Error::InconsistentGroup`].
    pub fn speaker_settings(&self, speaker_type: &SpeakerType) -> Result<SpeakerSettings> {
        consistency::validate(&self.registry, speaker_type)
    }

    fn is_empty_group(&self, speaker_type: &SpeakerType) -> bool {
        let empty = self.registry.for_type(speaker_type).is_empty();
        if empty {
            debug!(speaker_type = %speaker_type, "No speakers of type, nothing to change");
        }
        empty
    }

    fn apply_to_group(
        &self,
        speaker_type: &SpeakerType,
        operation: &'static str,
        change: impl Fn(&dyn SpeakerEndpoint) -> bool,
    ) -> Result<AppliedChange> {
        let speakers = self.registry.for_type(speaker_type).to_vec();
        let snapshots: Vec<Option<SpeakerSettings>> = speakers.iter().map(|s| s.settings().ok()).collect();

        for (index, speaker) in speakers.iter().enumerate() {
            if !change(speaker.as_ref()) {
                warn!(speaker_type = %speaker_type, operation, index, "Speaker rejected change");
                let partial = AppliedChange {
                    speaker_type: speaker_type.clone(),
                    speakers: speakers[..index].to_vec(),
                    snapshots: snapshots[..index].to_vec(),
                };
                partial.roll_back();
                return Err(Error::EndpointRejected { speaker_type: speaker_type.clone(), operation });
            }
        }

        Ok(AppliedChange { speaker_type: speaker_type.clone(), speakers, snapshots })
    }

    /// Confirm the group agrees after a change, restoring it if not.
    fn settled(&self, speaker_type: &SpeakerType, applied: &AppliedChange) -> Result<SpeakerSettings> {
        consistency::validate(&self.registry, speaker_type).inspect_err(|e| {
            warn!(speaker_type = %speaker_type, error = %e, "Group unsettled after change");
            applied.roll_back();
        })
    }

    fn publish(
        &self,
        speaker_type: &SpeakerType,
        settings: SpeakerSettings,
        event: EventName,
        force_no_notifications: bool,
        source: Source,
    ) {
        if force_no_notifications {
            debug!(speaker_type = %speaker_type, event = event.as_str(), "Skipping notifications");
            self.fanout.update_context(speaker_type, settings);
        } else {
            self.fanout.on_changed(speaker_type, settings, event, source);
        }
    }
}

/// Speakers touched by a change, with the settings each reported beforehand.
struct AppliedChange {
    speaker_type: SpeakerType,
    speakers: Vec<Arc<dyn SpeakerEndpoint>>,
    snapshots: Vec<Option<SpeakerSettings>>,
}

impl AppliedChange {
    fn roll_back(&self) {
        for (speaker, snapshot) in self.speakers.iter().zip(&self.snapshots) {
            let Some(previous) = snapshot else {
                error!(speaker_type = %self.speaker_type, "No prior settings to restore speaker to");
                continue;
            };
            if !(speaker.set_volume(previous.volume) && speaker.set_mute(previous.mute)) {
                error!(
                    speaker_type = %self.speaker_type,
                    volume = previous.volume,
                    mute = previous.mute,
                    "Failed to restore speaker settings"
                );
            }
        }
    }
}
