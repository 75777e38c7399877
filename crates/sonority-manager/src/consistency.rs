//! Cross-speaker consistency checks.

use sonority_core::{Error, Result, SpeakerSettings, SpeakerType};
use tracing::warn;

use crate::registry::SpeakerRegistry;

/// Read the settings shared by every speaker of `speaker_type`.
///
/// # Errors
/// - [`Error::NoSpeakers`] if the group is empty; set-style callers treat this
///   as a successful no-op.
/// - [`Error::EndpointUnavailable`] if any speaker cannot report its settings.
/// - [`Error::InconsistentGroup`] if the speakers disagree.
pub fn validate(registry: &SpeakerRegistry, speaker_type: &SpeakerType) -> Result<SpeakerSettings> {
    let mut speakers = registry.for_type(speaker_type).iter();
    let Some(first) = speakers.next() else {
        return Err(Error::NoSpeakers(speaker_type.clone()));
    };

    let expected = first.settings()?;
    for speaker in speakers {
        let settings = speaker.settings()?;
        if settings != expected {
            warn!(
                speaker_type = %speaker_type,
                expected_volume = expected.volume,
                expected_mute = expected.mute,
                volume = settings.volume,
                mute = settings.mute,
                "Speaker settings are inconsistent"
            );
            return Err(Error::InconsistentGroup(speaker_type.clone()));
        }
    }

    Ok(expected)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::testing::FakeSpeaker;

    #[test]
    fn test_empty_group_reports_no_speakers() {
        let registry = SpeakerRegistry::new();
        assert_matches!(validate(&registry, &SpeakerType::SPEAKER_VOLUME), Err(Error::NoSpeakers(_)));
    }

    #[test]
    fn test_agreeing_group_returns_settings() {
        let mut registry = SpeakerRegistry::new();
        registry.register(SpeakerType::SPEAKER_VOLUME, FakeSpeaker::shared(SpeakerType::SPEAKER_VOLUME, 35));
        registry.register(SpeakerType::SPEAKER_VOLUME, FakeSpeaker::shared(SpeakerType::SPEAKER_VOLUME, 35));

        let settings = validate(&registry, &SpeakerType::SPEAKER_VOLUME).unwrap();
        assert_eq!(settings, SpeakerSettings { volume: 35, mute: false });
    }

    #[test]
    fn test_disagreeing_group_is_inconsistent() {
        let mut registry = SpeakerRegistry::new();
        registry.register(SpeakerType::SPEAKER_VOLUME, FakeSpeaker::shared(SpeakerType::SPEAKER_VOLUME, 35));
        registry.register(SpeakerType::SPEAKER_VOLUME, FakeSpeaker::shared(SpeakerType::SPEAKER_VOLUME, 36));

        assert_matches!(
            validate(&registry, &SpeakerType::SPEAKER_VOLUME),
            Err(Error::InconsistentGroup(t)) if t == SpeakerType::SPEAKER_VOLUME
        );
    }

    #[test]
    fn test_mute_disagreement_is_inconsistent() {
        let mut registry = SpeakerRegistry::new();
        let muted = FakeSpeaker::shared(SpeakerType::SPEAKER_VOLUME, 35);
        muted.force_settings(SpeakerSettings { volume: 35, mute: true });
        registry.register(SpeakerType::SPEAKER_VOLUME, FakeSpeaker::shared(SpeakerType::SPEAKER_VOLUME, 35));
        registry.register(SpeakerType::SPEAKER_VOLUME, muted);

        assert_matches!(validate(&registry, &SpeakerType::SPEAKER_VOLUME), Err(Error::InconsistentGroup(_)));
    }

    #[test]
    fn test_failed_query_fails_validation() {
        let mut registry = SpeakerRegistry::new();
        let broken = FakeSpeaker::shared(SpeakerType::SPEAKER_VOLUME, 35);
        broken.fail_queries(true);
        registry.register(SpeakerType::SPEAKER_VOLUME, FakeSpeaker::shared(SpeakerType::SPEAKER_VOLUME, 35));
        registry.register(SpeakerType::SPEAKER_VOLUME, broken);

        assert_matches!(validate(&registry, &SpeakerType::SPEAKER_VOLUME), Err(Error::EndpointUnavailable(_)));
    }
}
