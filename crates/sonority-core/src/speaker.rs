//! Speaker types, settings, and the endpoint capability.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Lowest volume a speaker accepts.
pub const MIN_VOLUME: u8 = 0;
/// Highest volume a speaker accepts.
pub const MAX_VOLUME: u8 = 100;
/// Most negative delta an `AdjustVolume` directive may carry.
pub const MIN_VOLUME_DELTA: i8 = -100;
/// Most positive delta an `AdjustVolume` directive may carry.
pub const MAX_VOLUME_DELTA: i8 = 100;

/// Logical class of speakers whose settings are kept consistent.
///
/// The set of types is open: embedding applications create their own with
/// [`SpeakerType::new`] when they need independent volume controls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeakerType(Cow<'static, str>);

impl SpeakerType {
    /// Speakers controlled by the remote `Speaker` interface.
    pub const SPEAKER_VOLUME: Self = Self(Cow::Borrowed("SPEAKER_VOLUME"));
    /// Speakers used for alerts, controlled independently.
    pub const ALERTS_VOLUME: Self = Self(Cow::Borrowed("ALERTS_VOLUME"));

    /// Create an application-defined speaker type.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The type's name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeakerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Volume and mute state reported by a speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpeakerSettings {
    /// Volume level (0 - 100)
    pub volume: u8,
    /// Whether the speaker is muted
    pub mute: bool,
}

impl SpeakerSettings {
    /// Create settings, clamping the volume into range.
    #[must_use]
    pub fn new(volume: u8, mute: bool) -> Self {
        Self { volume: volume.min(MAX_VOLUME), mute }
    }
}

/// Clamp an arbitrary volume request into `MIN_VOLUME..=MAX_VOLUME`.
#[must_use]
pub fn clamp_volume(volume: i32) -> u8 {
    // Lossless: the value is clamped into 0..=100 first.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamped = volume.clamp(i32::from(MIN_VOLUME), i32::from(MAX_VOLUME)) as u8;
    clamped
}

/// Apply a relative change to a baseline volume, clamping the result.
#[must_use]
pub fn adjusted_volume(baseline: u8, delta: i32) -> u8 {
    clamp_volume(i32::from(baseline).saturating_add(delta))
}

/// A controllable audio output.
///
/// Endpoints are supplied by the embedding application and shared with the
/// speaker manager, which never destroys them. Calls may block (driver or
/// network backed); the manager only invokes them from its worker thread.
pub trait SpeakerEndpoint: Send + Sync {
    /// The group this speaker belongs to.
    fn speaker_type(&self) -> SpeakerType;

    /// Current settings of the speaker.
    ///
    /// # Errors
    /// Returns an error if the speaker cannot report its state.
    fn settings(&self) -> Result<SpeakerSettings>;

    /// Set the volume. Returns `false` if the speaker refused the value.
    fn set_volume(&self, volume: u8) -> bool;

    /// Set the mute state. Returns `false` if the speaker refused the value.
    fn set_mute(&self, mute: bool) -> bool;
}
