//! Inbound directive wire types and payload parsing.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::speaker::{MAX_VOLUME, MAX_VOLUME_DELTA, MIN_VOLUME, MIN_VOLUME_DELTA};

/// Namespace of the speaker directive and event interface.
pub const SPEAKER_NAMESPACE: &str = "Speaker";

/// Header shared by every directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveHeader {
    /// Interface namespace (e.g., "Speaker")
    pub namespace: String,
    /// Directive name (e.g., "SetVolume")
    pub name: String,
    /// Unique identifier of this directive
    pub message_id: String,
    /// Dialog the directive belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog_request_id: Option<String>,
}

/// A directive as delivered by the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub header: DirectiveHeader,
    /// Unvalidated payload object
    #[serde(default)]
    pub payload: Value,
}

impl Directive {
    /// Build a directive with a fresh message id.
    #[must_use]
    pub fn new(namespace: &str, name: &str, payload: Value) -> Self {
        Self {
            header: DirectiveHeader {
                namespace: namespace.to_string(),
                name: name.to_string(),
                message_id: uuid::Uuid::new_v4().to_string(),
                dialog_request_id: None,
            },
            payload,
        }
    }

    /// The directive's message id.
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.header.message_id
    }

    /// Namespace and name of this directive.
    #[must_use]
    pub fn namespace_and_name(&self) -> NamespaceAndName {
        NamespaceAndName::new(&self.header.namespace, &self.header.name)
    }

    /// The directive serialized back to JSON, as quoted in exception reports.
    #[must_use]
    pub fn unparsed(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Key identifying a directive kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespaceAndName {
    pub namespace: String,
    pub name: String,
}

impl NamespaceAndName {
    #[must_use]
    pub fn new(namespace: &str, name: &str) -> Self {
        Self { namespace: namespace.to_string(), name: name.to_string() }
    }
}

impl fmt::Display for NamespaceAndName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// How a dispatcher should sequence a directive against others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingPolicy {
    /// Later directives wait for this one to complete
    Blocking,
    /// Later directives may be handled concurrently
    NonBlocking,
}

/// Directive names handled by the speaker interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveName {
    SetVolume,
    AdjustVolume,
    SetMute,
}

impl DirectiveName {
    /// Every supported directive.
    pub const ALL: [Self; 3] = [Self::SetVolume, Self::AdjustVolume, Self::SetMute];

    /// Wire name of the directive.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SetVolume => "SetVolume",
            Self::AdjustVolume => "AdjustVolume",
            Self::SetMute => "SetMute",
        }
    }

    /// Look up a directive by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }
}

/// Operation requested by a parsed directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerOperation {
    /// Set an absolute volume
    SetVolume { volume: u8 },
    /// Change the volume relative to its current value
    AdjustVolume { delta: i8 },
    /// Mute or unmute
    SetMute { mute: bool },
}

/// Operation parameters extracted from a directive payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedPayload {
    pub operation: SpeakerOperation,
    pub force_no_notifications: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumePayload {
    volume: i64,
    #[serde(default)]
    force_no_notifications: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutePayload {
    mute: bool,
    #[serde(default)]
    force_no_notifications: bool,
}

/// Parse a directive payload into operation parameters.
///
/// # Errors
/// Returns [`Error::Parse`] for an unknown directive name, a payload that does
/// not match the directive's schema, or a value outside its allowed range.
pub fn parse_payload(name: &str, payload: &Value) -> Result<ParsedPayload> {
    let directive =
        DirectiveName::from_name(name).ok_or_else(|| Error::Parse(format!("unknown directive {name}")))?;

    match directive {
        DirectiveName::SetVolume => {
            let p: VolumePayload = from_payload(directive, payload)?;
            let volume = in_range(p.volume, i64::from(MIN_VOLUME), i64::from(MAX_VOLUME), "volume")?;
            Ok(ParsedPayload {
                operation: SpeakerOperation::SetVolume { volume: u8::try_from(volume).unwrap_or(MAX_VOLUME) },
                force_no_notifications: p.force_no_notifications,
            })
        }
        DirectiveName::AdjustVolume => {
            let p: VolumePayload = from_payload(directive, payload)?;
            let delta =
                in_range(p.volume, i64::from(MIN_VOLUME_DELTA), i64::from(MAX_VOLUME_DELTA), "volume delta")?;
            Ok(ParsedPayload {
                operation: SpeakerOperation::AdjustVolume { delta: i8::try_from(delta).unwrap_or(0) },
                force_no_notifications: p.force_no_notifications,
            })
        }
        DirectiveName::SetMute => {
            let p: MutePayload = from_payload(directive, payload)?;
            Ok(ParsedPayload {
                operation: SpeakerOperation::SetMute { mute: p.mute },
                force_no_notifications: p.force_no_notifications,
            })
        }
    }
}

fn from_payload<T: serde::de::DeserializeOwned>(directive: DirectiveName, payload: &Value) -> Result<T> {
    T::deserialize(payload).map_err(|e| Error::Parse(format!("{} payload: {e}", directive.as_str())))
}

fn in_range(value: i64, min: i64, max: i64, field: &str) -> Result<i64> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(Error::Parse(format!("{field} {value} outside {min}..={max}")))
    }
}

/// Completion sink for one directive, owned by the transport layer.
pub trait DirectiveResult: Send + Sync {
    /// The directive was handled successfully.
    fn set_completed(&self);

    /// The directive could not be handled.
    fn set_failed(&self, description: &str);
}

/// Classification of a directive processing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionErrorType {
    /// The directive was malformed
    UnexpectedInformationReceived,
    /// The directive is not supported
    UnsupportedOperation,
    /// The directive was valid but could not be carried out
    InternalError,
}

/// Reports directive processing failures back to the protocol layer.
pub trait ExceptionSender: Send + Sync {
    fn send_exception_encountered(
        &self,
        unparsed_directive: &str,
        error_type: ExceptionErrorType,
        message: &str,
    );
}
