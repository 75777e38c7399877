//! Capability descriptor published for discovery.

use serde::{Deserialize, Serialize};

use crate::directive::SPEAKER_NAMESPACE;

/// Interface type advertised for the speaker capability.
pub const CAPABILITY_INTERFACE_TYPE: &str = "AlexaInterface";
/// Version of the speaker interface implemented here.
pub const CAPABILITY_INTERFACE_VERSION: &str = "1.0";

/// A single published capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityConfiguration {
    /// Interface type (e.g., "AlexaInterface")
    pub interface_type: String,
    /// Interface name (e.g., "Speaker")
    pub interface_name: String,
    /// Interface version
    pub interface_version: String,
}

/// Descriptor for the speaker directive/event interface.
#[must_use]
pub fn speaker_capability() -> CapabilityConfiguration {
    CapabilityConfiguration {
        interface_type: CAPABILITY_INTERFACE_TYPE.to_string(),
        interface_name: SPEAKER_NAMESPACE.to_string(),
        interface_version: CAPABILITY_INTERFACE_VERSION.to_string(),
    }
}
