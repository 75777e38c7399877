//! Speaker manager configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::directive::SPEAKER_NAMESPACE;
use crate::error::{Error, Result};
use crate::speaker::{MAX_VOLUME, SpeakerType};

/// Volume applied when unmuting a silent group, unless configured otherwise.
pub const DEFAULT_MIN_UNMUTE_VOLUME: u8 = 10;

/// Settings fixed for the lifetime of a speaker manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Volume floor applied when unmuting a group below it
    #[serde(default = "default_min_unmute_volume")]
    pub min_unmute_volume: u8,
    /// Speaker type controlled by each directive namespace
    #[serde(default = "default_directive_namespaces")]
    pub directive_namespaces: BTreeMap<String, SpeakerType>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            min_unmute_volume: default_min_unmute_volume(),
            directive_namespaces: default_directive_namespaces(),
        }
    }
}

fn default_min_unmute_volume() -> u8 {
    DEFAULT_MIN_UNMUTE_VOLUME
}

fn default_directive_namespaces() -> BTreeMap<String, SpeakerType> {
    BTreeMap::from([(SPEAKER_NAMESPACE.to_string(), SpeakerType::SPEAKER_VOLUME)])
}

impl ManagerConfig {
    /// Check that every setting is within range.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if `min_unmute_volume` exceeds the maximum
    /// volume or no directive namespace is mapped.
    pub fn validate(&self) -> Result<()> {
        if self.min_unmute_volume > MAX_VOLUME {
            return Err(Error::InvalidConfig(format!(
                "min_unmute_volume {} exceeds {MAX_VOLUME}",
                self.min_unmute_volume
            )));
        }
        if self.directive_namespaces.is_empty() {
            return Err(Error::InvalidConfig("no directive namespaces configured".to_string()));
        }
        Ok(())
    }

    /// Speaker type addressed by directives in `namespace`.
    #[must_use]
    pub fn speaker_type_for(&self, namespace: &str) -> Option<&SpeakerType> {
        self.directive_namespaces.get(namespace)
    }
}
