//! Speaker endpoints grouped by type.

use std::collections::HashMap;
use std::sync::Arc;

use sonority_core::{SpeakerEndpoint, SpeakerType};
use tracing::{debug, info};

/// Groups of speaker endpoints keyed by [`SpeakerType`].
///
/// Only the manager's worker thread touches the registry, so it needs no
/// locking of its own.
#[derive(Default)]
pub struct SpeakerRegistry {
    groups: HashMap<SpeakerType, Vec<Arc<dyn SpeakerEndpoint>>>,
}

impl SpeakerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint to the group for `speaker_type`.
    ///
    /// Registering the same endpoint twice is a no-op.
    pub fn register(&mut self, speaker_type: SpeakerType, endpoint: Arc<dyn SpeakerEndpoint>) {
        let group = self.groups.entry(speaker_type.clone()).or_default();
        if group.iter().any(|existing| same_endpoint(existing, &endpoint)) {
            debug!(speaker_type = %speaker_type, "Speaker already registered");
            return;
        }
        group.push(endpoint);
        info!(speaker_type = %speaker_type, group_size = group.len(), "Speaker registered");
    }

    /// The current group for `speaker_type`; empty if the type is unknown.
    #[must_use]
    pub fn for_type(&self, speaker_type: &SpeakerType) -> &[Arc<dyn SpeakerEndpoint>] {
        self.groups.get(speaker_type).map_or(&[], Vec::as_slice)
    }

    /// Total number of registered endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Whether no endpoint is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every endpoint reference.
    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

fn same_endpoint(a: &Arc<dyn SpeakerEndpoint>, b: &Arc<dyn SpeakerEndpoint>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
