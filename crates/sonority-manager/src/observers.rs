//! The set of local observers.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use arc_swap::ArcSwap;
use sonority_core::{SpeakerManagerObserver, SpeakerSettings, SpeakerType, Source};
use tracing::{debug, error};

type ObserverList = Vec<Arc<dyn SpeakerManagerObserver>>;

/// Observers that may be added or removed from any thread.
///
/// Updates swap in a new list; delivery iterates the list current when the
/// notification starts, so an observer added mid-delivery sees the next change.
pub struct ObserverSet {
    observers: ArcSwap<ObserverList>,
}

impl Default for ObserverSet {
    fn default() -> Self {
        Self { observers: ArcSwap::from_pointee(Vec::new()) }
    }
}

impl ObserverSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. Adding one that is already present is a no-op.
    pub fn add(&self, observer: Arc<dyn SpeakerManagerObserver>) {
        self.observers.rcu(|current| {
            let mut next = ObserverList::clone(current);
            if !next.iter().any(|o| same_observer(o, &observer)) {
                next.push(Arc::clone(&observer));
            }
            next
        });
        debug!(count = self.len(), "Observer added");
    }

    /// Remove an observer. Removing an unknown observer is a no-op.
    pub fn remove(&self, observer: &Arc<dyn SpeakerManagerObserver>) {
        self.observers.rcu(|current| {
            current.iter().filter(|o| !same_observer(o, observer)).cloned().collect::<ObserverList>()
        });
        debug!(count = self.len(), "Observer removed");
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every observer.
    pub fn clear(&self) {
        self.observers.store(Arc::new(Vec::new()));
    }

    /// Deliver a change to every observer.
    ///
    /// A panicking observer is logged and skipped; the remaining observers
    /// are still notified.
    pub fn notify(&self, source: Source, speaker_type: &SpeakerType, settings: &SpeakerSettings) {
        let observers = self.observers.load_full();
        for observer in observers.iter() {
            let delivered = catch_unwind(AssertUnwindSafe(|| {
                observer.on_speaker_settings_changed(source, speaker_type, settings);
            }));
            if delivered.is_err() {
                error!(speaker_type = %speaker_type, ?source, "Observer panicked during notification");
            }
        }
    }
}

fn same_observer(a: &Arc<dyn SpeakerManagerObserver>, b: &Arc<dyn SpeakerManagerObserver>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
