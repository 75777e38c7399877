//! Sonority Manager - Serialized volume and mute coordination for speaker groups.
//!
//! The [`SpeakerManager`] owns every registered speaker on a single worker
//! thread. Local API calls, protocol directives, and speaker registration are
//! all queued on that worker, so no two operations ever interleave.

pub mod consistency;
pub mod directive;
pub mod engine;
pub mod executor;
pub mod fanout;
pub mod manager;
pub mod observers;
pub mod registry;

#[cfg(test)]
mod testing;

pub use directive::{DirectiveCoordinator, DirectiveInfo, DirectiveState};
pub use engine::VolumeMuteEngine;
pub use executor::{Deferred, SerializedExecutor};
pub use fanout::NotificationFanout;
pub use manager::SpeakerManager;
pub use observers::ObserverSet;
pub use registry::SpeakerRegistry;
