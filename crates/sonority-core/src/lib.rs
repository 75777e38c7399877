//! Sonority Core - Speaker model, capability traits, and protocol wire types.
//!
//! This crate contains the domain types shared by the speaker manager, the
//! IPC transport, and the daemon. It has no threads and no I/O of its own.

pub mod capability;
pub mod config;
pub mod context;
pub mod directive;
pub mod error;
pub mod event;
pub mod observer;
pub mod speaker;

pub use capability::{CapabilityConfiguration, speaker_capability};
pub use config::ManagerConfig;
pub use context::{ContextManager, InMemoryContextStore, VolumeState};
pub use directive::{
    BlockingPolicy, Directive, DirectiveHeader, DirectiveName, DirectiveResult, ExceptionErrorType,
    ExceptionSender, NamespaceAndName, ParsedPayload, SPEAKER_NAMESPACE, SpeakerOperation,
};
pub use error::{Error, Result};
pub use event::{EventMessage, EventName, MessageSender, SettingsChangedPayload};
pub use observer::{SpeakerManagerObserver, Source};
pub use speaker::{SpeakerEndpoint, SpeakerSettings, SpeakerType};
