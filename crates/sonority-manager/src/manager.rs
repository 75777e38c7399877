//! Public speaker manager: local API and directive handler.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sonority_core::{
    BlockingPolicy, CapabilityConfiguration, ContextManager, Directive, DirectiveName,
    ExceptionSender, ManagerConfig, MessageSender, NamespaceAndName, Result, SpeakerEndpoint,
    SpeakerManagerObserver, SpeakerSettings, SpeakerType, Source, speaker_capability,
};
use tracing::{debug, info};

use crate::directive::{DirectiveCoordinator, DirectiveInfo, DirectiveState};
use crate::engine::VolumeMuteEngine;
use crate::executor::{Deferred, SerializedExecutor};
use crate::fanout::NotificationFanout;
use crate::observers::ObserverSet;
use crate::registry::SpeakerRegistry;

const WORKER_THREAD_NAME: &str = "sonority-speakers";

/// Coordinates volume and mute across groups of speakers.
///
/// Every operation is queued on a single worker and returns a [`Deferred`]
/// handle; operations run one at a time in the order they were queued.
pub struct SpeakerManager {
    executor: Arc<SerializedExecutor<VolumeMuteEngine>>,
    directives: DirectiveCoordinator,
    observers: Arc<ObserverSet>,
    config: Arc<ManagerConfig>,
    capabilities: HashSet<CapabilityConfiguration>,
}

impl SpeakerManager {
    /// Build a manager over `speakers`, grouped by the type each reports.
    ///
    /// # Errors
    /// Returns [`sonority_core::Error::InvalidConfig`] for an invalid
    /// configuration, or [`sonority_core::Error::Worker`] if the worker
    /// thread cannot be started.
    pub fn create(
        speakers: Vec<Arc<dyn SpeakerEndpoint>>,
        context: Arc<dyn ContextManager>,
        sender: Arc<dyn MessageSender>,
        exceptions: Arc<dyn ExceptionSender>,
        config: ManagerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let observers = Arc::new(ObserverSet::new());
        let fanout = NotificationFanout::new(context, sender, Arc::clone(&observers));
        let mut engine = VolumeMuteEngine::new(SpeakerRegistry::new(), fanout, config.min_unmute_volume);
        for speaker in speakers {
            engine.add_speaker(speaker);
        }
        info!(
            speakers = engine.registry().len(),
            min_unmute_volume = config.min_unmute_volume,
            "Creating speaker manager"
        );

        let executor = Arc::new(SerializedExecutor::spawn(engine, WORKER_THREAD_NAME)?);
        let directives = DirectiveCoordinator::new(Arc::clone(&config), exceptions, Arc::clone(&executor));

        Ok(Self {
            executor,
            directives,
            observers,
            config,
            capabilities: HashSet::from([speaker_capability()]),
        })
    }

    /// Set the volume of every speaker of `speaker_type`.
    pub fn set_volume(&self, speaker_type: SpeakerType, volume: i32) -> Deferred<Option<SpeakerSettings>> {
        self.set_volume_with(speaker_type, volume, false)
    }

    pub fn set_volume_with(
        &self,
        speaker_type: SpeakerType,
        volume: i32,
        force_no_notifications: bool,
    ) -> Deferred<Option<SpeakerSettings>> {
        self.executor.submit(move |engine| {
            engine.set_volume(&speaker_type, volume, force_no_notifications, Source::LocalApi)
        })
    }

    /// Change the volume of every speaker of `speaker_type` by `delta`.
    pub fn adjust_volume(&self, speaker_type: SpeakerType, delta: i32) -> Deferred<Option<SpeakerSettings>> {
        self.adjust_volume_with(speaker_type, delta, false)
    }

    pub fn adjust_volume_with(
        &self,
        speaker_type: SpeakerType,
        delta: i32,
        force_no_notifications: bool,
    ) -> Deferred<Option<SpeakerSettings>> {
        self.executor.submit(move |engine| {
            engine.adjust_volume(&speaker_type, delta, force_no_notifications, Source::LocalApi)
        })
    }

    /// Mute or unmute every speaker of `speaker_type`.
    pub fn set_mute(&self, speaker_type: SpeakerType, mute: bool) -> Deferred<Option<SpeakerSettings>> {
        self.set_mute_with(speaker_type, mute, false)
    }

    pub fn set_mute_with(
        &self,
        speaker_type: SpeakerType,
        mute: bool,
        force_no_notifications: bool,
    ) -> Deferred<Option<SpeakerSettings>> {
        self.executor.submit(move |engine| {
            engine.set_mute(&speaker_type, mute, force_no_notifications, Source::LocalApi)
        })
    }

    /// Settings shared by every speaker of `speaker_type`.
    pub fn get_speaker_settings(&self, speaker_type: SpeakerType) -> Deferred<SpeakerSettings> {
        self.executor.submit(move |engine| engine.speaker_settings(&speaker_type))
    }

    /// Register another speaker under the type it reports.
    pub fn add_speaker(&self, speaker: Arc<dyn SpeakerEndpoint>) -> Deferred<()> {
        self.executor.submit(move |engine| {
            debug!(speaker_type = %speaker.speaker_type(), "Adding speaker");
            engine.add_speaker(speaker);
            Ok(())
        })
    }

    pub fn add_observer(&self, observer: Arc<dyn SpeakerManagerObserver>) {
        self.observers.add(observer);
    }

    pub fn remove_observer(&self, observer: &Arc<dyn SpeakerManagerObserver>) {
        self.observers.remove(observer);
    }

    /// Interfaces this manager advertises for discovery.
    #[must_use]
    pub fn capability_configurations(&self) -> &HashSet<CapabilityConfiguration> {
        &self.capabilities
    }

    /// Directives this manager handles, all non-blocking.
    #[must_use]
    pub fn directive_configuration(&self) -> HashMap<NamespaceAndName, BlockingPolicy> {
        self.config
            .directive_namespaces
            .keys()
            .flat_map(|namespace| {
                DirectiveName::ALL
                    .iter()
                    .map(move |name| (NamespaceAndName::new(namespace, name.as_str()), BlockingPolicy::NonBlocking))
            })
            .collect()
    }

    /// Parse a directive and hold it until [`Self::handle_directive`].
    pub fn pre_handle_directive(&self, info: DirectiveInfo) -> DirectiveState {
        self.directives.pre_handle(info)
    }

    /// Queue a pre-handled directive.
    pub fn handle_directive(&self, message_id: &str) -> Deferred<DirectiveState> {
        self.directives.handle(message_id)
    }

    /// Drop a directive that has not started handling.
    pub fn cancel_directive(&self, message_id: &str) -> bool {
        self.directives.cancel(message_id)
    }

    /// Parse and queue a directive in one step.
    pub fn handle_directive_immediately(&self, directive: Directive) -> Deferred<DirectiveState> {
        self.directives.handle_immediately(directive)
    }

    /// Whether the manager still accepts operations.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.executor.is_running()
    }

    /// Stop accepting work, drop queued operations, and release every speaker.
    ///
    /// Blocks until the worker has exited. Calling this again is a no-op.
    pub fn shutdown(&self) {
        if !self.executor.is_running() {
            return;
        }
        info!("Shutting down speaker manager");
        self.directives.clear();
        self.observers.clear();
        self.executor.shutdown_with(VolumeMuteEngine::release_speakers);
    }
}

impl Drop for SpeakerManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
