//! Shared fakes for manager scenario tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use sonority_core::{
    DirectiveResult, EventMessage, ExceptionErrorType, ExceptionSender, InMemoryContextStore,
    ManagerConfig, MessageSender, Result, SpeakerEndpoint, SpeakerManagerObserver, SpeakerSettings,
    SpeakerType, Source,
};
use sonority_manager::SpeakerManager;

/// Speaker that records the volume and mute values it is given.
pub struct TestSpeaker {
    speaker_type: SpeakerType,
    settings: Mutex<SpeakerSettings>,
    log: Mutex<Vec<String>>,
}

impl TestSpeaker {
    pub fn new(speaker_type: SpeakerType, settings: SpeakerSettings) -> Arc<Self> {
        Arc::new(Self { speaker_type, settings: Mutex::new(settings), log: Mutex::new(Vec::new()) })
    }

    pub fn current(&self) -> SpeakerSettings {
        *self.settings.lock()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

impl SpeakerEndpoint for TestSpeaker {
    fn speaker_type(&self) -> SpeakerType {
        self.speaker_type.clone()
    }

    fn settings(&self) -> Result<SpeakerSettings> {
        Ok(self.current())
    }

    fn set_volume(&self, volume: u8) -> bool {
        self.log.lock().push(format!("volume:{volume}"));
        self.settings.lock().volume = volume;
        true
    }

    fn set_mute(&self, mute: bool) -> bool {
        self.log.lock().push(format!("mute:{mute}"));
        self.settings.lock().mute = mute;
        true
    }
}

#[derive(Default)]
pub struct Events(Mutex<Vec<EventMessage>>);

impl Events {
    pub fn all(&self) -> Vec<EventMessage> {
        self.0.lock().clone()
    }
}

impl MessageSender for Events {
    fn send_event(&self, event: EventMessage) {
        self.0.lock().push(event);
    }
}

#[derive(Default)]
pub struct Exceptions(Mutex<Vec<ExceptionErrorType>>);

impl Exceptions {
    pub fn all(&self) -> Vec<ExceptionErrorType> {
        self.0.lock().clone()
    }
}

impl ExceptionSender for Exceptions {
    fn send_exception_encountered(&self, _: &str, error_type: ExceptionErrorType, _: &str) {
        self.0.lock().push(error_type);
    }
}

#[derive(Default)]
pub struct Notifications(Mutex<Vec<(Source, SpeakerType, SpeakerSettings)>>);

impl Notifications {
    pub fn all(&self) -> Vec<(Source, SpeakerType, SpeakerSettings)> {
        self.0.lock().clone()
    }
}

impl SpeakerManagerObserver for Notifications {
    fn on_speaker_settings_changed(&self, source: Source, speaker_type: &SpeakerType, settings: &SpeakerSettings) {
        self.0.lock().push((source, speaker_type.clone(), *settings));
    }
}

#[derive(Default)]
pub struct Outcome(Mutex<Option<std::result::Result<(), String>>>);

impl Outcome {
    pub fn get(&self) -> Option<std::result::Result<(), String>> {
        self.0.lock().clone()
    }
}

impl DirectiveResult for Outcome {
    fn set_completed(&self) {
        *self.0.lock() = Some(Ok(()));
    }

    fn set_failed(&self, description: &str) {
        *self.0.lock() = Some(Err(description.to_string()));
    }
}

pub struct Fixture {
    pub manager: SpeakerManager,
    pub context: Arc<InMemoryContextStore>,
    pub events: Arc<Events>,
    pub exceptions: Arc<Exceptions>,
    pub notifications: Arc<Notifications>,
}

pub fn fixture(speakers: &[Arc<TestSpeaker>]) -> Fixture {
    let context = Arc::new(InMemoryContextStore::new());
    let events = Arc::new(Events::default());
    let exceptions = Arc::new(Exceptions::default());
    let notifications = Arc::new(Notifications::default());

    let endpoints: Vec<Arc<dyn SpeakerEndpoint>> =
        speakers.iter().map(|s| Arc::clone(s) as Arc<dyn SpeakerEndpoint>).collect();
    let manager = SpeakerManager::create(
        endpoints,
        context.clone(),
        events.clone(),
        exceptions.clone(),
        ManagerConfig::default(),
    )
    .unwrap();
    manager.add_observer(notifications.clone());

    Fixture { manager, context, events, exceptions, notifications }
}
