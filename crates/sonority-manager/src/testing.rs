//! Test doubles for speaker endpoints and manager collaborators.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use parking_lot::Mutex;
use sonority_core::{
    DirectiveResult, Error, EventMessage, ExceptionErrorType, ExceptionSender, MessageSender,
    Result, SpeakerEndpoint, SpeakerManagerObserver, SpeakerSettings, SpeakerType, Source,
};

/// In-memory speaker that records every mutation it receives.
pub struct FakeSpeaker {
    speaker_type: SpeakerType,
    settings: Mutex<SpeakerSettings>,
    reject_volume: AtomicBool,
    reject_mute: AtomicBool,
    fail_queries: AtomicBool,
    panic_on_volume: AtomicBool,
    volume_gate: Mutex<Option<VolumeGate>>,
    volume_calls: Mutex<Vec<u8>>,
    mute_calls: Mutex<Vec<bool>>,
}

struct VolumeGate {
    entered: mpsc::Sender<()>,
    release: mpsc::Receiver<()>,
}

impl FakeSpeaker {
    pub fn shared(speaker_type: SpeakerType, volume: u8) -> Arc<Self> {
        Arc::new(Self {
            speaker_type,
            settings: Mutex::new(SpeakerSettings { volume, mute: false }),
            reject_volume: AtomicBool::new(false),
            reject_mute: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
            panic_on_volume: AtomicBool::new(false),
            volume_gate: Mutex::new(None),
            volume_calls: Mutex::new(Vec::new()),
            mute_calls: Mutex::new(Vec::new()),
        })
    }

    pub fn current(&self) -> SpeakerSettings {
        *self.settings.lock()
    }

    pub fn force_settings(&self, settings: SpeakerSettings) {
        *self.settings.lock() = settings;
    }

    pub fn reject_volume(&self, reject: bool) {
        self.reject_volume.store(reject, Ordering::SeqCst);
    }

    pub fn reject_mute(&self, reject: bool) {
        self.reject_mute.store(reject, Ordering::SeqCst);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn panic_on_volume(&self, panic: bool) {
        self.panic_on_volume.store(panic, Ordering::SeqCst);
    }

    /// Block the next `set_volume` call until the returned sender fires.
    ///
    /// The first receiver fires once that call has been entered.
    pub fn hold_next_volume(&self) -> (mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.volume_gate.lock() = Some(VolumeGate { entered: entered_tx, release: release_rx });
        (entered_rx, release_tx)
    }

    pub fn volume_calls(&self) -> Vec<u8> {
        self.volume_calls.lock().clone()
    }

    pub fn mute_calls(&self) -> Vec<bool> {
        self.mute_calls.lock().clone()
    }
}

impl SpeakerEndpoint for FakeSpeaker {
    fn speaker_type(&self) -> SpeakerType {
        self.speaker_type.clone()
    }

    fn settings(&self) -> Result<SpeakerSettings> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(Error::EndpointUnavailable("fake speaker offline".to_string()));
        }
        Ok(self.current())
    }

    fn set_volume(&self, volume: u8) -> bool {
        self.volume_calls.lock().push(volume);
        let gate = self.volume_gate.lock().take();
        if let Some(gate) = gate {
            gate.entered.send(()).ok();
            gate.release.recv_timeout(Duration::from_secs(5)).ok();
        }
        assert!(!self.panic_on_volume.load(Ordering::SeqCst), "fake speaker fault");
        if self.reject_volume.load(Ordering::SeqCst) {
            return false;
        }
        self.settings.lock().volume = volume;
        true
    }

    fn set_mute(&self, mute: bool) -> bool {
        self.mute_calls.lock().push(mute);
        if self.reject_mute.load(Ordering::SeqCst) {
            return false;
        }
        self.settings.lock().mute = mute;
        true
    }
}

/// Message sender that keeps every event.
#[derive(Default)]
pub struct RecordingSender {
    events: Mutex<Vec<EventMessage>>,
}

impl RecordingSender {
    pub fn events(&self) -> Vec<EventMessage> {
        self.events.lock().clone()
    }
}

impl MessageSender for RecordingSender {
    fn send_event(&self, event: EventMessage) {
        self.events.lock().push(event);
    }
}

/// Observer that keeps every notification.
#[derive(Default)]
pub struct RecordingObserver {
    calls: Mutex<Vec<(Source, SpeakerType, SpeakerSettings)>>,
}

impl RecordingObserver {
    pub fn calls(&self) -> Vec<(Source, SpeakerType, SpeakerSettings)> {
        self.calls.lock().clone()
    }
}

impl SpeakerManagerObserver for RecordingObserver {
    fn on_speaker_settings_changed(
        &self,
        source: Source,
        speaker_type: &SpeakerType,
        settings: &SpeakerSettings,
    ) {
        self.calls.lock().push((source, speaker_type.clone(), *settings));
    }
}

/// Exception sender that keeps every report.
#[derive(Default)]
pub struct RecordingExceptions {
    reports: Mutex<Vec<(String, ExceptionErrorType, String)>>,
}

impl RecordingExceptions {
    pub fn reports(&self) -> Vec<(String, ExceptionErrorType, String)> {
        self.reports.lock().clone()
    }
}

impl ExceptionSender for RecordingExceptions {
    fn send_exception_encountered(
        &self,
        unparsed_directive: &str,
        error_type: ExceptionErrorType,
        message: &str,
    ) {
        self.reports.lock().push((unparsed_directive.to_string(), error_type, message.to_string()));
    }
}

/// Outcome recorded by a directive result sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Completed,
    Failed(String),
}

/// Directive result sink that keeps its outcome.
#[derive(Default)]
pub struct RecordingResult {
    outcomes: Mutex<Vec<Recorded>>,
}

impl RecordingResult {
    pub fn outcomes(&self) -> Vec<Recorded> {
        self.outcomes.lock().clone()
    }
}

impl DirectiveResult for RecordingResult {
    fn set_completed(&self) {
        self.outcomes.lock().push(Recorded::Completed);
    }

    fn set_failed(&self, description: &str) {
        self.outcomes.lock().push(Recorded::Failed(description.to_string()));
    }
}
