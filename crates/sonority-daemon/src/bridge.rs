//! Forwards manager output onto the IPC event channel.

use parking_lot::Mutex;
use sonority_core::{
    DirectiveResult, EventMessage, ExceptionErrorType, ExceptionSender, MessageSender,
    SpeakerManagerObserver, SpeakerSettings, SpeakerType, Source,
};
use sonority_ipc::Event;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Publishes protocol events, exception reports, and observer notifications
/// to connected IPC clients.
pub struct EventBridge {
    event_tx: broadcast::Sender<Event>,
}

impl EventBridge {
    #[must_use]
    pub fn new(event_tx: broadcast::Sender<Event>) -> Self {
        Self { event_tx }
    }

    fn publish(&self, event: Event) {
        // No subscribers is not an error
        if self.event_tx.send(event).is_err() {
            debug!("No IPC clients listening");
        }
    }
}

impl MessageSender for EventBridge {
    fn send_event(&self, message: EventMessage) {
        match Event::protocol(&message) {
            Some(event) => self.publish(event),
            None => warn!(name = %message.header.name, "Dropping unknown outbound event"),
        }
    }
}

impl ExceptionSender for EventBridge {
    fn send_exception_encountered(&self, unparsed_directive: &str, error_type: ExceptionErrorType, message: &str) {
        self.publish(Event::exception(unparsed_directive, error_type, message));
    }
}

impl SpeakerManagerObserver for EventBridge {
    fn on_speaker_settings_changed(&self, source: Source, speaker_type: &SpeakerType, settings: &SpeakerSettings) {
        self.publish(Event::settings_changed(source, speaker_type, settings));
    }
}

/// Directive outcome reported back to the IPC client that sent it.
#[derive(Default)]
pub struct DirectiveOutcome {
    failure: Mutex<Option<String>>,
}

impl DirectiveOutcome {
    /// Description of the failure, if the directive failed.
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }
}

impl DirectiveResult for DirectiveOutcome {
    fn set_completed(&self) {
        *self.failure.lock() = None;
    }

    fn set_failed(&self, description: &str) {
        *self.failure.lock() = Some(description.to_string());
    }
}
