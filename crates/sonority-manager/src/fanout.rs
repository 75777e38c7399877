//! Publishing of settings changes to the protocol and local observers.

use std::sync::Arc;

use sonority_core::{
    ContextManager, EventMessage, EventName, MessageSender, SpeakerSettings, SpeakerType, Source,
};
use tracing::{debug, error};

use crate::observers::ObserverSet;

/// Fans a successful change out to context state, the remote protocol, and observers.
pub struct NotificationFanout {
    context: Arc<dyn ContextManager>,
    sender: Arc<dyn MessageSender>,
    observers: Arc<ObserverSet>,
}

impl NotificationFanout {
    #[must_use]
    pub fn new(
        context: Arc<dyn ContextManager>,
        sender: Arc<dyn MessageSender>,
        observers: Arc<ObserverSet>,
    ) -> Self {
        Self { context, sender, observers }
    }

    /// Record the new settings in the context store.
    ///
    /// Failure is logged only: the context is read lazily by the next outbound
    /// message, so the change itself still stands.
    pub fn update_context(&self, speaker_type: &SpeakerType, settings: SpeakerSettings) {
        if let Err(e) = self.context.set_volume_state(speaker_type, settings.into()) {
            error!(speaker_type = %speaker_type, error = %e, "Failed to update context state");
        }
    }

    /// Publish a change: context state, then the outbound event, then observers.
    pub fn on_changed(
        &self,
        speaker_type: &SpeakerType,
        settings: SpeakerSettings,
        event: EventName,
        source: Source,
    ) {
        self.update_context(speaker_type, settings);

        let message = EventMessage::settings_changed(event, settings, self.context.context());
        debug!(
            event = event.as_str(),
            message_id = %message.header.message_id,
            volume = settings.volume,
            mute = settings.mute,
            "Sending settings changed event"
        );
        self.sender.send_event(message);

        self.observers.notify(source, speaker_type, &settings);
    }
}
