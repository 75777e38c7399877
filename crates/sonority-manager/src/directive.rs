//! Directive lifecycle: pre-handle, handle, cancel.
//!
//! A directive moves `Received -> PreHandled -> Handling` and ends as
//! `Completed`, `Cancelled`, or `Failed`. Pre-handling parses the payload on
//! the caller's thread and records the directive as pending; handling runs the
//! parsed operation on the executor. A directive cancelled before the worker
//! reaches it is dropped without touching any speaker.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use sonority_core::directive::parse_payload;
use sonority_core::{
    Directive, DirectiveResult, Error, ExceptionErrorType, ExceptionSender, ManagerConfig,
    ParsedPayload, Result, SpeakerType, Source,
};
use tracing::{debug, error, info, warn};

use crate::engine::{ChangeOutcome, VolumeMuteEngine};
use crate::executor::{Deferred, SerializedExecutor};

/// A directive together with the sink its outcome is reported to.
#[derive(Clone)]
pub struct DirectiveInfo {
    pub directive: Arc<Directive>,
    pub result: Option<Arc<dyn DirectiveResult>>,
}

impl DirectiveInfo {
    #[must_use]
    pub fn new(directive: Directive, result: Option<Arc<dyn DirectiveResult>>) -> Self {
        Self { directive: Arc::new(directive), result }
    }

    #[must_use]
    pub fn message_id(&self) -> &str {
        self.directive.message_id()
    }
}

/// Processing state of a single directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveState {
    Received,
    PreHandled,
    Handling,
    Completed,
    Cancelled,
    Failed,
}

struct PendingDirective {
    info: DirectiveInfo,
    speaker_type: SpeakerType,
    payload: ParsedPayload,
    state: DirectiveState,
}

type PendingMap = Arc<Mutex<HashMap<String, PendingDirective>>>;

/// Maps protocol directives onto engine operations.
pub struct DirectiveCoordinator {
    pending: PendingMap,
    config: Arc<ManagerConfig>,
    exceptions: Arc<dyn ExceptionSender>,
    executor: Arc<SerializedExecutor<VolumeMuteEngine>>,
}

impl DirectiveCoordinator {
    #[must_use]
    pub fn new(
        config: Arc<ManagerConfig>,
        exceptions: Arc<dyn ExceptionSender>,
        executor: Arc<SerializedExecutor<VolumeMuteEngine>>,
    ) -> Self {
        Self { pending: Arc::new(Mutex::new(HashMap::new())), config, exceptions, executor }
    }

    /// Parse a directive and record it as pending.
    ///
    /// Returns `PreHandled` on success. A malformed directive is reported as
    /// `UnexpectedInformationReceived`, failed on its result sink, and
    /// returns `Failed`.
    pub fn pre_handle(&self, info: DirectiveInfo) -> DirectiveState {
        let message_id = info.message_id().to_string();
        let (speaker_type, payload) = match self.parse(&info.directive) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.report_parse_failure(&info, &e);
                return DirectiveState::Failed;
            }
        };

        let mut pending = self.pending.lock();
        if pending.contains_key(&message_id) {
            warn!(message_id = %message_id, "Directive already pending, ignoring duplicate");
            if let Some(result) = &info.result {
                result.set_failed("duplicate message id");
            }
            return DirectiveState::Failed;
        }

        debug!(message_id = %message_id, speaker_type = %speaker_type, "Directive pre-handled");
        pending.insert(
            message_id,
            PendingDirective { info, speaker_type, payload, state: DirectiveState::PreHandled },
        );
        DirectiveState::PreHandled
    }

    /// Queue a pre-handled directive for execution.
    ///
    /// Resolves to `Completed` or `Failed`, or to `Cancelled` if the directive
    /// was cancelled (or never pre-handled) before the worker reached it.
    pub fn handle(&self, message_id: &str) -> Deferred<DirectiveState> {
        if !self.pending.lock().contains_key(message_id) {
            debug!(message_id, "No pending directive to handle");
            return Deferred::resolved(Ok(DirectiveState::Cancelled));
        }

        let pending = Arc::clone(&self.pending);
        let exceptions = Arc::clone(&self.exceptions);
        let message_id = message_id.to_string();

        self.executor.submit(move |engine| {
            let (info, speaker_type, payload) = {
                let mut map = pending.lock();
                match map.get_mut(&message_id) {
                    Some(record) if record.state == DirectiveState::PreHandled => {
                        record.state = DirectiveState::Handling;
                        (record.info.clone(), record.speaker_type.clone(), record.payload)
                    }
                    Some(record) => return Ok(record.state),
                    None => {
                        info!(message_id = %message_id, "Directive cancelled before handling");
                        return Ok(DirectiveState::Cancelled);
                    }
                }
            };

            let outcome = apply_guarded(engine, &speaker_type, payload);
            pending.lock().remove(&message_id);
            Ok(finish(&info, outcome, exceptions.as_ref()))
        })
    }

    /// Parse and run a directive with no separate pre-handle phase.
    pub fn handle_immediately(&self, directive: Directive) -> Deferred<DirectiveState> {
        let info = DirectiveInfo::new(directive, None);
        let (speaker_type, payload) = match self.parse(&info.directive) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.report_parse_failure(&info, &e);
                return Deferred::resolved(Ok(DirectiveState::Failed));
            }
        };

        let exceptions = Arc::clone(&self.exceptions);
        self.executor.submit(move |engine| {
            let outcome = apply_guarded(engine, &speaker_type, payload);
            Ok(finish(&info, outcome, exceptions.as_ref()))
        })
    }

    /// Drop a pending directive that has not started handling.
    ///
    /// Returns whether a record was removed. Cancelling an unknown, finished,
    /// or already-handling directive is a no-op.
    pub fn cancel(&self, message_id: &str) -> bool {
        let mut pending = self.pending.lock();
        match pending.get(message_id).map(|record| record.state) {
            Some(DirectiveState::PreHandled) => {
                pending.remove(message_id);
                info!(message_id, "Directive cancelled");
                true
            }
            Some(state) => {
                debug!(message_id, ?state, "Directive already handling, letting it finish");
                false
            }
            None => false,
        }
    }

    /// Current state of a pending directive, if one is recorded.
    #[must_use]
    pub fn state(&self, message_id: &str) -> Option<DirectiveState> {
        self.pending.lock().get(message_id).map(|record| record.state)
    }

    /// Number of directives pre-handled or handling.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Drop every directive that has not started handling, failing its
    /// result sink.
    ///
    /// A directive already handling stays recorded; the worker finishes it and
    /// reports its outcome.
    pub fn clear(&self) {
        let drained: Vec<PendingDirective> = self
            .pending
            .lock()
            .extract_if(|_, record| record.state == DirectiveState::PreHandled)
            .map(|(_, record)| record)
            .collect();
        if !drained.is_empty() {
            info!(count = drained.len(), "Dropping pending directives");
        }
        for record in drained {
            if let Some(result) = &record.info.result {
                result.set_failed("speaker manager shut down");
            }
        }
    }

    fn parse(&self, directive: &Directive) -> Result<(SpeakerType, ParsedPayload)> {
        let namespace = &directive.header.namespace;
        let speaker_type = self
            .config
            .speaker_type_for(namespace)
            .cloned()
            .ok_or_else(|| Error::Parse(format!("unsupported namespace {namespace}")))?;
        let payload = parse_payload(&directive.header.name, &directive.payload)?;
        Ok((speaker_type, payload))
    }

    fn report_parse_failure(&self, info: &DirectiveInfo, e: &Error) {
        let message = e.to_string();
        warn!(message_id = %info.message_id(), directive = %info.directive.namespace_and_name(), error = %message, "Rejecting directive");
        self.exceptions.send_exception_encountered(
            &info.directive.unparsed(),
            ExceptionErrorType::UnexpectedInformationReceived,
            &message,
        );
        if let Some(result) = &info.result {
            result.set_failed(&message);
        }
    }
}

/// Run a directive's operation, turning a panicking speaker into a failure.
fn apply_guarded(engine: &VolumeMuteEngine, speaker_type: &SpeakerType, payload: ParsedPayload) -> ChangeOutcome {
    catch_unwind(AssertUnwindSafe(|| engine.apply(speaker_type, payload, Source::Directive))).unwrap_or_else(|_| {
        error!(speaker_type = %speaker_type, "Speaker panicked while handling directive");
        Err(Error::EndpointUnavailable(format!("speaker of type {speaker_type} panicked")))
    })
}

fn finish(info: &DirectiveInfo, outcome: ChangeOutcome, exceptions: &dyn ExceptionSender) -> DirectiveState {
    match outcome {
        Ok(settings) => {
            debug!(message_id = %info.message_id(), ?settings, "Directive completed");
            if let Some(result) = &info.result {
                result.set_completed();
            }
            DirectiveState::Completed
        }
        Err(e) => {
            let message = e.to_string();
            error!(message_id = %info.message_id(), error = %message, "Directive failed");
            exceptions.send_exception_encountered(
                &info.directive.unparsed(),
                ExceptionErrorType::InternalError,
                &message,
            );
            if let Some(result) = &info.result {
                result.set_failed(&message);
            }
            DirectiveState::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use serde_json::json;
    use sonority_core::{InMemoryContextStore, SPEAKER_NAMESPACE};

    use super::*;
    use crate::fanout::NotificationFanout;
    use crate::observers::ObserverSet;
    use crate::registry::SpeakerRegistry;
    use crate::testing::{FakeSpeaker, Recorded, RecordingExceptions, RecordingResult, RecordingSender};

    struct Harness {
        coordinator: DirectiveCoordinator,
        executor: Arc<SerializedExecutor<VolumeMuteEngine>>,
        speaker: Arc<FakeSpeaker>,
        sender: Arc<RecordingSender>,
        exceptions: Arc<RecordingExceptions>,
    }

    fn harness() -> Harness {
        let speaker = FakeSpeaker::shared(SpeakerType::SPEAKER_VOLUME, 20);
        let sender = Arc::new(RecordingSender::default());
        let exceptions = Arc::new(RecordingExceptions::default());
        let fanout = NotificationFanout::new(
            Arc::new(InMemoryContextStore::new()),
            sender.clone(),
            Arc::new(ObserverSet::new()),
        );
        let mut engine = VolumeMuteEngine::new(SpeakerRegistry::new(), fanout, 10);
        engine.add_speaker(speaker.clone());

        let executor = Arc::new(SerializedExecutor::spawn(engine, "test-directives").unwrap());
        let coordinator =
            DirectiveCoordinator::new(Arc::new(ManagerConfig::default()), exceptions.clone(), Arc::clone(&executor));
        Harness { coordinator, executor, speaker, sender, exceptions }
    }

    fn info(name: &str, payload: serde_json::Value) -> (DirectiveInfo, Arc<RecordingResult>) {
        let result = Arc::new(RecordingResult::default());
        let info = DirectiveInfo::new(Directive::new(SPEAKER_NAMESPACE, name, payload), Some(result.clone()));
        (info, result)
    }

    /// Hold the worker until the returned sender is dropped or signalled.
    fn block_worker(executor: &SerializedExecutor<VolumeMuteEngine>) -> mpsc::Sender<()> {
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let _blocked = executor.submit(move |_| {
            started_tx.send(()).ok();
            gate_rx.recv_timeout(Duration::from_secs(5)).ok();
            Ok(())
        });
        started_rx.recv().unwrap();
        gate_tx
    }

    #[test]
    fn test_pre_handle_then_handle_completes() {
        let h = harness();
        let (info, result) = info("SetVolume", json!({ "volume": 70 }));
        let id = info.message_id().to_string();

        assert_eq!(h.coordinator.pre_handle(info), DirectiveState::PreHandled);
        assert_eq!(h.coordinator.state(&id), Some(DirectiveState::PreHandled));

        assert_eq!(h.coordinator.handle(&id).wait().unwrap(), DirectiveState::Completed);
        assert_eq!(h.speaker.current().volume, 70);
        assert_eq!(result.outcomes(), vec![Recorded::Completed]);
        assert_eq!(h.coordinator.pending_count(), 0);
        assert_eq!(h.sender.events().len(), 1);
    }

    #[test]
    fn test_malformed_payload_fails_in_pre_handle() {
        let h = harness();
        let (info, result) = info("SetVolume", json!({ "volume": 101 }));
        let id = info.message_id().to_string();

        assert_eq!(h.coordinator.pre_handle(info), DirectiveState::Failed);

        let reports = h.exceptions.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].1, ExceptionErrorType::UnexpectedInformationReceived);
        assert!(reports[0].0.contains(&id));
        assert_matches::assert_matches!(result.outcomes().as_slice(), [Recorded::Failed(_)]);
        assert_eq!(h.coordinator.handle(&id).wait().unwrap(), DirectiveState::Cancelled);
        assert!(h.speaker.volume_calls().is_empty());
    }

    #[test]
    fn test_unknown_name_and_namespace_are_parse_failures() {
        let h = harness();
        let (unknown_name, _) = info("SetBass", json!({ "volume": 1 }));
        let unknown_namespace =
            DirectiveInfo::new(Directive::new("Equalizer", "SetVolume", json!({ "volume": 1 })), None);

        assert_eq!(h.coordinator.pre_handle(unknown_name), DirectiveState::Failed);
        assert_eq!(h.coordinator.pre_handle(unknown_namespace), DirectiveState::Failed);
        assert_eq!(h.exceptions.reports().len(), 2);
    }

    #[test]
    fn test_engine_failure_reports_internal_error() {
        let h = harness();
        h.speaker.reject_mute(true);
        let (info, result) = info("SetMute", json!({ "mute": true }));
        let id = info.message_id().to_string();

        h.coordinator.pre_handle(info);
        assert_eq!(h.coordinator.handle(&id).wait().unwrap(), DirectiveState::Failed);

        assert_eq!(h.exceptions.reports()[0].1, ExceptionErrorType::InternalError);
        assert_matches::assert_matches!(result.outcomes().as_slice(), [Recorded::Failed(_)]);
        assert_eq!(h.coordinator.pending_count(), 0);
    }

    #[test]
    fn test_cancel_before_worker_reaches_directive() {
        let h = harness();
        let (info, result) = info("SetVolume", json!({ "volume": 90 }));
        let id = info.message_id().to_string();
        h.coordinator.pre_handle(info);

        let gate = block_worker(&h.executor);
        let handled = h.coordinator.handle(&id);
        assert!(h.coordinator.cancel(&id));
        assert!(!h.coordinator.cancel(&id));
        gate.send(()).unwrap();

        assert_eq!(handled.wait().unwrap(), DirectiveState::Cancelled);
        assert!(h.speaker.volume_calls().is_empty());
        assert!(h.sender.events().is_empty());
        assert!(result.outcomes().is_empty());
        assert_eq!(h.coordinator.pending_count(), 0);
    }

    #[test]
    fn test_cancel_unknown_directive_is_noop() {
        let h = harness();
        assert!(!h.coordinator.cancel("missing"));
    }

    #[test]
    fn test_handle_immediately_runs_without_result_sink() {
        let h = harness();

        let state = h
            .coordinator
            .handle_immediately(Directive::new(SPEAKER_NAMESPACE, "AdjustVolume", json!({ "volume": -5 })))
            .wait()
            .unwrap();

        assert_eq!(state, DirectiveState::Completed);
        assert_eq!(h.speaker.current().volume, 15);
        assert_eq!(h.coordinator.pending_count(), 0);
    }

    #[test]
    fn test_duplicate_message_id_is_rejected() {
        let h = harness();
        let (first, _) = info("SetMute", json!({ "mute": true }));
        let duplicate = first.clone();

        assert_eq!(h.coordinator.pre_handle(first), DirectiveState::PreHandled);
        assert_eq!(h.coordinator.pre_handle(duplicate), DirectiveState::Failed);
        assert_eq!(h.coordinator.pending_count(), 1);
    }

    #[test]
    fn test_clear_fails_pending_results() {
        let h = harness();
        let (info, result) = info("SetMute", json!({ "mute": true }));
        h.coordinator.pre_handle(info);

        h.coordinator.clear();

        assert_eq!(h.coordinator.pending_count(), 0);
        assert_eq!(result.outcomes(), vec![Recorded::Failed("speaker manager shut down".to_string())]);
    }

    #[test]
    fn test_clear_leaves_handling_directive_to_worker() {
        let h = harness();
        let (info, result) = info("SetVolume", json!({ "volume": 70 }));
        let id = info.message_id().to_string();
        h.coordinator.pre_handle(info);

        let (entered, release) = h.speaker.hold_next_volume();
        let handled = h.coordinator.handle(&id);
        entered.recv().unwrap();

        h.coordinator.clear();
        assert_eq!(h.coordinator.state(&id), Some(DirectiveState::Handling));
        assert!(result.outcomes().is_empty());

        release.send(()).unwrap();
        assert_eq!(handled.wait().unwrap(), DirectiveState::Completed);
        assert_eq!(result.outcomes(), vec![Recorded::Completed]);
        assert_eq!(h.speaker.current().volume, 70);
        assert_eq!(h.coordinator.pending_count(), 0);
    }

    #[test]
    fn test_panicking_speaker_fails_directive() {
        let h = harness();
        h.speaker.panic_on_volume(true);
        let (info, result) = info("SetVolume", json!({ "volume": 70 }));
        let id = info.message_id().to_string();
        h.coordinator.pre_handle(info);

        assert_eq!(h.coordinator.handle(&id).wait().unwrap(), DirectiveState::Failed);
        assert_eq!(h.coordinator.pending_count(), 0);
        assert_matches::assert_matches!(result.outcomes().as_slice(), [Recorded::Failed(_)]);
        assert_eq!(h.exceptions.reports()[0].1, ExceptionErrorType::InternalError);

        h.speaker.panic_on_volume(false);
        let state = h
            .coordinator
            .handle_immediately(Directive::new(SPEAKER_NAMESPACE, "SetVolume", json!({ "volume": 40 })))
            .wait()
            .unwrap();
        assert_eq!(state, DirectiveState::Completed);
        assert_eq!(h.speaker.current().volume, 40);
    }
}
