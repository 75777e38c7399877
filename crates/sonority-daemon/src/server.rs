//! Request handling for the IPC server.

use std::sync::Arc;

use serde_json::{Value, json};
use sonority_core::{Error, SpeakerSettings};
use sonority_ipc::messages::{ErrorInfo, Method};
use sonority_manager::{DirectiveInfo, DirectiveState, SpeakerManager};
use tracing::{debug, info};

use crate::bridge::DirectiveOutcome;

/// Handle an IPC request and return a response value.
///
/// Subscriptions are handled by the IPC server itself; `Shutdown` is
/// acknowledged here and acted on by the main loop.
pub async fn handle_request(manager: &SpeakerManager, method: Method) -> Result<Value, ErrorInfo> {
    match method {
        Method::Directive { directive } => {
            let message_id = directive.message_id().to_string();
            debug!(message_id = %message_id, directive = %directive.namespace_and_name(), "Directive received");

            let outcome = Arc::new(DirectiveOutcome::default());
            let info = DirectiveInfo::new(directive, Some(outcome.clone()));
            if manager.pre_handle_directive(info) == DirectiveState::Failed {
                return Err(ErrorInfo::new(ErrorInfo::BAD_REQUEST, outcome.failure().unwrap_or_default()));
            }

            let state = manager.handle_directive(&message_id).await.map_err(|e| error_info(&e))?;
            directive_response(&message_id, state, outcome.failure())
        }

        Method::CancelDirective { message_id } => {
            let cancelled = manager.cancel_directive(&message_id);
            info!(message_id = %message_id, cancelled, "Directive cancel requested");
            Ok(json!({ "cancelled": cancelled }))
        }

        Method::SetVolume { speaker_type, volume, force_no_notifications } => {
            let settings = manager
                .set_volume_with(speaker_type, volume, force_no_notifications)
                .await
                .map_err(|e| error_info(&e))?;
            Ok(settings_value(settings))
        }

        Method::AdjustVolume { speaker_type, delta, force_no_notifications } => {
            let settings = manager
                .adjust_volume_with(speaker_type, delta, force_no_notifications)
                .await
                .map_err(|e| error_info(&e))?;
            Ok(settings_value(settings))
        }

        Method::SetMute { speaker_type, mute, force_no_notifications } => {
            let settings = manager
                .set_mute_with(speaker_type, mute, force_no_notifications)
                .await
                .map_err(|e| error_info(&e))?;
            Ok(settings_value(settings))
        }

        Method::GetSpeakerSettings { speaker_type } => {
            let settings = manager.get_speaker_settings(speaker_type).await.map_err(|e| error_info(&e))?;
            Ok(json!(settings))
        }

        Method::GetCapabilities => {
            let mut directives: Vec<Value> = manager
                .directive_configuration()
                .into_iter()
                .map(|(key, policy)| json!({ "namespace": key.namespace, "name": key.name, "policy": policy }))
                .collect();
            directives.sort_by_key(|d| d["name"].as_str().map(str::to_string));
            Ok(json!({
                "capabilities": manager.capability_configurations(),
                "directives": directives,
            }))
        }

        Method::Subscribe { events } | Method::Unsubscribe { events } => {
            debug!(?events, "Subscription change reached daemon");
            Ok(json!({ "success": true }))
        }

        Method::Shutdown => {
            info!("Shutdown requested via IPC");
            Ok(json!({ "success": true }))
        }
    }
}

fn directive_response(message_id: &str, state: DirectiveState, failure: Option<String>) -> Result<Value, ErrorInfo> {
    match state {
        DirectiveState::Completed => Ok(json!({ "message_id": message_id, "state": "completed" })),
        DirectiveState::Cancelled => Ok(json!({ "message_id": message_id, "state": "cancelled" })),
        _ => Err(ErrorInfo::new(ErrorInfo::INTERNAL, failure.unwrap_or_else(|| format!("directive {state:?}")))),
    }
}

fn settings_value(settings: Option<SpeakerSettings>) -> Value {
    match settings {
        Some(settings) => json!({ "applied": true, "volume": settings.volume, "mute": settings.mute }),
        None => json!({ "applied": false }),
    }
}

/// Map a manager error onto an IPC error code.
pub fn error_info(e: &Error) -> ErrorInfo {
    let code = match e {
        Error::Parse(_) | Error::InvalidConfig(_) => ErrorInfo::BAD_REQUEST,
        Error::NoSpeakers(_) => ErrorInfo::NOT_FOUND,
        Error::InconsistentGroup(_) => ErrorInfo::CONFLICT,
        Error::Shutdown => ErrorInfo::UNAVAILABLE,
        _ => ErrorInfo::INTERNAL,
    };
    ErrorInfo::new(code, e.to_string())
}
