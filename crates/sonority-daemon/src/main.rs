//! Sonority Daemon - Speaker volume and mute service.
//!
//! Hosts a speaker manager over the configured software speakers, accepts
//! directives and local control requests over the IPC socket, and publishes
//! outbound events to subscribed clients.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

mod bridge;
mod config;
mod server;
mod signals;
mod speakers;

use sonority_core::{InMemoryContextStore, SpeakerEndpoint};
use sonority_ipc::{IpcServer, Method, Response, socket_path};
use sonority_manager::SpeakerManager;

use crate::bridge::EventBridge;
use crate::speakers::SoftwareSpeaker;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("sonority={}", config.daemon.log_level).parse()?)
                .add_directive("sonority_daemon=debug".parse()?)
                .add_directive("sonority_manager=debug".parse()?),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Sonority daemon");
    info!(speakers = config.speakers.len(), "Configuration loaded");

    // Start IPC server
    let socket = socket_path();
    info!(?socket, "Starting IPC server");
    let (ipc_server, mut request_rx) = IpcServer::bind(&socket).await.context("Failed to start IPC server")?;
    let bridge = Arc::new(EventBridge::new(ipc_server.event_sender()));

    let speakers: Vec<Arc<dyn SpeakerEndpoint>> = config
        .speakers
        .iter()
        .map(|s| {
            let speaker = SoftwareSpeaker::new(s);
            debug!(name = speaker.name(), speaker_type = %s.speaker_type, volume = s.volume, mute = s.mute, "Registering speaker");
            Arc::new(speaker) as Arc<dyn SpeakerEndpoint>
        })
        .collect();

    let manager = Arc::new(
        SpeakerManager::create(
            speakers,
            Arc::new(InMemoryContextStore::new()),
            bridge.clone(),
            bridge.clone(),
            config.manager.clone(),
        )
        .context("Failed to create speaker manager")?,
    );
    manager.add_observer(bridge);

    let ipc_handle = tokio::spawn(async move {
        ipc_server.run().await;
    });

    let mut shutdown_rx = signals::setup_signal_handlers()?;

    info!("Daemon running. Press Ctrl+C to exit.");

    loop {
        tokio::select! {
            Some((client_id, request, response_tx)) = request_rx.recv() => {
                debug!(client_id, request_id = request.id, "Handling IPC request");

                if matches!(request.method, Method::Shutdown) {
                    let response = Response::ok(request.id, serde_json::json!({ "success": true }));
                    let _ = response_tx.send(response).await;
                    info!("Shutdown command processed");
                    break;
                }

                // Requests wait on the manager's worker; keep the loop free.
                let manager = Arc::clone(&manager);
                tokio::spawn(async move {
                    let result = server::handle_request(&manager, request.method).await;
                    if let Err(e) = &result {
                        debug!(client_id, request_id = request.id, code = e.code, message = %e.message, "Request failed");
                    }
                    let _ = response_tx.send(Response { id: request.id, result }).await;
                });
            }

            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Shutting down...");
    let stopping = Arc::clone(&manager);
    if let Err(e) = tokio::task::spawn_blocking(move || stopping.shutdown()).await {
        error!(error = %e, "Speaker manager shutdown failed");
    }
    ipc_handle.abort();

    info!("Sonority daemon stopped");
    Ok(())
}
