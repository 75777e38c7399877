//! Signal handling for graceful shutdown.

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::info;

/// Set up signal handlers for graceful shutdown.
///
/// Returns a receiver that will receive a message when a shutdown
/// signal (SIGTERM, SIGINT) is received.
pub fn setup_signal_handlers() -> Result<mpsc::Receiver<()>> {
    let (tx, rx) = mpsc::channel(1);

    let mut terminate = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let tx_term = tx.clone();
    tokio::spawn(async move {
        if terminate.recv().await.is_some() {
            info!("Received SIGTERM");
            let _ = tx_term.send(()).await;
        }
    });

    // Ctrl+C
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT");
            let _ = tx.send(()).await;
        }
    });

    Ok(rx)
}
