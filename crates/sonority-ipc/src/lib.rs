//! Sonority IPC - Unix socket protocol and client library.
//!
//! Requests, responses, and events are JSON objects, one per line. The daemon
//! uses this transport to receive directives and local control requests and
//! to publish outbound events.

pub mod client;
pub mod error;
pub mod events;
pub mod messages;
pub mod server;

pub use client::IpcClient;
pub use error::{IpcError, IpcResult};
pub use events::{Event, EventType, ExceptionData, SettingsChangedData};
pub use messages::{ErrorInfo, Method, Request, Response};
pub use server::{IncomingRequest, IpcServer};

use std::path::PathBuf;

use directories::BaseDirs;

const SOCKET_FILE: &str = "sonority/daemon.sock";

/// Get the default socket path.
///
/// Uses `$XDG_RUNTIME_DIR/sonority/daemon.sock`, falling back to the
/// system temporary directory when no runtime directory is available.
#[must_use]
pub fn socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(SOCKET_FILE);
    }
    BaseDirs::new()
        .and_then(|dirs| dirs.runtime_dir().map(|d| d.join(SOCKET_FILE)))
        .unwrap_or_else(|| std::env::temp_dir().join(SOCKET_FILE))
}
