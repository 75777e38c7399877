//! IPC error types.

use thiserror::Error;

/// IPC error type.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Line framing error: {0}")]
    Codec(#[from] tokio_util::codec::LinesCodecError),

    #[error("Server error {code}: {message}")]
    Server { code: i32, message: String },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Request timeout")]
    Timeout,
}

/// Result type for IPC operations.
pub type IpcResult<T> = Result<T, IpcError>;
