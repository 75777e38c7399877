//! IPC client implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::UnixStream;
use tokio::net::unix::OwnedWriteHalf;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, error, warn};

use crate::error::{IpcError, IpcResult};
use crate::events::Event;
use crate::messages::{Method, Request, Response};

/// How long [`IpcClient::call`] waits for a response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>>;

/// IPC client for connecting to the Sonority daemon.
pub struct IpcClient {
    writer: Arc<Mutex<FramedWrite<OwnedWriteHalf, LinesCodec>>>,
    next_id: AtomicU64,
    pending: Pending,
    event_rx: mpsc::Receiver<Event>,
}

impl IpcClient {
    /// Connect to the daemon at the given socket path.
    ///
    /// # Errors
    /// Returns an error if the connection fails.
    pub async fn connect(socket_path: &Path) -> IpcResult<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let (reader, writer) = stream.into_split();

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (event_tx, event_rx) = mpsc::channel(64);

        let reader_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            let mut lines = FramedRead::new(reader, LinesCodec::new());
            while let Some(line) = lines.next().await {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        error!(error = %e, "Read error");
                        break;
                    }
                };

                // Responses carry an id; events do not
                if let Ok(response) = serde_json::from_str::<Response>(&line) {
                    if let Some(tx) = reader_pending.lock().await.remove(&response.id) {
                        let _ = tx.send(response);
                    }
                } else if let Ok(event) = serde_json::from_str::<Event>(&line) {
                    let _ = event_tx.send(event).await;
                } else {
                    warn!("Unknown message format");
                }
            }
            debug!("Connection closed");
            // Dropping the senders fails every outstanding request.
            reader_pending.lock().await.clear();
        });

        Ok(Self {
            writer: Arc::new(Mutex::new(FramedWrite::new(writer, LinesCodec::new()))),
            next_id: AtomicU64::new(1),
            pending,
            event_rx,
        })
    }

    /// Connect to the daemon at the default socket path.
    ///
    /// # Errors
    /// Returns an error if the connection fails.
    pub async fn connect_default() -> IpcResult<Self> {
        Self::connect(&crate::socket_path()).await
    }

    /// Send a request and wait for a response.
    ///
    /// # Errors
    /// Returns an error if the request cannot be written or the connection
    /// closes before a response arrives.
    pub async fn request(&self, method: Method) -> IpcResult<Response> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = Request { id, method };

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let json = serde_json::to_string(&request)?;
        self.writer.lock().await.send(json).await?;

        rx.await.map_err(|_| IpcError::ConnectionClosed)
    }

    /// Send a request and return its successful result.
    ///
    /// # Errors
    /// Returns [`IpcError::Server`] if the daemon answered with an error, or
    /// [`IpcError::Timeout`] if no answer arrived within [`DEFAULT_TIMEOUT`].
    pub async fn call(&self, method: Method) -> IpcResult<Value> {
        let response = tokio::time::timeout(DEFAULT_TIMEOUT, self.request(method))
            .await
            .map_err(|_| IpcError::Timeout)??;
        response.result.map_err(|e| IpcError::Server { code: e.code, message: e.message })
    }

    /// Get the event receiver for incoming events.
    pub fn events(&mut self) -> &mut mpsc::Receiver<Event> {
        &mut self.event_rx
    }
}
