//! IPC server implementation.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::json;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};

use crate::error::IpcResult;
use crate::events::{Event, EventType};
use crate::messages::{ErrorInfo, Method, Request, Response};

/// Longest accepted request line, in bytes.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// A request from a client, with the channel its response goes to.
pub type IncomingRequest = (u64, Request, mpsc::Sender<Response>);

type Clients = Arc<RwLock<HashMap<u64, ClientHandle>>>;
type LineSink = FramedWrite<OwnedWriteHalf, LinesCodec>;

/// IPC server that listens for client connections.
pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
    clients: Clients,
    next_client_id: AtomicU64,
    event_tx: broadcast::Sender<Event>,
    request_tx: mpsc::Sender<IncomingRequest>,
}

#[derive(Default)]
struct ClientHandle {
    subscriptions: HashSet<EventType>,
}

impl ClientHandle {
    fn wants(&self, event: EventType) -> bool {
        self.subscriptions.is_empty() || self.subscriptions.contains(&event)
    }
}

impl IpcServer {
    /// Create a new IPC server bound to the given socket path.
    ///
    /// # Errors
    /// Returns an error if the socket cannot be created.
    pub async fn bind(socket_path: &Path) -> IpcResult<(Self, mpsc::Receiver<IncomingRequest>)> {
        if let Some(parent) = socket_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Stale socket from a previous run
        if socket_path.exists() {
            tokio::fs::remove_file(socket_path).await?;
        }

        let listener = UnixListener::bind(socket_path)?;
        info!(?socket_path, "IPC server listening");

        let (event_tx, _) = broadcast::channel(256);
        let (request_tx, request_rx) = mpsc::channel(64);

        Ok((
            Self {
                listener,
                socket_path: socket_path.to_path_buf(),
                clients: Arc::new(RwLock::new(HashMap::new())),
                next_client_id: AtomicU64::new(1),
                event_tx,
                request_tx,
            },
            request_rx,
        ))
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
                    info!(client_id, "Client connected");

                    let clients = Arc::clone(&self.clients);
                    let event_rx = self.event_tx.subscribe();
                    let request_tx = self.request_tx.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_client(client_id, stream, clients, event_rx, request_tx).await {
                            error!(client_id, error = %e, "Client error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Accept error");
                }
            }
        }
    }

    /// Broadcast an event to all subscribed clients.
    pub fn broadcast(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    /// Get a clone of the event sender for broadcasting from other tasks.
    #[must_use]
    pub fn event_sender(&self) -> broadcast::Sender<Event> {
        self.event_tx.clone()
    }

    /// Number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            debug!(error = %e, "Socket file not removed");
        }
    }
}

async fn handle_client(
    client_id: u64,
    stream: UnixStream,
    clients: Clients,
    mut event_rx: broadcast::Receiver<Event>,
    request_tx: mpsc::Sender<IncomingRequest>,
) -> IpcResult<()> {
    let (reader, writer) = stream.into_split();
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let mut sink = FramedWrite::new(writer, LinesCodec::new());

    let (response_tx, mut response_rx) = mpsc::channel::<Response>(16);

    clients.write().await.insert(client_id, ClientHandle::default());

    let result = loop {
        tokio::select! {
            line = lines.next() => {
                match line {
                    None => {
                        debug!(client_id, "Client disconnected");
                        break Ok(());
                    }
                    Some(Ok(line)) => {
                        let Ok(request) = serde_json::from_str::<Request>(&line) else {
                            warn!(client_id, "Invalid request format");
                            continue;
                        };
                        debug!(client_id, request_id = request.id, "Received request");
                        if let Some(response) = route_request(client_id, request, &clients, &request_tx, &response_tx).await
                            && let Err(e) = send_line(&mut sink, &response).await
                        {
                            break Err(e);
                        }
                    }
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        warn!(client_id, max = MAX_LINE_LENGTH, "Request line too long, discarded");
                    }
                    Some(Err(e)) => break Err(e.into()),
                }
            }

            Some(response) = response_rx.recv() => {
                if let Err(e) = send_line(&mut sink, &response).await {
                    break Err(e);
                }
            }

            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        let wanted = clients.read().await.get(&client_id).is_some_and(|h| h.wants(event.event));
                        if wanted && let Err(e) = send_line(&mut sink, &event).await {
                            break Err(e);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(client_id, skipped, "Client lagging, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break Ok(()),
                }
            }
        }
    };

    clients.write().await.remove(&client_id);
    info!(client_id, "Client handler exiting");
    result
}

/// Handle subscription requests in place; forward everything else.
///
/// Returns a response to write immediately, if any.
async fn route_request(
    client_id: u64,
    request: Request,
    clients: &Clients,
    request_tx: &mpsc::Sender<IncomingRequest>,
    response_tx: &mpsc::Sender<Response>,
) -> Option<Response> {
    let id = request.id;
    match request.method {
        Method::Subscribe { events } => {
            let mut clients = clients.write().await;
            let handle = clients.entry(client_id).or_default();
            handle.subscriptions.extend(events.iter().copied());
            debug!(client_id, ?events, "Client subscribed");
            Some(Response::ok(id, json!({ "subscribed": handle.subscriptions })))
        }
        Method::Unsubscribe { events } => {
            let mut clients = clients.write().await;
            let handle = clients.entry(client_id).or_default();
            handle.subscriptions.retain(|e| !events.contains(e));
            debug!(client_id, ?events, "Client unsubscribed");
            Some(Response::ok(id, json!({ "subscribed": handle.subscriptions })))
        }
        method => {
            if request_tx.send((client_id, Request { id, method }, response_tx.clone())).await.is_err() {
                warn!(client_id, request_id = id, "Request handler gone");
                return Some(Response::error(id, ErrorInfo::new(ErrorInfo::UNAVAILABLE, "daemon shutting down")));
            }
            None
        }
    }
}

async fn send_line<T: Serialize>(sink: &mut LineSink, value: &T) -> IpcResult<()> {
    sink.send(serde_json::to_string(value)?).await?;
    Ok(())
}
