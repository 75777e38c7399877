//! Single-worker serialized task queue.
//!
//! All reads and writes of speaker state run as jobs on one dedicated thread,
//! first submitted first run. Callers get a [`Deferred`] handle back and are
//! never blocked by the worker.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;
use sonority_core::{Error, Result};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

enum Envelope<S> {
    Run(Job<S>),
    Stop(Job<S>),
}

/// Owns a state value on a worker thread and runs submitted jobs against it.
pub struct SerializedExecutor<S> {
    tx: Mutex<Option<mpsc::Sender<Envelope<S>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    accepting: Arc<AtomicBool>,
}

impl<S: Send + 'static> SerializedExecutor<S> {
    /// Move `state` onto a new named worker thread.
    ///
    /// # Errors
    /// Returns [`Error::Worker`] if the thread cannot be spawned.
    pub fn spawn(state: S, thread_name: &str) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let accepting = Arc::new(AtomicBool::new(true));
        let worker_accepting = Arc::clone(&accepting);

        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || run_worker(state, &rx, &worker_accepting))?;

        info!(thread = thread_name, "Executor started");
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            worker_id: handle.thread().id(),
            worker: Mutex::new(Some(handle)),
            accepting,
        })
    }

    /// Queue `job` and return a handle to its result.
    ///
    /// After shutdown the handle resolves to [`Error::Shutdown`] at once.
    pub fn submit<R, F>(&self, job: F) -> Deferred<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut S) -> Result<R> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let envelope = Envelope::Run(Box::new(move |state: &mut S| {
            // The caller may have dropped its handle; the job still ran.
            let _ = result_tx.send(job(state));
        }));

        let guard = self.tx.lock();
        match guard.as_ref() {
            Some(tx) if self.accepting.load(Ordering::Acquire) => {
                if tx.send(envelope).is_err() {
                    warn!("Executor worker has exited");
                }
            }
            _ => debug!("Rejecting job submitted after shutdown"),
        }
        Deferred { rx: result_rx }
    }

    /// Whether jobs are still accepted.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Stop the worker.
    ///
    /// Queued jobs that have not started are dropped and their handles
    /// resolve to [`Error::Shutdown`]; `finish` then runs on the worker as
    /// the last job. Blocks until the worker exits unless called from the
    /// worker itself. Calling this more than once is a no-op.
    pub fn shutdown_with(&self, finish: impl FnOnce(&mut S) + Send + 'static) {
        let Some(tx) = self.tx.lock().take() else {
            return;
        };
        self.accepting.store(false, Ordering::Release);
        if tx.send(Envelope::Stop(Box::new(finish))).is_err() {
            warn!("Executor worker exited before shutdown");
        }
        drop(tx);

        if thread::current().id() == self.worker_id {
            debug!("Shutdown requested from worker, not joining");
            return;
        }
        if let Some(handle) = self.worker.lock().take()
            && handle.join().is_err()
        {
            error!("Executor worker panicked");
        }
        info!("Executor stopped");
    }

    /// Stop the worker without a final job.
    pub fn shutdown(&self) {
        self.shutdown_with(|_| {});
    }
}

impl<S> Drop for SerializedExecutor<S> {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop; nothing new can arrive.
        self.accepting.store(false, Ordering::Release);
        self.tx.get_mut().take();
        if thread::current().id() != self.worker_id
            && let Some(handle) = self.worker.get_mut().take()
        {
            let _ = handle.join();
        }
    }
}

fn run_worker<S>(mut state: S, rx: &mpsc::Receiver<Envelope<S>>, accepting: &AtomicBool) {
    debug!("Executor worker running");
    while let Ok(envelope) = rx.recv() {
        match envelope {
            Envelope::Run(job) => {
                if !accepting.load(Ordering::Acquire) {
                    // Dropping the job drops its result sender.
                    continue;
                }
                if catch_unwind(AssertUnwindSafe(|| job(&mut state))).is_err() {
                    error!("Executor job panicked");
                }
            }
            Envelope::Stop(finish) => {
                if catch_unwind(AssertUnwindSafe(|| finish(&mut state))).is_err() {
                    error!("Executor shutdown job panicked");
                }
                break;
            }
        }
    }
    debug!("Executor worker exiting");
}

/// Handle to the result of a queued operation.
///
/// Await it from async code or call [`Deferred::wait`] from a plain thread.
#[must_use = "a deferred result does nothing unless awaited or waited on"]
#[derive(Debug)]
pub struct Deferred<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Deferred<T> {
    /// A handle that is already resolved.
    pub fn resolved(result: Result<T>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }

    /// Block the current thread until the operation finishes.
    ///
    /// Must not be called from within an async runtime.
    ///
    /// # Errors
    /// Returns the operation's error, or [`Error::Shutdown`] if the operation
    /// was dropped before it ran.
    pub fn wait(self) -> Result<T> {
        self.rx.blocking_recv().unwrap_or_else(|_| Err(Error::Shutdown))
    }
}

impl<T> Future for Deferred<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| received.unwrap_or_else(|_| Err(Error::Shutdown)))
    }
}
