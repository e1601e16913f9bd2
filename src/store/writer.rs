//! Per-key debounced writer.
//!
//! Each storage key gets a dedicated thread that owns the key's pending
//! payload and its debounce deadline. Every `Schedule` replaces the payload
//! and restarts the window; the payload is written once the window elapses
//! without further messages, on `Flush`, or on shutdown.
//!
//! A writer is idle once its last payload reached the backend. Idle writers
//! can be shut down and respawned on the next schedule without losing data.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::backend::KeyValueBackend;

pub(crate) enum WriterMessage {
    /// Replace the pending payload and restart the debounce window.
    Schedule(String),
    /// Write now and acknowledge once the attempt is over.
    Flush(Sender<()>),
    Shutdown,
}

pub(crate) struct DebouncedWriter {
    tx: Sender<WriterMessage>,
    idle: Arc<AtomicBool>,
    handle: Option<JoinHandle<bool>>,
}

impl DebouncedWriter {
    pub(crate) fn spawn(
        thread_name: String,
        key: String,
        backend: Arc<dyn KeyValueBackend>,
        debounce: Duration,
    ) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let idle = Arc::new(AtomicBool::new(false));
        let thread_idle = Arc::clone(&idle);
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || writer_loop(key, backend, debounce, rx, thread_idle))?;
        Ok(Self {
            tx,
            idle,
            handle: Some(handle),
        })
    }

    pub(crate) fn schedule(&self, payload: String) -> bool {
        self.idle.store(false, Ordering::Release);
        self.tx.send(WriterMessage::Schedule(payload)).is_ok()
    }

    pub(crate) fn sender(&self) -> Sender<WriterMessage> {
        self.tx.clone()
    }

    /// True when nothing is waiting to be written.
    pub(crate) fn is_idle(&self) -> bool {
        self.idle.load(Ordering::Acquire)
    }

    /// Write whatever is pending, stop the thread and report whether the
    /// backend holds the last payload.
    pub(crate) fn shutdown(mut self) -> bool {
        self.stop()
    }

    fn stop(&mut self) -> bool {
        let _ = self.tx.send(WriterMessage::Shutdown);
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(clean) => clean,
                Err(_) => {
                    log::error!("Writer thread panicked during shutdown");
                    false
                }
            },
            None => true,
        }
    }
}

impl Drop for DebouncedWriter {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ask a writer to persist immediately and block until it has tried.
pub(crate) fn flush_sync(tx: &Sender<WriterMessage>) {
    let (ack_tx, ack_rx) = mpsc::channel();
    if tx.send(WriterMessage::Flush(ack_tx)).is_ok() {
        let _ = ack_rx.recv();
    }
}

fn writer_loop(
    key: String,
    backend: Arc<dyn KeyValueBackend>,
    debounce: Duration,
    rx: Receiver<WriterMessage>,
    idle: Arc<AtomicBool>,
) -> bool {
    let mut pending: Option<String> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let message = match deadline {
            Some(at) => {
                let now = Instant::now();
                if at <= now {
                    persist(&key, backend.as_ref(), &mut pending);
                    mark_idle(&idle, &pending);
                    deadline = None;
                    continue;
                }
                match rx.recv_timeout(at - now) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout) => {
                        persist(&key, backend.as_ref(), &mut pending);
                        mark_idle(&idle, &pending);
                        deadline = None;
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        persist(&key, backend.as_ref(), &mut pending);
                        break;
                    }
                }
            }
            None => match rx.recv() {
                Ok(message) => message,
                Err(_) => {
                    persist(&key, backend.as_ref(), &mut pending);
                    break;
                }
            },
        };

        match message {
            WriterMessage::Schedule(payload) => {
                pending = Some(payload);
                deadline = Some(Instant::now() + debounce);
            }
            WriterMessage::Flush(ack) => {
                persist(&key, backend.as_ref(), &mut pending);
                mark_idle(&idle, &pending);
                deadline = None;
                let _ = ack.send(());
            }
            WriterMessage::Shutdown => {
                persist(&key, backend.as_ref(), &mut pending);
                break;
            }
        }
    }

    pending.is_none()
}

/// Only called from the writer thread between messages. A `Schedule` that
/// races this store is still queued, so a reaped writer handles it before
/// `Shutdown`.
fn mark_idle(idle: &AtomicBool, pending: &Option<String>) {
    idle.store(pending.is_none(), Ordering::Release);
}

/// Write the pending payload. On failure the payload stays pending so the
/// next cycle (or an explicit flush) tries again.
fn persist(key: &str, backend: &dyn KeyValueBackend, pending: &mut Option<String>) {
    let Some(payload) = pending.take() else {
        return;
    };
    match backend.set(key, &payload) {
        Ok(()) => log::debug!("Persisted {} ({} bytes)", key, payload.len()),
        Err(e) => {
            log::warn!("Persisting {} failed, keeping in-memory state: {}", key, e);
            *pending = Some(payload);
        }
    }
}
