//! Read coalescing.
//!
//! Every `get`/`batch_get` lands in a shared pending window. The first read
//! of a window arms a flush according to the configured [`FlushMode`]; when
//! the flush runs it swaps the window out, issues exactly one
//! [`multi_get`](StorageBackend::multi_get) for the union of requested keys
//! (deduplicated, first-seen order) and hands each caller the values for its
//! own keys, in its own order.
//!
//! Reads enqueued while a flush is in flight start a new window.
//!
//! If the backend read fails, every request in the window receives a clone
//! of the same error.
//!
//! # Multi-threaded runtimes
//!
//! On a current-thread runtime a [`FlushMode::Tick`] window covers every read
//! issued before the caller yields. On a multi-threaded runtime the flush task
//! may be picked up by another worker immediately, so windows can be smaller.
//! Results are the same either way; only the number of round trips differs.

use std::{
    collections::{HashMap, HashSet},
    mem,
    sync::Arc,
};

use fail::fail_point;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{Span, debug, trace};

use crate::{
    backend::StorageBackend,
    config::FlushMode,
    error::{StorageError, StorageResult},
    metrics::Metrics,
    runtime::{self, Spawner},
    types::KeyEntry,
};

/// Receives the outcome of one enqueued read.
pub(crate) type PendingReply = oneshot::Receiver<StorageResult<Vec<KeyEntry>>>;

/// One caller's read, waiting for the next flush.
struct PendingGet {
    keys: Vec<String>,
    reply: oneshot::Sender<StorageResult<Vec<KeyEntry>>>,
}

#[derive(Default)]
struct Window {
    requests: Vec<PendingGet>,
    /// Deduplicated union of requested keys, in first-seen order.
    keys: Vec<String>,
    seen: HashSet<String>,
    /// A flush task has been scheduled for this window.
    armed: bool,
}

struct Inner<B> {
    backend: Arc<B>,
    mode: FlushMode,
    window: Mutex<Window>,
    metrics: Arc<Metrics>,
}

/// Coalesces reads into shared backend round trips.
pub(crate) struct GetBatcher<B> {
    inner: Arc<Inner<B>>,
}

impl<B> Clone for GetBatcher<B> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<B: StorageBackend + 'static> GetBatcher<B> {
    pub(crate) fn new(backend: Arc<B>, mode: FlushMode, metrics: Arc<Metrics>) -> Self {
        Self { inner: Arc::new(Inner { backend, mode, window: Mutex::default(), metrics }) }
    }

    /// Adds a read to the current window and arms a flush if needed.
    ///
    /// The read is registered before this returns, so reads enqueued back to
    /// back share a window even if their replies are awaited later.
    ///
    /// # Errors
    ///
    /// [`StorageError::Internal`] if a flush has to be scheduled on a native
    /// target and there is no Tokio runtime to schedule it on.
    pub(crate) fn enqueue(&self, keys: Vec<String>) -> StorageResult<PendingReply> {
        let spawner = match self.inner.mode {
            FlushMode::Manual => None,
            FlushMode::Tick | FlushMode::Delay { .. } => Some(Spawner::current()?),
        };

        let (tx, rx) = oneshot::channel();
        let schedule = {
            let mut window = self.inner.window.lock();
            for key in &keys {
                if window.seen.insert(key.clone()) {
                    window.keys.push(key.clone());
                }
            }
            trace!(keys = keys.len(), pending = window.requests.len() + 1, "read enqueued");
            window.requests.push(PendingGet { keys, reply: tx });
            !mem::replace(&mut window.armed, true)
        };

        if schedule && let Some(spawner) = spawner {
            self.schedule(&spawner);
        }
        Ok(rx)
    }

    fn schedule(&self, spawner: &Spawner) {
        let batcher = self.clone();
        match self.inner.mode {
            FlushMode::Tick => spawner.spawn(async move {
                runtime::tick().await;
                batcher.flush().await;
            }),
            FlushMode::Delay { after } => spawner.spawn(async move {
                runtime::sleep(after).await;
                batcher.flush().await;
            }),
            FlushMode::Manual => {},
        }
    }

    /// Flushes the current window, returning how many reads it served.
    #[tracing::instrument(name = "flush_gets", skip(self), fields(requests, keys))]
    pub(crate) async fn flush(&self) -> usize {
        let window = mem::take(&mut *self.inner.window.lock());
        if window.requests.is_empty() {
            return 0;
        }

        let span = Span::current();
        span.record("requests", window.requests.len());
        span.record("keys", window.keys.len());
        debug!(requests = window.requests.len(), keys = window.keys.len(), "flushing coalesced reads");

        self.inner.metrics.record_flush(window.keys.len());
        let served = window.requests.len();

        match read_batch(self.inner.backend.as_ref(), &window.keys).await {
            Ok(entries) => {
                let found: HashMap<String, Option<String>> = entries.into_iter().collect();
                for PendingGet { keys, reply } in window.requests {
                    let values = keys
                        .into_iter()
                        .map(|key| {
                            let value = found.get(&key).cloned().flatten();
                            (key, value)
                        })
                        .collect();
                    // A receiver that was dropped just discards its reply.
                    let _ = reply.send(Ok(values));
                }
            },
            Err(err) => {
                self.inner.metrics.record_error();
                for PendingGet { reply, .. } in window.requests {
                    let _ = reply.send(Err(err.clone()));
                }
            },
        }
        served
    }

    /// Number of reads waiting for a flush.
    pub(crate) fn pending(&self) -> usize {
        self.inner.window.lock().requests.len()
    }
}

async fn read_batch<B: StorageBackend + ?Sized>(
    backend: &B,
    keys: &[String],
) -> StorageResult<Vec<KeyEntry>> {
    fail_point!("get-batch-read", |_| {
        Err(StorageError::internal("injected failure in coalesced read"))
    });
    backend.multi_get(keys).await
}
