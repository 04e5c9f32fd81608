//! The storage facade.
//!
//! [`AsyncStorage`] is the API applications use. It validates arguments,
//! coalesces reads, and forwards everything else to its [`StorageBackend`].
//!
//! Every operation checks its arguments when it is *called*, not when the
//! returned future is first polled, and the returned future is
//! `Send + 'static` so it can be spawned or stored freely. Reads are enqueued
//! at call time as well, which is what lets
//! `tokio::join!(storage.get("a"), storage.get("b"))` share one round trip.

use std::{future::Future, sync::Arc};

use tracing::{Instrument, Span, debug, info_span};

use crate::{
    backend::StorageBackend,
    batcher::{GetBatcher, PendingReply},
    config::StorageConfig,
    error::{ConfigError, StorageError, StorageResult},
    metrics::{Metrics, MetricsSnapshot},
    size_limits::{validate_key, validate_pair},
    types::{Capabilities, KeyEntry, KeyValue},
};

/// Asynchronous key-value storage over a pluggable backend.
///
/// Cheaply cloneable; clones share the backend, the pending read window
/// and the metrics.
///
/// # Example
///
/// ```
/// use async_kv_storage::{AsyncStorage, LocalBackend, MemoryLocalStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> async_kv_storage::StorageResult<()> {
/// let storage = AsyncStorage::new(LocalBackend::new(MemoryLocalStore::new()));
///
/// storage.set("a", "1").await?;
/// storage.set("b", "2").await?;
///
/// let values = storage.batch_get(["a", "b", "c"]).await?;
/// assert_eq!(values[0], ("a".to_owned(), Some("1".to_owned())));
/// assert_eq!(values[2], ("c".to_owned(), None));
/// # Ok(())
/// # }
/// ```
pub struct AsyncStorage<B> {
    backend: Arc<B>,
    batcher: GetBatcher<B>,
    config: StorageConfig,
    metrics: Arc<Metrics>,
}

impl<B> Clone for AsyncStorage<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            batcher: self.batcher.clone(),
            config: self.config,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<B> std::fmt::Debug for AsyncStorage<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncStorage").field("config", &self.config).finish_non_exhaustive()
    }
}

impl<B: StorageBackend + 'static> AsyncStorage<B> {
    /// Creates a facade with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::build(backend, StorageConfig::default())
    }

    /// Creates a facade with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails
    /// [`validate`](StorageConfig::validate).
    pub fn with_config(backend: B, config: StorageConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(backend, config))
    }

    fn build(backend: B, config: StorageConfig) -> Self {
        let backend = Arc::new(backend);
        let metrics = Arc::new(Metrics::new());
        let batcher =
            GetBatcher::new(Arc::clone(&backend), config.flush_mode(), Arc::clone(&metrics));
        Self { backend, batcher, config, metrics }
    }

    /// Reads one key; `None` if it is absent.
    ///
    /// Coalesced with every other read in the current window.
    pub fn get(
        &self,
        key: impl Into<String>,
    ) -> impl Future<Output = StorageResult<Option<String>>> + Send + 'static {
        let key = key.into();
        let span = info_span!("get", key = %key);
        let pending = span.in_scope(|| -> StorageResult<_> {
            validate_key(&key, &self.config.size_limits())?;
            self.enqueue(vec![key])
        });

        self.run(span, pending.map(|rx| async move {
            let entries = receive(rx).await?;
            Ok(entries.into_iter().next().and_then(|(_, value)| value))
        }))
    }

    /// Reads several keys at once.
    ///
    /// The result lists exactly the requested keys, in the requested order,
    /// duplicates included. An empty request resolves to an empty list
    /// without touching the backend.
    pub fn batch_get<I, K>(
        &self,
        keys: I,
    ) -> impl Future<Output = StorageResult<Vec<KeyEntry>>> + Send + 'static
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        let span = info_span!("batch_get", count = keys.len());
        let pending = span.in_scope(|| -> StorageResult<_> {
            self.validate_keys(&keys)?;
            if keys.is_empty() {
                return Ok(None);
            }
            self.enqueue(keys).map(Some)
        });

        self.run(span, pending.map(|rx| async move {
            match rx {
                Some(rx) => receive(rx).await,
                None => Ok(Vec::new()),
            }
        }))
    }

    /// Stores `value` under `key`.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> impl Future<Output = StorageResult<()>> + Send + 'static {
        let pair = KeyValue::new(key, value);
        let span = info_span!("set", key = %pair.key);
        let checked = validate_pair(&pair.key, &pair.value, &self.config.size_limits());

        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        self.run(span, checked.map(|()| async move {
            metrics.record_write(1);
            backend.multi_set(vec![pair]).await
        }))
    }

    /// Removes `key`. Removing an absent key succeeds.
    pub fn remove(
        &self,
        key: impl Into<String>,
    ) -> impl Future<Output = StorageResult<()>> + Send + 'static {
        let key = key.into();
        let span = info_span!("remove", key = %key);
        let checked = validate_key(&key, &self.config.size_limits());

        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        self.run(span, checked.map(|()| async move {
            metrics.record_remove(1);
            backend.multi_remove(&[key]).await
        }))
    }

    /// Deep-merges the JSON object `value` into the JSON value stored under
    /// `key`.
    ///
    /// Fails with [`StorageError::Capability`] without contacting the
    /// backend if the backend does not support merging.
    pub fn merge(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> impl Future<Output = StorageResult<()>> + Send + 'static {
        let pair = KeyValue::new(key, value);
        let span = info_span!("merge", key = %pair.key);
        let checked = validate_pair(&pair.key, &pair.value, &self.config.size_limits())
            .and_then(|()| self.require_merge("merge"));

        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        self.run(span, checked.map(|()| async move {
            metrics.record_merge(1);
            backend.multi_merge(vec![pair]).await
        }))
    }

    /// Erases the entire store, including keys this facade never wrote.
    pub fn clear(&self) -> impl Future<Output = StorageResult<()>> + Send + 'static {
        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        self.run(info_span!("clear"), Ok(async move {
            metrics.record_clear();
            backend.clear().await
        }))
    }

    /// Lists every key in the store.
    pub fn list_keys(&self) -> impl Future<Output = StorageResult<Vec<String>>> + Send + 'static {
        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        self.run(info_span!("list_keys"), Ok(async move {
            metrics.record_key_listing();
            backend.get_all_keys().await
        }))
    }

    /// Stores every pair.
    ///
    /// Fails with [`StorageError::Validation`] for an empty list or any
    /// malformed pair, before anything is written.
    pub fn batch_set<I, P>(
        &self,
        pairs: I,
    ) -> impl Future<Output = StorageResult<()>> + Send + 'static
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyValue>,
    {
        let pairs: Vec<KeyValue> = pairs.into_iter().map(Into::into).collect();
        let span = info_span!("batch_set", count = pairs.len());
        let checked = self.validate_pairs("batch_set", &pairs);

        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        self.run(span, checked.map(|()| async move {
            metrics.record_write(pairs.len());
            backend.multi_set(pairs).await
        }))
    }

    /// Removes every key.
    ///
    /// Fails with [`StorageError::Validation`] for an empty list or any
    /// malformed key, before anything is removed.
    pub fn batch_remove<I, K>(
        &self,
        keys: I,
    ) -> impl Future<Output = StorageResult<()>> + Send + 'static
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        let span = info_span!("batch_remove", count = keys.len());
        let checked =
            non_empty("batch_remove", keys.len()).and_then(|()| self.validate_keys(&keys));

        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        self.run(span, checked.map(|()| async move {
            metrics.record_remove(keys.len());
            backend.multi_remove(&keys).await
        }))
    }

    /// Deep-merges every pair; see [`merge`](Self::merge).
    ///
    /// Fails with [`StorageError::Validation`] for an empty list or any
    /// malformed pair, and with [`StorageError::Capability`] if the backend
    /// cannot merge.
    pub fn batch_merge<I, P>(
        &self,
        pairs: I,
    ) -> impl Future<Output = StorageResult<()>> + Send + 'static
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyValue>,
    {
        let pairs: Vec<KeyValue> = pairs.into_iter().map(Into::into).collect();
        let span = info_span!("batch_merge", count = pairs.len());
        let checked = self
            .validate_pairs("batch_merge", &pairs)
            .and_then(|()| self.require_merge("batch_merge"));

        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        self.run(span, checked.map(|()| async move {
            metrics.record_merge(pairs.len());
            backend.multi_merge(pairs).await
        }))
    }

    /// Flushes the pending read window now, returning how many reads it
    /// served.
    ///
    /// This is the only way reads complete under
    /// [`FlushMode::Manual`](crate::FlushMode::Manual); in the other modes it
    /// just closes the window early.
    pub fn flush(&self) -> impl Future<Output = usize> + Send + 'static {
        let batcher = self.batcher.clone();
        async move { batcher.flush().await }
    }

    /// Number of reads waiting for the next flush.
    #[must_use]
    pub fn pending_reads(&self) -> usize {
        self.batcher.pending()
    }

    /// Optional operations the backend supports.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.backend.capabilities()
    }

    /// Current operation counters.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// The wrapped backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn enqueue(&self, keys: Vec<String>) -> StorageResult<PendingReply> {
        let count = keys.len();
        let rx = self.batcher.enqueue(keys)?;
        self.metrics.record_get_request(count);
        Ok(rx)
    }

    fn validate_keys(&self, keys: &[String]) -> StorageResult<()> {
        let limits = self.config.size_limits();
        keys.iter().try_for_each(|key| validate_key(key, &limits))
    }

    fn validate_pairs(&self, operation: &str, pairs: &[KeyValue]) -> StorageResult<()> {
        non_empty(operation, pairs.len())?;
        let limits = self.config.size_limits();
        pairs.iter().try_for_each(|p| validate_pair(&p.key, &p.value, &limits))
    }

    fn require_merge(&self, operation: &'static str) -> StorageResult<()> {
        if self.backend.capabilities().merge {
            Ok(())
        } else {
            Err(StorageError::capability(operation))
        }
    }

    /// Wraps an operation: the span, error metrics and error logging.
    ///
    /// `checked` is the outcome of the call-time checks; on failure the
    /// returned future resolves to that error without doing anything else.
    fn run<T, Fut>(
        &self,
        span: Span,
        checked: StorageResult<Fut>,
    ) -> impl Future<Output = StorageResult<T>> + Send + 'static
    where
        T: Send + 'static,
        Fut: Future<Output = StorageResult<T>> + Send + 'static,
    {
        let metrics = Arc::clone(&self.metrics);
        async move {
            let result = match checked {
                Ok(operation) => operation.await,
                Err(err) => Err(err),
            };
            if let Err(err) = &result {
                metrics.record_error();
                debug!(error = %err, "storage operation failed");
            }
            result
        }
        .instrument(span)
    }
}

fn non_empty(operation: &str, len: usize) -> StorageResult<()> {
    if len == 0 {
        return Err(StorageError::validation(format!("{operation} requires at least one entry")));
    }
    Ok(())
}

async fn receive(rx: PendingReply) -> StorageResult<Vec<KeyEntry>> {
    rx.await.map_err(|e| StorageError::internal_with_source("coalesced read was abandoned", e))?
}
