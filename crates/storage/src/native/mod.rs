//! Native storage module adapter.
//!
//! A platform storage module speaks in batches and reports failures through a
//! separate error channel whose shape varies: a single error object, a list of
//! them, or nothing at all. [`NativeModule`] mirrors that contract and
//! [`NativeBackend`] adapts it to [`StorageBackend`], normalizing the error
//! channel with [`normalize_errors`].
//!
//! ```text
//! AsyncStorage ──▶ NativeBackend ──▶ dyn NativeModule
//!                       │                  │
//!                       └── normalize_errors ◀── NativeReply { errors, result }
//! ```

pub mod memory;
pub mod registry;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    backend::StorageBackend,
    error::{ErrorEntry, StorageError, StorageResult},
    types::{Capabilities, KeyEntry, KeyValue},
};

/// Raw error payload from a native module.
///
/// Untagged so bridged JSON decodes directly: an object becomes
/// [`One`](Self::One), an array becomes [`Many`](Self::Many), and `null`
/// decodes as `None` when wrapped in `Option`.
///
/// ```
/// use async_kv_storage::native::{NativeErrors, normalize_errors};
///
/// let raw: Option<NativeErrors> = serde_json::from_str(r#"{"message":"locked","key":"a"}"#).unwrap();
/// assert_eq!(normalize_errors(raw).map(|e| e.len()), Some(1));
///
/// let raw: Option<NativeErrors> = serde_json::from_str("null").unwrap();
/// assert!(normalize_errors(raw).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NativeErrors {
    /// A list of error objects, possibly empty.
    ///
    /// Listed first: every `ErrorEntry` field has a default, so an empty
    /// array would otherwise decode as a single blank entry.
    Many(Vec<ErrorEntry>),
    /// A single error object.
    One(ErrorEntry),
}

impl From<ErrorEntry> for NativeErrors {
    fn from(entry: ErrorEntry) -> Self {
        Self::One(entry)
    }
}

impl From<Vec<ErrorEntry>> for NativeErrors {
    fn from(entries: Vec<ErrorEntry>) -> Self {
        Self::Many(entries)
    }
}

/// Normalizes a native error payload.
///
/// Returns `None` when there is no error (absent payload or empty list),
/// otherwise a non-empty list in the order the module reported. A single
/// error object becomes a one-element list.
#[must_use]
pub fn normalize_errors(errors: Option<NativeErrors>) -> Option<Vec<ErrorEntry>> {
    match errors? {
        NativeErrors::One(entry) => Some(vec![entry]),
        NativeErrors::Many(entries) if entries.is_empty() => None,
        NativeErrors::Many(entries) => Some(entries),
    }
}

/// Completion of one native call: an error payload plus the result.
///
/// Native modules deliver both at once (`done(errors, result)`); the result
/// is meaningful only when the normalized errors are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeReply<T> {
    /// Error payload, in whatever shape the module produced.
    pub errors: Option<NativeErrors>,
    /// Operation result.
    pub result: T,
}

impl<T> NativeReply<T> {
    /// A successful reply.
    pub fn ok(result: T) -> Self {
        Self { errors: None, result }
    }

    /// A reply carrying an error payload.
    pub fn failed(errors: impl Into<NativeErrors>, result: T) -> Self {
        Self { errors: Some(errors.into()), result }
    }

    /// Converts the reply into a [`StorageResult`], normalizing errors.
    ///
    /// # Errors
    ///
    /// [`StorageError::Backend`] with the normalized entries, verbatim.
    pub fn into_result(self) -> StorageResult<T> {
        match normalize_errors(self.errors) {
            None => Ok(self.result),
            Some(errors) => Err(StorageError::backend(errors)),
        }
    }
}

impl<T: Default> NativeReply<T> {
    /// A reply carrying an error payload and a default result.
    pub fn error(errors: impl Into<NativeErrors>) -> Self {
        Self::failed(errors, T::default())
    }
}

/// The platform-provided storage module.
///
/// Implementations are opaque collaborators (an SQLite-backed module, a
/// platform key-value store, ...). `multi_merge` is an optional capability:
/// modules that implement it must also return `true` from
/// [`supports_merge`](Self::supports_merge).
#[async_trait]
pub trait NativeModule: Send + Sync {
    /// Registered module name, e.g. `"RNCAsyncStorage"`.
    fn name(&self) -> &str;

    /// Whether [`multi_merge`](Self::multi_merge) is implemented.
    fn supports_merge(&self) -> bool {
        false
    }

    /// Reads the given keys.
    async fn multi_get(&self, keys: Vec<String>) -> NativeReply<Vec<KeyEntry>>;

    /// Stores every pair.
    async fn multi_set(&self, pairs: Vec<KeyValue>) -> NativeReply<()>;

    /// Removes every key.
    async fn multi_remove(&self, keys: Vec<String>) -> NativeReply<()>;

    /// Deep-merges JSON values into stored JSON values.
    async fn multi_merge(&self, pairs: Vec<KeyValue>) -> NativeReply<()> {
        let _ = pairs;
        NativeReply::error(ErrorEntry::new(format!(
            "{} does not implement multiMerge",
            self.name()
        )))
    }

    /// Erases the store.
    async fn clear(&self) -> NativeReply<()>;

    /// Lists every key.
    async fn get_all_keys(&self) -> NativeReply<Vec<String>>;
}

/// [`StorageBackend`] over a [`NativeModule`].
///
/// Cheaply cloneable; clones share the module.
#[derive(Clone)]
pub struct NativeBackend {
    module: Arc<dyn NativeModule>,
}

impl NativeBackend {
    /// Wraps a native module.
    pub fn new(module: impl NativeModule + 'static) -> Self {
        Self { module: Arc::new(module) }
    }

    /// Wraps an already shared native module.
    #[must_use]
    pub fn from_shared(module: Arc<dyn NativeModule>) -> Self {
        Self { module }
    }

    /// Resolves the module from a registry.
    ///
    /// # Errors
    ///
    /// [`StorageError::MissingBackend`] if no registered module matches.
    pub fn from_registry(registry: &registry::ModuleRegistry) -> StorageResult<Self> {
        registry.resolve().map(Self::from_shared)
    }

    /// Name of the wrapped module.
    #[must_use]
    pub fn module_name(&self) -> &str {
        self.module.name()
    }

    fn finish<T>(&self, operation: &'static str, reply: NativeReply<T>) -> StorageResult<T> {
        reply.into_result().inspect_err(|err| {
            warn!(module = self.module.name(), operation, error = %err, "native module reported errors");
        })
    }
}

impl std::fmt::Debug for NativeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBackend").field("module", &self.module.name()).finish()
    }
}

#[async_trait]
impl StorageBackend for NativeBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities { merge: self.module.supports_merge() }
    }

    async fn multi_get(&self, keys: &[String]) -> StorageResult<Vec<KeyEntry>> {
        let reply = self.module.multi_get(keys.to_vec()).await;
        self.finish("multi_get", reply)
    }

    async fn multi_set(&self, pairs: Vec<KeyValue>) -> StorageResult<()> {
        let reply = self.module.multi_set(pairs).await;
        self.finish("multi_set", reply)
    }

    async fn multi_remove(&self, keys: &[String]) -> StorageResult<()> {
        let reply = self.module.multi_remove(keys.to_vec()).await;
        self.finish("multi_remove", reply)
    }

    async fn multi_merge(&self, pairs: Vec<KeyValue>) -> StorageResult<()> {
        if !self.module.supports_merge() {
            return Err(StorageError::capability("multi_merge"));
        }
        let reply = self.module.multi_merge(pairs).await;
        self.finish("multi_merge", reply)
    }

    async fn clear(&self) -> StorageResult<()> {
        let reply = self.module.clear().await;
        self.finish("clear", reply)
    }

    async fn get_all_keys(&self) -> StorageResult<Vec<String>> {
        let reply = self.module.get_all_keys().await;
        self.finish("get_all_keys", reply)
    }
}
