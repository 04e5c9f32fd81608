//! Unified backend enum
//!
//! [`Backend`] wraps either backend flavour so the choice can be made at
//! startup while [`AsyncStorage`](crate::AsyncStorage) keeps a single
//! concrete type.
//!
//! # Available Backends
//!
//! | Variant | Use Case |
//! |---------|----------|
//! | [`Backend::Native`] | Hosts that register a platform storage module |
//! | [`Backend::Local`] | Browsers, files, testing |
//!
//! # Usage
//!
//! ```
//! use async_kv_storage::{AsyncStorage, Backend, MemoryNativeModule, ModuleRegistry};
//!
//! # async fn example() -> async_kv_storage::StorageResult<()> {
//! let mut registry = ModuleRegistry::new();
//! registry.register(MemoryNativeModule::new());
//!
//! let storage = AsyncStorage::new(Backend::detect(&registry)?);
//! storage.set("key", "value").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::{
    LocalBackend, MemoryLocalStore, NativeBackend, StorageBackend, StorageResult,
    native::registry::ModuleRegistry,
    types::{Capabilities, KeyEntry, KeyValue},
};

/// Runtime-selected storage backend.
#[derive(Clone, Debug)]
pub enum Backend {
    /// A platform native module.
    Native(NativeBackend),
    /// A synchronous local store.
    Local(LocalBackend),
}

impl Backend {
    /// Picks the backend for the current platform.
    ///
    /// On `wasm32` this is the browser's `localStorage`; everywhere else the
    /// native module is resolved from `registry`.
    ///
    /// # Errors
    ///
    /// [`StorageError::MissingBackend`](crate::StorageError::MissingBackend)
    /// when no native module is registered under a known name.
    pub fn detect(registry: &ModuleRegistry) -> StorageResult<Self> {
        #[cfg(target_arch = "wasm32")]
        {
            let _ = registry;
            Ok(Self::Local(LocalBackend::browser()))
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            NativeBackend::from_registry(registry).map(Self::Native)
        }
    }

    /// A local backend over a fresh in-memory store.
    #[must_use]
    pub fn memory() -> Self {
        Self::Local(LocalBackend::new(MemoryLocalStore::new()))
    }

    /// Returns true if this is a native backend
    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native(_))
    }

    /// Returns true if this is a local backend
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl From<NativeBackend> for Backend {
    fn from(backend: NativeBackend) -> Self {
        Self::Native(backend)
    }
}

impl From<LocalBackend> for Backend {
    fn from(backend: LocalBackend) -> Self {
        Self::Local(backend)
    }
}

#[async_trait]
impl StorageBackend for Backend {
    fn capabilities(&self) -> Capabilities {
        match self {
            Self::Native(b) => b.capabilities(),
            Self::Local(b) => b.capabilities(),
        }
    }

    async fn multi_get(&self, keys: &[String]) -> StorageResult<Vec<KeyEntry>> {
        match self {
            Self::Native(b) => b.multi_get(keys).await,
            Self::Local(b) => b.multi_get(keys).await,
        }
    }

    async fn multi_set(&self, pairs: Vec<KeyValue>) -> StorageResult<()> {
        match self {
            Self::Native(b) => b.multi_set(pairs).await,
            Self::Local(b) => b.multi_set(pairs).await,
        }
    }

    async fn multi_remove(&self, keys: &[String]) -> StorageResult<()> {
        match self {
            Self::Native(b) => b.multi_remove(keys).await,
            Self::Local(b) => b.multi_remove(keys).await,
        }
    }

    async fn multi_merge(&self, pairs: Vec<KeyValue>) -> StorageResult<()> {
        match self {
            Self::Native(b) => b.multi_merge(pairs).await,
            Self::Local(b) => b.multi_merge(pairs).await,
        }
    }

    async fn clear(&self) -> StorageResult<()> {
        match self {
            Self::Native(b) => b.clear().await,
            Self::Local(b) => b.clear().await,
        }
    }

    async fn get_all_keys(&self) -> StorageResult<Vec<String>> {
        match self {
            Self::Native(b) => b.get_all_keys().await,
            Self::Local(b) => b.get_all_keys().await,
        }
    }
}
