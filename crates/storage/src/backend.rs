//! Storage backend trait definition.
//!
//! This module defines the [`StorageBackend`] trait, the contract every
//! backend behind [`AsyncStorage`](crate::AsyncStorage) fulfils. The
//! operations are bulk-shaped on purpose: the facade coalesces single-key
//! reads into one `multi_get`, and a native module only speaks in batches.
//!
//! # Implementing a Backend
//!
//! 1. Implement the mandatory operations
//! 2. Report optional ones through [`capabilities`](StorageBackend::capabilities)
//! 3. Map backend-specific failures to [`StorageError`]
//!
//! See [`LocalBackend`](crate::LocalBackend) for a reference implementation
//! over a synchronous store, and [`run_all`](crate::conformance::run_all) for
//! the contract tests (feature `testutil`).

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    StorageError,
    error::StorageResult,
    types::{Capabilities, KeyEntry, KeyValue},
};

/// Abstract backend for bulk key-value operations.
///
/// Backends are expected to be thread-safe (`Send + Sync`).
///
/// | Method | Description |
/// |--------|-------------|
/// | [`multi_get`](StorageBackend::multi_get) | Read several keys in one round trip |
/// | [`multi_set`](StorageBackend::multi_set) | Store several pairs |
/// | [`multi_remove`](StorageBackend::multi_remove) | Remove several keys |
/// | [`multi_merge`](StorageBackend::multi_merge) | Deep-merge JSON values (optional) |
/// | [`clear`](StorageBackend::clear) | Erase the entire store |
/// | [`get_all_keys`](StorageBackend::get_all_keys) | List every stored key |
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Reports which optional operations this backend supports.
    fn capabilities(&self) -> Capabilities;

    /// Reads the given keys.
    ///
    /// The result may omit keys or list them in any order; absent keys are
    /// either missing or paired with `None`. The facade re-projects results
    /// onto the requested key order.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn multi_get(&self, keys: &[String]) -> StorageResult<Vec<KeyEntry>>;

    /// Stores every pair, overwriting existing values.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn multi_set(&self, pairs: Vec<KeyValue>) -> StorageResult<()>;

    /// Removes every key. Missing keys are not an error.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn multi_remove(&self, keys: &[String]) -> StorageResult<()>;

    /// Deep-merges each JSON value into the JSON value stored at its key.
    ///
    /// The default implementation fails with
    /// [`StorageError::Capability`] and must be overridden by backends that
    /// report [`Capabilities::merge`].
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn multi_merge(&self, pairs: Vec<KeyValue>) -> StorageResult<()> {
        let _ = pairs;
        Err(StorageError::capability("multi_merge"))
    }

    /// Erases every key in the store, not just the caller's.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn clear(&self) -> StorageResult<()>;

    /// Lists every key in the store.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get_all_keys(&self) -> StorageResult<Vec<String>>;
}

#[async_trait]
impl<B: StorageBackend + ?Sized> StorageBackend for Arc<B> {
    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    async fn multi_get(&self, keys: &[String]) -> StorageResult<Vec<KeyEntry>> {
        (**self).multi_get(keys).await
    }

    async fn multi_set(&self, pairs: Vec<KeyValue>) -> StorageResult<()> {
        (**self).multi_set(pairs).await
    }

    async fn multi_remove(&self, keys: &[String]) -> StorageResult<()> {
        (**self).multi_remove(keys).await
    }

    async fn multi_merge(&self, pairs: Vec<KeyValue>) -> StorageResult<()> {
        (**self).multi_merge(pairs).await
    }

    async fn clear(&self) -> StorageResult<()> {
        (**self).clear().await
    }

    async fn get_all_keys(&self) -> StorageResult<Vec<String>> {
        (**self).get_all_keys().await
    }
}
