//! Shared test utilities for storage testing.
//!
//! This module provides instrumented backends, a failure-injecting native
//! module, data generators and assertion macros. It is feature-gated behind
//! `testutil` to prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! async-kv-storage = { path = "../storage", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use async_kv_storage::testutil::{RecordingBackend, make_key, make_value};
//! ```

use std::{
    collections::HashSet,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    StorageBackend,
    error::{ErrorEntry, StorageError, StorageResult},
    native::{NativeModule, NativeReply, memory::MemoryNativeModule},
    types::{Capabilities, KeyEntry, KeyValue},
};

/// Create a deterministic test key from a prefix and index.
///
/// Produces keys like `"prefix:000042"`. The zero-padding keeps
/// lexicographic order equal to numeric order.
#[must_use]
pub fn make_key(prefix: &str, idx: usize) -> String {
    format!("{prefix}:{idx:06}")
}

/// Create a test value of the given size filled with `x`.
#[must_use]
pub fn make_value(size: usize) -> String {
    "x".repeat(size)
}

/// A [`StorageBackend`] wrapper that records what reached the inner backend.
///
/// Every `multi_get` key list is kept, in call order, so tests can assert
/// exactly how reads were coalesced.
pub struct RecordingBackend<B> {
    inner: B,
    get_batches: Mutex<Vec<Vec<String>>>,
    writes: AtomicUsize,
}

impl<B: StorageBackend> RecordingBackend<B> {
    /// Wraps `inner`.
    pub fn new(inner: B) -> Self {
        Self { inner, get_batches: Mutex::default(), writes: AtomicUsize::new(0) }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Key lists passed to `multi_get`, in call order.
    pub fn get_batches(&self) -> Vec<Vec<String>> {
        self.get_batches.lock().clone()
    }

    /// Number of `multi_get` calls.
    pub fn get_call_count(&self) -> usize {
        self.get_batches.lock().len()
    }

    /// Number of `multi_set`, `multi_remove`, `multi_merge` and `clear` calls.
    pub fn write_call_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl<B: StorageBackend> StorageBackend for RecordingBackend<B> {
    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    async fn multi_get(&self, keys: &[String]) -> StorageResult<Vec<KeyEntry>> {
        self.get_batches.lock().push(keys.to_vec());
        self.inner.multi_get(keys).await
    }

    async fn multi_set(&self, pairs: Vec<KeyValue>) -> StorageResult<()> {
        self.record_write();
        self.inner.multi_set(pairs).await
    }

    async fn multi_remove(&self, keys: &[String]) -> StorageResult<()> {
        self.record_write();
        self.inner.multi_remove(keys).await
    }

    async fn multi_merge(&self, pairs: Vec<KeyValue>) -> StorageResult<()> {
        self.record_write();
        self.inner.multi_merge(pairs).await
    }

    async fn clear(&self) -> StorageResult<()> {
        self.record_write();
        self.inner.clear().await
    }

    async fn get_all_keys(&self) -> StorageResult<Vec<String>> {
        self.inner.get_all_keys().await
    }
}

/// A native module that reports per-key errors for chosen keys.
///
/// Operations touching a poisoned key fail with one [`ErrorEntry`] per
/// poisoned key; operations that touch none are served by an inner
/// [`MemoryNativeModule`]. When `fail_all` is set every call fails with a
/// single keyless error instead, the way a module reports a dead database.
pub struct FailingModule {
    inner: MemoryNativeModule,
    poisoned: HashSet<String>,
    fail_all: bool,
}

impl FailingModule {
    /// Fails every operation touching one of `keys`.
    pub fn poisoning<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: MemoryNativeModule::new(),
            poisoned: keys.into_iter().map(Into::into).collect(),
            fail_all: false,
        }
    }

    /// Fails every operation.
    #[must_use]
    pub fn broken() -> Self {
        Self { inner: MemoryNativeModule::new(), poisoned: HashSet::new(), fail_all: true }
    }

    /// The module serving non-failing calls.
    pub fn inner(&self) -> &MemoryNativeModule {
        &self.inner
    }

    fn check<'a>(&self, keys: impl IntoIterator<Item = &'a String>) -> Option<Vec<ErrorEntry>> {
        if self.fail_all {
            return Some(vec![ErrorEntry::new("database is closed")]);
        }
        let errors: Vec<_> = keys
            .into_iter()
            .filter(|k| self.poisoned.contains(*k))
            .map(|k| ErrorEntry::for_key(k.as_str(), "injected failure"))
            .collect();
        (!errors.is_empty()).then_some(errors)
    }
}

#[async_trait]
impl NativeModule for FailingModule {
    fn name(&self) -> &str {
        "RNCAsyncStorage"
    }

    fn supports_merge(&self) -> bool {
        true
    }

    async fn multi_get(&self, keys: Vec<String>) -> NativeReply<Vec<KeyEntry>> {
        match self.check(&keys) {
            Some(errors) => NativeReply::error(errors),
            None => self.inner.multi_get(keys).await,
        }
    }

    async fn multi_set(&self, pairs: Vec<KeyValue>) -> NativeReply<()> {
        match self.check(pairs.iter().map(|p| &p.key)) {
            Some(errors) => NativeReply::error(errors),
            None => self.inner.multi_set(pairs).await,
        }
    }

    async fn multi_remove(&self, keys: Vec<String>) -> NativeReply<()> {
        match self.check(&keys) {
            Some(errors) => NativeReply::error(errors),
            None => self.inner.multi_remove(keys).await,
        }
    }

    async fn multi_merge(&self, pairs: Vec<KeyValue>) -> NativeReply<()> {
        match self.check(pairs.iter().map(|p| &p.key)) {
            Some(errors) => NativeReply::error(errors),
            None => self.inner.multi_merge(pairs).await,
        }
    }

    async fn clear(&self) -> NativeReply<()> {
        match self.check([]) {
            Some(errors) => NativeReply::error(errors),
            None => self.inner.clear().await,
        }
    }

    async fn get_all_keys(&self) -> NativeReply<Vec<String>> {
        match self.check([]) {
            Some(errors) => NativeReply::error(errors),
            None => self.inner.get_all_keys().await,
        }
    }
}

/// Assert that a [`StorageResult`] is a validation failure
/// ([`StorageError::Validation`] or [`StorageError::SizeLimitExceeded`]).
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use async_kv_storage::assert_validation;
/// use async_kv_storage::error::{StorageError, StorageResult};
///
/// let result: StorageResult<()> = Err(StorageError::validation("empty key"));
/// assert_validation!(result);
/// ```
#[macro_export]
macro_rules! assert_validation {
    ($result:expr) => {
        assert!(
            matches!(&$result, Err(e) if e.is_validation()),
            "expected a validation error, got: {:?}",
            $result,
        );
    };
    ($result:expr, $msg:expr) => {
        assert!(
            matches!(&$result, Err(e) if e.is_validation()),
            "{}: expected a validation error, got: {:?}",
            $msg,
            $result,
        );
    };
}

/// Assert that a [`StorageResult`] is a [`StorageError::Capability`].
#[macro_export]
macro_rules! assert_capability {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::Capability { .. })),
            "expected StorageError::Capability, got: {:?}",
            $result,
        );
    };
}

/// Assert that a [`StorageResult`] is a [`StorageError::Backend`] naming
/// exactly the given keys, in order.
#[macro_export]
macro_rules! assert_backend_keys {
    ($result:expr, [$($key:expr),* $(,)?]) => {
        match &$result {
            Err(err @ $crate::error::StorageError::Backend { .. }) => {
                let keys: Vec<&str> =
                    err.entries().iter().filter_map(|e| e.key.as_deref()).collect();
                assert_eq!(keys, vec![$($key),*], "unexpected failed keys");
            },
            other => panic!("expected StorageError::Backend, got: {other:?}"),
        }
    };
}

/// Unwrap a [`StorageResult`], panicking with the error on failure.
#[macro_export]
macro_rules! assert_storage_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got StorageError: {e:?}"),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("{}: expected Ok, got StorageError: {e:?}", $msg),
        }
    };
}

/// Helper to verify that a result is a `Capability` error.
pub fn is_capability<T>(result: &StorageResult<T>) -> bool {
    matches!(result, Err(StorageError::Capability { .. }))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::{NativeBackend, StorageBackend};

    #[test]
    fn test_make_key_ordering() {
        assert_eq!(make_key("test", 42), "test:000042");
        assert!(make_key("k", 1) < make_key("k", 10));
    }

    #[test]
    fn test_make_value_size() {
        assert_eq!(make_value(0).len(), 0);
        assert_eq!(make_value(64).len(), 64);
    }

    #[tokio::test]
    async fn test_failing_module_poisons_keys() {
        let backend = NativeBackend::new(FailingModule::poisoning(["bad"]));
        let result = backend
            .multi_set(vec![KeyValue::new("ok", "1"), KeyValue::new("bad", "2")])
            .await;
        assert_backend_keys!(result, ["bad"]);

        let result = backend.multi_set(vec![KeyValue::new("ok", "1")]).await;
        assert_storage_ok!(result);
    }

    #[tokio::test]
    async fn test_broken_module_fails_everything() {
        let backend = NativeBackend::new(FailingModule::broken());
        let result = backend.get_all_keys().await;
        assert!(matches!(&result, Err(StorageError::Backend { .. })));
    }

    #[test]
    fn test_assert_validation_macro() {
        let result: StorageResult<()> = Err(StorageError::size_limit_exceeded("key", 10, 5));
        assert_validation!(result);
    }

    #[test]
    fn test_assert_capability_macro() {
        let result: StorageResult<()> = Err(StorageError::capability("merge"));
        assert_capability!(result);
        assert!(is_capability(&result));
    }

    #[test]
    fn test_assert_storage_ok_macro() {
        let result: StorageResult<i32> = Ok(42);
        let val = assert_storage_ok!(result);
        assert_eq!(val, 42);
    }
}
