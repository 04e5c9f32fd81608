//! Local (synchronous) storage backend.
//!
//! [`LocalStore`] is the shape of a browser-style `localStorage`: one key at
//! a time, synchronous, strings only. [`LocalBackend`] lifts it into the bulk
//! async [`StorageBackend`] contract.
//!
//! Bulk operations try every item even after one fails, then report all
//! failures together as a single [`StorageError::Backend`] with one
//! [`ErrorEntry`] per failed key.

pub mod file;
pub mod memory;
#[cfg(target_arch = "wasm32")]
pub mod web;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::{
    backend::StorageBackend,
    error::{ErrorEntry, StorageError, StorageResult},
    merge::merge_json,
    types::{Capabilities, KeyEntry, KeyValue},
};

/// A synchronous string key-value store.
pub trait LocalStore: Send + Sync {
    /// Returns the value for `key`, or `None` if absent.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Removing an absent key succeeds.
    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Removes every key.
    fn clear(&self) -> StorageResult<()>;

    /// Number of stored keys.
    fn len(&self) -> StorageResult<usize>;

    /// Returns `true` if nothing is stored.
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// The key at `index` in the store's enumeration order.
    fn key(&self, index: usize) -> StorageResult<Option<String>>;

    /// Every stored key, in enumeration order.
    ///
    /// Defaults to walking [`key`](Self::key) by index. Stores that can
    /// enumerate directly should override it.
    fn keys(&self) -> StorageResult<Vec<String>> {
        let len = self.len()?;
        let mut keys = Vec::with_capacity(len);
        for index in 0..len {
            if let Some(key) = self.key(index)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    /// Stores every pair.
    ///
    /// Defaults to one [`set_item`](Self::set_item) per pair, attempting all
    /// of them and reporting a [`StorageError::Backend`] entry per failed key.
    fn set_items(&self, pairs: &[KeyValue]) -> StorageResult<()> {
        each_item("multi_set", pairs, |p| p.key.as_str(), |p| self.set_item(&p.key, &p.value))
    }

    /// Removes every listed key, with the same failure reporting as
    /// [`set_items`](Self::set_items).
    fn remove_items(&self, keys: &[String]) -> StorageResult<()> {
        each_item("multi_remove", keys, |k| k.as_str(), |k| self.remove_item(k))
    }
}

/// [`StorageBackend`] over a [`LocalStore`].
#[derive(Clone)]
pub struct LocalBackend {
    store: Arc<dyn LocalStore>,
}

impl LocalBackend {
    /// Wraps a local store.
    pub fn new(store: impl LocalStore + 'static) -> Self {
        Self { store: Arc::new(store) }
    }

    /// Wraps an already shared local store.
    #[must_use]
    pub fn from_shared(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Backend over the browser's `window.localStorage`.
    #[cfg(target_arch = "wasm32")]
    #[must_use]
    pub fn browser() -> Self {
        Self::new(web::WebLocalStore)
    }

    fn merge_one(&self, pair: &KeyValue) -> StorageResult<()> {
        let existing = self.store.get_item(&pair.key)?;
        let merged = merge_json(existing.as_deref(), &pair.value)?;
        self.store.set_item(&pair.key, &merged)
    }
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend").finish_non_exhaustive()
    }
}

/// Runs `op` for every item, collecting failures per key.
fn each_item<T>(
    operation: &'static str,
    items: impl IntoIterator<Item = T>,
    key_of: impl Fn(&T) -> &str,
    mut op: impl FnMut(&T) -> StorageResult<()>,
) -> StorageResult<()> {
    let mut errors = Vec::new();
    for item in items {
        if let Err(err) = op(&item) {
            errors.push(ErrorEntry::for_key(key_of(&item), err.to_string()));
        }
    }

    if errors.is_empty() {
        return Ok(());
    }
    warn!(operation, failed = errors.len(), "local store rejected items");
    Err(StorageError::backend(errors))
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities::full()
    }

    async fn multi_get(&self, keys: &[String]) -> StorageResult<Vec<KeyEntry>> {
        let mut entries = Vec::with_capacity(keys.len());
        let mut errors = Vec::new();
        for key in keys {
            match self.store.get_item(key) {
                Ok(value) => entries.push((key.clone(), value)),
                Err(err) => errors.push(ErrorEntry::for_key(key.as_str(), err.to_string())),
            }
        }
        if errors.is_empty() {
            Ok(entries)
        } else {
            warn!(operation = "multi_get", failed = errors.len(), "local store rejected items");
            Err(StorageError::backend(errors))
        }
    }

    async fn multi_set(&self, pairs: Vec<KeyValue>) -> StorageResult<()> {
        self.store.set_items(&pairs)
    }

    async fn multi_remove(&self, keys: &[String]) -> StorageResult<()> {
        self.store.remove_items(keys)
    }

    async fn multi_merge(&self, pairs: Vec<KeyValue>) -> StorageResult<()> {
        each_item("multi_merge", pairs, |p| p.key.as_str(), |p| self.merge_one(p))
    }

    async fn clear(&self) -> StorageResult<()> {
        self.store.clear()
    }

    async fn get_all_keys(&self) -> StorageResult<Vec<String>> {
        self.store.keys()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::{memory::MemoryLocalStore, *};

    /// Rejects writes to keys starting with `ro:`.
    struct ReadOnlyPrefix(MemoryLocalStore);

    impl LocalStore for ReadOnlyPrefix {
        fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
            self.0.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
            if key.starts_with("ro:") {
                return Err(StorageError::internal("quota exceeded"));
            }
            self.0.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> StorageResult<()> {
            self.0.remove_item(key)
        }

        fn clear(&self) -> StorageResult<()> {
            self.0.clear()
        }

        fn len(&self) -> StorageResult<usize> {
            self.0.len()
        }

        fn key(&self, index: usize) -> StorageResult<Option<String>> {
            self.0.key(index)
        }
    }

    #[tokio::test]
    async fn batch_write_reports_every_failed_key() {
        let backend = LocalBackend::new(ReadOnlyPrefix(MemoryLocalStore::new()));
        let err = backend
            .multi_set(vec![
                KeyValue::new("ro:a", "1"),
                KeyValue::new("ok", "2"),
                KeyValue::new("ro:b", "3"),
            ])
            .await
            .unwrap_err();

        let keys: Vec<_> = err.entries().iter().filter_map(|e| e.key.as_deref()).collect();
        assert_eq!(keys, vec!["ro:a", "ro:b"]);

        // Items after the first failure were still attempted.
        let got = backend.multi_get(&["ok".to_owned()]).await.unwrap();
        assert_eq!(got, vec![("ok".to_owned(), Some("2".to_owned()))]);
    }

    #[tokio::test]
    async fn merge_reads_merges_writes() {
        let backend = LocalBackend::new(MemoryLocalStore::new());
        backend.multi_set(vec![KeyValue::new("u", r#"{"a":1,"n":{"x":1}}"#)]).await.unwrap();
        backend.multi_merge(vec![KeyValue::new("u", r#"{"b":2,"n":{"y":2}}"#)]).await.unwrap();

        let got = backend.multi_get(&["u".to_owned()]).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(got[0].1.as_deref().unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"a":1,"b":2,"n":{"x":1,"y":2}}));
    }

    #[tokio::test]
    async fn merge_into_non_json_fails_for_that_key() {
        let backend = LocalBackend::new(MemoryLocalStore::new());
        backend.multi_set(vec![KeyValue::new("plain", "hello")]).await.unwrap();
        let err = backend.multi_merge(vec![KeyValue::new("plain", "{}")]).await.unwrap_err();
        assert_eq!(err.first_key(), Some("plain"));
    }

    #[test]
    fn default_keys_walk_by_index() {
        let store = ReadOnlyPrefix(MemoryLocalStore::new());
        store.set_item("b", "2").unwrap();
        store.set_item("a", "1").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn lists_keys_by_index() {
        let backend = LocalBackend::new(MemoryLocalStore::new());
        backend.multi_set(vec![KeyValue::new("b", "2"), KeyValue::new("a", "1")]).await.unwrap();
        let mut keys = backend.get_all_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
        assert!(backend.capabilities().merge);
    }
}
