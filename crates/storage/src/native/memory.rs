//! In-memory native module.
//!
//! [`MemoryNativeModule`] implements the [`NativeModule`] contract over a
//! [`BTreeMap`], including the per-key error reporting real modules use. It
//! stands in for the platform module in tests and on hosts that have none.
//!
//! # Features
//!
//! - **Thread-safe**: Uses [`parking_lot::RwLock`] for concurrent access
//! - **Ordered keys**: `get_all_keys` returns keys in lexicographic order
//! - **Optional merge**: Merge support can be switched off to model modules without it
//!
//! # Example
//!
//! ```
//! use async_kv_storage::{AsyncStorage, NativeBackend, native::memory::MemoryNativeModule};
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = AsyncStorage::new(NativeBackend::new(MemoryNativeModule::new()));
//!
//!     storage.set("greeting", "hello").await.unwrap();
//!     assert_eq!(storage.get("greeting").await.unwrap().as_deref(), Some("hello"));
//! }
//! ```
//!
//! # Limitations
//!
//! - Data is not persisted; all data is lost when the process exits

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{NativeModule, NativeReply};
use crate::{
    error::ErrorEntry,
    merge::merge_json,
    types::{KeyEntry, KeyValue},
};

/// Module name the in-memory module registers under by default.
pub const DEFAULT_NAME: &str = "RNCAsyncStorage";

/// In-memory [`NativeModule`].
///
/// # Cloning
///
/// `MemoryNativeModule` is cheaply cloneable via [`Arc`]. All clones share the
/// same underlying data, so a test can keep a handle to inspect what the
/// facade wrote.
#[derive(Clone)]
pub struct MemoryNativeModule {
    name: Arc<str>,
    data: Arc<RwLock<BTreeMap<String, String>>>,
    merge: bool,
}

impl MemoryNativeModule {
    /// Creates an empty module with merge support, named [`DEFAULT_NAME`].
    #[must_use]
    pub fn new() -> Self {
        Self { name: Arc::from(DEFAULT_NAME), data: Arc::default(), merge: true }
    }

    /// Sets the registered name.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Arc::from(name);
        self
    }

    /// Disables `multi_merge`, like modules that never implemented it.
    #[must_use]
    pub fn without_merge(mut self) -> Self {
        self.merge = false;
        self
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Reads a stored value directly, bypassing the native contract.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }
}

impl Default for MemoryNativeModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NativeModule for MemoryNativeModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_merge(&self) -> bool {
        self.merge
    }

    async fn multi_get(&self, keys: Vec<String>) -> NativeReply<Vec<KeyEntry>> {
        let data = self.data.read();
        let pairs = keys
            .into_iter()
            .map(|key| {
                let value = data.get(&key).cloned();
                (key, value)
            })
            .collect();
        NativeReply::ok(pairs)
    }

    async fn multi_set(&self, pairs: Vec<KeyValue>) -> NativeReply<()> {
        let mut data = self.data.write();
        for KeyValue { key, value } in pairs {
            data.insert(key, value);
        }
        NativeReply::ok(())
    }

    async fn multi_remove(&self, keys: Vec<String>) -> NativeReply<()> {
        let mut data = self.data.write();
        for key in &keys {
            data.remove(key);
        }
        NativeReply::ok(())
    }

    async fn multi_merge(&self, pairs: Vec<KeyValue>) -> NativeReply<()> {
        if !self.merge {
            return NativeReply::error(ErrorEntry::new(format!(
                "{} does not implement multiMerge",
                self.name
            )));
        }

        // Each pair is applied independently; failures are reported per key
        // and do not roll back pairs that merged cleanly.
        let mut errors = Vec::new();
        let mut data = self.data.write();
        for KeyValue { key, value } in pairs {
            match merge_json(data.get(&key).map(String::as_str), &value) {
                Ok(merged) => {
                    data.insert(key, merged);
                },
                Err(err) => errors.push(ErrorEntry::for_key(key, err.to_string())),
            }
        }

        if errors.is_empty() { NativeReply::ok(()) } else { NativeReply::error(errors) }
    }

    async fn clear(&self) -> NativeReply<()> {
        self.data.write().clear();
        NativeReply::ok(())
    }

    async fn get_all_keys(&self) -> NativeReply<Vec<String>> {
        NativeReply::ok(self.data.read().keys().cloned().collect())
    }
}
