//! In-memory [`LocalStore`].

use std::{collections::BTreeMap, sync::Arc};

use parking_lot::RwLock;

use super::LocalStore;
use crate::error::StorageResult;

/// A [`LocalStore`] kept in a [`BTreeMap`]; keys enumerate in sorted order.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocalStore {
    items: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryLocalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.items.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.items.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.items.write().clear();
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.items.read().len())
    }

    fn key(&self, index: usize) -> StorageResult<Option<String>> {
        Ok(self.items.read().keys().nth(index).cloned())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.items.read().keys().cloned().collect())
    }
}
