//! JSON-file-backed [`LocalStore`].
//!
//! The whole store is one JSON object on disk. It is loaded once when the
//! store is opened and kept in memory; every mutation rewrites the file by
//! writing a sibling temp file and renaming it over the original, so a crash
//! leaves either the old or the new contents, never a torn file.
//!
//! ```no_run
//! use async_kv_storage::{AsyncStorage, JsonFileStore, LocalBackend};
//!
//! # async fn run() -> async_kv_storage::StorageResult<()> {
//! let store = JsonFileStore::open("settings.json")?;
//! let storage = AsyncStorage::new(LocalBackend::new(store));
//! storage.set("theme", "dark").await?;
//! # Ok(())
//! # }
//! ```

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::LocalStore;
use crate::{
    error::{ErrorEntry, StorageError, StorageResult},
    types::KeyValue,
};

/// A [`LocalStore`] persisted as a single JSON object.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, creating an empty one if the file does
    /// not exist yet.
    ///
    /// # Errors
    ///
    /// [`StorageError::Internal`] if the file cannot be read,
    /// [`StorageError::Serialization`] if it is not a JSON object of strings.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let items = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::serialization_with_source(
                    format!("corrupt store file {}", path.display()),
                    e,
                )
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(StorageError::internal_with_source(
                    format!("failed to read {}", path.display()),
                    e,
                ));
            },
        };
        debug!(path = %path.display(), keys = items.len(), "opened json file store");
        Ok(Self { path, items: Mutex::new(items) })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `f` to the map and persists the result.
    ///
    /// The in-memory map only changes if the write succeeds.
    fn mutate(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> StorageResult<()> {
        let mut items = self.items.lock();
        let mut next = items.clone();
        f(&mut next);
        self.persist(&next)?;
        *items = next;
        Ok(())
    }

    /// Like [`mutate`](Self::mutate) for a batch: one rewrite for the whole
    /// batch, and a failed rewrite is reported against every key in it.
    fn mutate_batch<'a>(
        &self,
        operation: &'static str,
        keys: impl Iterator<Item = &'a str>,
        f: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> StorageResult<()> {
        self.mutate(f).map_err(|err| {
            let message = err.to_string();
            let errors: Vec<_> =
                keys.map(|key| ErrorEntry::for_key(key, message.as_str())).collect();
            warn!(operation, failed = errors.len(), error = %message, "json file store write failed");
            StorageError::backend(errors)
        })
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> StorageResult<()> {
        let bytes = serde_json::to_vec(items)
            .map_err(|e| StorageError::serialization_with_source("failed to encode store", e))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, bytes)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                StorageError::internal_with_source(
                    format!("failed to write {}", self.path.display()),
                    e,
                )
            })
    }
}

impl LocalStore for JsonFileStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.mutate(|items| {
            items.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        if !self.items.lock().contains_key(key) {
            return Ok(());
        }
        self.mutate(|items| {
            items.remove(key);
        })
    }

    fn clear(&self) -> StorageResult<()> {
        self.mutate(BTreeMap::clear)
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.items.lock().len())
    }

    fn key(&self, index: usize) -> StorageResult<Option<String>> {
        Ok(self.items.lock().keys().nth(index).cloned())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.items.lock().keys().cloned().collect())
    }

    fn set_items(&self, pairs: &[KeyValue]) -> StorageResult<()> {
        self.mutate_batch("multi_set", pairs.iter().map(|p| p.key.as_str()), |items| {
            for pair in pairs {
                items.insert(pair.key.clone(), pair.value.clone());
            }
        })
    }

    fn remove_items(&self, keys: &[String]) -> StorageResult<()> {
        if !keys.iter().any(|key| self.items.lock().contains_key(key)) {
            return Ok(());
        }
        self.mutate_batch("multi_remove", keys.iter().map(String::as_str), |items| {
            for key in keys {
                items.remove(key);
            }
        })
    }
}
