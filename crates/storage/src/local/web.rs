//! Browser `window.localStorage` as a [`LocalStore`].
//!
//! `web_sys` handles are not `Send`, so nothing is cached: each call looks up
//! the storage object again. The lookup is cheap and wasm32 is
//! single-threaded anyway.

use wasm_bindgen::JsValue;
use web_sys::Storage;

use super::LocalStore;
use crate::error::{StorageError, StorageResult};

/// The browser's `localStorage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebLocalStore;

fn storage() -> StorageResult<Storage> {
    web_sys::window()
        .ok_or_else(|| StorageError::internal("no global window"))?
        .local_storage()
        .map_err(js_error)?
        .ok_or_else(|| StorageError::internal("localStorage is unavailable"))
}

fn js_error(value: JsValue) -> StorageError {
    let message = value.as_string().unwrap_or_else(|| format!("{value:?}"));
    StorageError::internal(message)
}

impl LocalStore for WebLocalStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        storage()?.get_item(key).map_err(js_error)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        storage()?.set_item(key, value).map_err(js_error)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        storage()?.remove_item(key).map_err(js_error)
    }

    fn clear(&self) -> StorageResult<()> {
        storage()?.clear().map_err(js_error)
    }

    fn len(&self) -> StorageResult<usize> {
        let len = storage()?.length().map_err(js_error)?;
        Ok(len as usize)
    }

    fn key(&self, index: usize) -> StorageResult<Option<String>> {
        let index = u32::try_from(index)
            .map_err(|_| StorageError::validation("index out of range for localStorage"))?;
        storage()?.key(index).map_err(js_error)
    }
}
