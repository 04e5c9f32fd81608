//! Callback delivery for storage futures.
//!
//! Some callers want a completion callback rather than (or as well as) an
//! awaited result. [`CompletionExt::on_complete`] attaches one to any storage
//! future: the callback sees the result first, then the future resolves to
//! the same value.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use async_kv_storage::{AsyncStorage, CompletionExt, LocalBackend, MemoryLocalStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let storage = AsyncStorage::new(LocalBackend::new(MemoryLocalStore::new()));
//! let seen = Arc::new(Mutex::new(None));
//!
//! let sink = Arc::clone(&seen);
//! let value = storage
//!     .get("missing")
//!     .on_complete(move |result| *sink.lock().unwrap() = Some(result.is_ok()))
//!     .await;
//!
//! assert_eq!(value.unwrap(), None);
//! assert_eq!(*seen.lock().unwrap(), Some(true));
//! # }
//! ```

use std::future::Future;

use crate::error::StorageResult;

/// Adds [`on_complete`](Self::on_complete) to storage futures.
pub trait CompletionExt<T>: Future<Output = StorageResult<T>> + Sized {
    /// Calls `callback` with the result once the future completes, then
    /// yields that same result.
    ///
    /// The callback runs exactly once, on the task that polls the future.
    fn on_complete<F>(self, callback: F) -> impl Future<Output = StorageResult<T>> + Send
    where
        Self: Send,
        T: Send,
        F: FnOnce(&StorageResult<T>) + Send,
    {
        async move {
            let result = self.await;
            callback(&result);
            result
        }
    }
}

impl<T, Fut> CompletionExt<T> for Fut where Fut: Future<Output = StorageResult<T>> {}
