//! Where deferred flushes run.
//!
//! Native targets spawn onto the ambient Tokio runtime. Browsers have no
//! Tokio runtime or timer, so on `wasm32` flushes go to the JS microtask
//! queue through `wasm-bindgen-futures` and delays use `setTimeout`.

use std::{future::Future, time::Duration};

use crate::error::StorageResult;

#[cfg(not(target_arch = "wasm32"))]
pub(crate) use native::Spawner;
#[cfg(target_arch = "wasm32")]
pub(crate) use web::Spawner;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::*;
    use crate::error::StorageError;

    /// Handle to the Tokio runtime the caller is running on.
    #[derive(Clone)]
    pub(crate) struct Spawner(tokio::runtime::Handle);

    impl Spawner {
        /// # Errors
        ///
        /// [`StorageError::Internal`] outside a Tokio runtime.
        pub(crate) fn current() -> StorageResult<Self> {
            tokio::runtime::Handle::try_current().map(Self).map_err(|e| {
                StorageError::internal_with_source("coalesced reads require a Tokio runtime", e)
            })
        }

        pub(crate) fn spawn<F>(&self, task: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
            self.0.spawn(task);
        }
    }

    /// Lets every task already queued on this worker run first.
    pub(crate) async fn tick() {
        tokio::task::yield_now().await;
    }

    pub(crate) async fn sleep(after: Duration) {
        tokio::time::sleep(after).await;
    }
}

#[cfg(target_arch = "wasm32")]
mod web {
    use wasm_bindgen::JsValue;

    use super::*;

    /// The browser event loop.
    #[derive(Clone, Copy)]
    pub(crate) struct Spawner;

    impl Spawner {
        pub(crate) fn current() -> StorageResult<Self> {
            Ok(Self)
        }

        pub(crate) fn spawn<F>(&self, task: F)
        where
            F: Future<Output = ()> + 'static,
        {
            wasm_bindgen_futures::spawn_local(task);
        }
    }

    /// `spawn_local` already defers to the microtask queue, after the
    /// caller's synchronous run.
    pub(crate) async fn tick() {}

    pub(crate) async fn sleep(after: Duration) {
        let millis = i32::try_from(after.as_millis()).unwrap_or(i32::MAX);
        let timer = js_sys::Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window().is_some_and(|window| {
                window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
                    .is_ok()
            });
            // No window (e.g. a worker without timers): flush right away
            // rather than leave the window pending forever.
            if !scheduled {
                let _ = resolve.call0(&JsValue::UNDEFINED);
            }
        });
        let _ = wasm_bindgen_futures::JsFuture::from(timer).await;
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) use native::{sleep, tick};
#[cfg(target_arch = "wasm32")]
pub(crate) use web::{sleep, tick};
