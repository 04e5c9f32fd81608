//! Asynchronous key-value storage with read coalescing.
//!
//! This crate provides [`AsyncStorage`], a string key-value facade over a
//! pluggable [`StorageBackend`]. Reads issued close together are coalesced
//! into a single bulk backend read; every other operation is forwarded as a
//! bulk call.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Application                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     AsyncStorage                            │
//! │   validation │ read coalescing (GetBatcher) │ metrics       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                StorageBackend trait                         │
//! │ (multi_get, multi_set, multi_remove, multi_merge, clear, …) │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │        NativeBackend         │         LocalBackend         │
//! │  dyn NativeModule (resolved  │  dyn LocalStore (memory,     │
//! │  from a ModuleRegistry)      │  JSON file, localStorage)    │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use async_kv_storage::{AsyncStorage, LocalBackend, MemoryLocalStore};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = AsyncStorage::new(LocalBackend::new(MemoryLocalStore::new()));
//!
//!     storage.set("user:123", r#"{"name":"Alice"}"#).await?;
//!     storage.merge("user:123", r#"{"age":30}"#).await?;
//!
//!     // Both reads share one backend round trip.
//!     let (user, missing) = tokio::join!(storage.get("user:123"), storage.get("user:456"));
//!     assert!(user?.is_some());
//!     assert!(missing?.is_none());
//!     assert_eq!(storage.metrics().flushes, 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Available Backends
//!
//! | Backend | Use Case | Persistence |
//! |---------|----------|-------------|
//! | [`NativeBackend`] | Host-provided native storage module | Module-defined |
//! | [`LocalBackend`] + [`MemoryLocalStore`] | Testing, development | No |
//! | [`LocalBackend`] + [`JsonFileStore`] | Desktop tools, CLIs | Yes |
//! | [`LocalBackend`] + `WebLocalStore` | Browsers (`wasm32`) | Yes |
//!
//! [`Backend::detect`] picks between them at startup.
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`]. Argument problems are
//! reported before anything reaches the backend; backend failures keep the
//! per-key details the backend reported. Callers wanting a callback as well
//! as a future can use [`CompletionExt::on_complete`].
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` and `conformance` modules (recording backends, a
//!   failure-injecting native module, assertion macros, backend contract tests). Enable this in
//!   `[dev-dependencies]` for integration tests.
//! - **`failpoints`**: Compiles in the `get-batch-read` failpoint used by fault-injection tests.

#![deny(unsafe_code)]

pub mod backend;
pub mod backend_enum;
mod batcher;
pub mod completion;
pub mod config;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod conformance;
pub mod error;
pub mod facade;
pub mod local;
pub mod merge;
pub mod metrics;
pub mod native;
mod runtime;
pub mod size_limits;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;
pub mod types;

// Re-export primary types at crate root for convenience
pub use backend::StorageBackend;
pub use backend_enum::Backend;
pub use completion::CompletionExt;
pub use config::{FlushMode, StorageConfig};
pub use error::{BoxError, ConfigError, ErrorEntry, StorageError, StorageResult};
pub use facade::AsyncStorage;
pub use local::{LocalBackend, LocalStore, file::JsonFileStore, memory::MemoryLocalStore};
pub use metrics::{Metrics, MetricsSnapshot};
pub use native::{
    NativeBackend, NativeErrors, NativeModule, NativeReply, memory::MemoryNativeModule,
    normalize_errors, registry::ModuleRegistry,
};
pub use size_limits::{DEFAULT_MAX_KEY_SIZE, DEFAULT_MAX_VALUE_SIZE, SizeLimits};
pub use types::{Capabilities, KeyEntry, KeyValue};
