//! Conformance suite for every bundled backend.
//!
//! The native in-memory module gets one test per conformance check for
//! fine-grained failure reporting; the other backends run the whole suite
//! through `run_all`.

#![cfg(not(target_arch = "wasm32"))]
#![allow(clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use async_kv_storage::{
    Backend, JsonFileStore, LocalBackend, MemoryLocalStore, MemoryNativeModule, NativeBackend,
    conformance,
};

fn native() -> NativeBackend {
    NativeBackend::new(MemoryNativeModule::new())
}

// ============================================================================
// CRUD (7 tests)
// ============================================================================

#[tokio::test]
async fn crud_get_missing_key_yields_none() {
    conformance::crud_get_missing_key_yields_none(&native()).await;
}

#[tokio::test]
async fn crud_set_then_get_returns_value() {
    conformance::crud_set_then_get_returns_value(&native()).await;
}

#[tokio::test]
async fn crud_set_overwrites_existing() {
    conformance::crud_set_overwrites_existing(&native()).await;
}

#[tokio::test]
async fn crud_multi_set_stores_every_pair() {
    conformance::crud_multi_set_stores_every_pair(&native()).await;
}

#[tokio::test]
async fn crud_remove_missing_is_noop() {
    conformance::crud_remove_missing_is_noop(&native()).await;
}

#[tokio::test]
async fn crud_remove_removes_listed_keys() {
    conformance::crud_remove_removes_listed_keys(&native()).await;
}

#[tokio::test]
async fn crud_large_value_roundtrip() {
    conformance::crud_large_value_roundtrip(&native()).await;
}

// ============================================================================
// Keys (3 tests)
// ============================================================================

#[tokio::test]
async fn keys_lists_every_stored_key() {
    conformance::keys_lists_every_stored_key(&native()).await;
}

#[tokio::test]
async fn keys_clear_empties_store() {
    conformance::keys_clear_empties_store(&native()).await;
}

#[tokio::test]
async fn keys_clear_empty_store_is_noop() {
    conformance::keys_clear_empty_store_is_noop(&native()).await;
}

// ============================================================================
// Merge (3 tests)
// ============================================================================

#[tokio::test]
async fn merge_accumulates_nested_fields() {
    conformance::merge_accumulates_nested_fields(&native()).await;
}

#[tokio::test]
async fn merge_patch_wins_on_leaves() {
    conformance::merge_patch_wins_on_leaves(&native()).await;
}

#[tokio::test]
async fn merge_unsupported_is_capability_error() {
    let backend = NativeBackend::new(MemoryNativeModule::new().without_merge());
    conformance::merge_unsupported_is_capability_error(&backend).await;
}

// ============================================================================
// Concurrent (2 tests)
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sets_to_different_keys() {
    conformance::concurrent_sets_to_different_keys(Arc::new(native())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reads_return_consistent_value() {
    conformance::concurrent_reads_return_consistent_value(Arc::new(native())).await;
}

// ============================================================================
// Facade (2 tests)
// ============================================================================

#[tokio::test]
async fn facade_coalesced_reads_project_per_caller() {
    conformance::facade_coalesced_reads_project_per_caller(Arc::new(native())).await;
}

#[tokio::test]
async fn facade_remove_then_get_yields_none() {
    conformance::facade_remove_then_get_yields_none(Arc::new(native())).await;
}

// ============================================================================
// Full suite per backend
// ============================================================================

#[tokio::test]
async fn native_memory_module_passes_suite() {
    conformance::run_all(Arc::new(native())).await;
}

#[tokio::test]
async fn native_module_without_merge_passes_suite() {
    let backend = NativeBackend::new(MemoryNativeModule::new().without_merge());
    conformance::run_all(Arc::new(backend)).await;
}

#[tokio::test]
async fn local_memory_store_passes_suite() {
    conformance::run_all(Arc::new(LocalBackend::new(MemoryLocalStore::new()))).await;
}

#[tokio::test]
async fn json_file_store_passes_suite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::open(dir.path().join("store.json")).expect("open store");
    conformance::run_all(Arc::new(LocalBackend::new(store))).await;
}

#[tokio::test]
async fn backend_enum_passes_suite() {
    conformance::run_all(Arc::new(Backend::memory())).await;
    conformance::run_all(Arc::new(Backend::Native(native()))).await;
}
