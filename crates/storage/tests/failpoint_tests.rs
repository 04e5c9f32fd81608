#![cfg(not(target_arch = "wasm32"))]
#![allow(clippy::expect_used, clippy::panic, clippy::unwrap_used)]
//! Integration tests for fail-point injection.
//!
//! These tests require the `failpoints` feature:
//! ```bash
//! cargo test -p async-kv-storage --features failpoints --test failpoint_tests
//! ```
//!
//! Fail points are process-global, so each test holds a `FailScenario`
//! for its whole body; the scenario lock serializes them.

use async_kv_storage::{
    AsyncStorage, FlushMode, LocalBackend, MemoryLocalStore, StorageConfig, StorageError,
};

fn storage(mode: FlushMode) -> AsyncStorage<LocalBackend> {
    let config = StorageConfig::builder().flush_mode(mode).build().expect("valid config");
    AsyncStorage::with_config(LocalBackend::new(MemoryLocalStore::new()), config)
        .expect("valid config")
}

#[tokio::test]
async fn batch_read_failpoint_rejects_whole_window() {
    let scenario = fail::FailScenario::setup();
    fail::cfg("get-batch-read", "return").expect("failed to configure fail point");

    let storage = storage(FlushMode::Manual);
    let first = storage.get("a");
    let second = storage.batch_get(["b", "c"]);
    assert_eq!(storage.flush().await, 2);

    let first = first.await.expect_err("first read should fail");
    let second = second.await.expect_err("second read should fail");
    assert!(matches!(first, StorageError::Internal { .. }), "got {first:?}");
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(storage.metrics().errors, 3);

    scenario.teardown();
}

#[tokio::test]
async fn batch_read_without_failpoint_succeeds() {
    let scenario = fail::FailScenario::setup();
    // No fail point configured, so reads go through normally

    let storage = storage(FlushMode::Tick);
    storage.set("a", "1").await.expect("set");
    assert_eq!(storage.get("a").await.expect("get").as_deref(), Some("1"));

    scenario.teardown();
}

#[tokio::test]
async fn failpoint_removal_restores_reads() {
    let scenario = fail::FailScenario::setup();
    fail::cfg("get-batch-read", "1*return").expect("failed to configure fail point");

    let storage = storage(FlushMode::Tick);
    assert!(storage.get("a").await.is_err(), "first window should hit the fail point");
    assert_eq!(storage.get("a").await.expect("second window should succeed"), None);

    scenario.teardown();
}

#[tokio::test]
async fn writes_are_unaffected_by_read_failpoint() {
    let scenario = fail::FailScenario::setup();
    fail::cfg("get-batch-read", "return").expect("failed to configure fail point");

    let storage = storage(FlushMode::Tick);
    storage.set("a", "1").await.expect("writes bypass the read path");
    assert_eq!(storage.list_keys().await.expect("list_keys"), vec!["a"]);

    scenario.teardown();
}
