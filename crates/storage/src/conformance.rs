//! Conformance test suite for [`StorageBackend`] implementations.
//!
//! This module provides async test functions that check whether a
//! [`StorageBackend`] implementation satisfies the trait contract. Native
//! module adapters, local stores and third-party backends can all run the
//! same suite.
//!
//! # Usage
//!
//! Enable the `testutil` feature and call each conformance function with
//! a fresh backend instance:
//!
//! ```no_run
//! use async_kv_storage::{LocalBackend, MemoryLocalStore, conformance};
//!
//! #[tokio::test]
//! async fn crud_get_missing_key_yields_none() {
//!     let backend = LocalBackend::new(MemoryLocalStore::new());
//!     conformance::crud_get_missing_key_yields_none(&backend).await;
//! }
//! ```
//!
//! # Test Categories
//!
//! | Category | Functions | Contract aspect |
//! |----------|-----------|-----------------|
//! | CRUD | 7 tests | Bulk get/set/remove semantics |
//! | Keys | 3 tests | `get_all_keys` and `clear` |
//! | Merge | 3 tests | Deep merge, or a `Capability` error when unsupported |
//! | Concurrent | 2 tests | Thread-safety under parallel access |
//! | Facade | 2 tests | Coalesced reads through [`AsyncStorage`] |
//!
//! Every function except the `keys_*` ones uses its own key prefix, so the
//! whole suite can share one backend.

use std::sync::Arc;

use crate::{
    AsyncStorage, assert_capability,
    backend::StorageBackend,
    testutil::{make_key, make_value},
    types::{KeyEntry, KeyValue},
};

/// Looks `key` up in a `multi_get` result, which may be in any order.
fn lookup(entries: &[KeyEntry], key: &str) -> Option<String> {
    entries.iter().find(|(k, _)| k == key).and_then(|(_, v)| v.clone())
}

fn keys(items: &[&str]) -> Vec<String> {
    items.iter().map(|k| (*k).to_owned()).collect()
}

fn parse(value: &str) -> serde_json::Value {
    serde_json::from_str(value).expect("stored value should be JSON")
}

// ============================================================================
// CRUD: bulk get/set/remove semantics (7 tests)
// ============================================================================

/// `multi_get` of an absent key yields `None`, not an error.
pub async fn crud_get_missing_key_yields_none<B: StorageBackend>(backend: &B) {
    let result = backend.multi_get(&keys(&["crud:missing"])).await;
    assert!(result.is_ok(), "multi_get should not error on missing key: {result:?}");
    assert_eq!(lookup(&result.expect("checked above"), "crud:missing"), None);
}

/// `multi_set` then `multi_get` returns the value.
pub async fn crud_set_then_get_returns_value<B: StorageBackend>(backend: &B) {
    backend.multi_set(vec![KeyValue::new("crud:k1", "v1")]).await.expect("multi_set");
    let entries = backend.multi_get(&keys(&["crud:k1"])).await.expect("multi_get");
    assert_eq!(lookup(&entries, "crud:k1").as_deref(), Some("v1"));
}

/// `multi_set` on an existing key overwrites the value.
pub async fn crud_set_overwrites_existing<B: StorageBackend>(backend: &B) {
    backend.multi_set(vec![KeyValue::new("crud:ow", "old")]).await.expect("first set");
    backend.multi_set(vec![KeyValue::new("crud:ow", "new")]).await.expect("second set");
    let entries = backend.multi_get(&keys(&["crud:ow"])).await.expect("multi_get");
    assert_eq!(lookup(&entries, "crud:ow").as_deref(), Some("new"));
}

/// One `multi_set` stores every pair; one `multi_get` reads them all back.
pub async fn crud_multi_set_stores_every_pair<B: StorageBackend>(backend: &B) {
    let pairs: Vec<KeyValue> =
        (0..10).map(|i| KeyValue::new(make_key("crud:many", i), format!("v{i}"))).collect();
    let wanted: Vec<String> = pairs.iter().map(|p| p.key.clone()).collect();
    backend.multi_set(pairs).await.expect("multi_set");

    let entries = backend.multi_get(&wanted).await.expect("multi_get");
    for (i, key) in wanted.iter().enumerate() {
        assert_eq!(lookup(&entries, key), Some(format!("v{i}")), "value for {key}");
    }
}

/// `multi_remove` of an absent key succeeds.
pub async fn crud_remove_missing_is_noop<B: StorageBackend>(backend: &B) {
    backend.multi_remove(&keys(&["crud:never-set"])).await.expect("remove missing key");
}

/// `multi_remove` removes exactly the listed keys.
pub async fn crud_remove_removes_listed_keys<B: StorageBackend>(backend: &B) {
    backend
        .multi_set(vec![
            KeyValue::new("crud:rm:a", "1"),
            KeyValue::new("crud:rm:b", "2"),
            KeyValue::new("crud:rm:c", "3"),
        ])
        .await
        .expect("multi_set");
    backend.multi_remove(&keys(&["crud:rm:a", "crud:rm:c"])).await.expect("multi_remove");

    let entries =
        backend.multi_get(&keys(&["crud:rm:a", "crud:rm:b", "crud:rm:c"])).await.expect("get");
    assert_eq!(lookup(&entries, "crud:rm:a"), None);
    assert_eq!(lookup(&entries, "crud:rm:b").as_deref(), Some("2"));
    assert_eq!(lookup(&entries, "crud:rm:c"), None);
}

/// Large values survive a round trip unchanged.
pub async fn crud_large_value_roundtrip<B: StorageBackend>(backend: &B) {
    let big = make_value(256 * 1024);
    backend.multi_set(vec![KeyValue::new("crud:big", big.clone())]).await.expect("set");
    let entries = backend.multi_get(&keys(&["crud:big"])).await.expect("get");
    assert_eq!(lookup(&entries, "crud:big").map(|v| v.len()), Some(big.len()));
}

// ============================================================================
// Keys: get_all_keys / clear (3 tests)
// ============================================================================

/// `get_all_keys` lists every stored key.
pub async fn keys_lists_every_stored_key<B: StorageBackend>(backend: &B) {
    backend.clear().await.expect("clear");
    backend
        .multi_set(vec![KeyValue::new("keys:b", "2"), KeyValue::new("keys:a", "1")])
        .await
        .expect("multi_set");

    let mut listed = backend.get_all_keys().await.expect("get_all_keys");
    listed.sort();
    assert_eq!(listed, keys(&["keys:a", "keys:b"]));
}

/// `clear` removes everything.
pub async fn keys_clear_empties_store<B: StorageBackend>(backend: &B) {
    backend.multi_set(vec![KeyValue::new("keys:clear", "v")]).await.expect("multi_set");
    backend.clear().await.expect("clear");
    assert!(backend.get_all_keys().await.expect("get_all_keys").is_empty());
    let entries = backend.multi_get(&keys(&["keys:clear"])).await.expect("get");
    assert_eq!(lookup(&entries, "keys:clear"), None);
}

/// `clear` on an empty store succeeds.
pub async fn keys_clear_empty_store_is_noop<B: StorageBackend>(backend: &B) {
    backend.clear().await.expect("first clear");
    backend.clear().await.expect("second clear");
}

// ============================================================================
// Merge: deep merge or Capability error (3 tests)
// ============================================================================

/// Merging objects accumulates fields and recurses into nested objects.
pub async fn merge_accumulates_nested_fields<B: StorageBackend>(backend: &B) {
    let first = vec![KeyValue::new("merge:u", r#"{"a":1,"n":{"x":1}}"#)];
    if !backend.capabilities().merge {
        let result = backend.multi_merge(first).await;
        assert_capability!(result);
        return;
    }

    backend.multi_merge(first).await.expect("first merge");
    backend
        .multi_merge(vec![KeyValue::new("merge:u", r#"{"b":2,"n":{"y":2}}"#)])
        .await
        .expect("second merge");

    let entries = backend.multi_get(&keys(&["merge:u"])).await.expect("get");
    let stored = lookup(&entries, "merge:u").expect("merged value should exist");
    assert_eq!(parse(&stored), serde_json::json!({"a":1,"b":2,"n":{"x":1,"y":2}}));
}

/// Patch leaves win over stored leaves; non-object values are replaced.
pub async fn merge_patch_wins_on_leaves<B: StorageBackend>(backend: &B) {
    if !backend.capabilities().merge {
        return;
    }
    backend
        .multi_set(vec![KeyValue::new("merge:leaf", r#"{"a":1,"list":[1,2]}"#)])
        .await
        .expect("set");
    backend
        .multi_merge(vec![KeyValue::new("merge:leaf", r#"{"a":{"deep":true},"list":[3]}"#)])
        .await
        .expect("merge");

    let entries = backend.multi_get(&keys(&["merge:leaf"])).await.expect("get");
    let stored = lookup(&entries, "merge:leaf").expect("value should exist");
    assert_eq!(parse(&stored), serde_json::json!({"a":{"deep":true},"list":[3]}));
}

/// A backend without merge support reports a `Capability` error.
pub async fn merge_unsupported_is_capability_error<B: StorageBackend>(backend: &B) {
    if backend.capabilities().merge {
        return;
    }
    let result = backend.multi_merge(vec![KeyValue::new("merge:no", "{}")]).await;
    assert_capability!(result);
}

// ============================================================================
// Concurrent: thread-safety under parallel access (2 tests)
// ============================================================================

/// Parallel writers to different keys all land.
pub async fn concurrent_sets_to_different_keys<B: StorageBackend + 'static>(backend: Arc<B>) {
    let mut handles = Vec::new();
    for task in 0..8 {
        let backend = Arc::clone(&backend);
        handles.push(tokio::spawn(async move {
            let pairs =
                (0..10).map(|i| KeyValue::new(make_key(&format!("conc:{task}"), i), "v")).collect();
            backend.multi_set(pairs).await.expect("concurrent multi_set");
        }));
    }
    for handle in handles {
        handle.await.expect("task panicked");
    }

    let wanted: Vec<String> =
        (0..8).flat_map(|t| (0..10).map(move |i| make_key(&format!("conc:{t}"), i))).collect();
    let entries = backend.multi_get(&wanted).await.expect("multi_get");
    for key in &wanted {
        assert_eq!(lookup(&entries, key).as_deref(), Some("v"), "missing {key}");
    }
}

/// Parallel readers of one key all see the same value.
pub async fn concurrent_reads_return_consistent_value<B: StorageBackend + 'static>(
    backend: Arc<B>,
) {
    backend.multi_set(vec![KeyValue::new("conc:shared", "same")]).await.expect("set");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let backend = Arc::clone(&backend);
        handles.push(tokio::spawn(async move {
            let entries = backend.multi_get(&keys(&["conc:shared"])).await.expect("multi_get");
            lookup(&entries, "conc:shared")
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.expect("task panicked").as_deref(), Some("same"));
    }
}

// ============================================================================
// Facade: coalesced reads through AsyncStorage (2 tests)
// ============================================================================

/// Reads issued together are answered per caller, in each caller's order,
/// whatever order the backend returns entries in.
pub async fn facade_coalesced_reads_project_per_caller<B: StorageBackend + 'static>(
    backend: Arc<B>,
) {
    let storage = AsyncStorage::new(backend);
    storage.batch_set([("facade:a", "1"), ("facade:b", "2")]).await.expect("batch_set");

    let (a, ba, missing) = tokio::join!(
        storage.get("facade:a"),
        storage.batch_get(["facade:b", "facade:missing", "facade:a", "facade:b"]),
        storage.get("facade:missing"),
    );

    assert_eq!(a.expect("get a").as_deref(), Some("1"));
    let expected: Vec<KeyEntry> = vec![
        ("facade:b".to_owned(), Some("2".to_owned())),
        ("facade:missing".to_owned(), None),
        ("facade:a".to_owned(), Some("1".to_owned())),
        ("facade:b".to_owned(), Some("2".to_owned())),
    ];
    assert_eq!(ba.expect("batch_get"), expected);
    assert_eq!(missing.expect("get missing"), None);
}

/// Removed keys read back as `None` through the facade.
pub async fn facade_remove_then_get_yields_none<B: StorageBackend + 'static>(backend: Arc<B>) {
    let storage = AsyncStorage::new(backend);
    storage.set("facade:rm", "v").await.expect("set");
    storage.remove("facade:rm").await.expect("remove");
    assert_eq!(storage.get("facade:rm").await.expect("get"), None);
}

// ============================================================================
// run_all: execute the full suite against a single backend
// ============================================================================

/// Runs every conformance test against `backend`.
///
/// # Usage
///
/// ```no_run
/// use std::sync::Arc;
/// use async_kv_storage::{LocalBackend, MemoryLocalStore, conformance};
///
/// #[tokio::test]
/// async fn local_backend_conformance() {
///     conformance::run_all(Arc::new(LocalBackend::new(MemoryLocalStore::new()))).await;
/// }
/// ```
///
/// For finer-grained failure reporting, call individual test functions
/// directly.
pub async fn run_all<B: StorageBackend + 'static>(backend: Arc<B>) {
    // CRUD
    crud_get_missing_key_yields_none(backend.as_ref()).await;
    crud_set_then_get_returns_value(backend.as_ref()).await;
    crud_set_overwrites_existing(backend.as_ref()).await;
    crud_multi_set_stores_every_pair(backend.as_ref()).await;
    crud_remove_missing_is_noop(backend.as_ref()).await;
    crud_remove_removes_listed_keys(backend.as_ref()).await;
    crud_large_value_roundtrip(backend.as_ref()).await;

    // Keys
    keys_lists_every_stored_key(backend.as_ref()).await;
    keys_clear_empties_store(backend.as_ref()).await;
    keys_clear_empty_store_is_noop(backend.as_ref()).await;

    // Merge
    merge_accumulates_nested_fields(backend.as_ref()).await;
    merge_patch_wins_on_leaves(backend.as_ref()).await;
    merge_unsupported_is_capability_error(backend.as_ref()).await;

    // Concurrent
    concurrent_sets_to_different_keys(Arc::clone(&backend)).await;
    concurrent_reads_return_consistent_value(Arc::clone(&backend)).await;

    // Facade
    facade_coalesced_reads_project_per_caller(Arc::clone(&backend)).await;
    facade_remove_then_get_yields_none(backend).await;
}
