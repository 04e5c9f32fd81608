//! Failure propagation through the facade.
//!
//! Native modules report failures per key through a side channel. These tests
//! check that those details reach callers intact: on writes, on coalesced
//! reads shared by several callers, and through completion callbacks.

#![cfg(not(target_arch = "wasm32"))]
#![allow(clippy::expect_used, clippy::panic, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use async_kv_storage::{
    AsyncStorage, CompletionExt, FlushMode, KeyValue, NativeBackend, StorageConfig, StorageError,
    assert_backend_keys, assert_storage_ok, assert_validation, testutil::FailingModule,
};

fn storage(module: FailingModule) -> AsyncStorage<NativeBackend> {
    AsyncStorage::new(NativeBackend::new(module))
}

#[tokio::test]
async fn batch_set_reports_each_failed_key() {
    let storage = storage(FailingModule::poisoning(["bad:1", "bad:2"]));

    let result = storage.batch_set([("bad:1", "x"), ("ok", "y"), ("bad:2", "z")]).await;
    assert_backend_keys!(result, ["bad:1", "bad:2"]);
    assert_eq!(storage.metrics().errors, 1);
}

#[tokio::test]
async fn failed_batch_read_rejects_every_caller_in_window() {
    let storage = storage(FailingModule::poisoning(["bad"]));
    storage.set("good", "v").await.unwrap();

    let (good, bad, both) =
        tokio::join!(storage.get("good"), storage.get("bad"), storage.batch_get(["good", "bad"]));

    // One round trip failed, so everyone sharing it sees the same error.
    for result in [good.map(|_| ()), bad.map(|_| ()), both.map(|_| ())] {
        assert_backend_keys!(result, ["bad"]);
    }
    assert_eq!(storage.metrics().flushes, 1);
}

#[tokio::test]
async fn next_window_recovers_after_failed_read() {
    let storage = storage(FailingModule::poisoning(["bad"]));
    storage.set("good", "v").await.unwrap();

    let (_, _) = tokio::join!(storage.get("good"), storage.get("bad"));
    assert_eq!(storage.get("good").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn keyless_module_errors_are_preserved() {
    let storage = storage(FailingModule::broken());
    let err = storage.clear().await.unwrap_err();
    match err {
        StorageError::Backend { errors } => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].key, None);
            assert_eq!(errors[0].message, "database is closed");
        },
        other => panic!("expected Backend error, got {other:?}"),
    }
}

#[tokio::test]
async fn merge_failure_names_the_key() {
    let storage = storage(FailingModule::poisoning(["profile"]));
    let result = storage.batch_merge([KeyValue::new("profile", "{}")]).await;
    assert_backend_keys!(result, ["profile"]);
}

#[tokio::test]
async fn callback_and_future_see_the_same_failure() {
    let storage = storage(FailingModule::poisoning(["bad"]));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    let result = storage
        .set("bad", "v")
        .on_complete(move |r| sink.lock().unwrap().push(r.as_ref().err().cloned()))
        .await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1, "callback must run exactly once");
    let from_callback = seen[0].as_ref().expect("callback should see the error");
    let from_future = result.unwrap_err();
    assert_eq!(from_callback.entries(), from_future.entries());
}

#[tokio::test]
async fn callback_sees_validation_errors_too() {
    let storage = storage(FailingModule::poisoning(Vec::<String>::new()));
    let called = Arc::new(Mutex::new(false));

    let flag = Arc::clone(&called);
    let result = storage
        .get("")
        .on_complete(move |r| {
            *flag.lock().unwrap() = r.as_ref().is_err_and(StorageError::is_validation);
        })
        .await;

    assert_validation!(result);
    assert!(*called.lock().unwrap());
}

#[tokio::test]
async fn spawned_operation_delivers_through_callback() {
    let config = StorageConfig::builder().flush_mode(FlushMode::Manual).build().unwrap();
    let storage =
        AsyncStorage::with_config(NativeBackend::new(FailingModule::poisoning(["x"])), config)
            .unwrap();
    storage.set("k", "v").await.unwrap();

    let (tx, rx) = tokio::sync::oneshot::channel();
    let task = tokio::spawn(storage.get("k").on_complete(move |r| {
        let _ = tx.send(r.clone());
    }));

    storage.flush().await;
    let via_callback = rx.await.unwrap();
    let via_future = task.await.unwrap();
    assert_eq!(assert_storage_ok!(via_callback), assert_storage_ok!(via_future));
}
