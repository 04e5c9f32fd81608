#![allow(clippy::expect_used)]

use async_kv_storage::{
    AsyncStorage, FlushMode, LocalBackend, MemoryLocalStore, MemoryNativeModule, NativeBackend,
    StorageBackend, StorageConfig,
};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tokio::runtime::Runtime;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn rt() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime")
}

fn make_key(idx: usize) -> String {
    format!("bench:{idx:08}")
}

/// Creates a facade over `backend` pre-populated with `count` keys.
fn populated<B: StorageBackend + 'static>(
    rt: &Runtime,
    backend: B,
    mode: FlushMode,
    count: usize,
) -> AsyncStorage<B> {
    let config = StorageConfig::builder().flush_mode(mode).build().expect("valid config");
    let storage = AsyncStorage::with_config(backend, config).expect("valid config");
    rt.block_on(async {
        let pairs: Vec<_> = (0..count).map(|i| (make_key(i), "x".repeat(64))).collect();
        storage.batch_set(pairs).await.expect("populate failed");
    });
    storage
}

// ---------------------------------------------------------------------------
// 1. coalesced_gets: N concurrent single-key reads in one window
// ---------------------------------------------------------------------------

fn coalesced_gets(c: &mut Criterion) {
    let mut group = c.benchmark_group("coalesced_gets");
    let rt = rt();

    for &readers in &[1usize, 16, 256] {
        let storage = populated(
            &rt,
            NativeBackend::new(MemoryNativeModule::new()),
            FlushMode::Tick,
            readers,
        );
        group.throughput(Throughput::Elements(readers as u64));
        group.bench_with_input(BenchmarkId::new("native_tick", readers), &readers, |b, &n| {
            b.to_async(&rt).iter(|| {
                let reads: Vec<_> = (0..n).map(|i| storage.get(make_key(i))).collect();
                async move {
                    for read in reads {
                        read.await.expect("get failed");
                    }
                }
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// 2. sequential_gets: the same reads awaited one at a time, for comparison
// ---------------------------------------------------------------------------

fn sequential_gets(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_gets");
    let rt = rt();

    for &readers in &[1usize, 16, 256] {
        let storage = populated(
            &rt,
            LocalBackend::new(MemoryLocalStore::new()),
            FlushMode::Tick,
            readers,
        );
        group.throughput(Throughput::Elements(readers as u64));
        group.bench_with_input(BenchmarkId::new("local_tick", readers), &readers, |b, &n| {
            b.to_async(&rt).iter(|| {
                let storage = storage.clone();
                async move {
                    for i in 0..n {
                        storage.get(make_key(i)).await.expect("get failed");
                    }
                }
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// 3. manual_flush: window size vs. one explicit flush
// ---------------------------------------------------------------------------

fn manual_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("manual_flush");
    let rt = rt();

    for &keys in &[8usize, 64, 512] {
        let storage = populated(
            &rt,
            LocalBackend::new(MemoryLocalStore::new()),
            FlushMode::Manual,
            keys,
        );
        group.throughput(Throughput::Elements(keys as u64));
        group.bench_with_input(BenchmarkId::new("batch_get", keys), &keys, |b, &n| {
            b.to_async(&rt).iter(|| {
                let read = storage.batch_get((0..n).map(make_key));
                let storage = storage.clone();
                async move {
                    storage.flush().await;
                    read.await.expect("batch_get failed");
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, coalesced_gets, sequential_gets, manual_flush);
criterion_main!(benches);
