//! Facade operation counters.
//!
//! Tracks how many reads callers issued versus how many round trips the
//! backend actually served, which is the number that matters for read
//! coalescing. All counters use `Ordering::Relaxed`: each is independent and
//! monotonically increasing, and a snapshot reading them one after another
//! may be slightly inconsistent across counters. That is fine for telemetry.
//!
//! # Usage
//!
//! ```
//! use async_kv_storage::metrics::Metrics;
//!
//! let metrics = Metrics::new();
//! metrics.record_get_request(1);
//! metrics.record_get_request(2);
//! metrics.record_flush(3);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.get_requests, 2);
//! assert_eq!(snapshot.flushes, 1);
//! assert_eq!(snapshot.coalescing_ratio(), 2.0);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free operation counters.
#[derive(Debug, Default)]
pub struct Metrics {
    get_requests: AtomicU64,
    keys_requested: AtomicU64,
    flushes: AtomicU64,
    keys_fetched: AtomicU64,
    writes: AtomicU64,
    removes: AtomicU64,
    merges: AtomicU64,
    clears: AtomicU64,
    key_listings: AtomicU64,
    errors: AtomicU64,
}

impl Metrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one `get`/`batch_get` call asking for `keys` keys.
    pub fn record_get_request(&self, keys: usize) {
        self.get_requests.fetch_add(1, Ordering::Relaxed);
        self.keys_requested.fetch_add(keys as u64, Ordering::Relaxed);
    }

    /// Records one backend read of `keys` deduplicated keys.
    pub fn record_flush(&self, keys: usize) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.keys_fetched.fetch_add(keys as u64, Ordering::Relaxed);
    }

    /// Records a `set`/`batch_set` of `pairs` pairs.
    pub fn record_write(&self, pairs: usize) {
        self.writes.fetch_add(pairs as u64, Ordering::Relaxed);
    }

    /// Records a `remove`/`batch_remove` of `keys` keys.
    pub fn record_remove(&self, keys: usize) {
        self.removes.fetch_add(keys as u64, Ordering::Relaxed);
    }

    /// Records a `merge`/`batch_merge` of `pairs` pairs.
    pub fn record_merge(&self, pairs: usize) {
        self.merges.fetch_add(pairs as u64, Ordering::Relaxed);
    }

    /// Records a `clear`.
    pub fn record_clear(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a `list_keys`.
    pub fn record_key_listing(&self) {
        self.key_listings.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed operation.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            get_requests: self.get_requests.load(Ordering::Relaxed),
            keys_requested: self.keys_requested.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            keys_fetched: self.keys_fetched.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            merges: self.merges.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            key_listings: self.key_listings.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        for counter in [
            &self.get_requests,
            &self.keys_requested,
            &self.flushes,
            &self.keys_fetched,
            &self.writes,
            &self.removes,
            &self.merges,
            &self.clears,
            &self.key_listings,
            &self.errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// `get` and `batch_get` calls.
    pub get_requests: u64,
    /// Keys asked for across those calls, duplicates included.
    pub keys_requested: u64,
    /// Backend round trips made for reads.
    pub flushes: u64,
    /// Deduplicated keys sent to the backend.
    pub keys_fetched: u64,
    /// Pairs written.
    pub writes: u64,
    /// Keys removed.
    pub removes: u64,
    /// Pairs merged.
    pub merges: u64,
    /// Store-wide clears.
    pub clears: u64,
    /// Key listings.
    pub key_listings: u64,
    /// Operations that ended in an error.
    pub errors: u64,
}

impl MetricsSnapshot {
    /// Read calls served per backend round trip; `0.0` before any flush.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn coalescing_ratio(&self) -> f64 {
        if self.flushes == 0 {
            return 0.0;
        }
        self.get_requests as f64 / self.flushes as f64
    }
}
