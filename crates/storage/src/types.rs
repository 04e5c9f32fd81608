//! Common types used across storage operations.

use serde::{Deserialize, Serialize};

/// Key-value pair passed to batch writes.
///
/// # Examples
///
/// ```
/// use async_kv_storage::KeyValue;
///
/// let kv = KeyValue::new("user:123", r#"{"name":"Alice"}"#);
/// assert_eq!(kv.key, "user:123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValue {
    /// The key identifying this entry.
    pub key: String,

    /// The value stored at this key.
    pub value: String,
}

impl KeyValue {
    /// Creates a new key-value pair.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for KeyValue {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

/// A key paired with its value, or `None` when the key is absent.
pub type KeyEntry = (String, Option<String>);

/// Optional operations a backend supports.
///
/// Returned by [`StorageBackend::capabilities`](crate::StorageBackend::capabilities).
/// The facade exposes every operation regardless; unsupported ones fail with
/// [`StorageError::Capability`](crate::StorageError::Capability).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Whether `multi_merge` is implemented.
    pub merge: bool,
}

impl Capabilities {
    /// Every optional operation supported.
    #[must_use]
    pub fn full() -> Self {
        Self { merge: true }
    }

    /// Only the mandatory operations.
    #[must_use]
    pub fn minimal() -> Self {
        Self { merge: false }
    }
}
