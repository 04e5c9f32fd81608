//! Storage error types and result alias.
//!
//! Every facade operation returns [`StorageResult<T>`]. Backends map their
//! internal failures onto [`StorageError`]; per-key failures reported by a
//! native module are preserved verbatim as [`ErrorEntry`] values.
//!
//! # Error Types
//!
//! - [`StorageError::Validation`] - Malformed call arguments, raised before any backend call
//! - [`StorageError::SizeLimitExceeded`] - Key or value over the configured byte limit
//! - [`StorageError::Backend`] - Failure reported by the backend's error channel
//! - [`StorageError::Capability`] - Operation not supported by the active backend
//! - [`StorageError::MissingBackend`] - No native storage module could be located
//! - [`StorageError::Serialization`] - JSON encoding/decoding failures
//! - [`StorageError::Internal`] - Runtime, I/O and other internal failures
//!
//! # Example
//!
//! ```
//! use async_kv_storage::{ErrorEntry, StorageError, StorageResult};
//!
//! fn write(key: &str) -> StorageResult<()> {
//!     Err(StorageError::backend(vec![ErrorEntry::for_key(key, "disk full")]))
//! }
//!
//! let err = write("settings").unwrap_err();
//! assert_eq!(err.first_key(), Some("settings"));
//! ```

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Per-key failure detail reported by a backend.
///
/// Batch operations may report one entry per failed key. `key` is absent for
/// failures that are not attributable to a single item (e.g. `clear`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Human-readable failure description. Modules may omit it.
    #[serde(default)]
    pub message: String,
    /// The key that caused the failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ErrorEntry {
    /// Creates an entry not tied to a particular key.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), key: None }
    }

    /// Creates an entry for a specific key.
    #[must_use]
    pub fn for_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self { message: message.into(), key: Some(key.into()) }
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{} (key: {key})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Errors that can occur during storage operations.
///
/// Cloneable so a single failed batch read can be delivered to every caller
/// that shared the round trip.
///
/// # Non-exhaustive
///
/// New variants may be added without a semver-breaking change. Downstream
/// match expressions must include a wildcard arm.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The call arguments were malformed.
    ///
    /// Raised before anything is sent to the backend.
    #[error("Invalid argument: {message}")]
    Validation {
        /// Description of what was wrong with the arguments.
        message: String,
    },

    /// A key or value exceeded its configured size limit.
    #[error("{kind} size {actual} bytes exceeds limit of {limit} bytes")]
    SizeLimitExceeded {
        /// Which component was too large (`"key"` or `"value"`).
        kind: &'static str,
        /// Actual size in bytes.
        actual: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The backend reported one or more failures.
    ///
    /// The list is never empty and keeps the order the backend reported.
    #[error("Backend error: {}", join_entries(errors))]
    Backend {
        /// Failure details, in backend order.
        errors: Vec<ErrorEntry>,
    },

    /// The active backend does not support the requested operation.
    #[error("Operation `{operation}` is not supported by the active storage backend")]
    Capability {
        /// Name of the unsupported operation.
        operation: &'static str,
    },

    /// No native storage module could be located.
    #[error(
        "Native storage module is missing (searched: {}). Make sure the module is linked into \
         the host application and registered before the storage facade is created.",
        searched.join(", ")
    )]
    MissingBackend {
        /// Module names that were searched, in order.
        searched: Vec<String>,
    },

    /// Serialization or deserialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<BoxError>,
    },

    /// Internal error that fits no other category.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<BoxError>,
    },
}

fn join_entries(errors: &[ErrorEntry]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl StorageError {
    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Creates a new `SizeLimitExceeded` error.
    #[must_use]
    pub fn size_limit_exceeded(kind: &'static str, actual: usize, limit: usize) -> Self {
        Self::SizeLimitExceeded { kind, actual, limit }
    }

    /// Creates a new `Backend` error from a non-empty list of entries.
    ///
    /// An empty list is replaced by a single generic entry so the variant's
    /// non-empty invariant holds.
    #[must_use]
    pub fn backend(errors: Vec<ErrorEntry>) -> Self {
        if errors.is_empty() {
            return Self::Backend { errors: vec![ErrorEntry::new("unknown backend failure")] };
        }
        Self::Backend { errors }
    }

    /// Creates a new `Capability` error for the named operation.
    #[must_use]
    pub fn capability(operation: &'static str) -> Self {
        Self::Capability { operation }
    }

    /// Creates a new `MissingBackend` error.
    #[must_use]
    pub fn missing_backend<I, S>(searched: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingBackend { searched: searched.into_iter().map(Into::into).collect() }
    }

    /// Creates a new `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a new `Serialization` error with a message and source error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Internal` error with a message and source error.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Returns `true` for errors raised by argument checks, before any
    /// backend call was made.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::SizeLimitExceeded { .. })
    }

    /// Returns the per-key entries of a `Backend` error, or an empty slice.
    #[must_use]
    pub fn entries(&self) -> &[ErrorEntry] {
        match self {
            Self::Backend { errors } => errors,
            _ => &[],
        }
    }

    /// Returns the key of the first backend entry that names one.
    #[must_use]
    pub fn first_key(&self) -> Option<&str> {
        self.entries().iter().find_map(|e| e.key.as_deref())
    }
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A numeric setting is below its allowed minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Name of the offending field.
        field: &'static str,
        /// Smallest accepted value.
        min: String,
        /// Value that was supplied.
        value: String,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn backend_error_lists_every_entry() {
        let err = StorageError::backend(vec![
            ErrorEntry::for_key("a", "locked"),
            ErrorEntry::new("quota exceeded"),
        ]);
        assert_eq!(err.to_string(), "Backend error: locked (key: a); quota exceeded");
        assert_eq!(err.entries().len(), 2);
        assert_eq!(err.first_key(), Some("a"));
    }

    #[test]
    fn empty_backend_list_gets_placeholder_entry() {
        let err = StorageError::backend(Vec::new());
        assert_eq!(err.entries().len(), 1);
        assert_eq!(err.first_key(), None);
    }

    #[test]
    fn validation_classification() {
        assert!(StorageError::validation("empty key").is_validation());
        assert!(StorageError::size_limit_exceeded("key", 10, 5).is_validation());
        assert!(!StorageError::capability("merge").is_validation());
        assert!(!StorageError::internal("boom").is_validation());
    }

    #[test]
    fn missing_backend_names_searched_modules() {
        let err = StorageError::missing_backend(["A", "B"]);
        let message = err.to_string();
        assert!(message.contains("searched: A, B"), "unexpected message: {message}");
    }

    #[test]
    fn source_chain_is_preserved() {
        let io = std::io::Error::other("disk gone");
        let err = StorageError::internal_with_source("write failed", io);
        let source = err.source().expect("source should be set");
        assert_eq!(source.to_string(), "disk gone");
    }

    #[test]
    fn error_entry_deserializes_without_key() {
        let entry: ErrorEntry = serde_json::from_str(r#"{"message":"nope"}"#).unwrap();
        assert_eq!(entry, ErrorEntry::new("nope"));
    }
}
