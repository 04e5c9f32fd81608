//! Key and value size validation.
//!
//! The facade checks every key and value against [`SizeLimits`] before any
//! backend call, so oversized payloads never cross the native bridge.
//!
//! # Defaults
//!
//! | Limit | Default |
//! |-------|---------|
//! | `max_key_size` | 512 bytes |
//! | `max_value_size` | 524 288 bytes (512 KiB) |

use serde::{Deserialize, Serialize};

use crate::{ConfigError, StorageError};

/// Default maximum key size in bytes (512 B).
pub const DEFAULT_MAX_KEY_SIZE: usize = 512;

/// Default maximum value size in bytes (512 KiB).
pub const DEFAULT_MAX_VALUE_SIZE: usize = 512 * 1024;

/// Configurable size limits for keys and values.
///
/// # Example
///
/// ```
/// use async_kv_storage::SizeLimits;
///
/// let limits = SizeLimits::new(256, 1024 * 1024).unwrap();
/// assert_eq!(limits.max_key_size(), 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizeLimits {
    #[serde(default = "default_max_key_size")]
    max_key_size: usize,
    #[serde(default = "default_max_value_size")]
    max_value_size: usize,
}

fn default_max_key_size() -> usize {
    DEFAULT_MAX_KEY_SIZE
}

fn default_max_value_size() -> usize {
    DEFAULT_MAX_VALUE_SIZE
}

impl SizeLimits {
    /// Creates size limits with the given bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if either limit is zero.
    pub fn new(max_key_size: usize, max_value_size: usize) -> Result<Self, ConfigError> {
        let limits = Self { max_key_size, max_value_size };
        limits.validate()?;
        Ok(limits)
    }

    /// Checks both limits are at least 1.
    ///
    /// Deserialized limits bypass [`new`](Self::new), so configuration
    /// loading calls this explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if either limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_key_size == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "max_key_size",
                min: "1".into(),
                value: "0".into(),
            });
        }
        if self.max_value_size == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "max_value_size",
                min: "1".into(),
                value: "0".into(),
            });
        }
        Ok(())
    }

    /// Returns the maximum allowed key size in bytes.
    #[must_use]
    pub fn max_key_size(&self) -> usize {
        self.max_key_size
    }

    /// Returns the maximum allowed value size in bytes.
    #[must_use]
    pub fn max_value_size(&self) -> usize {
        self.max_value_size
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self { max_key_size: DEFAULT_MAX_KEY_SIZE, max_value_size: DEFAULT_MAX_VALUE_SIZE }
    }
}

/// Validates a key: non-empty and within the key limit.
///
/// # Errors
///
/// [`StorageError::Validation`] for an empty key,
/// [`StorageError::SizeLimitExceeded`] for an oversized one.
pub fn validate_key(key: &str, limits: &SizeLimits) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::validation("key must be a non-empty string"));
    }
    if key.len() > limits.max_key_size {
        return Err(StorageError::size_limit_exceeded("key", key.len(), limits.max_key_size));
    }
    Ok(())
}

/// Validates a key and its value.
///
/// # Errors
///
/// See [`validate_key`]; additionally [`StorageError::SizeLimitExceeded`] when
/// the value is over the value limit.
pub fn validate_pair(key: &str, value: &str, limits: &SizeLimits) -> Result<(), StorageError> {
    validate_key(key, limits)?;
    if value.len() > limits.max_value_size {
        return Err(StorageError::size_limit_exceeded("value", value.len(), limits.max_value_size));
    }
    Ok(())
}
