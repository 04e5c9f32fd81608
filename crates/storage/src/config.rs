//! Configuration for [`AsyncStorage`](crate::AsyncStorage).
//!
//! [`StorageConfig`] controls when coalesced reads are flushed and how large
//! keys and values may be. It can be built in code or deserialized from any
//! serde format:
//!
//! ```
//! use std::time::Duration;
//! use async_kv_storage::{FlushMode, StorageConfig};
//!
//! let config: StorageConfig = serde_json::from_str(
//!     r#"{ "flush_mode": { "mode": "delay", "after": "5ms" } }"#,
//! ).unwrap();
//! assert_eq!(config.flush_mode(), FlushMode::Delay { after: Duration::from_millis(5) });
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, SizeLimits};

/// When a window of coalesced reads is flushed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum FlushMode {
    /// Flush once the runtime gets back to the flush task, after the
    /// current synchronous run of the caller. Reads issued before the caller
    /// next yields share one round trip.
    #[default]
    Tick,
    /// Flush after a fixed delay, widening the coalescing window.
    Delay {
        /// How long to wait after the first read of a window.
        #[serde(with = "humantime_serde")]
        after: Duration,
    },
    /// Never flush automatically; reads wait for
    /// [`AsyncStorage::flush`](crate::AsyncStorage::flush).
    Manual,
}

/// Facade configuration.
///
/// # Example
///
/// ```
/// use async_kv_storage::{FlushMode, SizeLimits, StorageConfig};
///
/// let config = StorageConfig::builder()
///     .flush_mode(FlushMode::Manual)
///     .size_limits(SizeLimits::new(128, 4096)?)
///     .build()?;
/// assert_eq!(config.flush_mode(), FlushMode::Manual);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Read flush policy.
    #[serde(default)]
    pub(crate) flush_mode: FlushMode,

    /// Key/value byte limits.
    #[serde(default)]
    pub(crate) size_limits: SizeLimits,
}

#[bon::bon]
impl StorageConfig {
    /// Creates a new configuration, validating every field.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] for a zero flush delay or zero
    /// size limits.
    #[builder]
    pub fn new(
        #[builder(default)] flush_mode: FlushMode,
        #[builder(default)] size_limits: SizeLimits,
    ) -> Result<Self, ConfigError> {
        let config = Self { flush_mode, size_limits };
        config.validate()?;
        Ok(config)
    }

    /// Checks a configuration obtained through deserialization.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let FlushMode::Delay { after } = self.flush_mode
            && after.is_zero()
        {
            return Err(ConfigError::BelowMinimum {
                field: "flush_mode.after",
                min: "1ns".into(),
                value: "0s".into(),
            });
        }
        self.size_limits.validate()
    }

    /// Returns the read flush policy.
    #[must_use]
    pub fn flush_mode(&self) -> FlushMode {
        self.flush_mode
    }

    /// Returns the key/value size limits.
    #[must_use]
    pub fn size_limits(&self) -> SizeLimits {
        self.size_limits
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StorageConfig::builder().build().unwrap();
        assert_eq!(config, StorageConfig::default());
        assert_eq!(config.flush_mode(), FlushMode::Tick);
    }

    #[test]
    fn zero_delay_rejected() {
        let err = StorageConfig::builder()
            .flush_mode(FlushMode::Delay { after: Duration::ZERO })
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::BelowMinimum { field: "flush_mode.after", .. }));
    }

    #[test]
    fn deserializes_manual_mode() {
        let config: StorageConfig =
            serde_json::from_str(r#"{ "flush_mode": { "mode": "manual" } }"#).unwrap();
        assert_eq!(config.flush_mode(), FlushMode::Manual);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserialize_rejects_unknown_fields() {
        let result = serde_json::from_str::<StorageConfig>(r#"{ "flush": "tick" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn deserialized_zero_limits_fail_validation() {
        let config: StorageConfig =
            serde_json::from_str(r#"{ "size_limits": { "max_key_size": 0 } }"#).unwrap();
        assert!(config.validate().is_err());
    }
}
