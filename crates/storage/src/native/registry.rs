//! Native module lookup.
//!
//! Hosts expose their storage module under one of several well-known names,
//! depending on platform and on which storage implementation was linked.
//! [`ModuleRegistry`] holds whatever the host registered and resolves the
//! first match in priority order. Finding nothing is fatal for the facade
//! and surfaces as [`StorageError::MissingBackend`].

use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use super::NativeModule;
use crate::error::{StorageError, StorageResult};

/// Names searched first, in priority order.
pub const MODULE_NAMES: &[&str] =
    &["PlatformLocalStorage", "RNC_AsyncSQLiteDBStorage", "RNCAsyncStorage"];

/// Names searched afterwards when legacy fallback is enabled.
pub const LEGACY_MODULE_NAMES: &[&str] = &["AsyncSQLiteDBStorage", "AsyncLocalStorage"];

/// Registered native modules, keyed by name.
///
/// # Example
///
/// ```
/// use async_kv_storage::native::{memory::MemoryNativeModule, registry::ModuleRegistry};
///
/// let mut registry = ModuleRegistry::new();
/// registry.register(MemoryNativeModule::new().with_name("AsyncLocalStorage"));
///
/// let module = registry.resolve().unwrap();
/// assert_eq!(module.name(), "AsyncLocalStorage");
///
/// let strict = ModuleRegistry::new().with_legacy_fallback(false);
/// assert!(strict.resolve().is_err());
/// ```
#[derive(Clone)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn NativeModule>>,
    legacy_fallback: bool,
}

impl ModuleRegistry {
    /// Creates an empty registry with legacy fallback enabled.
    #[must_use]
    pub fn new() -> Self {
        Self { modules: HashMap::new(), legacy_fallback: true }
    }

    /// Enables or disables searching [`LEGACY_MODULE_NAMES`].
    #[must_use]
    pub fn with_legacy_fallback(mut self, enabled: bool) -> Self {
        self.legacy_fallback = enabled;
        self
    }

    /// Registers a module under its own [`name`](NativeModule::name),
    /// replacing any module already registered under that name.
    pub fn register(&mut self, module: impl NativeModule + 'static) -> &mut Self {
        self.register_shared(Arc::new(module))
    }

    /// Registers an already shared module.
    pub fn register_shared(&mut self, module: Arc<dyn NativeModule>) -> &mut Self {
        let name = module.name().to_owned();
        debug!(module = %name, "registered native storage module");
        self.modules.insert(name, module);
        self
    }

    /// Names searched by [`resolve`](Self::resolve), in order.
    pub fn search_order(&self) -> impl Iterator<Item = &'static str> + '_ {
        let legacy: &[&'static str] = if self.legacy_fallback { LEGACY_MODULE_NAMES } else { &[] };
        MODULE_NAMES.iter().chain(legacy.iter()).copied()
    }

    /// Returns the highest-priority registered module.
    ///
    /// # Errors
    ///
    /// [`StorageError::MissingBackend`] listing every searched name when no
    /// module matched.
    pub fn resolve(&self) -> StorageResult<Arc<dyn NativeModule>> {
        for name in self.search_order() {
            if let Some(module) = self.modules.get(name) {
                debug!(module = name, "resolved native storage module");
                return Ok(Arc::clone(module));
            }
        }
        Err(StorageError::missing_backend(self.search_order()))
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
