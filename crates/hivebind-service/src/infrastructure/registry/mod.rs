//! Store backends and the choice between them.
//!
//! The live registry is only compiled on Windows.  Everywhere else, and
//! when `--in-memory` is given, settings go to a process-local
//! [`MemoryStore`] that starts empty and is discarded on exit.

#[cfg(target_os = "windows")]
pub mod windows;

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use hivebind_core::{KeyValueStore, MemoryStore, StoreError};

/// Which store the service binds its settings to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Registry,
    Memory,
}

impl Backend {
    /// The registry on Windows, memory elsewhere.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "windows") {
            Backend::Registry
        } else {
            Backend::Memory
        }
    }

    /// `Memory` if `in_memory` is set, else the platform default.
    pub fn select(in_memory: bool) -> Self {
        if in_memory {
            Backend::Memory
        } else {
            Self::platform_default()
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Registry => f.write_str("registry"),
            Backend::Memory => f.write_str("memory"),
        }
    }
}

/// Creates the store for `backend`.
///
/// # Errors
///
/// [`StoreError::Unsupported`] if the registry is requested on a platform
/// that has none.
pub fn open_store(backend: Backend) -> Result<Arc<dyn KeyValueStore>, StoreError> {
    match backend {
        Backend::Memory => {
            warn!("using in-memory store; settings are not persisted");
            Ok(Arc::new(MemoryStore::new()))
        }
        Backend::Registry => registry_store(),
    }
}

#[cfg(target_os = "windows")]
fn registry_store() -> Result<Arc<dyn KeyValueStore>, StoreError> {
    info!("using Windows registry store");
    Ok(Arc::new(self::windows::WindowsRegistry::new()))
}

#[cfg(not(target_os = "windows"))]
fn registry_store() -> Result<Arc<dyn KeyValueStore>, StoreError> {
    info!("registry store requested on a platform without one");
    Err(StoreError::Unsupported(
        "the Windows registry is not available on this platform".into(),
    ))
}

#[cfg(test)]
mod tests {
    use hivebind_core::{AccessMode, RootKey};

    use super::*;

    #[test]
    fn test_in_memory_flag_always_selects_memory() {
        assert_eq!(Backend::select(true), Backend::Memory);
    }

    #[test]
    fn test_default_backend_matches_platform() {
        let expected = if cfg!(target_os = "windows") {
            Backend::Registry
        } else {
            Backend::Memory
        };
        assert_eq!(Backend::select(false), expected);
    }

    #[test]
    fn test_memory_store_starts_empty() {
        let store = open_store(Backend::Memory).unwrap();
        assert!(matches!(
            store.open_key(RootKey::LocalMachine, r"Software\Hivebind", AccessMode::ReadOnly),
            Err(StoreError::NotFound)
        ));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_registry_is_unsupported_off_windows() {
        assert!(matches!(
            open_store(Backend::Registry),
            Err(StoreError::Unsupported(_))
        ));
    }
}
