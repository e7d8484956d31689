//! The key-value store capability consumed by schemas.
//!
//! A backend exposes exactly four primitives: open a key, read a value,
//! write a value, and close the key.  Closing is `Drop` on the boxed
//! [`KeyHandle`], so a handle is released on every exit path, including
//! early returns through `?`.
//!
//! # Backends
//!
//! - [`memory::MemoryStore`]: in-process tree, used by tests and by hosts
//!   without a registry.
//! - The Windows registry adapter lives in the `hivebind-service` crate, next
//!   to the other OS-facing code.
//!
//! # Testability
//!
//! Both traits carry `mockall` automocks under `cfg(test)` so failure paths
//! (offline hive, denied writes) can be injected without a real store.

use crate::domain::key_path::RootKey;
use crate::domain::raw::RawValue;

pub use crate::domain::error::StoreError;

pub mod memory;

/// How a key is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Query values only.  The key must already exist.
    ReadOnly,
    /// Query and set values.  The key must already exist.
    ReadWrite,
    /// Query and set values, creating the key and every missing
    /// intermediate key first.
    CreateIfMissing,
}

impl AccessMode {
    /// Returns `true` if handles opened in this mode may write.
    pub fn can_write(self) -> bool {
        !matches!(self, AccessMode::ReadOnly)
    }
}

/// A hierarchical, string-keyed store such as the OS registry.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    /// Opens `path` below `root`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the key is absent and `mode` does not
    /// create it, [`StoreError::AccessDenied`] if the caller lacks the
    /// privilege for `mode`, or a backend-specific error.
    fn open_key(
        &self,
        root: RootKey,
        path: &str,
        mode: AccessMode,
    ) -> Result<Box<dyn KeyHandle>, StoreError>;
}

/// An open key.  Dropping the handle closes it.
#[cfg_attr(test, mockall::automock)]
pub trait KeyHandle {
    /// Reads the value called `name`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such value exists under this key.
    fn read_value(&self, name: &str) -> Result<RawValue, StoreError>;

    /// Creates or overwrites the value called `name`.
    fn write_value(&mut self, name: &str, value: &RawValue) -> Result<(), StoreError>;

    /// Removes the value called `name`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such value exists under this key.
    fn delete_value(&mut self, name: &str) -> Result<(), StoreError>;

    /// Names of all values held directly under this key.
    fn value_names(&self) -> Result<Vec<String>, StoreError>;
}
