//! Typed accessor for one named setting.
//!
//! A [`Setting`] borrows its owning [`Schema`] and knows only its leaf name
//! and value type.  It holds no value between calls: `get` and `set` each go
//! to the store through the schema and convert with the type's
//! [`SettingValue`] impl.

use std::fmt;
use std::marker::PhantomData;

use tracing::{debug, warn};

use crate::codec::SettingValue;
use crate::domain::error::SettingsError;
use crate::schema::Schema;

/// Get/set handle for one leaf key, bound to semantic type `T`.
pub struct Setting<'s, T> {
    schema: &'s Schema,
    leaf: &'s str,
    _marker: PhantomData<fn() -> T>,
}

impl<'s, T> Clone for Setting<'s, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'s, T> Copy for Setting<'s, T> {}

impl<'s, T> fmt::Debug for Setting<'s, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setting")
            .field("key", &self.schema.resolve_key(self.leaf))
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<'s, T: SettingValue> Setting<'s, T> {
    /// Binds `leaf` to `schema`.  Touches no store.
    pub fn new(schema: &'s Schema, leaf: &'s str) -> Self {
        Self {
            schema,
            leaf,
            _marker: PhantomData,
        }
    }

    pub fn leaf(&self) -> &'s str {
        self.leaf
    }

    /// Fully-qualified key path below the root.
    pub fn key_path(&self) -> String {
        self.schema.resolve_key(self.leaf)
    }

    /// Reads and decodes the current value.
    ///
    /// # Errors
    ///
    /// - [`SettingsError::NotFound`] if the value was never written.
    /// - [`SettingsError::StoreUnavailable`] if the base path cannot be opened.
    /// - [`SettingsError::MalformedValue`] if the stored value cannot be
    ///   decoded as `T`.
    pub fn get(&self) -> Result<T, SettingsError> {
        let raw = self.schema.read_raw(self.leaf)?;
        T::decode(raw).map_err(|reason| SettingsError::MalformedValue {
            key: self.key_path(),
            reason,
        })
    }

    /// Encodes and stores `value`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// [`SettingsError::WriteDenied`] or [`SettingsError::StoreUnavailable`].
    pub fn set(&self, value: &T) -> Result<(), SettingsError> {
        self.schema.write_raw(self.leaf, &value.encode())
    }

    /// Like [`Setting::get`], but any failure yields `fallback`.
    ///
    /// Absence is expected for optional settings and is only logged at
    /// debug level.  Every other failure is logged as a warning.
    pub fn get_or_default(&self, fallback: T) -> T {
        self.get_or_default_reported(fallback).0
    }

    /// Like [`Setting::get_or_default`], and also returns the failure that
    /// caused the fallback (including `NotFound`).
    pub fn get_or_default_reported(&self, fallback: T) -> (T, Option<SettingsError>) {
        match self.get() {
            Ok(value) => (value, None),
            Err(err) if err.is_not_found() => {
                debug!(key = %err.key(), "setting absent, using fallback");
                (fallback, Some(err))
            }
            Err(err) => {
                warn!(key = %self.key_path(), error = %err, "setting unreadable, using fallback");
                (fallback, Some(err))
            }
        }
    }

    /// Returns whether a value (of any kind) is stored for this setting.
    ///
    /// # Errors
    ///
    /// [`SettingsError::StoreUnavailable`] if the base path cannot be opened.
    pub fn exists(&self) -> Result<bool, SettingsError> {
        self.schema.contains(self.leaf)
    }

    /// Removes the stored value.  Clearing an absent value succeeds.
    ///
    /// # Errors
    ///
    /// [`SettingsError::WriteDenied`] or [`SettingsError::StoreUnavailable`].
    pub fn clear(&self) -> Result<(), SettingsError> {
        self.schema.delete_raw(self.leaf)
    }
}
