//! Settings schemas: one namespace of typed fields under a fixed key path.
//!
//! A [`Schema`] is a value object holding the [`SchemaLocation`] and the
//! store capability.  It is the single choke point through which every
//! field reads and writes raw values: each call opens a scoped handle,
//! performs one operation, and drops the handle before returning.  Nothing
//! is cached, so readers always observe the store's current state.
//!
//! Concrete schemas are declared with [`settings_schema!`](crate::settings_schema):
//!
//! ```rust
//! use std::sync::Arc;
//! use hivebind_core::{settings_schema, MemoryStore, RootKey, Schema, SchemaLocation};
//!
//! settings_schema! {
//!     /// Settings for the example app.
//!     pub struct AppSettings {
//!         log_dir: String = "logDir",
//!         verbose: bool = "verbose",
//!     }
//! }
//!
//! const APP: SchemaLocation = SchemaLocation::new(RootKey::CurrentUser, r"Software\Vendor\App");
//!
//! let settings = AppSettings::new(Schema::new(APP, Arc::new(MemoryStore::new())));
//! settings.verbose().set(&true).unwrap();
//! assert!(settings.verbose().get().unwrap());
//! assert!(settings.log_dir().get().unwrap_err().is_not_found());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::codec::SettingValue;
use crate::domain::error::{SettingsError, StoreError};
use crate::domain::key_path::SchemaLocation;
use crate::domain::raw::{RawKind, RawValue};
use crate::setting::Setting;
use crate::store::{AccessMode, KeyHandle, KeyValueStore};

/// Field name → leaf key substitutions applied when a schema hands out
/// accessors.  Loaded once at startup; immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTable {
    leaves: BTreeMap<String, String>,
}

impl KeyTable {
    /// An empty table: every field uses its declared leaf.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the leaf used for field `name`.
    pub fn with_leaf(mut self, name: impl Into<String>, leaf: impl Into<String>) -> Self {
        self.leaves.insert(name.into(), leaf.into());
        self
    }

    /// The substituted leaf for field `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.leaves.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Iterates over `(field name, leaf)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.leaves.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<N: Into<String>, L: Into<String>> FromIterator<(N, L)> for KeyTable {
    fn from_iter<I: IntoIterator<Item = (N, L)>>(iter: I) -> Self {
        Self {
            leaves: iter
                .into_iter()
                .map(|(name, leaf)| (name.into(), leaf.into()))
                .collect(),
        }
    }
}

/// One configuration namespace bound to a store.
#[derive(Clone)]
pub struct Schema {
    location: SchemaLocation,
    keys: Arc<KeyTable>,
    store: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("location", &self.location)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl Schema {
    /// Binds `location` to `store`.  No store access happens here.
    pub fn new(location: SchemaLocation, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            location,
            keys: Arc::new(KeyTable::new()),
            store,
        }
    }

    /// Returns a copy of this schema that resolves field leaves through
    /// `keys` first.
    pub fn with_key_table(mut self, keys: KeyTable) -> Self {
        self.keys = Arc::new(keys);
        self
    }

    /// Returns a copy of this schema at a different location, sharing the
    /// same store and key table.
    pub fn relocated(&self, location: SchemaLocation) -> Self {
        Self {
            location,
            keys: Arc::clone(&self.keys),
            store: Arc::clone(&self.store),
        }
    }

    pub fn location(&self) -> &SchemaLocation {
        &self.location
    }

    pub fn key_table(&self) -> &KeyTable {
        &self.keys
    }

    /// Fully-qualified key path of `leaf`, below the root.
    pub fn resolve_key(&self, leaf: &str) -> String {
        self.location.resolve(leaf)
    }

    /// The leaf actually used for a field: the key-table substitution if
    /// there is one, else the declared leaf.
    pub fn leaf_for<'a>(&'a self, name: &str, declared: &'a str) -> &'a str {
        self.keys.get(name).unwrap_or(declared)
    }

    /// Binds a declared field to this schema.
    pub fn setting<T: SettingValue>(&self, key: SettingKey<T>) -> Setting<'_, T> {
        Setting::new(self, self.leaf_for(key.name(), key.leaf()))
    }

    fn open(&self, mode: AccessMode) -> Result<Box<dyn KeyHandle>, StoreError> {
        trace!(location = %self.location, ?mode, "opening key");
        self.store
            .open_key(self.location.root(), self.location.base_path(), mode)
    }

    fn unavailable(&self, source: StoreError) -> SettingsError {
        SettingsError::StoreUnavailable {
            path: self.location.to_string(),
            source,
        }
    }

    /// Reads the raw value stored at `leaf`.
    ///
    /// # Errors
    ///
    /// - [`SettingsError::StoreUnavailable`] if the base path cannot be opened.
    /// - [`SettingsError::NotFound`] if the base path opens but `leaf` is absent.
    /// - [`SettingsError::MalformedValue`] if the stored data has no raw form.
    pub fn read_raw(&self, leaf: &str) -> Result<RawValue, SettingsError> {
        let handle = self
            .open(AccessMode::ReadOnly)
            .map_err(|e| self.unavailable(e))?;
        match handle.read_value(leaf) {
            Ok(raw) => {
                debug!(key = %self.resolve_key(leaf), kind = %raw.kind(), "read raw value");
                Ok(raw)
            }
            Err(StoreError::NotFound) => Err(SettingsError::NotFound {
                key: self.resolve_key(leaf),
            }),
            Err(StoreError::Malformed(reason)) => Err(SettingsError::MalformedValue {
                key: self.resolve_key(leaf),
                reason,
            }),
            Err(e) => Err(self.unavailable(e)),
        }
    }

    /// Writes `raw` at `leaf`, creating the base path if needed.
    ///
    /// # Errors
    ///
    /// - [`SettingsError::WriteDenied`] if the store refuses the open or the write.
    /// - [`SettingsError::StoreUnavailable`] for any other store failure.
    pub fn write_raw(&self, leaf: &str, raw: &RawValue) -> Result<(), SettingsError> {
        let mut handle = self
            .open(AccessMode::CreateIfMissing)
            .map_err(|e| self.write_error(leaf, e))?;
        handle
            .write_value(leaf, raw)
            .map_err(|e| self.write_error(leaf, e))?;
        debug!(key = %self.resolve_key(leaf), kind = %raw.kind(), "wrote raw value");
        Ok(())
    }

    /// Removes the value at `leaf`.  Removing an absent value, or a value
    /// under an absent base path, succeeds.
    ///
    /// # Errors
    ///
    /// Same as [`Schema::write_raw`].
    pub fn delete_raw(&self, leaf: &str) -> Result<(), SettingsError> {
        let mut handle = match self.open(AccessMode::ReadWrite) {
            Ok(handle) => handle,
            Err(StoreError::NotFound) => return Ok(()),
            Err(e) => return Err(self.write_error(leaf, e)),
        };
        match handle.delete_value(leaf) {
            Ok(()) => {
                debug!(key = %self.resolve_key(leaf), "deleted value");
                Ok(())
            }
            Err(StoreError::NotFound) => Ok(()),
            Err(e) => Err(self.write_error(leaf, e)),
        }
    }

    fn write_error(&self, leaf: &str, source: StoreError) -> SettingsError {
        match source {
            StoreError::AccessDenied => SettingsError::WriteDenied {
                key: self.resolve_key(leaf),
                source,
            },
            other => self.unavailable(other),
        }
    }

    /// Returns whether a value is stored at `leaf`.
    ///
    /// # Errors
    ///
    /// [`SettingsError::StoreUnavailable`] if the base path cannot be opened.
    pub fn contains(&self, leaf: &str) -> Result<bool, SettingsError> {
        match self.read_raw(leaf) {
            Ok(_) => Ok(true),
            Err(SettingsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Names of every value stored directly under the base path.
    ///
    /// # Errors
    ///
    /// [`SettingsError::StoreUnavailable`] if the base path cannot be opened
    /// or enumerated.
    pub fn value_names(&self) -> Result<Vec<String>, SettingsError> {
        let handle = self
            .open(AccessMode::ReadOnly)
            .map_err(|e| self.unavailable(e))?;
        handle.value_names().map_err(|e| self.unavailable(e))
    }

    /// Returns `true` if the base path can currently be opened for reading.
    pub fn is_available(&self) -> bool {
        self.open(AccessMode::ReadOnly).is_ok()
    }
}

/// A typed field declaration: field name, declared leaf, value type.
pub struct SettingKey<T> {
    name: &'static str,
    leaf: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SettingKey<T> {
    pub const fn new(name: &'static str, leaf: &'static str) -> Self {
        Self {
            name,
            leaf,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn leaf(&self) -> &'static str {
        self.leaf
    }
}

impl<T> Clone for SettingKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SettingKey<T> {}

impl<T> fmt::Debug for SettingKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingKey")
            .field("name", &self.name)
            .field("leaf", &self.leaf)
            .finish()
    }
}

/// Untyped description of one declared field, for enumeration and
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDecl {
    /// Field name as written in the declaration.
    pub name: &'static str,
    /// Declared leaf key.
    pub leaf: &'static str,
    /// Raw kind the field's type writes.
    pub kind: RawKind,
}

/// Current state of one declared field, as reported by
/// [`SettingsSchema::inspect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldStatus {
    pub field: FieldDecl,
    /// Leaf in effect after key-table substitution.
    pub leaf: String,
    /// Fully-qualified key path.
    pub key: String,
    pub value: Result<RawValue, SettingsError>,
}

/// Implemented by every schema type declared with
/// [`settings_schema!`](crate::settings_schema).
pub trait SettingsSchema {
    /// Declared fields, in declaration order.
    const FIELDS: &'static [FieldDecl];

    /// The schema the fields are bound to.
    fn schema(&self) -> &Schema;

    /// Looks up a declared field by name.
    fn field(name: &str) -> Option<&'static FieldDecl> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }

    /// Reads every declared field's raw value.
    fn inspect(&self) -> Vec<FieldStatus> {
        let schema = self.schema();
        Self::FIELDS
            .iter()
            .map(|field| {
                let leaf = schema.leaf_for(field.name, field.leaf);
                FieldStatus {
                    field: *field,
                    leaf: leaf.to_string(),
                    key: schema.resolve_key(leaf),
                    value: schema.read_raw(leaf),
                }
            })
            .collect()
    }

    /// Names of values stored under the base path that no declared field
    /// refers to.
    ///
    /// # Errors
    ///
    /// [`SettingsError::StoreUnavailable`] if the base path cannot be opened.
    fn undeclared_values(&self) -> Result<Vec<String>, SettingsError> {
        let schema = self.schema();
        let mut names = schema.value_names()?;
        names.retain(|name| {
            !Self::FIELDS.iter().any(|field| {
                schema
                    .leaf_for(field.name, field.leaf)
                    .eq_ignore_ascii_case(name)
            })
        });
        Ok(names)
    }
}

/// Returns `true` if no two fields share a leaf (ASCII case-insensitive,
/// matching the registry).  Evaluated at compile time by
/// [`settings_schema!`](crate::settings_schema).
pub const fn leaves_are_unique(fields: &[FieldDecl]) -> bool {
    let mut i = 0;
    while i < fields.len() {
        let mut j = i + 1;
        while j < fields.len() {
            if ascii_eq_ignore_case(fields[i].leaf.as_bytes(), fields[j].leaf.as_bytes()) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const fn ascii_eq_ignore_case(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i].to_ascii_lowercase() != b[i].to_ascii_lowercase() {
            return false;
        }
        i += 1;
    }
    true
}

/// Returns the first leaf that appears twice, ignoring ASCII case.  The
/// runtime counterpart of [`leaves_are_unique`], for leaves that come from
/// a [`KeyTable`].
pub fn duplicate_leaf<'a, I>(leaves: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: Vec<&'a str> = Vec::new();
    for leaf in leaves {
        if seen.iter().any(|s| s.eq_ignore_ascii_case(leaf)) {
            return Some(leaf);
        }
        seen.push(leaf);
    }
    None
}

/// Declares a settings schema type.
///
/// Generates a struct wrapping a [`Schema`], a `new(schema)` constructor,
/// one accessor method per field returning a [`Setting`] bound to the
/// schema, and a [`SettingsSchema`] impl listing the fields.  Duplicate leaf
/// keys are a compile-time error.
///
/// Leaf keys may be any `&'static str` constant expression.
#[macro_export]
macro_rules! settings_schema {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $ty:ty = $leaf:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            schema: $crate::Schema,
        }

        impl $name {
            /// Wraps `schema`.  No store access happens here.
            pub fn new(schema: $crate::Schema) -> Self {
                Self { schema }
            }

            $(
                $(#[$field_meta])*
                pub fn $field(&self) -> $crate::Setting<'_, $ty> {
                    self.schema
                        .setting($crate::SettingKey::<$ty>::new(stringify!($field), $leaf))
                }
            )+
        }

        impl $crate::SettingsSchema for $name {
            const FIELDS: &'static [$crate::FieldDecl] = &[
                $(
                    $crate::FieldDecl {
                        name: stringify!($field),
                        leaf: $leaf,
                        kind: <$ty as $crate::SettingValue>::KIND,
                    },
                )+
            ];

            fn schema(&self) -> &$crate::Schema {
                &self.schema
            }
        }

        const _: () = assert!(
            $crate::schema::leaves_are_unique(<$name as $crate::SettingsSchema>::FIELDS),
            concat!("duplicate leaf key in settings schema ", stringify!($name)),
        );
    };
}
