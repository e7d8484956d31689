//! # hivebind-core
//!
//! Typed, declarative bindings between application settings and a
//! hierarchical key-value store such as the Windows registry.
//!
//! A program declares "I have a setting called X of type T, stored under key
//! K" and gets back a handle that reads the persisted value, writes a new
//! one, and reports absence or type mismatch, with no marshalling code at
//! the call site.
//!
//! # Architecture overview
//!
//! ```text
//! settings_schema! { struct AppSettings { log_level: Level = "logLevel", .. } }
//!        │
//!        ▼
//! Setting<'_, T>      get / set / get_or_default        (setting)
//!        │  encode / decode via SettingValue           (codec)
//!        ▼
//! Schema              resolve_key / read_raw / write_raw (schema)
//!        │  one scoped handle per operation
//!        ▼
//! dyn KeyValueStore   open_key → KeyHandle → Drop        (store)
//! ```
//!
//! - **`domain`**: roots and locations, raw values, the error taxonomy.
//! - **`store`**: the store capability plus an in-process backend.
//! - **`codec`**: one `SettingValue` impl per supported semantic type.
//! - **`schema`** / **`setting`**: the binding layer itself.
//!
//! This crate has no OS dependencies; the registry adapter lives in the
//! application crate.

pub mod codec;
pub mod domain;
pub mod schema;
pub mod setting;
pub mod store;

pub use codec::SettingValue;
pub use domain::error::{DecodeError, SettingsError, StoreError};
pub use domain::key_path::{RootKey, SchemaLocation, UnknownRootError, KEY_SEPARATOR};
pub use domain::raw::{RawKind, RawValue};
pub use schema::{
    duplicate_leaf, FieldDecl, FieldStatus, KeyTable, Schema, SettingKey, SettingsSchema,
};
pub use setting::Setting;
pub use store::memory::MemoryStore;
pub use store::{AccessMode, KeyHandle, KeyValueStore};
