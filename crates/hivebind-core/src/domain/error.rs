//! Error taxonomy for typed settings access.
//!
//! Three layers of failure exist:
//!
//! - [`StoreError`]: what a store backend reports for one open/read/write.
//! - [`DecodeError`]: why a raw value could not be converted to the declared type.
//! - [`SettingsError`]: what application code sees from a schema or accessor.
//!   Every store and decode failure is folded into exactly one of its four
//!   variants.

use thiserror::Error;

use crate::domain::raw::RawKind;

/// Failure reported by a key-value store backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The key or value does not exist.
    #[error("not found")]
    NotFound,

    /// The caller lacks the privilege for the requested access.
    #[error("access denied")]
    AccessDenied,

    /// The backend cannot serve this request at all (offline hive, platform
    /// without a registry).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The value exists but its stored data has no [`RawValue`] form.
    ///
    /// [`RawValue`]: crate::domain::raw::RawValue
    #[error("unreadable value: {0}")]
    Malformed(DecodeError),

    /// Any other platform failure, with the OS status code.
    #[error("os error {code}: {message}")]
    Os { code: u32, message: String },
}

/// Why a raw value could not be decoded as the declared semantic type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The stored value has a store-native type the declared type never uses.
    #[error("expected {expected}, found {found}")]
    KindMismatch { expected: RawKind, found: RawKind },

    /// The stored integer is outside the declared type's valid range.
    #[error("value {value} is out of range")]
    OutOfRange { value: u64 },

    /// The stored string is not the name of any enumeration level.
    #[error("unknown token {0:?}")]
    UnknownToken(String),

    /// The store holds data it cannot represent: an unmodelled value type,
    /// or bytes too short or misaligned for their declared type.
    #[error("unreadable data: {0}")]
    Unreadable(String),
}

/// Error returned by schema and accessor operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// The leaf value is absent under an openable base path.
    #[error("setting not found: {key}")]
    NotFound { key: String },

    /// The base path could not be opened, or the store failed mid-operation.
    #[error("store unavailable at {path}: {source}")]
    StoreUnavailable {
        path: String,
        #[source]
        source: StoreError,
    },

    /// A write was rejected for lack of privilege.
    #[error("write denied for {key}: {source}")]
    WriteDenied {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The value exists but cannot be decoded as the declared type.
    #[error("malformed value at {key}: {reason}")]
    MalformedValue {
        key: String,
        #[source]
        reason: DecodeError,
    },
}

impl SettingsError {
    /// Returns `true` for [`SettingsError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, SettingsError::NotFound { .. })
    }

    /// The key path (or base path, for [`SettingsError::StoreUnavailable`])
    /// the failure refers to.
    pub fn key(&self) -> &str {
        match self {
            SettingsError::NotFound { key }
            | SettingsError::WriteDenied { key, .. }
            | SettingsError::MalformedValue { key, .. } => key,
            SettingsError::StoreUnavailable { path, .. } => path,
        }
    }
}
