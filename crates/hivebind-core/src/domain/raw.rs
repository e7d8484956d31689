//! Store-native value representations.
//!
//! A [`RawValue`] is what the key-value store actually holds for a leaf key,
//! before any type-directed conversion.  The variants mirror the registry's
//! value types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag identifying the store-native type of a [`RawValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RawKind {
    /// 32-bit unsigned integer (`REG_DWORD`).
    Dword,
    /// 64-bit unsigned integer (`REG_QWORD`).
    Qword,
    /// Plain string (`REG_SZ`).
    String,
    /// String holding unexpanded `%VAR%` references (`REG_EXPAND_SZ`).
    ExpandString,
    /// List of strings (`REG_MULTI_SZ`).
    MultiString,
    /// Untyped byte blob (`REG_BINARY`).
    Binary,
}

impl RawKind {
    /// Registry type name, e.g. `REG_DWORD`.
    pub fn reg_name(self) -> &'static str {
        match self {
            RawKind::Dword => "REG_DWORD",
            RawKind::Qword => "REG_QWORD",
            RawKind::String => "REG_SZ",
            RawKind::ExpandString => "REG_EXPAND_SZ",
            RawKind::MultiString => "REG_MULTI_SZ",
            RawKind::Binary => "REG_BINARY",
        }
    }
}

impl fmt::Display for RawKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reg_name())
    }
}

/// A value as stored, tagged with its store-native type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum RawValue {
    Dword(u32),
    Qword(u64),
    String(String),
    ExpandString(String),
    MultiString(Vec<String>),
    Binary(Vec<u8>),
}

impl RawValue {
    /// The store-native type of this value.
    pub fn kind(&self) -> RawKind {
        match self {
            RawValue::Dword(_) => RawKind::Dword,
            RawValue::Qword(_) => RawKind::Qword,
            RawValue::String(_) => RawKind::String,
            RawValue::ExpandString(_) => RawKind::ExpandString,
            RawValue::MultiString(_) => RawKind::MultiString,
            RawValue::Binary(_) => RawKind::Binary,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Dword(v) => write!(f, "{v} (0x{v:08x})"),
            RawValue::Qword(v) => write!(f, "{v} (0x{v:016x})"),
            RawValue::String(s) | RawValue::ExpandString(s) => write!(f, "{s:?}"),
            RawValue::MultiString(items) => write!(f, "{items:?}"),
            RawValue::Binary(bytes) => {
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}
