//! Store roots and schema locations.
//!
//! A [`SchemaLocation`] pins a settings namespace to one root hive plus a
//! `\`-delimited base path.  Every field declared on the schema resolves to
//! `base_path\leaf`, so the mapping from declaration to stored key is total
//! and deterministic.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between path segments in a store key path.
pub const KEY_SEPARATOR: char = '\\';

/// The top-level hive a key path is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RootKey {
    /// `HKEY_LOCAL_MACHINE`: machine-wide settings.
    LocalMachine,
    /// `HKEY_CURRENT_USER`: settings of the calling user.
    CurrentUser,
    /// `HKEY_CLASSES_ROOT`
    ClassesRoot,
    /// `HKEY_USERS`
    Users,
    /// `HKEY_CURRENT_CONFIG`
    CurrentConfig,
}

impl RootKey {
    /// All roots, in declaration order.
    pub const ALL: [RootKey; 5] = [
        RootKey::LocalMachine,
        RootKey::CurrentUser,
        RootKey::ClassesRoot,
        RootKey::Users,
        RootKey::CurrentConfig,
    ];

    /// Short conventional name, e.g. `HKLM`.
    pub fn short_name(self) -> &'static str {
        match self {
            RootKey::LocalMachine => "HKLM",
            RootKey::CurrentUser => "HKCU",
            RootKey::ClassesRoot => "HKCR",
            RootKey::Users => "HKU",
            RootKey::CurrentConfig => "HKCC",
        }
    }

    /// Full Win32 name, e.g. `HKEY_LOCAL_MACHINE`.
    pub fn long_name(self) -> &'static str {
        match self {
            RootKey::LocalMachine => "HKEY_LOCAL_MACHINE",
            RootKey::CurrentUser => "HKEY_CURRENT_USER",
            RootKey::ClassesRoot => "HKEY_CLASSES_ROOT",
            RootKey::Users => "HKEY_USERS",
            RootKey::CurrentConfig => "HKEY_CURRENT_CONFIG",
        }
    }

    /// Name used in configuration files, e.g. `local-machine`.
    pub fn kebab_name(self) -> &'static str {
        match self {
            RootKey::LocalMachine => "local-machine",
            RootKey::CurrentUser => "current-user",
            RootKey::ClassesRoot => "classes-root",
            RootKey::Users => "users",
            RootKey::CurrentConfig => "current-config",
        }
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Error returned when a root name is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown store root: {0}")]
pub struct UnknownRootError(pub String);

impl FromStr for RootKey {
    type Err = UnknownRootError;

    /// Accepts the short name (`HKLM`), the Win32 name (`HKEY_LOCAL_MACHINE`)
    /// or the kebab-case name used in config files (`local-machine`),
    /// ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        RootKey::ALL
            .into_iter()
            .find(|root| {
                wanted.eq_ignore_ascii_case(root.short_name())
                    || wanted.eq_ignore_ascii_case(root.long_name())
                    || wanted.eq_ignore_ascii_case(root.kebab_name())
            })
            .ok_or_else(|| UnknownRootError(s.to_string()))
    }
}

/// Root plus base path of one settings namespace.
///
/// Usually a compile-time constant:
///
/// ```rust
/// use hivebind_core::{RootKey, SchemaLocation};
///
/// const APP: SchemaLocation = SchemaLocation::new(RootKey::LocalMachine, r"Software\Vendor\App");
/// assert_eq!(APP.resolve("logLevel"), r"Software\Vendor\App\logLevel");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaLocation {
    root: RootKey,
    base_path: Cow<'static, str>,
}

impl SchemaLocation {
    /// Creates a location from a static base path.
    pub const fn new(root: RootKey, base_path: &'static str) -> Self {
        Self {
            root,
            base_path: Cow::Borrowed(base_path),
        }
    }

    /// Creates a location from a base path known only at runtime, e.g. one
    /// read from a startup override file.
    pub fn owned(root: RootKey, base_path: impl Into<String>) -> Self {
        Self {
            root,
            base_path: Cow::Owned(base_path.into()),
        }
    }

    /// The root hive.
    pub fn root(&self) -> RootKey {
        self.root
    }

    /// The base path with surrounding separators removed.
    pub fn base_path(&self) -> &str {
        self.base_path.trim_matches(KEY_SEPARATOR)
    }

    /// Resolves `leaf` to its fully-qualified key path below the root.
    ///
    /// Pure string composition; never fails and always yields the same
    /// result for the same input.
    pub fn resolve(&self, leaf: &str) -> String {
        let base = self.base_path();
        if base.is_empty() {
            return leaf.to_string();
        }
        let mut path = String::with_capacity(base.len() + 1 + leaf.len());
        path.push_str(base);
        path.push(KEY_SEPARATOR);
        path.push_str(leaf);
        path
    }
}

impl fmt::Display for SchemaLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.root, KEY_SEPARATOR, self.base_path())
    }
}
