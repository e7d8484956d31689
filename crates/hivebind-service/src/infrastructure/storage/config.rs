//! TOML startup configuration for the service.
//!
//! The file is optional.  When present it can move the settings to another
//! root or base path and rename individual leaf keys, which is how test rigs
//! and side-by-side installs keep their values apart:
//!
//! ```toml
//! root = "HKCU"
//! base_path = 'Software\Hivebind\ServiceDev'
//!
//! [keys]
//! log_level = "logLevelDev"
//! ```
//!
//! Default location:
//! - Windows:  `%ProgramData%\Hivebind\service.toml`
//! - Linux:    `~/.config/hivebind/service.toml`
//! - macOS:    `~/Library/Application Support/Hivebind/service.toml`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use hivebind_core::{
    duplicate_leaf, KeyTable, KeyValueStore, RootKey, Schema, SchemaLocation, SettingsSchema,
};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `[keys]` names a field the schema does not declare.
    #[error("[keys] renames unknown setting '{0}'")]
    UnknownField(String),

    /// `[keys]` maps a field to an empty leaf.
    #[error("[keys] gives setting '{0}' an empty key name")]
    EmptyLeaf(String),

    /// After renames, two fields would share a leaf.
    #[error("key '{0}' is used by more than one setting")]
    DuplicateLeaf(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Overrides applied to a schema's declared location and leaves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingConfig {
    /// Root key, in any spelling `RootKey` parses (`HKLM`, `HKEY_CURRENT_USER`, ...).
    #[serde(default, with = "root_name", skip_serializing_if = "Option::is_none")]
    pub root: Option<RootKey>,
    /// Base path below the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    /// Field name → leaf key renames.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub keys: BTreeMap<String, String>,
}

impl BindingConfig {
    /// `default` with this config's root and base path substituted.
    pub fn location(&self, default: &SchemaLocation) -> SchemaLocation {
        let root = self.root.unwrap_or_else(|| default.root());
        match &self.base_path {
            Some(path) => SchemaLocation::owned(root, path.clone()),
            None => SchemaLocation::owned(root, default.base_path().to_string()),
        }
    }

    pub fn key_table(&self) -> KeyTable {
        self.keys.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    /// Checks the `[keys]` table against schema `S`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownField`], [`ConfigError::EmptyLeaf`] or
    /// [`ConfigError::DuplicateLeaf`].
    pub fn validate<S: SettingsSchema>(&self) -> Result<(), ConfigError> {
        for (name, leaf) in &self.keys {
            if S::field(name).is_none() {
                return Err(ConfigError::UnknownField(name.clone()));
            }
            if leaf.trim().is_empty() {
                return Err(ConfigError::EmptyLeaf(name.clone()));
            }
        }
        let effective = S::FIELDS
            .iter()
            .map(|f| self.keys.get(f.name).map_or(f.leaf, String::as_str));
        match duplicate_leaf(effective) {
            Some(leaf) => Err(ConfigError::DuplicateLeaf(leaf.to_string())),
            None => Ok(()),
        }
    }

    /// Validates against `S`, then binds `store` at the configured location
    /// with the configured renames.
    ///
    /// # Errors
    ///
    /// See [`BindingConfig::validate`].
    pub fn bind<S: SettingsSchema>(
        &self,
        default: &SchemaLocation,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Schema, ConfigError> {
        self.validate::<S>()?;
        let location = self.location(default);
        debug!(%location, renames = self.keys.len(), "binding settings schema");
        Ok(Schema::new(location, store).with_key_table(self.key_table()))
    }
}

/// Serializes a root as its short name and parses any spelling.
mod root_name {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use hivebind_core::RootKey;

    pub fn serialize<S: Serializer>(root: &Option<RootKey>, s: S) -> Result<S::Ok, S::Error> {
        match root {
            Some(root) => s.serialize_str(root.short_name()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RootKey>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|name| name.parse().map_err(<D::Error as de::Error>::custom))
            .transpose()
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("service.toml"))
}

/// Loads a [`BindingConfig`] from `path`, returning the default if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<BindingConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: BindingConfig = toml::from_str(&content)?;
            debug!(path = %path.display(), "loaded startup config");
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no startup config, using defaults");
            Ok(BindingConfig::default())
        }
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &BindingConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory, including the `Hivebind` component.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // Machine-wide, like the HKLM settings it configures.
        std::env::var_os("ProgramData").map(|p| PathBuf::from(p).join("Hivebind"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("hivebind"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Hivebind")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
