//! The service's own settings schema.
//!
//! Three values live under `HKLM\Software\Hivebind\Service`:
//!
//! | Field             | Leaf             | Type       |
//! |-------------------|------------------|------------|
//! | `log_level`       | `logLevel`       | `LogLevel` |
//! | `log_dir`         | `logDir`         | `String`   |
//! | `middleware_path` | `middlewarePath` | `PathBuf`  |
//!
//! [`ServiceField`] names one of them at runtime so the operator CLI can
//! read and write fields chosen on the command line.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use hivebind_core::{
    settings_ordinal, settings_schema, FieldDecl, RootKey, SchemaLocation, SettingsError,
    SettingsSchema,
};

/// Well-known key names shared with installers and other tooling.
pub mod keys {
    /// Base path of the service's settings, below `HKEY_LOCAL_MACHINE`.
    pub const REGISTRY_PATH: &str = r"Software\Hivebind\Service";
    pub const LOG_LEVEL_KEY: &str = "logLevel";
    pub const LOG_DIR_KEY: &str = "logDir";
    /// Written by the installer; read by the service at startup.
    pub const MIDDLEWARE_PATH_KEY: &str = "middlewarePath";
}

/// Where [`ServiceSettings`] live unless the startup config relocates them.
pub const SERVICE_LOCATION: SchemaLocation =
    SchemaLocation::new(RootKey::LocalMachine, keys::REGISTRY_PATH);

// ── LogLevel ──────────────────────────────────────────────────────────────────

/// Minimum severity the service logs.  Stored as a DWORD ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

settings_ordinal!(LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
});

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Off,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// `tracing` filter directive for this level.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directive())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log level '{0}' (expected off, error, warn, info, debug, trace or 0-5)")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    /// Accepts a level name (any case) or its stored ordinal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if let Ok(ordinal) = wanted.parse::<usize>() {
            return Self::ALL
                .get(ordinal)
                .copied()
                .ok_or_else(|| ParseLevelError(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|level| level.directive().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}

// ── Schema ────────────────────────────────────────────────────────────────────

settings_schema! {
    /// Settings the service reads at startup.
    pub struct ServiceSettings {
        /// Minimum severity written to the service log.
        log_level: LogLevel = keys::LOG_LEVEL_KEY,
        /// Directory for `hivebind-service.log`; empty means stderr only.
        log_dir: String = keys::LOG_DIR_KEY,
        /// Middleware library the service loads.
        middleware_path: PathBuf = keys::MIDDLEWARE_PATH_KEY,
    }
}

// ── ServiceField ──────────────────────────────────────────────────────────────

/// One field of [`ServiceSettings`], chosen at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceField {
    LogLevel,
    LogDir,
    MiddlewarePath,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown setting '{0}' (expected log_level, log_dir or middleware_path)")]
pub struct ParseFieldError(pub String);

/// Failure to apply a textual value to a field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl ServiceField {
    pub const ALL: [ServiceField; 3] = [
        ServiceField::LogLevel,
        ServiceField::LogDir,
        ServiceField::MiddlewarePath,
    ];

    /// Field name as declared in [`ServiceSettings`].
    pub fn name(self) -> &'static str {
        match self {
            ServiceField::LogLevel => "log_level",
            ServiceField::LogDir => "log_dir",
            ServiceField::MiddlewarePath => "middleware_path",
        }
    }

    /// The field's declaration.
    pub fn decl(self) -> &'static FieldDecl {
        match ServiceSettings::field(self.name()) {
            Some(decl) => decl,
            None => unreachable!("every ServiceField is declared in ServiceSettings"),
        }
    }

    /// Reads the field and renders it as text.
    ///
    /// # Errors
    ///
    /// Whatever the typed `get` returns.
    pub fn read(self, settings: &ServiceSettings) -> Result<String, SettingsError> {
        Ok(match self {
            ServiceField::LogLevel => settings.log_level().get()?.to_string(),
            ServiceField::LogDir => settings.log_dir().get()?,
            ServiceField::MiddlewarePath => settings.middleware_path().get()?.display().to_string(),
        })
    }

    /// Parses `text` as this field's type and stores it.
    ///
    /// # Errors
    ///
    /// [`FieldError::InvalidValue`] if `text` does not parse; otherwise
    /// whatever the typed `set` returns.
    pub fn write(self, settings: &ServiceSettings, text: &str) -> Result<(), FieldError> {
        match self {
            ServiceField::LogLevel => {
                let level = text.parse::<LogLevel>().map_err(|e| FieldError::InvalidValue {
                    field: self.name(),
                    reason: e.to_string(),
                })?;
                settings.log_level().set(&level)?;
            }
            ServiceField::LogDir => settings.log_dir().set(&text.to_string())?,
            ServiceField::MiddlewarePath => {
                if text.trim().is_empty() {
                    return Err(FieldError::InvalidValue {
                        field: self.name(),
                        reason: "path must not be empty".into(),
                    });
                }
                settings.middleware_path().set(&PathBuf::from(text))?;
            }
        }
        Ok(())
    }

    /// Removes the stored value.
    ///
    /// # Errors
    ///
    /// Whatever the typed `clear` returns.
    pub fn clear(self, settings: &ServiceSettings) -> Result<(), SettingsError> {
        match self {
            ServiceField::LogLevel => settings.log_level().clear(),
            ServiceField::LogDir => settings.log_dir().clear(),
            ServiceField::MiddlewarePath => settings.middleware_path().clear(),
        }
    }
}

impl fmt::Display for ServiceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ServiceField {
    type Err = ParseFieldError;

    /// Accepts the field name in snake or kebab case, or its leaf key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|field| {
                field.name().eq_ignore_ascii_case(&wanted)
                    || field.decl().leaf.eq_ignore_ascii_case(s.trim())
            })
            .ok_or_else(|| ParseFieldError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hivebind_core::{MemoryStore, RawKind, RawValue, Schema};

    use super::*;

    fn settings() -> (MemoryStore, ServiceSettings) {
        let store = MemoryStore::new();
        let schema = Schema::new(SERVICE_LOCATION, Arc::new(store.clone()));
        (store, ServiceSettings::new(schema))
    }

    // ── LogLevel ──────────────────────────────────────────────────────────────

    #[test]
    fn test_log_level_parses_names_and_ordinals() {
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("TRACE".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert_eq!("0".parse::<LogLevel>(), Ok(LogLevel::Off));
        assert_eq!("5".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert!("6".parse::<LogLevel>().is_err());
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_level_ordinals_match_storage_layout() {
        use hivebind_core::SettingValue;
        for (ordinal, level) in LogLevel::ALL.into_iter().enumerate() {
            assert_eq!(level.encode(), RawValue::Dword(ordinal as u32));
        }
    }

    // ── Schema declaration ────────────────────────────────────────────────────

    #[test]
    fn test_schema_declares_three_fields_with_expected_kinds() {
        let kinds: Vec<_> = ServiceSettings::FIELDS.iter().map(|f| (f.leaf, f.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("logLevel", RawKind::Dword),
                ("logDir", RawKind::String),
                ("middlewarePath", RawKind::String),
            ]
        );
    }

    #[test]
    fn test_middleware_path_resolves_under_service_key() {
        let (_, s) = settings();
        assert_eq!(
            s.middleware_path().key_path(),
            r"Software\Hivebind\Service\middlewarePath"
        );
    }

    // ── ServiceField ──────────────────────────────────────────────────────────

    #[test]
    fn test_field_parses_snake_kebab_and_leaf_spellings() {
        assert_eq!("log_level".parse::<ServiceField>(), Ok(ServiceField::LogLevel));
        assert_eq!("log-dir".parse::<ServiceField>(), Ok(ServiceField::LogDir));
        assert_eq!("middlewarePath".parse::<ServiceField>(), Ok(ServiceField::MiddlewarePath));
        assert_eq!(
            "colour".parse::<ServiceField>(),
            Err(ParseFieldError("colour".into()))
        );
    }

    #[test]
    fn test_every_field_has_a_declaration() {
        for field in ServiceField::ALL {
            assert_eq!(field.decl().name, field.name());
        }
    }

    #[test]
    fn test_write_then_read_log_level_as_text() {
        // Arrange
        let (store, s) = settings();

        // Act
        ServiceField::LogLevel.write(&s, "debug").unwrap();

        // Assert
        assert_eq!(
            store.raw(RootKey::LocalMachine, keys::REGISTRY_PATH, keys::LOG_LEVEL_KEY),
            Some(RawValue::Dword(4))
        );
        assert_eq!(ServiceField::LogLevel.read(&s), Ok("debug".to_string()));
    }

    #[test]
    fn test_write_rejects_bad_level_without_touching_store() {
        let (store, s) = settings();

        let result = ServiceField::LogLevel.write(&s, "loud");

        assert!(matches!(result, Err(FieldError::InvalidValue { field: "log_level", .. })));
        assert!(!store.key_exists(RootKey::LocalMachine, keys::REGISTRY_PATH));
    }

    #[test]
    fn test_write_rejects_empty_middleware_path() {
        let (_, s) = settings();
        assert!(matches!(
            ServiceField::MiddlewarePath.write(&s, "  "),
            Err(FieldError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_clear_makes_field_absent() {
        let (_, s) = settings();
        ServiceField::LogDir.write(&s, r"C:\logs").unwrap();

        ServiceField::LogDir.clear(&s).unwrap();

        assert!(ServiceField::LogDir.read(&s).unwrap_err().is_not_found());
    }

    #[test]
    fn test_denied_write_surfaces_as_settings_error() {
        let (store, s) = settings();
        store.deny_writes(RootKey::LocalMachine);

        let result = ServiceField::LogDir.write(&s, "logs");

        assert!(matches!(
            result,
            Err(FieldError::Settings(SettingsError::WriteDenied { .. }))
        ));
    }
}
