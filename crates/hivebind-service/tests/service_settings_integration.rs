//! End-to-end tests of the service wiring over the in-memory store:
//! startup config → bound schema → logging plan → operator operations.

use std::path::PathBuf;
use std::sync::Arc;

use hivebind_core::{MemoryStore, RawValue, RootKey, SettingsError};
use hivebind_service::application::inspect_settings::SettingsReport;
use hivebind_service::application::service_settings::{
    keys, LogLevel, ServiceField, ServiceSettings, SERVICE_LOCATION,
};
use hivebind_service::infrastructure::logging::{LoggingPlan, DEFAULT_LEVEL};
use hivebind_service::infrastructure::storage::config::{load_config, save_config, BindingConfig};
use uuid::Uuid;

fn bind(store: &MemoryStore, config: &BindingConfig) -> ServiceSettings {
    let schema = config
        .bind::<ServiceSettings>(&SERVICE_LOCATION, Arc::new(store.clone()))
        .expect("valid config");
    ServiceSettings::new(schema)
}

#[test]
fn test_installer_written_values_drive_the_logging_plan() {
    // Arrange: values as an installer would leave them
    let store = MemoryStore::new();
    store.seed(
        RootKey::LocalMachine,
        keys::REGISTRY_PATH,
        keys::LOG_LEVEL_KEY,
        RawValue::Dword(2),
    );
    store.seed(
        RootKey::LocalMachine,
        keys::REGISTRY_PATH,
        keys::LOG_DIR_KEY,
        RawValue::ExpandString(r"C:\ProgramData\Hivebind\logs".into()),
    );
    store.seed(
        RootKey::LocalMachine,
        keys::REGISTRY_PATH,
        keys::MIDDLEWARE_PATH_KEY,
        RawValue::String(r"C:\Program Files\Hivebind\middleware.dll".into()),
    );

    // Act
    let settings = bind(&store, &BindingConfig::default());
    let plan = LoggingPlan::from_settings(&settings);

    // Assert
    assert_eq!(plan.level, LogLevel::Warn);
    assert_eq!(plan.log_dir, Some(PathBuf::from(r"C:\ProgramData\Hivebind\logs")));
    assert!(plan.diagnostics.is_empty());
    assert_eq!(
        settings.middleware_path().get(),
        Ok(PathBuf::from(r"C:\Program Files\Hivebind\middleware.dll"))
    );
}

#[test]
fn test_fresh_install_runs_on_defaults() {
    let store = MemoryStore::new();
    let settings = bind(&store, &BindingConfig::default());

    let plan = LoggingPlan::from_settings(&settings);

    assert_eq!(plan.level, DEFAULT_LEVEL);
    assert_eq!(plan.log_dir, None);
    assert!(matches!(
        settings.middleware_path().get(),
        Err(SettingsError::StoreUnavailable { .. })
    ));
}

#[test]
fn test_config_file_relocates_and_renames() {
    // Arrange
    let dir = std::env::temp_dir().join(format!("hivebind-it-{}", Uuid::new_v4()));
    let path = dir.join("service.toml");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        &path,
        "root = \"HKCU\"\nbase_path = 'Software\\Hivebind\\Dev'\n\n[keys]\nlog_level = \"logLevelDev\"\n",
    )
    .unwrap();
    let store = MemoryStore::new();

    // Act
    let config = load_config(&path).unwrap();
    let settings = bind(&store, &config);
    ServiceField::LogLevel.write(&settings, "trace").unwrap();

    // Assert
    assert_eq!(
        store.raw(RootKey::CurrentUser, r"Software\Hivebind\Dev", "logLevelDev"),
        Some(RawValue::Dword(5))
    );
    assert!(!store.key_exists(RootKey::LocalMachine, keys::REGISTRY_PATH));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_saved_config_is_loaded_back() {
    let dir = std::env::temp_dir().join(format!("hivebind-it-{}", Uuid::new_v4()));
    let path = dir.join("nested").join("service.toml");
    let mut config = BindingConfig::default();
    config.keys.insert("log_dir".into(), "logDirectory".into());

    save_config(&path, &config).unwrap();

    assert_eq!(load_config(&path).unwrap(), config);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_operator_set_show_unset_cycle() {
    // Arrange
    let store = MemoryStore::new();
    let settings = bind(&store, &BindingConfig::default());

    // Act: set two fields
    ServiceField::LogDir.write(&settings, "/var/log/hivebind").unwrap();
    ServiceField::LogLevel.write(&settings, "1").unwrap();
    let before = SettingsReport::collect(&settings);

    // Act: unset one
    ServiceField::LogDir.clear(&settings).unwrap();
    let after = SettingsReport::collect(&settings);

    // Assert
    assert_eq!(before.present(), 2);
    assert_eq!(after.present(), 1);
    assert_eq!(ServiceField::LogLevel.read(&settings), Ok("error".to_string()));
    assert!(ServiceField::LogDir.read(&settings).unwrap_err().is_not_found());
}

#[test]
fn test_read_only_registry_rejects_operator_writes() {
    let store = MemoryStore::new();
    store.deny_writes(RootKey::LocalMachine);
    let settings = bind(&store, &BindingConfig::default());

    let result = ServiceField::LogLevel.write(&settings, "info");

    assert!(result.is_err());
    assert_eq!(store.raw(RootKey::LocalMachine, keys::REGISTRY_PATH, keys::LOG_LEVEL_KEY), None);
}
