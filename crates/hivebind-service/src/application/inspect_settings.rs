//! Read-only snapshot of the service settings for operators.
//!
//! Builds a [`SettingsReport`] from [`SettingsSchema::inspect`]: every
//! declared field with its resolved key and either the stored value or the
//! reason it could not be read, plus any stray values under the same key.

use serde::Serialize;

use hivebind_core::{RawKind, RawValue, SettingsSchema};

use super::service_settings::ServiceSettings;

/// State of every declared field at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsReport {
    /// `ROOT\base\path` the schema is bound to.
    pub location: String,
    pub fields: Vec<FieldReport>,
    /// Values stored under the base path that no field declares.  Empty
    /// when the base path cannot be enumerated.
    pub undeclared: Vec<String>,
}

/// One row of a [`SettingsReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub field: &'static str,
    pub key: String,
    /// Kind the field writes.
    pub kind: RawKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<RawValue>,
    /// Why `value` is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SettingsReport {
    /// Reads every field of `settings`.  Never fails; per-field errors are
    /// recorded in the rows.
    pub fn collect(settings: &ServiceSettings) -> Self {
        let fields = settings
            .inspect()
            .into_iter()
            .map(|status| {
                let (value, error) = match status.value {
                    Ok(raw) => (Some(raw), None),
                    Err(e) => (None, Some(e.to_string())),
                };
                FieldReport {
                    field: status.field.name,
                    key: status.key,
                    kind: status.field.kind,
                    value,
                    error,
                }
            })
            .collect();

        Self {
            location: settings.schema().location().to_string(),
            fields,
            undeclared: settings.undeclared_values().unwrap_or_default(),
        }
    }

    /// Number of fields that currently hold a value.
    pub fn present(&self) -> usize {
        self.fields.iter().filter(|f| f.value.is_some()).count()
    }
}
