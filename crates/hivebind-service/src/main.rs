//! hivebind-service entry point: operator CLI for the service's settings.
//!
//! # Startup order
//!
//! ```text
//! main()
//!  ├─ Cli::parse()
//!  ├─ load_config()              -- optional TOML: root, base path, leaf renames
//!  ├─ open_store()               -- registry on Windows, memory otherwise
//!  ├─ BindingConfig::bind()      -- ServiceSettings at the configured location
//!  ├─ LoggingPlan::from_settings -- logLevel / logDir with fallbacks
//!  ├─ logging::init()
//!  └─ run(command)               -- show | get | set | unset
//! ```
//!
//! Settings are read before logging exists, so fallbacks taken during that
//! read are collected in the plan and logged right after `init`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use hivebind_core::{KeyValueStore, SettingsSchema};
use hivebind_service::application::inspect_settings::SettingsReport;
use hivebind_service::application::service_settings::{
    ServiceField, ServiceSettings, SERVICE_LOCATION,
};
use hivebind_service::infrastructure::logging::{self, LoggingPlan};
use hivebind_service::infrastructure::registry::{open_store, Backend};
use hivebind_service::infrastructure::storage::config::{self, BindingConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Inspect and change the hivebind service's registry settings.
#[derive(Debug, Parser)]
#[command(
    name = "hivebind-service",
    about = "Inspect and change the hivebind service's registry settings",
    version
)]
struct Cli {
    /// Startup config file.  Defaults to the platform config directory;
    /// a missing file means no overrides.
    #[arg(long, global = true, env = "HIVEBIND_CONFIG")]
    config: Option<PathBuf>,

    /// Use a process-local store instead of the registry.  Always on for
    /// platforms without a registry.
    #[arg(long, global = true, env = "HIVEBIND_IN_MEMORY")]
    in_memory: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List every setting with its key and current value (the default).
    Show {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print one setting's value.
    Get {
        /// `log_level`, `log_dir` or `middleware_path` (leaf names also work).
        field: ServiceField,
    },
    /// Store a new value for one setting.
    Set {
        field: ServiceField,
        value: String,
    },
    /// Remove one setting so the service falls back to its default.
    Unset { field: ServiceField },
}

impl Cli {
    /// Loads the startup config named by `--config`, or the default file.
    fn binding_config(&self) -> anyhow::Result<BindingConfig> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => match config::config_file_path() {
                Ok(path) => path,
                Err(e) => {
                    debug!(error = %e, "no default config location");
                    return Ok(BindingConfig::default());
                }
            },
        };
        config::load_config(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let binding = cli.binding_config()?;
    let backend = Backend::select(cli.in_memory);
    let store: Arc<dyn KeyValueStore> =
        open_store(backend).with_context(|| format!("cannot open {backend} store"))?;
    let schema = binding
        .bind::<ServiceSettings>(&SERVICE_LOCATION, store)
        .context("invalid startup config")?;
    let settings = ServiceSettings::new(schema);

    // ── Logging setup ─────────────────────────────────────────────────────────
    let plan = LoggingPlan::from_settings(&settings);
    logging::init(&plan)?;
    plan.report();

    info!(
        backend = %backend,
        location = %settings.schema().location(),
        "hivebind-service settings bound"
    );

    run(&settings, cli.command.unwrap_or(Command::Show { json: false }))
}

fn run(settings: &ServiceSettings, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Show { json } => {
            let report = SettingsReport::collect(settings);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Command::Get { field } => {
            let value = field
                .read(settings)
                .with_context(|| format!("cannot read {field}"))?;
            println!("{value}");
        }
        Command::Set { field, value } => {
            field
                .write(settings, &value)
                .with_context(|| format!("cannot set {field}"))?;
            info!(%field, %value, "setting stored");
        }
        Command::Unset { field } => {
            field
                .clear(settings)
                .with_context(|| format!("cannot unset {field}"))?;
            info!(%field, "setting removed");
        }
    }
    Ok(())
}

fn print_report(report: &SettingsReport) {
    println!("{}", report.location);
    for row in &report.fields {
        let state = match (&row.value, &row.error) {
            (Some(value), _) => value.to_string(),
            (None, Some(error)) => format!("<{error}>"),
            (None, None) => "<unset>".to_string(),
        };
        println!("  {:<16} {:<10} {state}", row.field, row.kind.to_string());
    }
    if !report.undeclared.is_empty() {
        println!("  undeclared: {}", report.undeclared.join(", "));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_show() {
        // Arrange: parse with no arguments
        let cli = Cli::parse_from(["hivebind-service"]);

        // Assert
        assert!(cli.command.is_none());
        assert!(!cli.in_memory);
    }

    #[test]
    fn test_set_parses_field_and_value() {
        let cli = Cli::parse_from(["hivebind-service", "--in-memory", "set", "log-level", "warn"]);

        assert!(cli.in_memory);
        assert!(matches!(
            cli.command,
            Some(Command::Set { field: ServiceField::LogLevel, ref value }) if value == "warn"
        ));
    }

    #[test]
    fn test_get_accepts_leaf_name() {
        let cli = Cli::parse_from(["hivebind-service", "get", "middlewarePath"]);

        assert!(matches!(
            cli.command,
            Some(Command::Get { field: ServiceField::MiddlewarePath })
        ));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = Cli::try_parse_from(["hivebind-service", "get", "colour"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_show_json_flag() {
        let cli = Cli::parse_from(["hivebind-service", "show", "--json"]);
        assert!(matches!(cli.command, Some(Command::Show { json: true })));
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::parse_from(["hivebind-service", "show", "--config", "svc.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("svc.toml")));
    }
}
