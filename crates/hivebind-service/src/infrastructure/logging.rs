//! Structured logging set up from the service's own settings.
//!
//! The log level and directory are stored in the registry, so they have to
//! be read before any subscriber exists.  [`LoggingPlan::from_settings`]
//! reads them with fallbacks and keeps whatever went wrong; [`init`]
//! installs the subscriber and [`LoggingPlan::report`] then logs those
//! problems through it.
//!
//! `RUST_LOG`, when set, wins over the stored level.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hivebind_core::SettingsError;

use crate::application::service_settings::{LogLevel, ServiceSettings};

/// File written inside the configured log directory.
pub const LOG_FILE_NAME: &str = "hivebind-service.log";

/// Level used when `logLevel` is absent or unreadable.
pub const DEFAULT_LEVEL: LogLevel = LogLevel::Info;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A global subscriber was already installed.
    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

/// Logging configuration resolved from [`ServiceSettings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingPlan {
    pub level: LogLevel,
    /// `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
    /// Read failures other than absence, to be logged once a subscriber
    /// exists.
    pub diagnostics: Vec<SettingsError>,
}

impl Default for LoggingPlan {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            log_dir: None,
            diagnostics: Vec::new(),
        }
    }
}

impl LoggingPlan {
    /// Reads `logLevel` and `logDir`, falling back to [`DEFAULT_LEVEL`] and
    /// stderr.  An empty `logDir` also means stderr.
    pub fn from_settings(settings: &ServiceSettings) -> Self {
        let (level, level_err) = settings.log_level().get_or_default_reported(DEFAULT_LEVEL);
        let (dir, dir_err) = settings.log_dir().get_or_default_reported(String::new());

        let diagnostics = [level_err, dir_err]
            .into_iter()
            .flatten()
            .filter(|e| !e.is_not_found())
            .collect();
        let dir = dir.trim();

        Self {
            level,
            log_dir: (!dir.is_empty()).then(|| PathBuf::from(dir)),
            diagnostics,
        }
    }

    /// Full path of the log file, if logging to a file.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|dir| dir.join(LOG_FILE_NAME))
    }

    /// `RUST_LOG` if set and valid, else the planned level.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.directive()))
    }

    /// Logs the plan and any diagnostics collected while building it.
    pub fn report(&self) {
        match self.log_file() {
            Some(file) => info!(level = %self.level, file = %file.display(), "logging to file"),
            None => info!(level = %self.level, "logging to stderr"),
        }
        for diagnostic in &self.diagnostics {
            warn!(error = %diagnostic, "logging setting ignored, using fallback");
        }
    }
}

/// Installs the global subscriber described by `plan`.
///
/// # Errors
///
/// [`LoggingError::CreateDir`] or [`LoggingError::OpenFile`] if the log file
/// cannot be prepared, [`LoggingError::Install`] if a subscriber is already
/// installed.
pub fn init(plan: &LoggingPlan) -> Result<(), LoggingError> {
    let builder = tracing_subscriber::fmt().with_env_filter(plan.env_filter());

    let installed = match (&plan.log_dir, plan.log_file()) {
        (Some(dir), Some(path)) => {
            fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
                path: dir.clone(),
                source,
            })?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| LoggingError::OpenFile { path, source })?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        _ => builder.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| LoggingError::Install(e.to_string()))
}
