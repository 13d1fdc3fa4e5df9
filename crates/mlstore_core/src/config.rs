//! Process-wide store settings.
//!
//! Settings are layered with figment, highest priority first:
//! 1. `MLSTORE_*` environment variables (`MLSTORE_DB_PATH` -> `db_path`)
//! 2. Built-in defaults
//!
//! [`StoreConfig::load_with_dotenv`] additionally reads a `.env` file from
//! the working directory before the environment layer is built.
//!
//! # Invariants
//! - Settings are resolved once per process and never change afterwards.
//! - Unset variables fall back to defaults; malformed values are errors.

use crate::db::DEFAULT_BUSY_TIMEOUT;
use crate::logging::default_log_level;
use figment::providers::{Env, Serialized};
use figment::Figment;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_PREFIX: &str = "MLSTORE_";

const DEFAULT_DB_FILE_NAME: &str = "mlstore.sqlite3";

static STORE_CONFIG: OnceCell<StoreConfig> = OnceCell::new();

#[derive(Debug)]
pub enum ConfigError {
    /// A layer could not be read or a value has the wrong shape.
    Figment(Box<figment::Error>),
    /// A value parsed but cannot be used.
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Figment(err) => write!(f, "configuration error: {err}"),
            Self::InvalidValue { field, reason } => {
                write!(f, "invalid configuration value for `{field}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Figment(err) => Some(err.as_ref()),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        Self::Figment(Box::new(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Logging stays off when unset or blank.
    pub log_dir: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout_ms: u64::try_from(DEFAULT_BUSY_TIMEOUT.as_millis()).unwrap_or(5_000),
        }
    }
}

impl StoreConfig {
    /// Defaults overlaid with `MLSTORE_*` environment variables.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    /// Loads settings from defaults and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Loads a `.env` file from the working directory, if any, then
    /// behaves like [`StoreConfig::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Extracts settings from any figment, normalizing blank values.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let mut config: Self = figment.extract()?;

        if config.db_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "db_path",
                reason: "path must not be empty".to_string(),
            });
        }
        if config.log_level.trim().is_empty() {
            config.log_level = default_log_level().to_string();
        }
        if config
            .log_dir
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().is_empty())
        {
            config.log_dir = None;
        }

        Ok(config)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Returns the process-wide settings, loading them on first use.
pub fn store_config() -> Result<&'static StoreConfig, ConfigError> {
    STORE_CONFIG.get_or_try_init(StoreConfig::load_with_dotenv)
}
