//! Application settings (lives in the OS config directory).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::currency::{Currency, DEFAULT_RATES_TTL, DEFAULT_RATES_URL};
use crate::model::DEFAULT_HISTORY_LIMIT;
use crate::store::StoreOptions;

pub const ENV_DATA_DIR: &str = "PM_DASHBOARD_DATA_DIR";
pub const ENV_LOG: &str = "PM_DASHBOARD_LOG";
const APP_NAME: &str = "RustPmDashboard";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CurrencySettings {
    /// Rate endpoint; empty disables the lookup and uses fixed rates.
    pub rates_url: String,
    pub ttl_secs: u64,
    /// Currency totals are reported in.
    pub display: Currency,
}

impl Default for CurrencySettings {
    fn default() -> Self {
        Self {
            rates_url: DEFAULT_RATES_URL.to_string(),
            ttl_secs: DEFAULT_RATES_TTL.as_secs(),
            display: Currency::Brl,
        }
    }
}

impl CurrencySettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Where the store's JSON files live. `None` means the OS data dir.
    pub data_dir: Option<PathBuf>,
    pub actor: String,
    pub history_limit: usize,
    pub log_level: String,
    pub currency: CurrencySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            actor: "User".into(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            log_level: "info".into(),
            currency: CurrencySettings::default(),
        }
    }
}

impl Config {
    /// Default location of `config.json`.
    pub fn default_path() -> PathBuf {
        match directories::ProjectDirs::from("", "", APP_NAME) {
            Some(dirs) => dirs.config_dir().join("config.json"),
            None => PathBuf::from("config.json"),
        }
    }

    /// Load from an explicit path. A missing file yields defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the config, then apply environment overrides.
    ///
    /// A file that cannot be read or parsed yields defaults plus the error,
    /// so the caller can report it once logging is up.
    pub fn load(path: Option<&Path>) -> (Self, Option<ConfigError>) {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let (mut config, error) = match Self::from_file(&path) {
            Ok(config) => (config, None),
            Err(err) => (Self::default(), Some(err)),
        };
        config.apply_env(|key| std::env::var(key).ok());
        (config, error)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = var(ENV_LOG).filter(|v| !v.is_empty()) {
            self.log_level = level;
        }
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        match directories::ProjectDirs::from("", "", APP_NAME) {
            Some(dirs) => dirs.data_dir().to_path_buf(),
            None => PathBuf::from("."),
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            actor: self.actor.clone(),
            history_limit: self.history_limit,
        }
    }
}
