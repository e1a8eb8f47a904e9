//! Migration run settings
//!
//! Loaded from `config/config.toml` (optional, `[migrations]` section) and
//! environment variables prefixed with `TIDEMARK__`, e.g.
//! `TIDEMARK__MIGRATIONS__LOCK_TIMEOUT_SECONDS=5`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config/config.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MigrateConfig {
    /// Directory holding the `version_*.rs` migration files
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    /// Location of the JSON execution store
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Directory for run lock files
    #[serde(default = "default_lock_dir")]
    pub lock_dir: PathBuf,
    #[serde(default = "default_lock_name")]
    pub lock_name: String,
    #[serde(default = "default_lock_timeout_seconds")]
    pub lock_timeout_seconds: u64,
}

fn default_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_store_path() -> PathBuf {
    PathBuf::from("migrations/executions.json")
}

fn default_lock_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_lock_name() -> String {
    "tidemark".to_string()
}

fn default_lock_timeout_seconds() -> u64 {
    60
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            store_path: default_store_path(),
            lock_dir: default_lock_dir(),
            lock_name: default_lock_name(),
            lock_timeout_seconds: default_lock_timeout_seconds(),
        }
    }
}

impl MigrateConfig {
    /// Load from `config/config.toml`, falling back to env vars
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if neither the file nor the environment yields a
    /// valid configuration.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from the given TOML file (optional), then env vars
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if neither the file nor the environment yields a
    /// valid configuration.
    pub fn load_from(config_file: &Path) -> Result<Self, ConfigError> {
        let file_and_env = Config::builder()
            .add_source(File::from(config_file).required(false))
            .add_source(env_source())
            .build();

        let settings = match file_and_env {
            Ok(settings) => settings,
            Err(err) => {
                // An unreadable or malformed file should not block env-only setups
                if config_file.exists() {
                    log::warn!(
                        "Failed to load config file {}, falling back to env. Error: {}",
                        config_file.display(),
                        err
                    );
                }
                Config::builder()
                    .add_source(env_source())
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {err}, then env-only error: {env_err}"
                        ))
                    })?
            }
        };

        match settings.get::<MigrateConfig>("migrations") {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Migrations configuration could not be loaded from file or environment: {e}"
            ))),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_seconds)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("TIDEMARK").separator("__")
}
