//! Configuration loading for the host inventory.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `INVENTORY_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable prefix recognised by the loader.
pub const ENV_PREFIX: &str = "INVENTORY_";

/// Application configuration derived from `INVENTORY_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Returns a redacted JSON representation (database password is redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if let Ok(mut url) = Url::parse(&config.database_url)
            && url.password().is_some()
            && url.set_password(Some("[REDACTED]")).is_ok()
        {
            config.database_url = url.to_string();
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error for unusable settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        if let Err(err) = Url::parse(&self.database_url) {
            return Err(ConfigError::InvalidDatabaseUrl {
                error: err.to_string(),
            });
        }

        if self.db_max_connections == 0 || self.db_max_connections > 100 {
            return Err(ConfigError::InvalidMaxConnections {
                value: self.db_max_connections,
            });
        }

        if self.db_acquire_timeout_ms < 100 {
            return Err(ConfigError::InvalidAcquireTimeout {
                value: self.db_acquire_timeout_ms,
            });
        }

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "postgresql://inventory@localhost:5432/inventory".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("database URL is missing; set INVENTORY_DATABASE_URL")]
    MissingDatabaseUrl,
    #[error("database URL is invalid: {error}")]
    InvalidDatabaseUrl { error: String },
    #[error("database max connections must be between 1 and 100, got {value}")]
    InvalidMaxConnections { value: u32 },
    #[error("database acquire timeout must be at least 100ms, got {value}")]
    InvalidAcquireTimeout { value: u64 },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Loads configuration using layered `.env` files and `INVENTORY_*` env vars.
///
/// Later layers win: `.env`, `.env.local`, `.env.<profile>`,
/// `.env.<profile>.local`, then the process environment.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections = parse_or(
            &mut layered,
            "DB_MAX_CONNECTIONS",
            default_db_max_connections,
        )?;
        let db_acquire_timeout_ms = parse_or(
            &mut layered,
            "DB_ACQUIRE_TIMEOUT_MS",
            default_db_acquire_timeout_ms,
        )?;

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
        };

        config.validate()?;

        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_or<T, F>(
    layered: &mut BTreeMap<String, String>,
    key: &str,
    default: F,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: FnOnce() -> T,
{
    match layered.remove(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}{key}"),
                value,
            }),
        None => Ok(default()),
    }
}
