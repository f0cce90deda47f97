//! Application configuration loaded from environment variables.
//!
//! Fail-fast: required variables must be present and valid or the server
//! exits with a clear error message before touching anything else.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

use assetflow_sync::{PhotoMissPolicy, SchedulerConfig};

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// An environment variable holds an unparseable value.
    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: &'static str, message: String },
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Required.
    pub database_url: String,

    /// Bind host for the health endpoints.
    pub host: String,

    /// Bind port for the health endpoints.
    pub port: u16,

    /// Log filter directive.
    pub rust_log: String,

    /// Root directory for stored user photos.
    pub photo_storage_root: PathBuf,

    /// Directory sync interval in seconds.
    pub sync_interval_secs: u64,

    /// Whether to remember users without a photo instead of retrying every
    /// cycle.
    pub photo_negative_cache: bool,

    /// Capacity of the photo fetch queue.
    pub photo_queue_capacity: usize,
}

impl Config {
    /// Loads configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
            photo_storage_root: PathBuf::from(env_or(
                "PHOTO_STORAGE_ROOT",
                "./storage/user-photos",
            )),
            sync_interval_secs: env_parse("SYNC_INTERVAL_SECS", 60)?,
            photo_negative_cache: parse_bool(&env_or("PHOTO_NEGATIVE_CACHE", "false"))
                .ok_or_else(|| ConfigError::InvalidValue {
                    var: "PHOTO_NEGATIVE_CACHE",
                    message: "expected true or false".to_string(),
                })?,
            photo_queue_capacity: env_parse("PHOTO_QUEUE_CAPACITY", 1024)?,
        })
    }

    /// Bind address for the health endpoints.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Negative-cache policy for missing photos.
    #[must_use]
    pub fn photo_miss_policy(&self) -> PhotoMissPolicy {
        if self.photo_negative_cache {
            PhotoMissPolicy::Remember
        } else {
            PhotoMissPolicy::RetryAlways
        }
    }

    /// Scheduler intervals, with the sync interval taken from the
    /// environment.
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            sync_interval: std::time::Duration::from_secs(self.sync_interval_secs),
            ..SchedulerConfig::default()
        }
    }
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(value) => value.parse().map_err(|e| ConfigError::InvalidValue {
            var,
            message: format!("{e}"),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
