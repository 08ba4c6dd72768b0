//! Configuration resolution for training-sync
//!
//! Explicit configuration struct constructed once at startup and passed
//! into the components. Resolution priority per option: environment
//! variable → TOML config file → compiled default. Portal credentials
//! have no default and fail resolution with an actionable message.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Default TOML config location, relative to the working directory
const DEFAULT_CONFIG_FILE: &str = "training-sync.toml";

/// Runtime configuration for one sync run
#[derive(Debug, Clone)]
pub struct Config {
    /// Portal login account
    pub username: String,
    /// Portal login password
    pub password: String,
    /// Portal base URL; login page and completion API live under it
    pub base_url: String,
    /// sqlx connection URL for the training database
    pub database_url: String,
    /// OCR sidecar endpoint used to read captcha images
    pub ocr_endpoint: String,
    /// Session cookie persistence path
    pub cookie_file: PathBuf,
    /// Worker pool width for the reconciliation pass
    pub max_workers: usize,
    /// Bound on every portal/OCR HTTP call
    pub request_timeout: Duration,
    /// Login attempts before the run is aborted
    pub login_max_attempts: u32,
    /// Random inter-task delay range per worker, milliseconds
    pub task_delay_ms: (u64, u64),
    /// Random backoff range between failed login attempts, milliseconds
    pub login_backoff_ms: (u64, u64),
}

/// On-disk TOML shape; every field optional, env takes priority
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    username: Option<String>,
    password: Option<String>,
    base_url: Option<String>,
    database_url: Option<String>,
    ocr_endpoint: Option<String>,
    cookie_file: Option<String>,
    max_workers: Option<usize>,
    request_timeout_secs: Option<u64>,
    login_max_attempts: Option<u32>,
    task_delay_ms: Option<(u64, u64)>,
    login_backoff_ms: Option<(u64, u64)>,
}

impl Config {
    /// Load configuration from the environment and the default TOML file
    pub fn load() -> Result<Self> {
        let toml_path = std::env::var("SYNC_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&toml_path)
    }

    /// Load configuration, reading the TOML file at `toml_path` if present
    pub fn load_from(toml_path: &Path) -> Result<Self> {
        let file = read_toml_config(toml_path)?;

        let username = resolve("TII_USERNAME", file.username).ok_or_else(|| {
            Error::Config(
                "Portal username not configured. Set TII_USERNAME or add \
                 username = \"...\" to training-sync.toml"
                    .to_string(),
            )
        })?;
        let password = resolve("TII_PASSWORD", file.password).ok_or_else(|| {
            Error::Config(
                "Portal password not configured. Set TII_PASSWORD or add \
                 password = \"...\" to training-sync.toml"
                    .to_string(),
            )
        })?;

        let base_url = resolve("SYNC_BASE_URL", file.base_url)
            .unwrap_or_else(|| "https://elearning.tii.org.tw".to_string());
        let database_url = resolve("DATABASE_URL", file.database_url)
            .unwrap_or_else(|| "sqlite://training_sync.db?mode=rwc".to_string());
        let ocr_endpoint = resolve("SYNC_OCR_ENDPOINT", file.ocr_endpoint)
            .unwrap_or_else(|| "http://127.0.0.1:9898/ocr".to_string());
        let cookie_file = resolve("SYNC_COOKIE_FILE", file.cookie_file)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("tii_elearning_cookies.txt"));

        let max_workers = resolve_parsed("SYNC_MAX_WORKERS", file.max_workers)?.unwrap_or(5);
        let request_timeout_secs =
            resolve_parsed("SYNC_REQUEST_TIMEOUT_SECS", file.request_timeout_secs)?.unwrap_or(30);
        let login_max_attempts =
            resolve_parsed("SYNC_LOGIN_MAX_ATTEMPTS", file.login_max_attempts)?.unwrap_or(10);

        let task_delay_ms = validate_range(file.task_delay_ms.unwrap_or((1_000, 3_000)))?;
        let login_backoff_ms = validate_range(file.login_backoff_ms.unwrap_or((2_000, 4_000)))?;

        if max_workers == 0 {
            return Err(Error::Config("max_workers must be at least 1".to_string()));
        }

        Ok(Config {
            username,
            password,
            base_url,
            database_url,
            ocr_endpoint,
            cookie_file,
            max_workers,
            request_timeout: Duration::from_secs(request_timeout_secs),
            login_max_attempts,
            task_delay_ms,
            login_backoff_ms,
        })
    }
}

/// Read the TOML file if it exists; a missing file is not an error,
/// an unparseable one is.
fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Ok(TomlConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Environment variable wins over the TOML value
fn resolve(env_key: &str, toml_value: Option<String>) -> Option<String> {
    match std::env::var(env_key) {
        Ok(v) if !v.trim().is_empty() => {
            if toml_value.is_some() {
                warn!(
                    "{} set in both environment and TOML config. Using environment.",
                    env_key
                );
            }
            Some(v)
        }
        _ => toml_value,
    }
}

/// Same priority as `resolve`, parsing the environment string
fn resolve_parsed<T: std::str::FromStr>(env_key: &str, toml_value: Option<T>) -> Result<Option<T>> {
    match std::env::var(env_key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} has invalid value: {:?}", env_key, v))),
        _ => Ok(toml_value),
    }
}

fn validate_range(range: (u64, u64)) -> Result<(u64, u64)> {
    if range.0 > range.1 {
        return Err(Error::Config(format!(
            "delay range minimum {} exceeds maximum {}",
            range.0, range.1
        )));
    }
    Ok(range)
}
