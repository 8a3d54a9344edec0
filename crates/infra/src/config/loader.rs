//! Configuration loader
//!
//! ## Loading Strategy
//! 1. `.env` in the working directory is read into the process environment
//!    (existing variables win)
//! 2. The first config file found by [`probe_config_paths`] provides the base;
//!    without one the built-in defaults are used
//! 3. `DAOSYNC_*` environment variables override individual fields
//! 4. The result is validated
//!
//! ## Environment Variables
//! - `DAOSYNC_DB_PATH`, `DAOSYNC_DB_POOL_SIZE`
//! - `DAOSYNC_API_BASE_URL`, `DAOSYNC_API_BEARER_TOKEN`,
//!   `DAOSYNC_API_TIMEOUT_SECS`, `DAOSYNC_API_MAX_ATTEMPTS`
//! - `DAOSYNC_LOOKBACK_DAYS`, `DAOSYNC_SCHEDULE_INTERVAL_HOURS`,
//!   `DAOSYNC_MAX_REQUESTS_PER_BATCH`, `DAOSYNC_METRICS_IDS_PER_REQUEST`
//! - `DAOSYNC_RATE_LIMIT_ALLOWED`, `DAOSYNC_RATE_WINDOW_SECS`
//! - `DAOSYNC_LOG_RETENTION_DAYS` (`0` or `off` disables pruning)
//! - `DAOSYNC_LOG_LEVEL`, `DAOSYNC_LOG_JSON`
//!
//! ## File Locations
//! `daosync.toml`, `daosync.json`, `config.toml`, `config.json` in the
//! working directory, then next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use daosync_domain::{Config, DaoSyncError, Result};

const FILE_NAMES: [&str; 4] = ["daosync.toml", "daosync.json", "config.toml", "config.json"];

/// Load, merge and validate the configuration
///
/// # Errors
/// Returns `DaoSyncError::Config` if a config file cannot be parsed, an
/// environment override is malformed or the merged config is invalid.
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => {
            return Err(DaoSyncError::Config(format!("Failed to read .env file: {err}")));
        }
    }

    let mut config = match probe_config_paths() {
        Some(path) => load_from_file(&path)?,
        None => {
            tracing::debug!("no config file found, starting from defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;

    tracing::info!(
        db_path = %config.database.path,
        api_base_url = %config.api.base_url,
        bearer_token_set = config.api.bearer_token.is_some(),
        "configuration loaded"
    );
    Ok(config)
}

/// Load configuration from a file without environment overrides
///
/// Format is chosen by extension (`.toml` or `.json`). Sections and fields
/// left out of the file keep their defaults.
///
/// # Errors
/// Returns `DaoSyncError::Config` if the file is missing or unparseable.
pub fn load_from_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(DaoSyncError::Config(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| DaoSyncError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| DaoSyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| DaoSyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(DaoSyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in the standard locations
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    probe_dirs(&dirs)
}

fn probe_dirs(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

/// Overlay `DAOSYNC_*` variables onto `config`
///
/// `lookup` abstracts the environment so the mapping can be tested without
/// touching process state.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| {
        lookup(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
    };

    if let Some(path) = var("DAOSYNC_DB_PATH") {
        config.database.path = path;
    }
    override_parsed(&var, "DAOSYNC_DB_POOL_SIZE", &mut config.database.pool_size)?;

    if let Some(url) = var("DAOSYNC_API_BASE_URL") {
        config.api.base_url = url;
    }
    if let Some(token) = var("DAOSYNC_API_BEARER_TOKEN") {
        config.api.bearer_token = Some(token);
    }
    override_parsed(&var, "DAOSYNC_API_TIMEOUT_SECS", &mut config.api.timeout_secs)?;
    override_parsed(&var, "DAOSYNC_API_MAX_ATTEMPTS", &mut config.api.max_attempts)?;

    let sync = &mut config.sync;
    override_parsed(&var, "DAOSYNC_LOOKBACK_DAYS", &mut sync.lookback_days)?;
    override_parsed(&var, "DAOSYNC_SCHEDULE_INTERVAL_HOURS", &mut sync.schedule_interval_hours)?;
    override_parsed(&var, "DAOSYNC_MAX_REQUESTS_PER_BATCH", &mut sync.max_requests_per_batch)?;
    override_parsed(&var, "DAOSYNC_METRICS_IDS_PER_REQUEST", &mut sync.metrics_ids_per_request)?;
    override_parsed(&var, "DAOSYNC_RATE_LIMIT_ALLOWED", &mut sync.rate_limit_allowed)?;
    override_parsed(&var, "DAOSYNC_RATE_WINDOW_SECS", &mut sync.rate_window_secs)?;

    if let Some(raw) = var("DAOSYNC_LOG_RETENTION_DAYS") {
        sync.log_retention_days = match raw.to_ascii_lowercase().as_str() {
            "0" | "off" | "none" => None,
            _ => Some(parse_value("DAOSYNC_LOG_RETENTION_DAYS", &raw)?),
        };
    }

    if let Some(level) = var("DAOSYNC_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(raw) = var("DAOSYNC_LOG_JSON") {
        config.logging.json = parse_bool(&raw);
    }

    Ok(())
}

fn override_parsed<T, V>(var: &V, key: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    V: Fn(&str) -> Option<String>,
{
    if let Some(raw) = var(key) {
        *target = parse_value(key, &raw)?;
    }
    Ok(())
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| DaoSyncError::Config(format!("Invalid value for {key}: {e}")))
}

/// Accepts `1`/`true`/`yes`/`on` (case-insensitive); anything else is false
fn parse_bool(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
