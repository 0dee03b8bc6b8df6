//! Configuration loader
//!
//! Loads Changecast configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `CHANGECAST_REQUESTS_PER_SECOND` is missing or a value is invalid,
//!    falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `CHANGECAST_REQUESTS_PER_SECOND`: Outbound call rate (required)
//! - `CHANGECAST_BATCH_WORKERS`: Worker bound per batch
//! - `CHANGECAST_BATCH_DEADLINE_SECS`: Deadline for a whole batch
//! - `CHANGECAST_RETRY_MAX_ATTEMPTS`: Attempts per item, including the first
//! - `CHANGECAST_RETRY_INITIAL_DELAY_MS`: First backoff delay
//! - `CHANGECAST_RETRY_BACKOFF_BASE`: Exponential backoff multiplier
//! - `CHANGECAST_RETRY_MAX_DELAY_MS`: Backoff cap
//! - `CHANGECAST_RETRY_JITTER`: `none`, `full` or `equal`
//! - `CHANGECAST_RETRY_MAX_TOTAL_SECS`: Retry time budget
//! - `CHANGECAST_DEFAULT_TIMEZONE`: IANA zone for meetings without one
//! - `CHANGECAST_OUTPUT_PREFIXES`: Comma-separated keys the pipeline writes
//! - `CHANGECAST_MARKER_KEY` / `CHANGECAST_MARKER_VALUE`: Output marker
//! - `CHANGECAST_LOG_LEVEL`: Default log filter
//! - `CHANGECAST_LOG_JSON`: Emit JSON logs (true/false)
//!
//! Optional variables that are unset keep their defaults.
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./changecast.json` or `./changecast.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names next to the executable

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use changecast_domain::{ChangecastError, Config, JitterMode, Result};

const ENV_PREFIX: &str = "CHANGECAST_";

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If that fails, falls
/// back to loading from a config file.
///
/// # Errors
/// Returns `ChangecastError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `ChangecastError::Config` if the required variable is missing or
/// any present variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.rate_limit.requests_per_second = parse_value(
        &env_key("REQUESTS_PER_SECOND"),
        &env_var(&env_key("REQUESTS_PER_SECOND"))?,
    )?;

    if let Some(workers) = env_parse(&env_key("BATCH_WORKERS"))? {
        config.batch.workers = workers;
    }
    if let Some(secs) = env_parse(&env_key("BATCH_DEADLINE_SECS"))? {
        config.batch.deadline_secs = Some(secs);
    }

    if let Some(attempts) = env_parse(&env_key("RETRY_MAX_ATTEMPTS"))? {
        config.retry.max_attempts = attempts;
    }
    if let Some(delay) = env_parse(&env_key("RETRY_INITIAL_DELAY_MS"))? {
        config.retry.initial_delay_ms = delay;
    }
    if let Some(base) = env_parse(&env_key("RETRY_BACKOFF_BASE"))? {
        config.retry.backoff_base = base;
    }
    if let Some(delay) = env_parse(&env_key("RETRY_MAX_DELAY_MS"))? {
        config.retry.max_delay_ms = delay;
    }
    if let Some(jitter) = env_parse::<JitterMode>(&env_key("RETRY_JITTER"))? {
        config.retry.jitter = jitter;
    }
    if let Some(secs) = env_parse(&env_key("RETRY_MAX_TOTAL_SECS"))? {
        config.retry.max_total_secs = Some(secs);
    }

    if let Some(zone) = env_opt(&env_key("DEFAULT_TIMEZONE")) {
        config.reconciler.default_timezone = zone;
    }

    if let Some(prefixes) = env_opt(&env_key("OUTPUT_PREFIXES")) {
        config.event_guard.output_prefixes = prefixes
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(key) = env_opt(&env_key("MARKER_KEY")) {
        config.event_guard.marker_key = key;
    }
    if let Some(value) = env_opt(&env_key("MARKER_VALUE")) {
        config.event_guard.marker_value = value;
    }

    if let Some(level) = env_opt(&env_key("LOG_LEVEL")) {
        config.logging.level = level;
    }
    config.logging.json = env_bool(&env_key("LOG_JSON"), config.logging.json);

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ChangecastError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - A value fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ChangecastError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ChangecastError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ChangecastError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`); a missing
/// extension is read as JSON.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ChangecastError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ChangecastError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ChangecastError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["changecast.json", "changecast.toml", "config.json", "config.toml"];

    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter().flat_map(|dir| NAMES.iter().map(move |name| dir.join(name))).find(|p| p.exists())
}

fn env_key(suffix: &str) -> String {
    format!("{ENV_PREFIX}{suffix}")
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        ChangecastError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Optional variable; blank counts as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    env_opt(key).map(|raw| parse_value(key, &raw)).transpose()
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ChangecastError::Config(format!("Invalid value for {key}: {e}")))
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
