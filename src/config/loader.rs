// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, RolloutError};

/// Environment variables that override secrets from the config file.
pub const ENV_SLACK_WEBHOOK_URL: &str = "ROLLOUT_SLACK_WEBHOOK_URL";
pub const ENV_NEWRELIC_APP_ID: &str = "ROLLOUT_NEWRELIC_APP_ID";
pub const ENV_NEWRELIC_API_KEY: &str = "ROLLOUT_NEWRELIC_API_KEY";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        RolloutError::ConfigError(format!("cannot read {}: {e}", path.display()))
    })?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// Environment overrides are *not* applied; see [`load`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// Resolve, load, override and validate the configuration used by a run.
///
/// - An explicit `path` must exist.
/// - Without one, [`default_config_path`] is used when present, otherwise the
///   built-in defaults.
/// - Secrets from the process environment win over the file.
pub fn load(path: Option<&str>) -> Result<ConfigFile> {
    let mut raw = match path {
        Some(path) => load_from_path(path)?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                load_from_path(&default_path)?
            } else {
                debug!(path = %default_path.display(), "no config file; using built-in defaults");
                RawConfigFile::default()
            }
        }
    };

    apply_env_overrides(&mut raw, |key| std::env::var(key).ok());
    ConfigFile::try_from(raw)
}

/// Overwrite secrets in `raw` with values returned by `lookup`.
///
/// `lookup` is the environment in production; tests pass a closure.
pub fn apply_env_overrides<F>(raw: &mut RawConfigFile, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_SLACK_WEBHOOK_URL) {
        raw.slack.webhook_url = url;
    }
    if let Some(app_id) = lookup(ENV_NEWRELIC_APP_ID) {
        raw.newrelic.app_id = app_id;
    }
    if let Some(api_key) = lookup(ENV_NEWRELIC_API_KEY) {
        raw.newrelic.api_key = api_key;
    }
}

/// `Rollout.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Rollout.toml")
}
