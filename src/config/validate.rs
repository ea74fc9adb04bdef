// src/config/validate.rs

use crate::config::model::{is_unset, ConfigFile, RawConfigFile};
use crate::errors::{Result, RolloutError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RolloutError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_build(cfg)?;
    validate_deploy(cfg)?;
    validate_notifications(cfg)?;
    validate_users(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> RolloutError {
    RolloutError::ConfigError(msg.into())
}

fn validate_build(cfg: &RawConfigFile) -> Result<()> {
    if cfg.build.program.trim().is_empty() {
        return Err(config_error("[build].program must not be empty"));
    }
    Ok(())
}

fn validate_deploy(cfg: &RawConfigFile) -> Result<()> {
    let deploy = &cfg.deploy;

    if deploy.rsync_program.trim().is_empty() {
        return Err(config_error("[deploy].rsync_program must not be empty"));
    }
    if deploy.ssh_program.trim().is_empty() {
        return Err(config_error("[deploy].ssh_program must not be empty"));
    }

    for (idx, entry) in deploy.sync.iter().enumerate() {
        if entry.from.trim().is_empty() || entry.to.trim().is_empty() {
            return Err(config_error(format!(
                "[deploy].sync[{idx}] needs both `from` and `to`"
            )));
        }
    }

    for (idx, argv) in deploy.remote.iter().enumerate() {
        if argv.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(config_error(format!(
                "[deploy].remote[{idx}] must start with a program name"
            )));
        }
    }

    Ok(())
}

fn validate_notifications(cfg: &RawConfigFile) -> Result<()> {
    let webhook = &cfg.slack.webhook_url;
    if !is_unset(webhook) && !is_http_url(webhook) {
        return Err(config_error(format!(
            "[slack].webhook_url must be an http(s) URL (got {webhook:?})"
        )));
    }

    let template = &cfg.newrelic.url_template;
    if !template.contains("{app_id}") {
        return Err(config_error(
            "[newrelic].url_template must contain the `{app_id}` placeholder",
        ));
    }
    if !is_http_url(template) {
        return Err(config_error(format!(
            "[newrelic].url_template must be an http(s) URL (got {template:?})"
        )));
    }

    Ok(())
}

fn validate_users(cfg: &RawConfigFile) -> Result<()> {
    for (name, user) in cfg.users.iter() {
        if user.slack_id.trim().is_empty() {
            return Err(config_error(format!(
                "[users.{name}].slack_id must not be empty"
            )));
        }
    }
    Ok(())
}

fn is_http_url(s: &str) -> bool {
    let s = s.trim();
    s.starts_with("https://") || s.starts_with("http://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{SyncEntry, UserInfo};

    #[test]
    fn defaults_are_valid() {
        assert!(ConfigFile::try_from(RawConfigFile::default()).is_ok());
    }

    #[test]
    fn rejects_empty_remote_command() {
        let mut raw = RawConfigFile::default();
        raw.deploy.remote.push(Vec::new());

        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("[deploy].remote[3]"), "{err}");
    }

    #[test]
    fn rejects_half_specified_sync_entry() {
        let mut raw = RawConfigFile::default();
        raw.deploy.sync = vec![SyncEntry {
            from: "./bin/".into(),
            to: " ".into(),
        }];

        assert!(matches!(
            ConfigFile::try_from(raw),
            Err(RolloutError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_url_template_without_placeholder() {
        let mut raw = RawConfigFile::default();
        raw.newrelic.url_template = "https://api.newrelic.com/v2/deployments.json".into();

        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn rejects_non_http_webhook_but_accepts_sentinel() {
        let mut raw = RawConfigFile::default();
        raw.slack.webhook_url = "hooks.slack.com/services/x".into();
        assert!(ConfigFile::try_from(raw.clone()).is_err());

        raw.slack.webhook_url = "unset".into();
        assert!(ConfigFile::try_from(raw).is_ok());
    }

    #[test]
    fn rejects_user_without_slack_id() {
        let mut raw = RawConfigFile::default();
        raw.users.insert(
            "alice".into(),
            UserInfo {
                github_id: 1,
                slack_id: String::new(),
            },
        );

        assert!(ConfigFile::try_from(raw).is_err());
    }
}
