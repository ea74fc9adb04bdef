// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

/// Value that marks a credential or endpoint as deliberately not configured.
///
/// Tasks that depend on such a value log and succeed without doing any IO.
pub const UNSET: &str = "unset";

/// True when `value` is empty or the [`UNSET`] sentinel.
pub fn is_unset(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == UNSET
}

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [build]
/// program = "make"
/// args = ["app_linux_amd64"]
///
/// [deploy]
/// sync = [{ from = "./go/", to = "webapp/go/" }]
/// remote = [["sudo", "systemctl", "restart", "app.service"]]
///
/// [newrelic]
/// app_id = "12345"
///
/// [users.alice]
/// github_id = 1
/// slack_id = "U0000001"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub deploy: DeploySection,

    #[serde(default)]
    pub git: GitSection,

    #[serde(default)]
    pub slack: SlackSection,

    #[serde(default)]
    pub newrelic: NewRelicSection,

    /// OS user name -> identities used for attribution in notifications.
    #[serde(default)]
    pub users: BTreeMap<String, UserInfo>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on the invariants checked there. Never mutated after load.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub build: BuildSection,
    pub deploy: DeploySection,
    pub git: GitSection,
    pub slack: SlackSection,
    pub newrelic: NewRelicSection,
    pub users: BTreeMap<String, UserInfo>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            build: raw.build,
            deploy: raw.deploy,
            git: raw.git,
            slack: raw.slack,
            newrelic: raw.newrelic,
            users: raw.users,
        }
    }

    pub fn user(&self, os_user: &str) -> Option<&UserInfo> {
        self.users.get(os_user)
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[build]` section: the local build command run before anything is copied.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    #[serde(default = "default_build_program")]
    pub program: String,

    #[serde(default = "default_build_args")]
    pub args: Vec<String>,

    /// Working directory for the build; defaults to the current directory.
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_build_program() -> String {
    "make".to_string()
}

fn default_build_args() -> Vec<String> {
    vec!["app_linux_amd64".to_string()]
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            program: default_build_program(),
            args: default_build_args(),
            dir: None,
        }
    }
}

/// `[deploy]` section: what gets copied to each target and what runs there.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySection {
    #[serde(default = "default_rsync_program")]
    pub rsync_program: String,

    /// Flags passed to rsync before the source and destination.
    #[serde(default = "default_rsync_args")]
    pub rsync_args: Vec<String>,

    #[serde(default = "default_ssh_program")]
    pub ssh_program: String,

    /// Paths to copy, in order. `to` is relative to the remote login directory.
    #[serde(default = "default_sync")]
    pub sync: Vec<SyncEntry>,

    /// Commands run on each target after the copy, in order.
    #[serde(default = "default_remote")]
    pub remote: Vec<Vec<String>>,

    /// How long a cancelled process gets to exit after SIGINT before it is killed.
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,
}

impl DeploySection {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncEntry {
    pub from: String,
    pub to: String,
}

impl SyncEntry {
    fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

fn default_rsync_program() -> String {
    "rsync".to_string()
}

fn default_ssh_program() -> String {
    "ssh".to_string()
}

fn default_rsync_args() -> Vec<String> {
    ["-avzL", "--exclude", ".git*", "-e", "ssh", "--rsync-path", "sudo -u isucon -i rsync"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// No --delete: it would wipe seed data under sql/ and go.mod under go/.
fn default_sync() -> Vec<SyncEntry> {
    vec![
        SyncEntry::new("./sql/", "webapp/sql/"),
        SyncEntry::new("./go.mod", "webapp/go/"),
        SyncEntry::new("./go.sum", "webapp/go/"),
        SyncEntry::new("./go/", "webapp/go/"),
    ]
}

fn default_remote() -> Vec<Vec<String>> {
    let argv = |parts: &[&str]| parts.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    vec![
        argv(&[
            "sudo",
            "-u",
            "isucon",
            "-i",
            "mv",
            "webapp/go/app_linux_amd64",
            "webapp/go/isucondition",
        ]),
        argv(&["sudo", "systemctl", "restart", "isucondition.go.service"]),
        argv(&["sudo", "systemctl", "status", "isucondition.go.service"]),
    ]
}

fn default_grace_period_secs() -> u64 {
    10
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            rsync_program: default_rsync_program(),
            rsync_args: default_rsync_args(),
            ssh_program: default_ssh_program(),
            sync: default_sync(),
            remote: default_remote(),
            grace_period_secs: default_grace_period_secs(),
        }
    }
}

/// `[git]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GitSection {
    /// Remote whose URL names the GitHub repository used for commit links.
    #[serde(default = "default_git_remote")]
    pub remote: String,
}

fn default_git_remote() -> String {
    "origin".to_string()
}

impl Default for GitSection {
    fn default() -> Self {
        Self {
            remote: default_git_remote(),
        }
    }
}

/// `[slack]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackSection {
    /// Incoming webhook URL. [`UNSET`] disables the notifications.
    #[serde(default = "default_unset")]
    pub webhook_url: String,

    #[serde(default = "default_slack_channel")]
    pub channel: String,

    #[serde(default = "default_slack_icon")]
    pub icon_emoji: String,
}

fn default_unset() -> String {
    UNSET.to_string()
}

fn default_slack_channel() -> String {
    "#general".to_string()
}

fn default_slack_icon() -> String {
    ":rocket:".to_string()
}

impl Default for SlackSection {
    fn default() -> Self {
        Self {
            webhook_url: default_unset(),
            channel: default_slack_channel(),
            icon_emoji: default_slack_icon(),
        }
    }
}

/// `[newrelic]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRelicSection {
    #[serde(default = "default_unset")]
    pub app_id: String,

    #[serde(default = "default_unset")]
    pub api_key: String,

    /// Deployment-record endpoint; `{app_id}` is substituted.
    #[serde(default = "default_newrelic_url_template")]
    pub url_template: String,
}

impl NewRelicSection {
    pub fn is_configured(&self) -> bool {
        !is_unset(&self.app_id) && !is_unset(&self.api_key)
    }

    pub fn deployments_url(&self) -> String {
        self.url_template.replace("{app_id}", self.app_id.trim())
    }
}

fn default_newrelic_url_template() -> String {
    "https://api.newrelic.com/v2/applications/{app_id}/deployments.json".to_string()
}

impl Default for NewRelicSection {
    fn default() -> Self {
        Self {
            app_id: default_unset(),
            api_key: default_unset(),
            url_template: default_newrelic_url_template(),
        }
    }
}

/// `[users.<os-user>]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    pub github_id: u64,
    pub slack_id: String,
}

impl UserInfo {
    pub fn avatar_url(&self) -> String {
        format!("https://avatars.githubusercontent.com/u/{}", self.github_id)
    }
}
