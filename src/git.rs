// src/git.rs

//! Version-control collaborator.
//!
//! Thin read-only wrappers around the `git` CLI. Every query returns trimmed
//! stdout or a [`RolloutError::GitQuery`] naming the command that failed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;

use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::errors::{Result, RolloutError};

// Either scheme://[user@]host[:port]/owner/repo or scp-style [user@]host:owner/repo,
// with an optional `.git` suffix and trailing slash.
static REMOTE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[a-z][a-z0-9+.-]*://(?:[^@/]+@)?[^/:@]+(?::\d+)?/|(?:[^@/:]+@)?[^/:@]+:)(?P<path>[^/]+/[^/]+?)(?:\.git)?/?$",
    )
    .expect("remote URL regex is valid")
});

/// Snapshot of the revision being deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// `git describe --dirty --always --abbrev=0`
    pub descriptive: String,
    /// Full commit hash of `HEAD`.
    pub sha: String,
    /// Symbolic ref of `HEAD`, e.g. `refs/heads/main`.
    pub branch: String,
    /// `git show -s --oneline HEAD`
    pub summary: String,
    /// `owner/repo` parsed from the configured remote.
    pub repo_full_name: String,
}

/// A git working tree queried through the `git` binary.
#[derive(Debug, Clone, Default)]
pub struct GitRepo {
    dir: Option<PathBuf>,
}

impl GitRepo {
    /// Repository containing the current working directory.
    pub fn current() -> Self {
        Self::default()
    }

    pub fn at(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: Some(dir.as_ref().to_path_buf()),
        }
    }

    pub async fn descriptive_revision(&self) -> Result<String> {
        self.query(&["describe", "--dirty", "--always", "--abbrev=0"]).await
    }

    pub async fn current_branch(&self) -> Result<String> {
        self.query(&["rev-parse", "--symbolic-full-name", "HEAD"]).await
    }

    pub async fn commit_message(&self) -> Result<String> {
        self.query(&["show", "-s", "--oneline", "HEAD"]).await
    }

    pub async fn sha(&self) -> Result<String> {
        self.query(&["rev-parse", "HEAD"]).await
    }

    pub async fn remote_url(&self, remote: &str) -> Result<String> {
        self.query(&["remote", "get-url", remote]).await
    }

    /// `owner/repo` for `remote`, as used in GitHub commit links.
    pub async fn repo_full_name(&self, remote: &str) -> Result<String> {
        let url = self.remote_url(remote).await?;
        repo_full_name_from_url(&url).ok_or_else(|| RolloutError::GitQuery {
            query: format!("git remote get-url {remote}"),
            message: format!("cannot derive owner/repo from remote URL {url:?}"),
        })
    }

    /// Run every query needed to describe the deploy.
    pub async fn revision(&self, remote: &str) -> Result<Revision> {
        Ok(Revision {
            descriptive: self.descriptive_revision().await?,
            sha: self.sha().await?,
            branch: self.current_branch().await?,
            summary: self.commit_message().await?,
            repo_full_name: self.repo_full_name(remote).await?,
        })
    }

    async fn query(&self, args: &[&str]) -> Result<String> {
        let query = format!("git {}", args.join(" "));
        debug!(%query, "running git query");

        let mut cmd = Command::new("git");
        cmd.args(args).stdin(Stdio::null());
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| RolloutError::GitQuery {
            query: query.clone(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(RolloutError::GitQuery {
                query,
                message: format!(
                    "exit status {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Extract `owner/repo` from an https, ssh or scp-style remote URL.
pub fn repo_full_name_from_url(url: &str) -> Option<String> {
    let caps = REMOTE_URL_RE.captures(url.trim())?;
    caps.name("path").map(|path| path.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_https_remote() {
        assert_eq!(
            repo_full_name_from_url("https://github.com/acme/webapp.git\n").as_deref(),
            Some("acme/webapp")
        );
        assert_eq!(
            repo_full_name_from_url("https://github.com/acme/webapp").as_deref(),
            Some("acme/webapp")
        );
    }

    #[test]
    fn parses_scp_and_ssh_remotes() {
        assert_eq!(
            repo_full_name_from_url("git@github.com:acme/webapp.git").as_deref(),
            Some("acme/webapp")
        );
        assert_eq!(
            repo_full_name_from_url("ssh://git@github.com:22/acme/webapp.git").as_deref(),
            Some("acme/webapp")
        );
    }

    #[test]
    fn parses_scp_remote_without_user_and_trailing_slash() {
        assert_eq!(
            repo_full_name_from_url("github.com:acme/webapp").as_deref(),
            Some("acme/webapp")
        );
        assert_eq!(
            repo_full_name_from_url("https://github.com/acme/webapp/").as_deref(),
            Some("acme/webapp")
        );
    }

    #[test]
    fn rejects_bare_host() {
        assert_eq!(repo_full_name_from_url("https://github.com/"), None);
        assert_eq!(repo_full_name_from_url("https://github.com"), None);
        assert_eq!(repo_full_name_from_url(""), None);
    }

    #[test]
    fn rejects_path_without_owner() {
        assert_eq!(repo_full_name_from_url("https://github.com/webapp.git"), None);
        assert_eq!(repo_full_name_from_url("git@github.com:webapp"), None);
    }
}
