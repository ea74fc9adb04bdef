// src/notify/mod.rs

//! Outbound webhook leaves.
//!
//! - [`slack`] posts the start / finish announcements.
//! - [`newrelic`] records the deployment with New Relic APM.
//!
//! Both are [`Task`](crate::task::Task)s: one HTTP POST per run, aborted when
//! the cancellation token fires, and skipped (successfully) when their
//! endpoint or credentials carry the [`UNSET`](crate::config::UNSET) sentinel.

use reqwest::RequestBuilder;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{Result, RolloutError};
use crate::git::Revision;

pub mod newrelic;
pub mod slack;

pub use newrelic::RecordDeployment;
pub use slack::PostSlack;

/// Who deployed what, where. Shared by every notification of one run.
#[derive(Debug, Clone)]
pub struct DeployInfo {
    /// OS user running the deploy.
    pub user: String,
    pub revision: Revision,
    pub targets: Vec<String>,
}

impl DeployInfo {
    /// `<user> deployed <revision>: <summary>`
    pub fn changelog_line(&self) -> String {
        format!(
            "{} deployed {}: {}",
            self.user, self.revision.descriptive, self.revision.summary
        )
    }
}

/// Name of the invoking OS user, from `USER` (or `USERNAME` on Windows).
pub fn invoking_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Send `request`, racing it against `cancel`; non-2xx becomes
/// [`RolloutError::HttpStatus`] carrying the response body.
pub(crate) async fn send(
    request: RequestBuilder,
    endpoint: &str,
    task: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let response = tokio::select! {
        response = request.send() => response?,
        _ = cancel.cancelled() => {
            return Err(RolloutError::Cancelled { task: task.to_string() });
        }
    };

    let status = response.status();
    debug!(%endpoint, status = status.as_u16(), "webhook responded");

    if status.is_success() {
        return Ok(());
    }

    let body = tokio::select! {
        body = response.text() => body.unwrap_or_default(),
        _ = cancel.cancelled() => {
            return Err(RolloutError::Cancelled { task: task.to_string() });
        }
    };
    Err(RolloutError::HttpStatus {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}
