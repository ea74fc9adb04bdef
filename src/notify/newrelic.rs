// src/notify/newrelic.rs

//! New Relic deployment markers.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{send, DeployInfo};
use crate::config::NewRelicSection;
use crate::errors::Result;
use crate::task::{Task, TaskFuture, TaskOutput};

/// `{"deployment": {...}}` body of `POST .../applications/{app_id}/deployments.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRecord {
    pub deployment: Deployment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deployment {
    pub revision: String,
    pub changelog: String,
    pub description: String,
    pub user: String,
}

impl DeploymentRecord {
    pub fn from_info(info: &DeployInfo) -> Self {
        let line = info.changelog_line();
        Self {
            deployment: Deployment {
                revision: info.revision.descriptive.clone(),
                changelog: line.clone(),
                description: line,
                user: info.user.clone(),
            },
        }
    }
}

/// Leaf task recording one deployment.
///
/// Skipped, successfully and without any request, when the app id or API key
/// is the `unset` sentinel.
#[derive(Debug, Clone)]
pub struct RecordDeployment {
    client: reqwest::Client,
    section: NewRelicSection,
    payload: DeploymentRecord,
}

impl RecordDeployment {
    pub fn new(client: reqwest::Client, section: &NewRelicSection, payload: DeploymentRecord) -> Self {
        Self {
            client,
            section: section.clone(),
            payload,
        }
    }

    pub fn payload(&self) -> &DeploymentRecord {
        &self.payload
    }

    async fn execute(&self, cancel: CancellationToken) -> Result<TaskOutput> {
        if !self.section.is_configured() {
            info!("skip record new relic deployment; app_id and api_key must be configured");
            return Ok(TaskOutput::empty());
        }

        let url = self.section.deployments_url();
        let request = self
            .client
            .post(&url)
            .header("x-api-key", self.section.api_key.trim())
            .json(&self.payload);

        send(request, &url, &self.name(), &cancel).await?;
        info!(revision = %self.payload.deployment.revision, "recorded new relic deployment");
        Ok(TaskOutput::empty())
    }
}

impl Task for RecordDeployment {
    fn name(&self) -> String {
        "newrelic(record deployment)".to_string()
    }

    fn run(&self, cancel: CancellationToken) -> TaskFuture<'_> {
        Box::pin(self.execute(cancel))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::git::Revision;

    #[test]
    fn payload_matches_deployments_api() {
        let info = DeployInfo {
            user: "alice".into(),
            revision: Revision {
                descriptive: "v3".into(),
                sha: "ffff".into(),
                branch: "refs/heads/main".into(),
                summary: "ffff fix n+1".into(),
                repo_full_name: "acme/webapp".into(),
            },
            targets: vec!["host-a".into()],
        };

        let value = serde_json::to_value(DeploymentRecord::from_info(&info)).unwrap();
        assert_eq!(
            value,
            json!({
                "deployment": {
                    "revision": "v3",
                    "changelog": "alice deployed v3: ffff fix n+1",
                    "description": "alice deployed v3: ffff fix n+1",
                    "user": "alice"
                }
            })
        );
    }

    #[test]
    fn url_substitutes_app_id() {
        let section = NewRelicSection {
            app_id: " 1234 ".into(),
            api_key: "key".into(),
            ..NewRelicSection::default()
        };
        assert!(section.is_configured());
        assert_eq!(
            section.deployments_url(),
            "https://api.newrelic.com/v2/applications/1234/deployments.json"
        );
    }
}
