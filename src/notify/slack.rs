// src/notify/slack.rs

//! Slack incoming-webhook announcements.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{send, DeployInfo};
use crate::config::{is_unset, ConfigFile, SlackSection};
use crate::errors::Result;
use crate::task::{Task, TaskFuture, TaskOutput};

/// Body of an incoming-webhook POST.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookMessage {
    pub channel: String,
    pub username: String,
    pub icon_emoji: String,
    /// Plain-text fallback for clients that don't render blocks.
    pub text: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { text: TextObject },
    Section { fields: Vec<TextObject> },
    Context { elements: Vec<ContextElement> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: TextKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextKind {
    PlainText,
    Mrkdwn,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextElement {
    Image { image_url: String, alt_text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: TextKind::PlainText,
            text: text.into(),
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            kind: TextKind::Mrkdwn,
            text: text.into(),
        }
    }
}

/// Build the announcement for `title` ("Start deploy", "Finished deploy").
///
/// Users missing from `[users]` are attributed by name, without avatar.
pub fn deploy_message(cfg: &ConfigFile, title: &str, info: &DeployInfo) -> WebhookMessage {
    let revision = &info.revision;
    let targets = info.targets.join(", ");

    let fields = vec![
        TextObject::markdown(format!(
            "revision: <https://github.com/{}/commit/{}|`{}`>",
            revision.repo_full_name, revision.sha, revision.descriptive
        )),
        TextObject::markdown(format!("branch: `{}`", revision.branch)),
    ];

    let mut attribution = Vec::new();
    let deployed_by = match cfg.user(&info.user) {
        Some(user) => {
            attribution.push(ContextElement::Image {
                image_url: user.avatar_url(),
                alt_text: info.user.clone(),
            });
            format!("Deployed by <@{}>", user.slack_id)
        }
        None => format!("Deployed by {}", info.user),
    };
    attribution.push(ContextElement::Mrkdwn { text: deployed_by });

    WebhookMessage {
        channel: cfg.slack.channel.clone(),
        username: format!("deploy({})", info.user),
        icon_emoji: cfg.slack.icon_emoji.clone(),
        text: format!(
            "{title}: revision={} (branch={}) to {targets} by {}",
            revision.sha, revision.branch, info.user
        ),
        blocks: vec![
            Block::Header {
                text: TextObject::plain(title),
            },
            Block::Section { fields },
            Block::Context {
                elements: attribution,
            },
        ],
    }
}

/// Leaf task posting one [`WebhookMessage`].
#[derive(Debug, Clone)]
pub struct PostSlack {
    client: reqwest::Client,
    webhook_url: String,
    title: String,
    message: WebhookMessage,
}

impl PostSlack {
    pub fn new(
        client: reqwest::Client,
        slack: &SlackSection,
        title: impl Into<String>,
        message: WebhookMessage,
    ) -> Self {
        Self {
            client,
            webhook_url: slack.webhook_url.trim().to_string(),
            title: title.into(),
            message,
        }
    }

    pub fn message(&self) -> &WebhookMessage {
        &self.message
    }

    async fn execute(&self, cancel: CancellationToken) -> Result<TaskOutput> {
        if is_unset(&self.webhook_url) {
            info!(title = %self.title, "skip slack notification; [slack].webhook_url is not configured");
            return Ok(TaskOutput::empty());
        }

        let request = self.client.post(&self.webhook_url).json(&self.message);
        send(request, "slack webhook", &self.name(), &cancel).await?;
        Ok(TaskOutput::empty())
    }
}

impl Task for PostSlack {
    fn name(&self) -> String {
        format!("slack({})", self.title)
    }

    fn run(&self, cancel: CancellationToken) -> TaskFuture<'_> {
        Box::pin(self.execute(cancel))
    }
}
