//! Chat notification sink.
//!
//! Posts summaries to a Slack-style incoming webhook. One attempt per call,
//! no retries.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("chat webhook not configured (set SLACK_WEBHOOK_URL)")]
    NotConfigured,
    #[error("chat webhook request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("chat webhook returned status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A message for the chat channel: header, body and footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPayload {
    pub title: String,
    pub body: String,
    pub footer: String,
}

impl ChatPayload {
    /// `generated_at` is the already formatted send-time timestamp.
    pub fn new(title: impl Into<String>, body: impl Into<String>, generated_at: &str) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            footer: format!("_Generated on {generated_at}_"),
        }
    }

    /// Slack block-kit JSON for this message.
    pub fn to_slack(&self) -> Value {
        json!({
            "text": "*Todo Summary*",
            "blocks": [
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": self.title }
                },
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": self.body }
                },
                {
                    "type": "context",
                    "elements": [
                        { "type": "mrkdwn", "text": self.footer }
                    ]
                }
            ]
        })
    }
}

/// Delivers a payload to a chat channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, payload: &ChatPayload) -> Result<(), NotifyError>;
}

/// Notifier that posts to a Slack incoming webhook URL.
pub struct SlackWebhook {
    webhook_url: Option<String>,
    client: reqwest::Client,
}

impl SlackWebhook {
    pub fn new(webhook_url: Option<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            webhook_url,
            client,
        })
    }
}

#[async_trait]
impl Notifier for SlackWebhook {
    async fn send(&self, payload: &ChatPayload) -> Result<(), NotifyError> {
        let url = self.webhook_url.as_deref().ok_or(NotifyError::NotConfigured)?;

        let resp = self
            .client
            .post(url)
            .json(&payload.to_slack())
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }

        Ok(())
    }
}
