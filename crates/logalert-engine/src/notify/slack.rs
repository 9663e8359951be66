//! Slack webhook integration

use super::{DEFAULT_HTTP_TIMEOUT, Notifier, NotifyError, http_client, post_json};
use crate::config::SlackConfig;
use async_trait::async_trait;
use chrono::Utc;
use logalert_core::parse_duration_or;
use reqwest::Client;
use serde::Serialize;

// Slack client for sending alerts
pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
}

// slack message payload
#[derive(Serialize)]
struct SlackMessage {
    text: String,
    attachments: Vec<SlackAttachment>,
}

// slack attachment (colored sidebar with details)
#[derive(Serialize)]
struct SlackAttachment {
    color: String,
    title: String,
    text: String,
    mrkdwn_in: Vec<&'static str>,
    footer: String,
    ts: i64,
}

impl SlackNotifier {
    pub fn new(config: &SlackConfig) -> Result<Self, NotifyError> {
        Ok(Self {
            client: http_client(parse_duration_or(&config.timeout, DEFAULT_HTTP_TIMEOUT))?,
            webhook_url: config.webhook_url.clone(),
        })
    }

    // Build Slack message from an alert
    fn build_message(title: &str, body: &str) -> SlackMessage {
        SlackMessage {
            text: format!("🚨 {}", title),
            attachments: vec![SlackAttachment {
                color: "danger".to_string(),
                title: title.to_string(),
                text: to_mrkdwn(body),
                mrkdwn_in: vec!["text"],
                footer: "logalert".to_string(),
                ts: Utc::now().timestamp(),
            }],
        }
    }
}

// slack bold is a single asterisk
fn to_mrkdwn(body: &str) -> String {
    body.replace("**", "*")
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let message = Self::build_message(title, body);
        post_json(&self.client, "slack", &self.webhook_url, &message, None).await?;
        Ok(())
    }
}
