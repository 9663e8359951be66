// Generic webhook: POST {title, message, ts} with custom headers

use super::{DEFAULT_HTTP_TIMEOUT, Notifier, NotifyError, http_client, post_json};
use crate::config::WebhookConfig;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use logalert_core::parse_duration_or;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;

pub struct WebhookNotifier {
    client: Client,
    url: String,
    headers: HashMap<String, String>,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    title: &'a str,
    message: &'a str,
    ts: String,
}

impl WebhookNotifier {
    pub fn new(config: &WebhookConfig) -> Result<Self, NotifyError> {
        Ok(Self {
            client: http_client(parse_duration_or(&config.timeout, DEFAULT_HTTP_TIMEOUT))?,
            url: config.url.clone(),
            headers: config.headers.clone(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            title,
            message: body,
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        };

        post_json(&self.client, "webhook", &self.url, &payload, Some(&self.headers)).await?;
        Ok(())
    }
}
