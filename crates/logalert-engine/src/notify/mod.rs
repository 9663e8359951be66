//! Notification channels
//!
//! Every channel implements [`Notifier`]: a string identity that rules
//! reference in `alerts.channels`, and a `send(title, body)`. Platform
//! quirks (signing, mention syntax, card layout) stay inside the channel.

pub mod console;
pub mod dingtalk;
pub mod email;
pub mod feishu;
pub mod slack;
pub mod webhook;
pub mod wechat;

pub use console::ConsoleNotifier;
pub use dingtalk::DingTalkNotifier;
pub use email::EmailNotifier;
pub use feishu::FeishuNotifier;
pub use slack::SlackNotifier;
pub use webhook::WebhookNotifier;
pub use wechat::WeChatNotifier;

use crate::config::NotificationsConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{channel} returned status={status} body={body}")]
    Status {
        channel: &'static str,
        status: u16,
        body: String,
    },

    #[error("{channel} API error: {message}")]
    Api {
        channel: &'static str,
        message: String,
    },

    #[error("mail delivery failed: {0}")]
    Mail(String),

    #[error("deadline exceeded")]
    Timeout,

    #[error("notifier panicked: {0}")]
    Panicked(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Identity matched against a rule's channel names.
    fn name(&self) -> &str;

    async fn send(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Console is always present; the rest only when configured.
pub fn build_notifiers(config: &NotificationsConfig) -> Result<Vec<Arc<dyn Notifier>>, NotifyError> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(ConsoleNotifier)];

    if !config.webhook.url.is_empty() {
        notifiers.push(Arc::new(WebhookNotifier::new(&config.webhook)?));
    }
    if !config.slack.webhook_url.is_empty() {
        notifiers.push(Arc::new(SlackNotifier::new(&config.slack)?));
    }
    if !config.feishu.webhook.is_empty() {
        notifiers.push(Arc::new(FeishuNotifier::new(&config.feishu)?));
    }
    if !config.dingtalk.webhook.is_empty() {
        notifiers.push(Arc::new(DingTalkNotifier::new(&config.dingtalk)?));
    }
    if !config.wechat.webhook.is_empty() {
        notifiers.push(Arc::new(WeChatNotifier::new(&config.wechat)?));
    }
    if config.email.is_configured() {
        notifiers.push(Arc::new(EmailNotifier::new(&config.email)?));
    }

    for n in &notifiers {
        tracing::info!(channel = %n.name(), "notification channel registered");
    }
    Ok(notifiers)
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, NotifyError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

pub(crate) fn json_request<T: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    payload: &T,
    headers: Option<&HashMap<String, String>>,
) -> RequestBuilder {
    let mut request = client.post(url).json(payload);
    for (key, value) in headers.into_iter().flatten() {
        request = request.header(key.as_str(), value.as_str());
    }
    request
}

// POST a JSON payload, any non-2xx is an error; returns the response text
pub(crate) async fn post_json<T: Serialize + ?Sized>(
    client: &Client,
    channel: &'static str,
    url: &str,
    payload: &T,
    headers: Option<&HashMap<String, String>>,
) -> Result<String, NotifyError> {
    let response = json_request(client, url, payload, headers).send().await?;
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(NotifyError::Status {
            channel,
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(text)
}
