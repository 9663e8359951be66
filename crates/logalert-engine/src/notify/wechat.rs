// WeCom (WeChat Work) group robot, markdown message

use super::{DEFAULT_HTTP_TIMEOUT, Notifier, NotifyError, http_client, post_json};
use crate::config::WeChatConfig;
use async_trait::async_trait;
use logalert_core::parse_duration_or;
use reqwest::Client;
use serde_json::{Value, json};

pub struct WeChatNotifier {
    client: Client,
    webhook: String,
}

impl WeChatNotifier {
    pub fn new(config: &WeChatConfig) -> Result<Self, NotifyError> {
        Ok(Self {
            client: http_client(parse_duration_or(&config.timeout, DEFAULT_HTTP_TIMEOUT))?,
            webhook: config.webhook.clone(),
        })
    }

    fn build_markdown(title: &str, body: &str) -> Value {
        json!({
            "msgtype": "markdown",
            "markdown": { "content": format!("**🚨 {}**\n{}", title, body) }
        })
    }
}

#[async_trait]
impl Notifier for WeChatNotifier {
    fn name(&self) -> &str {
        "wechat"
    }

    async fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let payload = Self::build_markdown(title, body);
        let text = post_json(&self.client, "wechat", &self.webhook, &payload, None).await?;

        if let Ok(reply) = serde_json::from_str::<Value>(&text) {
            let code = reply.get("errcode").and_then(Value::as_i64).unwrap_or(0);
            if code != 0 {
                let msg = reply.get("errmsg").and_then(Value::as_str).unwrap_or("unknown");
                return Err(NotifyError::Api {
                    channel: "wechat",
                    message: format!("errcode={code} errmsg={msg}"),
                });
            }
        }
        Ok(())
    }
}
