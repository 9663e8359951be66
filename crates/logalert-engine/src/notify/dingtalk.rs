// DingTalk robot: markdown message, optional signed URL

use super::{DEFAULT_HTTP_TIMEOUT, Notifier, NotifyError, http_client, post_json};
use crate::config::DingTalkConfig;
use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use logalert_core::parse_duration_or;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub struct DingTalkNotifier {
    client: Client,
    webhook: String,
    secret: Option<String>,
    enable_at_all: bool,
}

// dingtalk answers 200 even on failure
#[derive(Deserialize)]
struct DingTalkReply {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl DingTalkNotifier {
    pub fn new(config: &DingTalkConfig) -> Result<Self, NotifyError> {
        Ok(Self {
            client: http_client(parse_duration_or(&config.timeout, DEFAULT_HTTP_TIMEOUT))?,
            webhook: config.webhook.clone(),
            secret: Some(config.secret.clone()).filter(|s| !s.is_empty()),
            enable_at_all: config.enable_at_all,
        })
    }

    /// Append `timestamp` and `sign` per the robot signing scheme:
    /// base64(HMAC-SHA256(secret, "<ms>\n<secret>")), url-encoded.
    pub fn sign_url(&self, base_url: &str, timestamp_ms: i64) -> String {
        let Some(secret) = &self.secret else {
            return base_url.to_string();
        };

        let string_to_sign = format!("{}\n{}", timestamp_ms, secret);
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return base_url.to_string();
        };
        mac.update(string_to_sign.as_bytes());
        let sign = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        let sep = if base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}timestamp={}&sign={}",
            base_url,
            sep,
            timestamp_ms,
            urlencoding::encode(&sign)
        )
    }

    fn build_markdown(&self, title: &str, body: &str) -> serde_json::Value {
        let mut text = format!("**🚨 Log Alert**\n\n🏷️ **Rule:** {}\n\n📝 **Details:**\n{}", title, body);
        if self.enable_at_all {
            text.push_str("\n\n@all");
        }
        json!({
            "msgtype": "markdown",
            "markdown": { "title": "Log Alert", "text": text },
            "at": { "isAtAll": self.enable_at_all }
        })
    }
}

#[async_trait]
impl Notifier for DingTalkNotifier {
    fn name(&self) -> &str {
        "dingtalk"
    }

    async fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let url = self.sign_url(&self.webhook, Utc::now().timestamp_millis());
        let payload = self.build_markdown(title, body);
        let text = post_json(&self.client, "dingtalk", &url, &payload, None).await?;

        if let Ok(reply) = serde_json::from_str::<DingTalkReply>(&text) {
            if reply.errcode != 0 {
                return Err(NotifyError::Api {
                    channel: "dingtalk",
                    message: format!("errcode={} errmsg={}", reply.errcode, reply.errmsg),
                });
            }
        }
        Ok(())
    }
}
