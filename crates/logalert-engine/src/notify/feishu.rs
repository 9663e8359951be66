// Feishu (Lark) interactive card

use super::{DEFAULT_HTTP_TIMEOUT, Notifier, NotifyError, http_client, post_json};
use crate::config::FeishuConfig;
use async_trait::async_trait;
use logalert_core::parse_duration_or;
use reqwest::Client;
use serde_json::{Value, json};

pub struct FeishuNotifier {
    client: Client,
    webhook: String,
    enable_at_all: bool,
    title_prefix: String,
    content_intro: String,
}

impl FeishuNotifier {
    pub fn new(config: &FeishuConfig) -> Result<Self, NotifyError> {
        Ok(Self {
            client: http_client(parse_duration_or(&config.timeout, DEFAULT_HTTP_TIMEOUT))?,
            webhook: config.webhook.clone(),
            enable_at_all: config.enable_at_all,
            title_prefix: config.title_prefix.clone(),
            content_intro: config.content_intro.clone(),
        })
    }

    fn build_card(&self, title: &str, body: &str) -> Value {
        let display_title = if self.title_prefix.is_empty() {
            format!("🚨 {}", title)
        } else {
            format!("🚨 {} {}", self.title_prefix, title)
        };

        let mut content = String::new();
        if !self.content_intro.is_empty() {
            content.push_str(&self.content_intro);
            content.push_str("\n\n");
        }
        content.push_str(body);
        // mention at the bottom of the card
        if self.enable_at_all {
            content.push_str("\n\n<at id=all></at>");
        }

        json!({
            "msg_type": "interactive",
            "card": {
                "header": {
                    "title": { "tag": "plain_text", "content": display_title },
                    "template": "red"
                },
                "elements": [
                    { "tag": "div", "text": { "tag": "lark_md", "content": content } }
                ]
            }
        })
    }
}

#[async_trait]
impl Notifier for FeishuNotifier {
    fn name(&self) -> &str {
        "feishu"
    }

    async fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let card = self.build_card(title, body);
        let text = post_json(&self.client, "feishu", &self.webhook, &card, None).await?;

        // feishu answers 200 with a non-zero code on failure
        if let Ok(reply) = serde_json::from_str::<Value>(&text) {
            let code = reply
                .get("code")
                .or_else(|| reply.get("StatusCode"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            if code != 0 {
                let message = reply
                    .get("msg")
                    .or_else(|| reply.get("StatusMessage"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                return Err(NotifyError::Api {
                    channel: "feishu",
                    message: format!("code={code} msg={message}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier(config: FeishuConfig) -> FeishuNotifier {
        FeishuNotifier::new(&FeishuConfig {
            webhook: "https://open.feishu.cn/open-apis/bot/v2/hook/x".into(),
            ..config
        })
        .unwrap()
    }

    #[test]
    fn test_card_layout() {
        let n = notifier(FeishuConfig {
            title_prefix: "[prod]".into(),
            content_intro: "Please check".into(),
            enable_at_all: true,
            ..Default::default()
        });
        let card = n.build_card("[Log Alert] r", "body");
        assert_eq!(card["msg_type"], "interactive");
        assert_eq!(card["card"]["header"]["title"]["content"], "🚨 [prod] [Log Alert] r");
        assert_eq!(card["card"]["header"]["template"], "red");
        assert_eq!(
            card["card"]["elements"][0]["text"]["content"],
            "Please check\n\nbody\n\n<at id=all></at>"
        );
    }

    #[test]
    fn test_plain_card() {
        let n = notifier(FeishuConfig::default());
        let card = n.build_card("t", "body");
        assert_eq!(card["card"]["header"]["title"]["content"], "🚨 t");
        assert_eq!(card["card"]["elements"][0]["text"]["content"], "body");
    }
}
