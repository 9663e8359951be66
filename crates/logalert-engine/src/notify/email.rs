// SMTP channel, the markdown body is rendered as a small HTML card

use super::{Notifier, NotifyError};
use crate::config::EmailConfig;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use logalert_core::parse_duration_or;
use std::time::Duration;

const DEFAULT_EMAIL_TIMEOUT: Duration = Duration::from_secs(10);

pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
    subject_prefix: String,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let mail_err = |e: &dyn std::fmt::Display| NotifyError::Mail(e.to_string());

        let tls_params = TlsParameters::builder(config.host.clone())
            .dangerous_accept_invalid_certs(config.tls_skip_verify)
            .build()
            .map_err(|e| mail_err(&e))?;
        // implicit TLS for smtps, otherwise upgrade when the server offers STARTTLS
        let (tls, default_port) = if config.use_tls {
            (Tls::Wrapper(tls_params), 465)
        } else {
            (Tls::Opportunistic(tls_params), 25)
        };
        let port = if config.port == 0 { default_port } else { config.port };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.host.as_str())
            .port(port)
            .tls(tls)
            .timeout(Some(parse_duration_or(&config.timeout, DEFAULT_EMAIL_TIMEOUT)));
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        let from: Mailbox = config.from.parse().map_err(|e| mail_err(&e))?;
        let to = config
            .to
            .iter()
            .map(|addr| addr.parse::<Mailbox>().map_err(|e| mail_err(&e)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            transport: builder.build(),
            from,
            to,
            subject_prefix: config.subject_prefix.clone(),
        })
    }

    fn subject(&self, title: &str) -> String {
        if self.subject_prefix.is_empty() {
            title.to_string()
        } else {
            format!("{} {}", self.subject_prefix, title)
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let subject = self.subject(title);
        let mut builder = Message::builder().from(self.from.clone()).subject(subject.as_str());
        for rcpt in &self.to {
            builder = builder.to(rcpt.clone());
        }
        let message = builder
            .header(ContentType::TEXT_HTML)
            .body(render_html(&subject, body))
            .map_err(|e| NotifyError::Mail(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Mail(e.to_string()))?;
        Ok(())
    }
}

pub fn render_html(subject: &str, body: &str) -> String {
    let subject = escape_html(subject);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <title>{subject}</title>
  <style>
    body {{ font-family: -apple-system,Segoe UI,Roboto,Helvetica,Arial,sans-serif; margin: 20px; color: #333; }}
    .card {{ border-radius: 10px; border: 1px solid #f5c6cb; background-color: #fdecea; padding: 16px 20px; margin-bottom: 20px; }}
    .card h2 {{ margin: 0 0 8px 0; }}
    .content {{ background: #f8f9fa; border-radius: 6px; padding: 12px 16px; white-space: pre-wrap; font-family: Menlo,Consolas,monospace; }}
  </style>
</head>
<body>
  <div class="card">
    <h2>🚨 Log Alert</h2>
    <div>{subject}</div>
  </div>
  <div class="content">{content}</div>
</body>
</html>
"#,
        subject = subject,
        content = markdown_to_html(body),
    )
}

/// The subset the renderer emits: `**bold**` and newlines; everything else
/// is escaped.
pub fn markdown_to_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 32);
    let mut bold = false;
    let mut rest = s;

    while let Some(c) = rest.chars().next() {
        if rest.starts_with("**") {
            out.push_str(if bold { "</strong>" } else { "<strong>" });
            bold = !bold;
            rest = &rest[2..];
            continue;
        }
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("<br>"),
            _ => out.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }
    if bold {
        out.push_str("</strong>");
    }
    out
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_to_html() {
        assert_eq!(
            markdown_to_html("- **Hits:** 5\n<b>&"),
            "- <strong>Hits:</strong> 5<br>&lt;b&gt;&amp;"
        );
        // unbalanced bold is closed
        assert_eq!(markdown_to_html("**open"), "<strong>open</strong>");
        assert_eq!(markdown_to_html("日志 **x**"), "日志 <strong>x</strong>");
    }

    #[test]
    fn test_html_escapes_subject() {
        let html = render_html("[Log Alert] <r>", "body");
        assert!(html.contains("<title>[Log Alert] &lt;r&gt;</title>"));
        assert!(html.contains(r#"<div class="content">body</div>"#));
    }

    #[tokio::test]
    async fn test_subject_prefix_and_bad_address() {
        let config = EmailConfig {
            host: "smtp.example.com".into(),
            from: "alerts@example.com".into(),
            to: vec!["ops@example.com".into()],
            subject_prefix: "[prod]".into(),
            ..Default::default()
        };
        let n = EmailNotifier::new(&config).unwrap();
        assert_eq!(n.subject("t"), "[prod] t");

        let bad = EmailConfig {
            to: vec!["not an address".into()],
            ..config
        };
        assert!(matches!(EmailNotifier::new(&bad), Err(NotifyError::Mail(_))));
    }
}
