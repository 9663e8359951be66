//! Alert title and body rendering
//!
//! The body is light markdown (`**bold**`, `- ` bullets) so chat channels
//! render it natively and the email channel can turn it into HTML. Only the
//! first (most recent) sample document is surfaced.

use chrono::DateTime;
use chrono_tz::Tz;
use logalert_core::{Rule, RuleFilter, SampleDocument};
use std::fmt::Write;

/// Characters of the sample's message kept in the body.
pub const MESSAGE_LIMIT: usize = 800;

/// Appended after a cut message.
pub const TRUNCATION_MARKER: &str = "...(message truncated)";

pub const TIMESTAMP_FIELD: &str = "@timestamp";
pub const MESSAGE_FIELD: &str = "message";

// contextual dimensions, each tried across common field layouts
const DIMENSIONS: &[(&str, &[&str])] = &[
    ("Host", &["kubernetes_host", "host.name", "host.hostname", "host"]),
    ("Namespace", &["kubernetes_namespace_name", "kubernetes.namespace_name", "kubernetes.namespace"]),
    ("Workload", &["kubernetes_pod_name", "kubernetes.pod_name", "kubernetes.pod.name"]),
    ("Image", &["kubernetes_container_image", "kubernetes.container_image", "container.image.name"]),
];

/// Per-firing inputs that do not come from the rule or the backend.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub fired_at: DateTime<Tz>,
    // public base of the log detail page
    pub link_base: Option<String>,
    // first backend address, fallback for links
    pub backend_address: Option<String>,
}

impl RenderContext {
    pub fn new(fired_at: DateTime<Tz>) -> Self {
        Self {
            fired_at,
            link_base: None,
            backend_address: None,
        }
    }

    pub fn with_link_base(mut self, base: impl Into<String>) -> Self {
        self.link_base = non_empty(base.into());
        self
    }

    pub fn with_backend_address(mut self, address: impl Into<String>) -> Self {
        self.backend_address = non_empty(address.into());
        self
    }

    /// Detail link for one document, `None` when no base is known.
    pub fn document_link(&self, index: &str, id: &str) -> Option<String> {
        if index.is_empty() || id.is_empty() {
            return None;
        }
        let index = urlencoding::encode(index);
        let id = urlencoding::encode(id);
        if let Some(base) = &self.link_base {
            return Some(format!("{base}/logs?index={index}&id={id}"));
        }
        self.backend_address
            .as_ref()
            .map(|addr| format!("{addr}/{index}/_doc/{id}?pretty"))
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn render_title(rule: &Rule) -> String {
    format!("[Log Alert] {}", rule.name)
}

/// Cut `message` to [`MESSAGE_LIMIT`] characters. Returns the kept text and
/// whether anything was dropped.
pub fn truncate_message(message: &str) -> (&str, bool) {
    match message.char_indices().nth(MESSAGE_LIMIT) {
        Some((cut, _)) => (&message[..cut], true),
        None => (message, false),
    }
}

pub fn render_body(rule: &Rule, count: u64, samples: &[SampleDocument], ctx: &RenderContext) -> String {
    let mut b = String::new();

    b.push_str("🚨 **Log Alert**\n\n");
    if !rule.description.trim().is_empty() {
        let _ = write!(b, "{}\n\n", rule.description.trim());
    }

    b.push_str("📊 **Summary**\n");
    let _ = writeln!(b, "- **Rule:** {}", rule.name);
    let _ = writeln!(b, "- **Severity:** {}", rule.severity());
    let _ = writeln!(b, "- **Fired at:** {}", ctx.fired_at.format("%Y-%m-%d %H:%M:%S %Z"));
    let _ = writeln!(b, "- **Index:** {}", rule.index);
    let _ = writeln!(b, "- **Time window:** {}", rule.time_window);
    let _ = writeln!(b, "- **Hits:** {}", count);
    if let Some(limit) = rule.threshold.count_gt {
        let _ = writeln!(b, "- **Threshold:** > {}", limit);
    }
    match rule.filter() {
        RuleFilter::QueryString(q) => {
            let _ = writeln!(b, "- **Query:** {}", q);
        }
        RuleFilter::Structured(_) => b.push_str("- **Query:** structured query\n"),
        RuleFilter::None => {}
    }

    if let Some(doc) = samples.first() {
        render_sample(&mut b, doc, ctx);
    }

    b
}

fn render_sample(b: &mut String, doc: &SampleDocument, ctx: &RenderContext) {
    let mut target = String::new();
    for (label, keys) in DIMENSIONS {
        if let Some(value) = doc.first_str(keys) {
            let _ = writeln!(target, "- **{}:** {}", label, value);
        }
    }
    if let Some(ts) = doc.field_str(TIMESTAMP_FIELD) {
        let _ = writeln!(target, "- **Log time:** {}", ts);
    }
    if !target.is_empty() {
        b.push_str("\n📌 **Alert target**\n");
        b.push_str(&target);
    }

    if let Some(message) = doc.field_str(MESSAGE_FIELD) {
        let (kept, truncated) = truncate_message(message);
        b.push_str("\n🧾 **Sample log**\n");
        b.push_str(kept);
        if truncated {
            b.push_str(TRUNCATION_MARKER);
        }
        b.push('\n');
    }

    if let Some(link) = ctx.document_link(&doc.index, &doc.id) {
        let _ = writeln!(b, "\n🔗 **Details:** {}", link);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use logalert_core::Threshold;
    use serde_json::{Value, json};

    fn rule() -> Rule {
        Rule {
            name: "error-spike".into(),
            index: "logs-*".into(),
            cron: "0 * * * * *".into(),
            time_window: "5m".into(),
            query_string: Some("level:ERROR".into()),
            threshold: Threshold::new(10),
            ..Default::default()
        }
    }

    fn ctx() -> RenderContext {
        RenderContext::new(Tz::UTC.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap())
    }

    fn sample(source: Value) -> SampleDocument {
        SampleDocument::new("logs-2024.06.01", "doc-1", source.as_object().cloned().unwrap())
    }

    #[test]
    fn test_summary_lines() {
        let body = render_body(&rule(), 15, &[], &ctx());
        assert!(body.contains("- **Rule:** error-spike"));
        assert!(body.contains("- **Severity:** Medium"));
        assert!(body.contains("- **Fired at:** 2024-06-01 08:30:00 UTC"));
        assert!(body.contains("- **Index:** logs-*"));
        assert!(body.contains("- **Time window:** 5m"));
        assert!(body.contains("- **Hits:** 15"));
        assert!(body.contains("- **Threshold:** > 10"));
        assert!(body.contains("- **Query:** level:ERROR"));
        assert!(!body.contains("Alert target"));
    }

    #[test]
    fn test_structured_query_not_echoed() {
        let mut r = rule();
        r.query_string = None;
        r.dsl = Some(json!({"term": {"secret_field": "x"}}));
        let body = render_body(&r, 11, &[], &ctx());
        assert!(body.contains("- **Query:** structured query"));
        assert!(!body.contains("secret_field"));
    }

    #[test]
    fn test_truncates_long_message() {
        let long = "x".repeat(1000);
        let body = render_body(&rule(), 11, &[sample(json!({"message": long}))], &ctx());
        let expected = format!("{}{}\n", "x".repeat(MESSAGE_LIMIT), TRUNCATION_MARKER);
        assert!(body.contains(&expected));
        assert!(!body.contains(&"x".repeat(MESSAGE_LIMIT + 1)));
    }

    #[test]
    fn test_short_message_untouched() {
        let msg = "y".repeat(700);
        let body = render_body(&rule(), 11, &[sample(json!({"message": msg}))], &ctx());
        assert!(body.contains(&format!("{}\n", msg)));
        assert!(!body.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn test_truncation_counts_chars() {
        let msg = "日".repeat(MESSAGE_LIMIT + 5);
        let (kept, truncated) = truncate_message(&msg);
        assert!(truncated);
        assert_eq!(kept.chars().count(), MESSAGE_LIMIT);
    }

    #[test]
    fn test_absent_dimensions_omitted() {
        let doc = sample(json!({
            "kubernetes_host": "node-7",
            "kubernetes_namespace_name": "",
            "@timestamp": "2024-06-01T08:29:58Z"
        }));
        let body = render_body(&rule(), 11, &[doc], &ctx());
        assert!(body.contains("- **Host:** node-7"));
        assert!(body.contains("- **Log time:** 2024-06-01T08:29:58Z"));
        assert!(!body.contains("Namespace"));
        assert!(!body.contains("Workload"));
        assert!(!body.contains("Image"));
        assert!(!body.contains("Sample log"));
    }

    #[test]
    fn test_only_first_sample_used() {
        let docs = [
            sample(json!({"message": "newest"})),
            sample(json!({"message": "older"})),
        ];
        let body = render_body(&rule(), 11, &docs, &ctx());
        assert!(body.contains("newest"));
        assert!(!body.contains("older"));
    }

    #[test]
    fn test_link_prefers_web_base_and_escapes() {
        let doc = SampleDocument::new("logs 2024/06", "id#1", Default::default());
        let with_base = ctx()
            .with_link_base("http://alert.example.com:8080/")
            .with_backend_address("http://es:9200");
        let body = render_body(&rule(), 11, std::slice::from_ref(&doc), &with_base);
        assert!(body.contains(
            "http://alert.example.com:8080/logs?index=logs%202024%2F06&id=id%231"
        ));

        let fallback = ctx().with_backend_address("http://es:9200");
        let body = render_body(&rule(), 11, &[doc.clone()], &fallback);
        assert!(body.contains("http://es:9200/logs%202024%2F06/_doc/id%231?pretty"));

        let body = render_body(&rule(), 11, &[doc], &ctx());
        assert!(!body.contains("Details"));
    }
}
