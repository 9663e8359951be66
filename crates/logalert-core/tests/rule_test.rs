use logalert_core::{hit, Rule, RuleFilter, SampleDocument};
use serde_json::json;
use std::time::Duration;

const RULE_JSON: &str = r#"{
    "name": "payment-timeouts",
    "description": "gateway timeouts in the payment service",
    "index": "payment-*",
    "cron": "0 */2 * * * *",
    "timeWindow": "10m",
    "dsl": { "term": { "kubernetes_namespace_name": "payment" } },
    "threshold": { "countGt": 20 },
    "dedup": { "quietPeriod": "30m" },
    "alerts": { "channels": ["console", "dingtalk"] }
}"#;

#[test]
fn test_rule_from_json() {
    let rule: Rule = serde_json::from_str(RULE_JSON).unwrap();

    assert_eq!(rule.name, "payment-timeouts");
    assert_eq!(rule.severity(), "Medium");
    assert!(rule.missing_fields().is_empty());
    assert_eq!(rule.quiet_period(Duration::from_secs(300)), Duration::from_secs(1800));
    assert_eq!(rule.alerts.channels, vec!["console", "dingtalk"]);

    match rule.filter() {
        RuleFilter::Structured(dsl) => {
            assert_eq!(dsl, &json!({ "term": { "kubernetes_namespace_name": "payment" } }))
        }
        other => panic!("expected structured filter, got {:?}", other),
    }
}

#[test]
fn test_threshold_is_strict() {
    let rule: Rule = serde_json::from_str(RULE_JSON).unwrap();

    assert!(!hit(&rule, 0));
    assert!(!hit(&rule, 20));
    assert!(hit(&rule, 21));
    assert!(hit(&rule, u64::MAX));
}

#[test]
fn test_empty_rule_reports_every_required_field() {
    let rule: Rule = serde_json::from_str("{}").unwrap();
    assert_eq!(rule.missing_fields(), vec!["name", "index", "cron", "timeWindow"]);
    assert!(matches!(rule.filter(), RuleFilter::None));
    assert!(!hit(&rule, 1_000));
}

#[test]
fn test_sample_document_from_search_hit() {
    let doc: SampleDocument = serde_json::from_value(json!({
        "index": "payment-2024.05.01",
        "id": "a1",
        "source": {
            "@timestamp": "2024-05-01T10:00:00Z",
            "kubernetes": { "pod_name": "payment-7d9f" },
            "message": "  "
        }
    }))
    .unwrap();

    assert_eq!(doc.field_str("kubernetes.pod_name"), Some("payment-7d9f"));
    assert_eq!(doc.field_str("message"), None);
    assert_eq!(
        doc.first_str(&["kubernetes_pod_name", "kubernetes.pod_name"]),
        Some("payment-7d9f")
    );
}
