//! Alerting rule model
//! one rule per file on disk; keys are camelCase (`timeWindow`, `countGt`).

use crate::duration::parse_duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Severity shown in alert bodies when the rule leaves it blank.
pub const DEFAULT_SEVERITY: &str = "Medium";

/// A single alerting rule. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    // unique name, also the dedup key
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    // display only (High / Medium / Low)
    #[serde(default)]
    pub severity: String,

    // collection (index pattern) to query
    #[serde(default)]
    pub index: String,

    // six-field cron expression, seconds first
    #[serde(default)]
    pub cron: String,

    // lookback window relative to evaluation time, e.g. "5m"
    #[serde(default)]
    pub time_window: String,

    // free-text filter, AND semantics between terms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string: Option<String>,

    // structured filter used verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsl: Option<Value>,

    #[serde(default)]
    pub threshold: Threshold,

    #[serde(default)]
    pub dedup: Dedup,

    #[serde(default)]
    pub alerts: Alerts,
}

/// Single-sided numeric condition on the hit count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threshold {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_gt: Option<i64>,
}

impl Threshold {
    pub fn new(count_gt: i64) -> Self {
        Self { count_gt: Some(count_gt) }
    }

    /// True iff a threshold is set and `count` is strictly greater.
    /// A rule without a threshold never fires.
    pub fn is_hit(&self, count: u64) -> bool {
        match self.count_gt {
            Some(limit) => i128::from(count) > i128::from(limit),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dedup {
    #[serde(default)]
    pub quiet_period: String,
}

impl Dedup {
    /// The rule's own quiet period, or `default` when unset or unparseable.
    pub fn quiet_period(&self, default: Duration) -> Duration {
        if self.quiet_period.trim().is_empty() {
            return default;
        }
        parse_duration(&self.quiet_period).unwrap_or(default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alerts {
    // channel names, matched by string identity
    #[serde(default)]
    pub channels: Vec<String>,
}

/// The filter half of a rule's query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleFilter<'a> {
    None,
    QueryString(&'a str),
    Structured(&'a Value),
}

impl Rule {
    pub fn severity(&self) -> &str {
        let s = self.severity.trim();
        if s.is_empty() { DEFAULT_SEVERITY } else { s }
    }

    /// Free-text wins when both filters are set.
    pub fn filter(&self) -> RuleFilter<'_> {
        match (&self.query_string, &self.dsl) {
            (Some(q), _) if !q.trim().is_empty() => RuleFilter::QueryString(q),
            (_, Some(dsl)) if !dsl.is_null() => RuleFilter::Structured(dsl),
            _ => RuleFilter::None,
        }
    }

    pub fn quiet_period(&self, default: Duration) -> Duration {
        self.dedup.quiet_period(default)
    }

    /// Names of required fields that are empty, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.index.trim().is_empty() {
            missing.push("index");
        }
        if self.cron.trim().is_empty() {
            missing.push("cron");
        }
        if self.time_window.trim().is_empty() {
            missing.push("timeWindow");
        }
        missing
    }
}
