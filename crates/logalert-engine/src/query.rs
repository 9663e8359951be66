//! Query building: rule + evaluation instant -> backend-agnostic search
//! pure, no I/O.

use chrono::{DateTime, SecondsFormat, TimeDelta};
use chrono_tz::Tz;
use logalert_core::{Rule, RuleFilter, parse_duration};
use serde_json::{Value, json};
use thiserror::Error;

/// Field every document is range-filtered and sorted on.
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Lookback used when a rule reaches the builder with an empty window.
pub const DEFAULT_TIME_WINDOW: &str = "5m";

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("rule {rule:?}: invalid timeWindow {window:?}: {reason}")]
    InvalidWindow {
        rule: String,
        window: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    None,
    // AND-combined free text
    QueryString(String),
    // used verbatim
    Structured(Value),
}

/// One evaluation's search: documents in `[from, to)` matching `filter`,
/// with an exact total and up to `size` samples, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub from: DateTime<Tz>,
    pub to: DateTime<Tz>,
    pub filter: QueryFilter,
    pub size: usize,
    pub track_total_hits: bool,
}

impl SearchQuery {
    /// Elasticsearch / OpenSearch request body.
    pub fn to_body(&self) -> Value {
        let mut filters = vec![json!({
            "range": {
                TIMESTAMP_FIELD: {
                    "gte": self.from.to_rfc3339_opts(SecondsFormat::Millis, true),
                    "lt": self.to.to_rfc3339_opts(SecondsFormat::Millis, true),
                    "format": "strict_date_optional_time"
                }
            }
        })];

        match &self.filter {
            QueryFilter::None => {}
            QueryFilter::QueryString(q) => filters.push(json!({
                "query_string": {
                    "query": q,
                    "default_operator": "AND"
                }
            })),
            QueryFilter::Structured(dsl) => filters.push(dsl.clone()),
        }

        json!({
            "size": self.size,
            "sort": [{ TIMESTAMP_FIELD: { "order": "desc" } }],
            "track_total_hits": self.track_total_hits,
            "query": { "bool": { "filter": filters } }
        })
    }
}

/// Build the search for `rule` evaluated at `now`.
pub fn build_query(rule: &Rule, now: DateTime<Tz>, sample_size: usize) -> Result<SearchQuery, QueryError> {
    let window_str = if rule.time_window.trim().is_empty() {
        DEFAULT_TIME_WINDOW
    } else {
        rule.time_window.trim()
    };
    let invalid = |reason: String| QueryError::InvalidWindow {
        rule: rule.name.clone(),
        window: window_str.to_string(),
        reason,
    };
    let window = parse_duration(window_str).map_err(|e| invalid(e.to_string()))?;
    let window = TimeDelta::from_std(window).map_err(|e| invalid(e.to_string()))?;
    let from = now.checked_sub_signed(window).ok_or_else(|| invalid("window out of range".into()))?;

    let filter = match rule.filter() {
        RuleFilter::None => QueryFilter::None,
        RuleFilter::QueryString(q) => QueryFilter::QueryString(q.to_string()),
        RuleFilter::Structured(dsl) => QueryFilter::Structured(dsl.clone()),
    };

    Ok(SearchQuery {
        from,
        to: now,
        filter,
        size: sample_size,
        track_total_hits: true,
    })
}
