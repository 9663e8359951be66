//! Rule schedule expressions and the engine timezone
//!
//! Expressions have six fields with seconds first
//! (`sec min hour day-of-month month day-of-week`), an optional seventh
//! year field, the `@hourly`/`@daily`/... descriptors, or
//! `@every <duration>` for fixed intervals.

use chrono::{DateTime, Duration as ChronoDuration};
use chrono_tz::Tz;
use logalert_core::parse_duration;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("invalid cron {expr:?} for rule {rule:?}: {reason}")]
    InvalidCron {
        rule: String,
        expr: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub enum RuleSchedule {
    Cron(Box<cron::Schedule>),
    Every(ChronoDuration),
}

impl RuleSchedule {
    /// Parse a rule's schedule, naming the rule on failure.
    pub fn parse(rule: &str, expr: &str) -> Result<Self, ScheduleError> {
        let invalid = |reason: String| ScheduleError::InvalidCron {
            rule: rule.to_string(),
            expr: expr.to_string(),
            reason,
        };

        let trimmed = expr.trim();
        if let Some(interval) = trimmed.strip_prefix("@every") {
            let every = parse_duration(interval).map_err(|e| invalid(e.to_string()))?;
            let every = ChronoDuration::from_std(every).map_err(|e| invalid(e.to_string()))?;
            if every <= ChronoDuration::zero() {
                return Err(invalid("interval must be positive".into()));
            }
            return Ok(RuleSchedule::Every(every));
        }

        // seconds come first, a five-field crontab line is an error
        if !trimmed.starts_with('@') {
            let fields = trimmed.split_whitespace().count();
            if !(6..=7).contains(&fields) {
                return Err(invalid(format!("expected 6 or 7 fields, got {fields}")));
            }
        }

        cron::Schedule::from_str(trimmed)
            .map(|s| RuleSchedule::Cron(Box::new(s)))
            .map_err(|e| invalid(e.to_string()))
    }

    /// Next tick strictly after `after`, in `after`'s timezone.
    pub fn next_after(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        match self {
            RuleSchedule::Cron(schedule) => schedule.after(after).next(),
            RuleSchedule::Every(every) => after.checked_add_signed(*every),
        }
    }
}

/// Resolve the configured zone, falling back to the process local zone
/// and then UTC.
pub fn resolve_timezone(name: &str) -> Tz {
    if let Ok(tz) = name.trim().parse::<Tz>() {
        return tz;
    }
    let local = iana_time_zone::get_timezone()
        .ok()
        .and_then(|n| n.parse::<Tz>().ok())
        .unwrap_or(Tz::UTC);
    tracing::warn!(configured = %name, fallback = %local.name(), "invalid timezone, using local zone");
    local
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(tz: Tz, h: u32, m: u32, s: u32) -> DateTime<Tz> {
        tz.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_six_field_cron() {
        let schedule = RuleSchedule::parse("r", "0 */5 * * * *").unwrap();
        let next = schedule.next_after(&at(Tz::UTC, 10, 2, 30)).unwrap();
        assert_eq!(next, at(Tz::UTC, 10, 5, 0));
    }

    #[test]
    fn test_cron_respects_timezone() {
        let tz: Tz = "Asia/Shanghai".parse().unwrap();
        let schedule = RuleSchedule::parse("r", "0 0 9 * * *").unwrap();
        let next = schedule.next_after(&at(tz, 8, 59, 59)).unwrap();
        assert_eq!(next, at(tz, 9, 0, 0));
    }

    #[test]
    fn test_every_interval() {
        let schedule = RuleSchedule::parse("r", "@every 90s").unwrap();
        let next = schedule.next_after(&at(Tz::UTC, 0, 0, 0)).unwrap();
        assert_eq!(next, at(Tz::UTC, 0, 1, 30));
    }

    #[test]
    fn test_descriptor() {
        let schedule = RuleSchedule::parse("r", "@hourly").unwrap();
        let next = schedule.next_after(&at(Tz::UTC, 3, 15, 0)).unwrap();
        assert_eq!(next, at(Tz::UTC, 4, 0, 0));
    }

    #[test]
    fn test_invalid_names_rule() {
        let err = RuleSchedule::parse("disk-full", "not a cron").unwrap_err();
        let ScheduleError::InvalidCron { rule, .. } = &err;
        assert_eq!(rule, "disk-full");
        assert!(err.to_string().contains("disk-full"));

        // five-field crontab lines are rejected rather than misread
        assert!(RuleSchedule::parse("r", "*/5 * * * *").is_err());
        assert!(RuleSchedule::parse("r", "@every 0s").is_err());
    }

    #[test]
    fn test_resolve_timezone() {
        assert_eq!(resolve_timezone("Europe/Berlin"), chrono_tz::Europe::Berlin);
        // falls back to something valid rather than failing
        let _ = resolve_timezone("Mars/Olympus_Mons");
    }
}
