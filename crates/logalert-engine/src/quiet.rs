//! Quiet-period tracking (alert deduplication)
//! last-fired timestamps per rule name, shared by concurrent evaluations.

use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct QuietPeriodTracker {
    last_fired: Mutex<HashMap<String, DateTime<Tz>>>,
}

impl QuietPeriodTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only check: has the rule's quiet period elapsed at `now`?
    pub fn should_fire(&self, rule: &str, quiet: Duration, now: DateTime<Tz>) -> bool {
        let map = self.lock();
        is_due(map.get(rule), quiet, now)
    }

    /// Check and record in one critical section. Returns false when the
    /// rule fired within its quiet period, in which case nothing changes.
    pub fn try_fire(&self, rule: &str, quiet: Duration, now: DateTime<Tz>) -> bool {
        let mut map = self.lock();
        if !is_due(map.get(rule), quiet, now) {
            return false;
        }
        map.insert(rule.to_string(), now);
        true
    }

    pub fn last_fired(&self, rule: &str) -> Option<DateTime<Tz>> {
        self.lock().get(rule).copied()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Tz>>> {
        // poisoning is ignored, every write is a single insert
        self.last_fired.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn is_due(last: Option<&DateTime<Tz>>, quiet: Duration, now: DateTime<Tz>) -> bool {
    let Some(last) = last else {
        return true;
    };
    let quiet = TimeDelta::from_std(quiet).unwrap_or(TimeDelta::MAX);
    now.signed_duration_since(*last) >= quiet
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FIVE_MIN: Duration = Duration::from_secs(300);

    fn t0() -> DateTime<Tz> {
        Tz::UTC.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_unknown_rule_fires() {
        let tracker = QuietPeriodTracker::new();
        assert!(tracker.should_fire("a", FIVE_MIN, t0()));
        assert!(tracker.last_fired("a").is_none());
    }

    #[test]
    fn test_quiet_window_boundaries() {
        let tracker = QuietPeriodTracker::new();
        assert!(tracker.try_fire("a", FIVE_MIN, t0()));

        for secs in [0, 1, 60, 299] {
            let t = t0() + TimeDelta::seconds(secs);
            assert!(!tracker.should_fire("a", FIVE_MIN, t), "fired at +{secs}s");
        }
        assert!(tracker.should_fire("a", FIVE_MIN, t0() + TimeDelta::seconds(300)));
    }

    #[test]
    fn test_try_fire_is_exclusive() {
        let tracker = QuietPeriodTracker::new();
        assert!(tracker.try_fire("a", FIVE_MIN, t0()));
        assert!(!tracker.try_fire("a", FIVE_MIN, t0() + TimeDelta::seconds(10)));
        assert_eq!(tracker.last_fired("a"), Some(t0()));

        // other rules are independent
        assert!(tracker.try_fire("b", FIVE_MIN, t0()));
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let tracker = Arc::new(QuietPeriodTracker::new());
        let wins = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let tracker = tracker.clone();
                let wins = wins.clone();
                std::thread::spawn(move || {
                    if tracker.try_fire("hot", FIVE_MIN, t0()) {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}
