//! Threshold evaluation
//! the whole condition language is a strict `count > countGt`.

use crate::rule::Rule;

/// Fire decision for one evaluation's hit count.
pub fn hit(rule: &Rule, count: u64) -> bool {
    rule.threshold.is_hit(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Threshold;

    fn rule_with(threshold: Threshold) -> Rule {
        Rule {
            name: "r".into(),
            threshold,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_threshold_never_hits() {
        let rule = rule_with(Threshold::default());
        for count in [0, 1, 10, 1_000, u64::MAX] {
            assert!(!hit(&rule, count), "count {count} should not fire");
        }
    }

    #[test]
    fn test_strict_greater_than() {
        let rule = rule_with(Threshold::new(10));
        assert!(!hit(&rule, 9));
        assert!(!hit(&rule, 10));
        assert!(hit(&rule, 11));
    }

    #[test]
    fn test_negative_threshold_always_hits() {
        let rule = rule_with(Threshold::new(-1));
        assert!(hit(&rule, 0));
    }
}
