use logalert_engine::loader::{LoadError, load_rules};
use logalert_engine::schedule::RuleSchedule;
use std::fs;
use tempfile::TempDir;

const ERROR_SPIKE: &str = r#"
name = "error-spike"
severity = "High"
index = "app-logs-*"
cron = "0 * * * * *"
timeWindow = "5m"
queryString = "level:error"
threshold = { countGt = 10 }
dedup = { quietPeriod = "5m" }
alerts = { channels = ["console", "webhook"] }
"#;

#[test]
fn test_rule_directory_loads_and_schedules() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("error-spike.toml"), ERROR_SPIKE).unwrap();
    fs::write(dir.path().join("README.md"), "# rules").unwrap();

    let rules = load_rules(dir.path()).unwrap();
    assert_eq!(rules.len(), 1);

    let rule = &rules[0];
    assert_eq!(rule.severity(), "High");
    assert_eq!(rule.threshold.count_gt, Some(10));
    assert!(RuleSchedule::parse(&rule.name, &rule.cron).is_ok());
}

#[test]
fn test_missing_cron_rejects_whole_set() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("error-spike.toml"), ERROR_SPIKE).unwrap();
    let broken = ERROR_SPIKE
        .replace("error-spike", "no-schedule")
        .replace("cron = \"0 * * * * *\"\n", "");
    let broken_path = dir.path().join("no-schedule.toml");
    fs::write(&broken_path, broken).unwrap();

    let err = load_rules(dir.path()).unwrap_err();
    assert!(matches!(err, LoadError::Invalid { .. }));
    assert_eq!(err.path(), broken_path.as_path());

    let msg = err.to_string();
    assert!(msg.contains("no-schedule.toml"));
    assert!(msg.contains("cron"));
}

#[test]
fn test_malformed_json_names_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ \"name\": ").unwrap();

    let err = load_rules(dir.path()).unwrap_err();
    assert!(matches!(err, LoadError::Parse { .. }));
    assert!(err.to_string().contains("broken.json"));
}
