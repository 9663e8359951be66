//! Configuration parsing for the alert engine

use logalert_core::parse_duration_or;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SAMPLE_SIZE: usize = 3;
pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

// Main config structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub web: WebConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which wire dialect the search backend speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Elasticsearch,
    Opensearch,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub provider: Provider,

    // tried in order until one answers
    #[serde(default)]
    pub addresses: Vec<String>,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    // sent as `Authorization: ApiKey <key>`
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub tls_skip_verify: bool,

    #[serde(default)]
    pub request_timeout: String,
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        parse_duration_or(&self.request_timeout, Duration::from_secs(30))
    }

    /// First configured address without a trailing slash.
    pub fn primary_address(&self) -> Option<&str> {
        self.addresses
            .iter()
            .map(|a| a.trim().trim_end_matches('/'))
            .find(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulerConfig {
    // IANA zone name; invalid falls back to the local zone
    #[serde(default)]
    pub timezone: String,

    #[serde(default)]
    pub shutdown_timeout: String,
}

impl SchedulerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        parse_duration_or(&self.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub directory: PathBuf,

    #[serde(default)]
    pub sample_size: i64,

    #[serde(default)]
    pub default_quiet_period: String,
}

impl RulesConfig {
    pub fn sample_size(&self) -> usize {
        if self.sample_size <= 0 {
            DEFAULT_SAMPLE_SIZE
        } else {
            self.sample_size as usize
        }
    }

    pub fn default_quiet_period(&self) -> Duration {
        parse_duration_or(&self.default_quiet_period, DEFAULT_QUIET_PERIOD)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebConfig {
    // public base used for deep links in alert bodies
    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: String,
}

// notification channel settings, a channel is registered only when configured
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub feishu: FeishuConfig,

    #[serde(default)]
    pub dingtalk: DingTalkConfig,

    #[serde(default)]
    pub wechat: WeChatConfig,

    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default)]
    pub timeout: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub webhook_url: String,

    #[serde(default)]
    pub timeout: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeishuConfig {
    #[serde(default)]
    pub webhook: String,

    #[serde(default)]
    pub enable_at_all: bool,

    #[serde(default)]
    pub title_prefix: String,

    #[serde(default)]
    pub content_intro: String,

    #[serde(default)]
    pub timeout: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DingTalkConfig {
    #[serde(default)]
    pub webhook: String,

    // enables HMAC-SHA256 URL signing when set
    #[serde(default)]
    pub secret: String,

    #[serde(default)]
    pub enable_at_all: bool,

    #[serde(default)]
    pub timeout: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeChatConfig {
    #[serde(default)]
    pub webhook: String,

    #[serde(default)]
    pub timeout: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub from: String,

    #[serde(default)]
    pub to: Vec<String>,

    // implicit TLS (smtps); otherwise STARTTLS when offered
    #[serde(default)]
    pub use_tls: bool,

    #[serde(default)]
    pub tls_skip_verify: bool,

    #[serde(default)]
    pub subject_prefix: String,

    #[serde(default)]
    pub timeout: String,
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && !self.from.is_empty() && !self.to.is_empty()
    }
}

impl AlertConfig {
    /// Parse from TOML text and apply defaults.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: AlertConfig = toml::from_str(content)?;
        config.apply_defaults();
        Ok(config)
    }

    fn apply_defaults(&mut self) {
        if self.scheduler.timezone.trim().is_empty() {
            self.scheduler.timezone = DEFAULT_TIMEZONE.to_string();
        }
        if self.logging.level.trim().is_empty() {
            self.logging.level = "info".to_string();
        }
        if self.rules.sample_size <= 0 {
            self.rules.sample_size = DEFAULT_SAMPLE_SIZE as i64;
        }
    }

    /// Checks that the engine cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.primary_address().is_none() {
            return Err(ConfigError::Invalid(
                "backend.addresses must contain at least one address".into(),
            ));
        }
        if self.rules.directory.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("rules.directory is required".into()));
        }
        Ok(())
    }
}

// Load configuration from a TOML file, LOG_LEVEL overrides logging.level
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AlertConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = AlertConfig::from_toml(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        if !level.trim().is_empty() {
            config.logging.level = level;
        }
    }
    Ok(config)
}
