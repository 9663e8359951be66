//! One rule evaluation, end to end
//!
//! quiet-period pre-check -> query -> threshold -> fire decision -> render
//! -> dispatch. The fire decision is recorded before dispatch and does not
//! depend on delivery.

use crate::backend::SearchBackend;
use crate::config::{AlertConfig, DEFAULT_QUIET_PERIOD, DEFAULT_SAMPLE_SIZE};
use crate::dispatch::{DispatchReport, Dispatcher};
use crate::notify::Notifier;
use crate::query::build_query;
use crate::quiet::QuietPeriodTracker;
use crate::render::{RenderContext, render_body, render_title};
use crate::schedule::resolve_timezone;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::FutureExt;
use logalert_core::{Rule, hit};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Inside the quiet period, no query was issued.
    Suppressed,
    QueryFailed,
    BelowThreshold,
    /// An overlapping evaluation of the same rule fired first.
    Raced,
    Fired { count: u64, report: DispatchReport },
}

impl Evaluation {
    pub fn is_fired(&self) -> bool {
        matches!(self, Evaluation::Fired { .. })
    }
}

pub struct AlertEngine {
    rules: Vec<Arc<Rule>>,
    backend: Arc<dyn SearchBackend>,
    dispatcher: Dispatcher,
    tracker: QuietPeriodTracker,
    timezone: Tz,
    default_quiet: Duration,
    sample_size: usize,
    link_base: Option<String>,
    backend_address: Option<String>,
}

impl AlertEngine {
    pub fn new(rules: Vec<Rule>, backend: Arc<dyn SearchBackend>, dispatcher: Dispatcher) -> Self {
        Self {
            rules: rules.into_iter().map(Arc::new).collect(),
            backend,
            dispatcher,
            tracker: QuietPeriodTracker::new(),
            timezone: Tz::UTC,
            default_quiet: DEFAULT_QUIET_PERIOD,
            sample_size: DEFAULT_SAMPLE_SIZE,
            link_base: None,
            backend_address: None,
        }
    }

    pub fn from_config(
        config: &AlertConfig,
        rules: Vec<Rule>,
        backend: Arc<dyn SearchBackend>,
        notifiers: Vec<Arc<dyn Notifier>>,
    ) -> Self {
        let mut engine = Self::new(rules, backend, Dispatcher::new(notifiers))
            .with_timezone(resolve_timezone(&config.scheduler.timezone))
            .with_default_quiet_period(config.rules.default_quiet_period())
            .with_sample_size(config.rules.sample_size());
        if !config.web.base_url.is_empty() {
            engine.link_base = Some(config.web.base_url.clone());
        }
        engine.backend_address = config.backend.primary_address().map(str::to_string);
        engine
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_default_quiet_period(mut self, quiet: Duration) -> Self {
        self.default_quiet = quiet;
        self
    }

    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size;
        self
    }

    pub fn with_link_base(mut self, base: impl Into<String>) -> Self {
        self.link_base = Some(base.into());
        self
    }

    pub fn with_backend_address(mut self, address: impl Into<String>) -> Self {
        self.backend_address = Some(address.into());
        self
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    pub fn tracker(&self) -> &QuietPeriodTracker {
        &self.tracker
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub async fn evaluate(&self, rule: &Rule, now: DateTime<Tz>) -> Evaluation {
        let quiet = rule.quiet_period(self.default_quiet);
        if !self.tracker.should_fire(&rule.name, quiet, now) {
            tracing::debug!(rule = %rule.name, "inside quiet period, skip");
            return Evaluation::Suppressed;
        }

        let query = match build_query(rule, now, self.sample_size) {
            Ok(query) => query,
            Err(e) => {
                tracing::error!(rule = %rule.name, error = %e, "build query failed");
                return Evaluation::QueryFailed;
            }
        };

        let result = match self.backend.search(&rule.index, &query).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    rule = %rule.name,
                    index = %rule.index,
                    provider = self.backend.provider(),
                    error = %e,
                    "search failed"
                );
                return Evaluation::QueryFailed;
            }
        };

        if !hit(rule, result.total) {
            tracing::debug!(rule = %rule.name, count = result.total, "below threshold");
            return Evaluation::BelowThreshold;
        }

        if !self.tracker.try_fire(&rule.name, quiet, now) {
            tracing::debug!(rule = %rule.name, "fired by an overlapping evaluation");
            return Evaluation::Raced;
        }

        tracing::warn!(
            rule = %rule.name,
            count = result.total,
            threshold = ?rule.threshold.count_gt,
            "alert fired"
        );

        let title = render_title(rule);
        let body = render_body(rule, result.total, &result.documents, &self.render_context(now));
        let report = self
            .dispatcher
            .dispatch(&rule.alerts.channels, &title, &body)
            .await;
        if report.attempted.is_empty() {
            tracing::warn!(rule = %rule.name, "no notifier matched the rule's channels");
        }

        Evaluation::Fired {
            count: result.total,
            report,
        }
    }

    /// Evaluate `rule` now, in the engine timezone. A panic anywhere in the
    /// pipeline is logged and ends this evaluation only.
    pub async fn run_tick(&self, rule: &Rule) -> Option<Evaluation> {
        let now = Utc::now().with_timezone(&self.timezone);
        match AssertUnwindSafe(self.evaluate(rule, now)).catch_unwind().await {
            Ok(evaluation) => Some(evaluation),
            Err(payload) => {
                tracing::error!(
                    rule = %rule.name,
                    panic = panic_message(payload.as_ref()),
                    "evaluation panicked"
                );
                None
            }
        }
    }

    fn render_context(&self, now: DateTime<Tz>) -> RenderContext {
        let mut ctx = RenderContext::new(now);
        if let Some(base) = &self.link_base {
            ctx = ctx.with_link_base(base.as_str());
        }
        if let Some(address) = &self.backend_address {
            ctx = ctx.with_backend_address(address.as_str());
        }
        ctx
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
