//! Per-rule timers
//!
//! Each rule gets its own task that sleeps until the rule's next tick and
//! spawns the evaluation into a shared tracker, so a slow evaluation never
//! delays the timer and evaluations of one rule may overlap.

use crate::config::DEFAULT_SHUTDOWN_TIMEOUT;
use crate::engine::AlertEngine;
use crate::schedule::{RuleSchedule, ScheduleError};
use chrono::Utc;
use logalert_core::Rule;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub struct Scheduler {
    engine: Arc<AlertEngine>,
    token: CancellationToken,
    tasks: TaskTracker,
    shutdown_timeout: Duration,
}

impl Scheduler {
    pub fn new(engine: Arc<AlertEngine>) -> Self {
        Self {
            engine,
            token: CancellationToken::new(),
            tasks: TaskTracker::new(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn engine(&self) -> &Arc<AlertEngine> {
        &self.engine
    }

    /// Timers plus in-flight evaluations.
    pub fn active_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Register one timer per rule. Every schedule is parsed first, so an
    /// invalid expression starts nothing. Must be called inside a tokio
    /// runtime.
    pub fn start(&self) -> Result<usize, ScheduleError> {
        let timers = self
            .engine
            .rules()
            .iter()
            .map(|rule| RuleSchedule::parse(&rule.name, &rule.cron).map(|s| (Arc::clone(rule), s)))
            .collect::<Result<Vec<_>, _>>()?;

        let count = timers.len();
        for (rule, schedule) in timers {
            tracing::info!(rule = %rule.name, cron = %rule.cron, "rule scheduled");
            self.tasks.spawn(run_timer(
                Arc::clone(&self.engine),
                rule,
                schedule,
                self.token.clone(),
                self.tasks.clone(),
            ));
        }
        tracing::info!(rules = count, timezone = %self.engine.timezone().name(), "scheduler started");
        Ok(count)
    }

    /// Stop ticking and wait for in-flight evaluations, at most
    /// `shutdown_timeout`. Returns false when the wait timed out.
    pub async fn stop(&self) -> bool {
        self.token.cancel();
        self.tasks.close();

        match tokio::time::timeout(self.shutdown_timeout, self.tasks.wait()).await {
            Ok(()) => {
                tracing::info!("scheduler stopped");
                true
            }
            Err(_) => {
                tracing::warn!(
                    pending = self.tasks.len(),
                    timeout = ?self.shutdown_timeout,
                    "shutdown timed out with evaluations still running"
                );
                false
            }
        }
    }
}

async fn run_timer(
    engine: Arc<AlertEngine>,
    rule: Arc<Rule>,
    schedule: RuleSchedule,
    token: CancellationToken,
    tasks: TaskTracker,
) {
    let tz = engine.timezone();
    let mut cursor = Utc::now().with_timezone(&tz);

    loop {
        let Some(next) = schedule.next_after(&cursor) else {
            tracing::info!(rule = %rule.name, "schedule has no further ticks");
            return;
        };
        let wait = next
            .signed_duration_since(Utc::now().with_timezone(&tz))
            .to_std()
            .unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(wait) => {}
        }
        if token.is_cancelled() {
            return;
        }

        let engine = Arc::clone(&engine);
        let tick_rule = Arc::clone(&rule);
        tasks.spawn(async move {
            engine.run_tick(&tick_rule).await;
        });

        // never reuse a tick, and skip ticks missed while the process slept
        let now = Utc::now().with_timezone(&tz);
        cursor = if now > next { now } else { next };
    }
}
