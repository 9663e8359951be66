//! Fan-out of one firing to the channels a rule names
//!
//! Matching notifiers run concurrently under one shared deadline, so a hung
//! channel cannot eat the budget of the others. Failures, timeouts and
//! panics are recorded per channel and never retried.

use crate::engine::panic_message;
use crate::notify::{Notifier, NotifyError};
use futures::FutureExt;
use futures::future::join_all;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

/// Shared deadline for the whole fan-out of one firing.
pub const DISPATCH_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    // notifier names in the order they were matched
    pub attempted: Vec<String>,
    pub delivered: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Dispatcher {
    notifiers: Vec<Arc<dyn Notifier>>,
    deadline: Duration,
}

impl Dispatcher {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self {
            notifiers,
            deadline: DISPATCH_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn notifiers(&self) -> &[Arc<dyn Notifier>] {
        &self.notifiers
    }

    /// Every registered notifier whose identity equals one of `channels`,
    /// once per listed name. Unknown names match nothing.
    pub fn matching<'a>(&'a self, channels: &'a [String]) -> impl Iterator<Item = &'a Arc<dyn Notifier>> + 'a {
        channels.iter().flat_map(move |ch| {
            self.notifiers
                .iter()
                .filter(move |n| n.name() == ch.as_str())
        })
    }

    pub async fn dispatch(&self, channels: &[String], title: &str, body: &str) -> DispatchReport {
        let deadline = Instant::now() + self.deadline;
        let targets: Vec<&Arc<dyn Notifier>> = self.matching(channels).collect();

        let sends = targets.iter().map(|n| async move {
            // a panicking channel fails alone, its siblings keep running
            let send = AssertUnwindSafe(timeout_at(deadline, n.send(title, body))).catch_unwind();
            let result = match send.await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(NotifyError::Timeout),
                Err(payload) => Err(NotifyError::Panicked(panic_message(payload.as_ref()).to_string())),
            };
            (n.name().to_string(), result)
        });
        let results = join_all(sends).await;

        let mut report = DispatchReport::default();
        for (name, result) in results {
            report.attempted.push(name.clone());
            match result {
                Ok(()) => report.delivered.push(name),
                Err(e) => {
                    tracing::error!(channel = %name, error = %e, "send alert failed");
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        report
    }
}
