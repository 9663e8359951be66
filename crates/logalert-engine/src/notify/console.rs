// Console channel, writes the alert to the log

use super::{Notifier, NotifyError};
use async_trait::async_trait;

pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        tracing::info!(channel = "console", "[ALERT] {}\n{}", title, body);
        Ok(())
    }
}
