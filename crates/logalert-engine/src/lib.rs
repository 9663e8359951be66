//! Log alert evaluation engine
//!
//! Rules are loaded from a directory, each is evaluated on its own schedule
//! against an Elasticsearch/OpenSearch backend, and firings fan out to the
//! configured notification channels.

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod loader;
pub mod notify;
pub mod query;
pub mod quiet;
pub mod render;
pub mod schedule;
pub mod scheduler;

pub use backend::{BackendError, SearchBackend, SearchResult, build_backend};
pub use config::{AlertConfig, ConfigError, load_config};
pub use dispatch::{DispatchReport, Dispatcher};
pub use engine::{AlertEngine, Evaluation};
pub use loader::{LoadError, load_rules};
pub use notify::{Notifier, NotifyError, build_notifiers};
pub use query::{SearchQuery, build_query};
pub use quiet::QuietPeriodTracker;
pub use schedule::{RuleSchedule, ScheduleError, resolve_timezone};
pub use scheduler::Scheduler;
