//! Core types for the log alerting engine
//! this crate contains the rule model and the pure decision logic shared
//! by the engine and the CLI. Nothing in here performs I/O.

pub mod document;
pub mod duration;
pub mod rule;
pub mod threshold;

pub use document::SampleDocument;
pub use duration::{parse_duration, parse_duration_or, DurationError};
pub use rule::{Alerts, Dedup, Rule, RuleFilter, Threshold, DEFAULT_SEVERITY};
pub use threshold::hit;
