//! warden-alert: rule-based alerting over health records.
//!
//! # Components
//!
//! - **`rule`**: typed conditions over a fixed context, message templates,
//!   and the built-in rule set
//! - **`engine`**: pure evaluation, active/resolved lifecycle, dispatch
//! - **`sink`**: notification sinks (log, webhook, chat)
//!
//! Dispatch runs each sink as its own task with a timeout. A failing sink
//! is recorded in the [`DispatchReport`] and never affects other sinks.

pub mod engine;
pub mod error;
pub mod event;
pub mod rule;
pub mod sink;

pub use engine::{AlertEngine, DispatchReport};
pub use error::AlertDispatchError;
pub use event::{AlertEvent, AlertStatus, Severity};
pub use rule::{AlertRule, Condition, RuleContext, builtin_rules};
pub use sink::{AlertSink, ChatSink, LogSink, WebhookSink, build_sinks};
