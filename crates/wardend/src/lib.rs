//! Composition root for the Warden daemon.
//!
//! [`Monitor`] owns one instance of every component and is shared via `Arc`
//! between the monitoring loop, the HTTP API and the one-shot subcommands.

pub mod monitor;

pub use monitor::{CycleSummary, Monitor};
