//! Alert events produced when rules fire.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub rule: String,
    pub service: String,
    pub severity: Severity,
    pub message: String,
    pub triggered_at: u64,
    pub resolved_at: Option<u64>,
    pub status: AlertStatus,
}

impl AlertEvent {
    /// One-line summary used by chat and log sinks.
    pub fn summary(&self) -> String {
        match self.status {
            AlertStatus::Active => format!("[{}] {}", self.severity, self.message),
            AlertStatus::Resolved => format!("[resolved] {}", self.message),
        }
    }
}
