//! Domain types shared across the Warden crates.
//!
//! Service definitions are produced by discovery and replaced wholesale on
//! every discovery cycle. Health records are produced by the check engine and
//! overwritten on every probe cycle. Both serialize to JSON for the API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a monitored service, unique within a registry.
pub type ServiceName = String;

// ── Services ──────────────────────────────────────────────────────

/// Broad role of a service in the fleet, inferred from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceCategory {
    ApiService,
    Datastore,
    MessageQueue,
    LoadBalancer,
    Monitoring,
    BackgroundWorker,
}

impl ServiceCategory {
    /// Whether services of this category are critical unless told otherwise.
    pub fn critical_by_default(self) -> bool {
        matches!(self, Self::ApiService | Self::Datastore)
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ApiService => "api_service",
            Self::Datastore => "datastore",
            Self::MessageQueue => "message_queue",
            Self::LoadBalancer => "load_balancer",
            Self::Monitoring => "monitoring",
            Self::BackgroundWorker => "background_worker",
        };
        f.write_str(s)
    }
}

/// Resource limits declared for a service in its manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU share, e.g. `0.5`.
    pub cpus: Option<f64>,
    /// Memory limit as written in the manifest, e.g. `"512M"`.
    pub memory: Option<String>,
}

impl ResourceLimits {
    pub fn is_empty(&self) -> bool {
        self.cpus.is_none() && self.memory.is_none()
    }
}

/// Static descriptor of a monitored service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: ServiceName,
    pub category: ServiceCategory,
    pub host: String,
    pub port: u16,
    /// HTTP path probed for health, e.g. `/health`.
    pub health_path: String,
    /// Names of services this one depends on. May name unknown services.
    pub dependencies: Vec<ServiceName>,
    pub startup_timeout_secs: u64,
    pub check_interval_secs: u64,
    pub max_restart_attempts: u32,
    pub critical: bool,
    /// Container name or id used by restart strategies.
    pub container_ref: Option<String>,
    pub resources: Option<ResourceLimits>,
}

impl ServiceDefinition {
    /// A definition with default timings and no dependencies.
    pub fn new(name: &str, category: ServiceCategory, host: &str, port: u16) -> Self {
        Self {
            name: name.to_string(),
            category,
            host: host.to_string(),
            port,
            health_path: "/health".to_string(),
            dependencies: Vec::new(),
            startup_timeout_secs: 60,
            check_interval_secs: 30,
            max_restart_attempts: 3,
            critical: category.critical_by_default(),
            container_ref: None,
            resources: None,
        }
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// `host:port` address used for connectivity checks.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Health ────────────────────────────────────────────────────────

/// Health status of a service as determined by the latest probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
    Stopped,
}

impl HealthStatus {
    /// Statuses that extend a service's consecutive failure streak.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Unhealthy | Self::Unknown)
    }

    /// Statuses that count toward uptime.
    pub fn is_up(self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest observed status and metrics for one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub service: ServiceName,
    pub status: HealthStatus,
    /// Unix timestamp of this check.
    pub last_check: u64,
    /// Probe latency in seconds, absent when no probe was attempted.
    pub response_time: Option<f64>,
    pub error: Option<String>,
    pub consecutive_failures: u32,
    /// Unix timestamp of the last HEALTHY or DEGRADED check.
    pub last_successful: Option<u64>,
    /// Share of successful checks inside the rolling window (0–100).
    pub uptime_percentage: f64,
}

impl HealthRecord {
    /// A record for a service that has not been checked yet.
    pub fn unknown(service: &str) -> Self {
        Self {
            service: service.to_string(),
            status: HealthStatus::Unknown,
            last_check: 0,
            response_time: None,
            error: None,
            consecutive_failures: 0,
            last_successful: None,
            uptime_percentage: 100.0,
        }
    }
}
