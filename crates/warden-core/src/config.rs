//! warden.toml configuration parser.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration. Durations are expressed in whole seconds.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub monitor: MonitorConfig,
    pub discovery: DiscoveryConfig,
    pub breaker: BreakerConfig,
    pub alerts: AlertsConfig,
    pub healing: HealingConfig,
    pub readiness: ReadinessConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub check_interval_seconds: u64,
    pub timeout_seconds: u64,
    pub max_consecutive_failures: u32,
    pub max_concurrent_checks: usize,
    pub discovery_interval_seconds: u64,
    pub uptime_window_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: 30,
            timeout_seconds: 10,
            max_consecutive_failures: 3,
            max_concurrent_checks: 10,
            discovery_interval_seconds: 300,
            uptime_window_seconds: 24 * 60 * 60,
        }
    }
}

impl MonitorConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_secs(self.discovery_interval_seconds)
    }

    pub fn uptime_window(&self) -> Duration {
        Duration::from_secs(self.uptime_window_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Compose-style manifest files, read in order.
    pub manifests: Vec<PathBuf>,
    pub default_host: String,
    pub default_health_path: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            manifests: vec![PathBuf::from("docker-compose.yml")],
            default_host: "localhost".to_string(),
            default_health_path: "/health".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    pub max_failures: u32,
    pub cooldown_seconds: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            cooldown_seconds: 60,
        }
    }
}

impl BreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub response_time_threshold_seconds: f64,
    pub uptime_threshold_percent: f64,
    pub dispatch_timeout_seconds: u64,
    /// Built-in rules to switch off, by name.
    pub disabled_rules: Vec<String>,
    pub sinks: Vec<SinkConfig>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            response_time_threshold_seconds: 5.0,
            uptime_threshold_percent: 95.0,
            dispatch_timeout_seconds: 10,
            disabled_rules: Vec::new(),
            sinks: Vec::new(),
        }
    }
}

/// One outbound notification sink. Endpoints are opaque to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Emit alerts as log events.
    Log,
    /// POST the alert event as JSON.
    Webhook {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    /// POST a `{"text": ...}` message to a chat webhook.
    Chat { url: String },
}

impl SinkConfig {
    /// Remote endpoint, if the sink has one.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Log => None,
            Self::Webhook { url, .. } | Self::Chat { url } => Some(url),
        }
    }
}

/// Remediation backends, tried in the configured order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Container,
    Orchestrator,
    Process,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealingConfig {
    pub strategies: Vec<StrategyKind>,
    pub command_timeout_seconds: u64,
    /// Namespace for orchestrator restarts. Absent disables that backend.
    pub orchestrator_namespace: Option<String>,
    /// Shell command template; `{name}` expands to the service name, passed as a quoted argument.
    pub process_restart_command: Option<String>,
    /// Per-service strategy chains overriding `strategies`.
    pub overrides: HashMap<String, Vec<StrategyKind>>,
}

impl Default for HealingConfig {
    fn default() -> Self {
        Self {
            strategies: vec![
                StrategyKind::Container,
                StrategyKind::Orchestrator,
                StrategyKind::Process,
            ],
            command_timeout_seconds: 60,
            orchestrator_namespace: None,
            process_restart_command: None,
            overrides: HashMap::new(),
        }
    }
}

impl HealingConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub latency_budget_seconds: f64,
    pub uptime_target_percent: f64,
    pub documentation_paths: Vec<PathBuf>,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            latency_budget_seconds: 2.0,
            uptime_target_percent: 99.0,
            documentation_paths: vec![PathBuf::from("README.md")],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub listen: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:9400".to_string(),
        }
    }
}

impl WardenConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: WardenConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.monitor.max_concurrent_checks == 0 {
            return Err(ConfigError::Invalid {
                field: "monitor.max_concurrent_checks",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.monitor.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "monitor.timeout_seconds",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.breaker.max_failures == 0 {
            return Err(ConfigError::Invalid {
                field: "breaker.max_failures",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
