//! Readiness check definitions and the context they evaluate.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use warden_core::config::{ReadinessConfig, SinkConfig};
use warden_core::{HealthRecord, ServiceDefinition};
use warden_deps::DependencyReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    Infrastructure,
    Api,
    Integration,
    Monitoring,
    Security,
    Performance,
    Documentation,
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Infrastructure => "infrastructure",
            Self::Api => "api",
            Self::Integration => "integration",
            Self::Monitoring => "monitoring",
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Documentation => "documentation",
        })
    }
}

/// Most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for CheckSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        })
    }
}

/// What an evaluator reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub passed: bool,
    pub details: String,
}

impl CheckOutcome {
    pub fn pass(details: impl Into<String>) -> Self {
        Self {
            passed: true,
            details: details.into(),
        }
    }

    pub fn fail(details: impl Into<String>) -> Self {
        Self {
            passed: false,
            details: details.into(),
        }
    }
}

/// Everything an evaluator may look at. Built once per readiness run.
#[derive(Debug, Clone, Default)]
pub struct ReadinessContext {
    pub services: BTreeMap<String, ServiceDefinition>,
    pub health: BTreeMap<String, HealthRecord>,
    pub dependencies: DependencyReport,
    pub sinks: Vec<SinkConfig>,
    pub config: ReadinessConfig,
    /// Directory that `config.documentation_paths` are relative to.
    pub base_dir: PathBuf,
}

pub type Evaluator = Box<dyn Fn(&ReadinessContext) -> anyhow::Result<CheckOutcome> + Send + Sync>;

pub struct ReadinessCheck {
    pub name: String,
    pub category: CheckCategory,
    pub severity: CheckSeverity,
    /// Must pass before production.
    pub required: bool,
    evaluator: Evaluator,
}

impl ReadinessCheck {
    pub fn new<F>(name: &str, category: CheckCategory, severity: CheckSeverity, required: bool, evaluator: F) -> Self
    where
        F: Fn(&ReadinessContext) -> anyhow::Result<CheckOutcome> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            category,
            severity,
            required,
            evaluator: Box::new(evaluator),
        }
    }

    pub fn evaluate(&self, ctx: &ReadinessContext) -> anyhow::Result<CheckOutcome> {
        (self.evaluator)(ctx)
    }
}

impl fmt::Debug for ReadinessCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessCheck")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("severity", &self.severity)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// One evaluated check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub category: CheckCategory,
    pub severity: CheckSeverity,
    pub required: bool,
    pub passed: bool,
    pub details: String,
}
