//! Alert rules: typed conditions and message templates.

use serde::{Deserialize, Serialize};

use warden_core::config::AlertsConfig;
use warden_core::{HealthRecord, HealthStatus};

use crate::event::Severity;

/// The fixed set of fields a rule condition can look at.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleContext {
    pub status: HealthStatus,
    /// Seconds; absent when no probe was attempted.
    pub response_time: Option<f64>,
    pub consecutive_failures: u32,
    pub uptime_percentage: f64,
    pub previous_status: Option<HealthStatus>,
}

impl RuleContext {
    pub fn new(record: &HealthRecord, previous_status: Option<HealthStatus>) -> Self {
        Self {
            status: record.status,
            response_time: record.response_time,
            consecutive_failures: record.consecutive_failures,
            uptime_percentage: record.uptime_percentage,
            previous_status,
        }
    }
}

/// Predicate over a [`RuleContext`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum Condition {
    StatusIs { status: HealthStatus },
    PreviousStatusIs { status: HealthStatus },
    /// Strictly greater than.
    ResponseTimeAbove { seconds: f64 },
    ConsecutiveFailuresAtLeast { count: u32 },
    /// Strictly less than.
    UptimeBelow { percent: f64 },
    All { conditions: Vec<Condition> },
}

impl Condition {
    pub fn matches(&self, ctx: &RuleContext) -> bool {
        match self {
            Self::StatusIs { status } => ctx.status == *status,
            Self::PreviousStatusIs { status } => ctx.previous_status == Some(*status),
            Self::ResponseTimeAbove { seconds } => ctx.response_time.is_some_and(|t| t > *seconds),
            Self::ConsecutiveFailuresAtLeast { count } => ctx.consecutive_failures >= *count,
            Self::UptimeBelow { percent } => ctx.uptime_percentage < *percent,
            Self::All { conditions } => conditions.iter().all(|c| c.matches(ctx)),
        }
    }
}

/// A named condition with a severity and a message template.
///
/// Templates may use `{service}`, `{status}`, `{response_time}`,
/// `{consecutive_failures}`, `{uptime}` and `{error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub name: String,
    pub condition: Condition,
    pub severity: Severity,
    pub enabled: bool,
    pub template: String,
}

impl AlertRule {
    pub fn new(name: &str, condition: Condition, severity: Severity, template: &str) -> Self {
        Self {
            name: name.to_string(),
            condition,
            severity,
            enabled: true,
            template: template.to_string(),
        }
    }

    pub fn render(&self, record: &HealthRecord) -> String {
        let response_time = record
            .response_time
            .map(|t| format!("{t:.2}"))
            .unwrap_or_else(|| "n/a".to_string());
        self.template
            .replace("{service}", &record.service)
            .replace("{status}", record.status.as_str())
            .replace("{response_time}", &response_time)
            .replace("{consecutive_failures}", &record.consecutive_failures.to_string())
            .replace("{uptime}", &format!("{:.1}", record.uptime_percentage))
            .replace("{error}", record.error.as_deref().unwrap_or("no error reported"))
    }
}

/// The built-in rule set, with thresholds taken from configuration.
pub fn builtin_rules(config: &AlertsConfig, max_consecutive_failures: u32) -> Vec<AlertRule> {
    let mut rules = vec![
        AlertRule::new(
            "service_down",
            Condition::StatusIs {
                status: HealthStatus::Unhealthy,
            },
            Severity::Critical,
            "Service {service} is down: {error}",
        ),
        AlertRule::new(
            "high_response_time",
            Condition::ResponseTimeAbove {
                seconds: config.response_time_threshold_seconds,
            },
            Severity::Warning,
            "Service {service} is responding slowly ({response_time}s)",
        ),
        AlertRule::new(
            "consecutive_failures",
            Condition::ConsecutiveFailuresAtLeast {
                count: max_consecutive_failures,
            },
            Severity::Critical,
            "Service {service} failed {consecutive_failures} consecutive health checks",
        ),
        AlertRule::new(
            "low_uptime",
            Condition::UptimeBelow {
                percent: config.uptime_threshold_percent,
            },
            Severity::Warning,
            "Service {service} uptime dropped to {uptime}%",
        ),
        AlertRule::new(
            "service_recovery",
            Condition::All {
                conditions: vec![
                    Condition::StatusIs {
                        status: HealthStatus::Healthy,
                    },
                    Condition::PreviousStatusIs {
                        status: HealthStatus::Unhealthy,
                    },
                ],
            },
            Severity::Info,
            "Service {service} has recovered",
        ),
    ];

    for rule in &mut rules {
        if config.disabled_rules.iter().any(|d| d == &rule.name) {
            rule.enabled = false;
        }
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(status: HealthStatus) -> RuleContext {
        RuleContext {
            status,
            response_time: Some(0.1),
            consecutive_failures: 0,
            uptime_percentage: 100.0,
            previous_status: None,
        }
    }

    #[test]
    fn response_time_boundary_is_strict() {
        let cond = Condition::ResponseTimeAbove { seconds: 5.0 };
        let mut c = ctx(HealthStatus::Healthy);
        c.response_time = Some(5.01);
        assert!(cond.matches(&c));
        c.response_time = Some(5.0);
        assert!(!cond.matches(&c));
        c.response_time = None;
        assert!(!cond.matches(&c));
    }

    #[test]
    fn consecutive_failures_is_inclusive() {
        let cond = Condition::ConsecutiveFailuresAtLeast { count: 3 };
        let mut c = ctx(HealthStatus::Unhealthy);
        c.consecutive_failures = 2;
        assert!(!cond.matches(&c));
        c.consecutive_failures = 3;
        assert!(cond.matches(&c));
    }

    #[test]
    fn recovery_needs_both_statuses() {
        let rules = builtin_rules(&AlertsConfig::default(), 3);
        let recovery = rules.iter().find(|r| r.name == "service_recovery").unwrap();

        let mut c = ctx(HealthStatus::Healthy);
        assert!(!recovery.condition.matches(&c));
        c.previous_status = Some(HealthStatus::Unhealthy);
        assert!(recovery.condition.matches(&c));
        c.status = HealthStatus::Degraded;
        assert!(!recovery.condition.matches(&c));
    }

    #[test]
    fn disabled_rules_are_flagged() {
        let config = AlertsConfig {
            disabled_rules: vec!["low_uptime".to_string()],
            ..Default::default()
        };
        let rules = builtin_rules(&config, 3);
        assert_eq!(rules.len(), 5);
        assert!(!rules.iter().find(|r| r.name == "low_uptime").unwrap().enabled);
        assert!(rules.iter().filter(|r| r.enabled).count() == 4);
    }

    #[test]
    fn template_renders_record_fields() {
        let rule = AlertRule::new(
            "t",
            Condition::StatusIs {
                status: HealthStatus::Unhealthy,
            },
            Severity::Critical,
            "{service} {status} {response_time} {consecutive_failures} {uptime} {error}",
        );
        let mut record = HealthRecord::unknown("api");
        record.status = HealthStatus::Unhealthy;
        record.response_time = Some(1.234);
        record.consecutive_failures = 2;
        record.uptime_percentage = 97.5;
        record.error = Some("Timeout".to_string());
        assert_eq!(rule.render(&record), "api unhealthy 1.23 2 97.5 Timeout");
    }

    #[test]
    fn conditions_deserialize_from_toml() {
        let cond: Condition = toml::from_str("when = \"uptime_below\"\npercent = 90.0\n").unwrap();
        assert_eq!(cond, Condition::UptimeBelow { percent: 90.0 });
    }
}
