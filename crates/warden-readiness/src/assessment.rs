//! Readiness verdicts.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::check::{CheckCategory, CheckResult, CheckSeverity};

/// Ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessLevel {
    NotReady,
    TestingReady,
    DevelopmentReady,
    ProductionReady,
}

impl fmt::Display for ReadinessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotReady => "NOT_READY",
            Self::TestingReady => "TESTING_READY",
            Self::DevelopmentReady => "DEVELOPMENT_READY",
            Self::ProductionReady => "PRODUCTION_READY",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub passed: usize,
    pub failed: usize,
}

impl CategorySummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessAssessment {
    pub readiness_level: ReadinessLevel,
    /// Percentage of checks that passed, 0-100.
    pub score: f64,
    pub total_checks: usize,
    pub passed_checks: usize,
    /// `"<check>: <details>"` for failed critical or required checks.
    pub critical_issues: Vec<String>,
    pub categories: BTreeMap<CheckCategory, CategorySummary>,
    pub recommendations: Vec<String>,
    pub results: Vec<CheckResult>,
    pub assessed_at: u64,
}

impl ReadinessAssessment {
    pub fn from_results(results: Vec<CheckResult>, assessed_at: u64) -> Self {
        let total_checks = results.len();
        let passed_checks = results.iter().filter(|r| r.passed).count();
        let score = if total_checks == 0 {
            100.0
        } else {
            passed_checks as f64 / total_checks as f64 * 100.0
        };

        let mut categories: BTreeMap<CheckCategory, CategorySummary> = BTreeMap::new();
        for r in &results {
            let entry = categories.entry(r.category).or_default();
            if r.passed {
                entry.passed += 1;
            } else {
                entry.failed += 1;
            }
        }

        let critical_issues = results
            .iter()
            .filter(|r| !r.passed && (r.required || r.severity == CheckSeverity::Critical))
            .map(|r| format!("{}: {}", r.name, r.details))
            .collect();

        Self {
            readiness_level: classify(&results),
            score,
            total_checks,
            passed_checks,
            critical_issues,
            categories,
            recommendations: recommendations(&results),
            results,
            assessed_at,
        }
    }

    pub fn is_production_ready(&self) -> bool {
        self.readiness_level == ReadinessLevel::ProductionReady
    }
}

/// Map check results to a readiness level.
pub fn classify(results: &[CheckResult]) -> ReadinessLevel {
    let failed: Vec<&CheckResult> = results.iter().filter(|r| !r.passed).collect();
    let critical = failed.iter().any(|r| r.severity == CheckSeverity::Critical);
    let required = failed.iter().filter(|r| r.required).count();

    if critical || required > 2 {
        ReadinessLevel::NotReady
    } else if required > 0 {
        ReadinessLevel::TestingReady
    } else if failed.iter().any(|r| r.severity == CheckSeverity::High) {
        ReadinessLevel::DevelopmentReady
    } else {
        ReadinessLevel::ProductionReady
    }
}

fn recommendations(results: &[CheckResult]) -> Vec<String> {
    let mut buckets: BTreeMap<CheckSeverity, usize> = BTreeMap::new();
    for r in results.iter().filter(|r| !r.passed) {
        *buckets.entry(r.severity).or_default() += 1;
    }
    buckets
        .into_iter()
        .map(|(severity, n)| match severity {
            CheckSeverity::Critical => format!("Resolve {n} critical issue(s) before deploying to production"),
            CheckSeverity::High => format!("Address {n} high-severity issue(s) to reach production readiness"),
            CheckSeverity::Medium => format!("Review {n} medium-severity issue(s) to harden operations"),
            CheckSeverity::Low => format!("Consider {n} low-severity improvement(s)"),
        })
        .collect()
}
