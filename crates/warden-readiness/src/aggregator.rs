//! Runs the check battery.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, info, warn};

use warden_core::epoch_secs;

use crate::assessment::ReadinessAssessment;
use crate::battery::standard_checks;
use crate::check::{CheckOutcome, CheckResult, ReadinessCheck, ReadinessContext};

#[derive(Debug)]
pub struct ReadinessAggregator {
    checks: Vec<ReadinessCheck>,
}

impl Default for ReadinessAggregator {
    fn default() -> Self {
        Self::standard()
    }
}

impl ReadinessAggregator {
    pub fn new(checks: Vec<ReadinessCheck>) -> Self {
        Self { checks }
    }

    /// The standard battery.
    pub fn standard() -> Self {
        Self::new(standard_checks())
    }

    pub fn with_check(mut self, check: ReadinessCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn checks(&self) -> &[ReadinessCheck] {
        &self.checks
    }

    /// Evaluate every check and classify the results.
    pub fn run(&self, ctx: &ReadinessContext) -> ReadinessAssessment {
        let results: Vec<CheckResult> = self.checks.iter().map(|check| evaluate(check, ctx)).collect();
        let assessment = ReadinessAssessment::from_results(results, epoch_secs());
        info!(
            level = %assessment.readiness_level,
            score = assessment.score,
            passed = assessment.passed_checks,
            total = assessment.total_checks,
            "readiness assessed"
        );
        assessment
    }
}

fn evaluate(check: &ReadinessCheck, ctx: &ReadinessContext) -> CheckResult {
    let outcome = match catch_unwind(AssertUnwindSafe(|| check.evaluate(ctx))) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            warn!(check = %check.name, error = %e, "readiness check errored");
            CheckOutcome::fail(format!("check failed to run: {e:#}"))
        }
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(check = %check.name, panic = %msg, "readiness check panicked");
            CheckOutcome::fail(format!("check panicked: {msg}"))
        }
    };
    debug!(check = %check.name, passed = outcome.passed, details = %outcome.details, "readiness check");

    CheckResult {
        name: check.name.clone(),
        category: check.category,
        severity: check.severity,
        required: check.required,
        passed: outcome.passed,
        details: outcome.details,
    }
}
