//! The standard readiness battery.

use warden_core::{HealthStatus, ServiceCategory, ServiceDefinition};

use crate::check::{CheckCategory, CheckOutcome, CheckSeverity, ReadinessCheck, ReadinessContext};

/// All standard checks, in evaluation order.
pub fn standard_checks() -> Vec<ReadinessCheck> {
    use CheckCategory::*;
    use CheckSeverity::*;

    vec![
        ReadinessCheck::new("critical_services_healthy", Infrastructure, Critical, true, |ctx| {
            Ok(services_up(ctx, |s| s.critical, "critical"))
        }),
        ReadinessCheck::new("datastores_healthy", Infrastructure, High, true, |ctx| {
            Ok(services_up(ctx, |s| s.category == ServiceCategory::Datastore, "datastore"))
        }),
        ReadinessCheck::new("api_services_healthy", Api, High, true, |ctx| {
            Ok(services_up(ctx, |s| s.category == ServiceCategory::ApiService, "API"))
        }),
        ReadinessCheck::new("dependencies_resolved", Integration, Critical, true, |ctx| {
            Ok(empty_or_list(&ctx.dependencies.missing, "all dependencies resolve"))
        }),
        ReadinessCheck::new("no_dependency_cycles", Integration, High, true, |ctx| {
            let cycles: Vec<String> = ctx.dependencies.circular.iter().map(|c| c.join(" -> ")).collect();
            Ok(empty_or_list(&cycles, "dependency graph is acyclic"))
        }),
        ReadinessCheck::new("dependencies_healthy", Integration, Medium, false, |ctx| {
            Ok(empty_or_list(&ctx.dependencies.unhealthy, "all dependencies healthy"))
        }),
        ReadinessCheck::new("monitoring_present", Monitoring, Medium, false, |ctx| {
            let monitors: Vec<&str> = ctx
                .services
                .values()
                .filter(|s| s.category == ServiceCategory::Monitoring)
                .map(|s| s.name.as_str())
                .collect();
            Ok(if monitors.is_empty() {
                CheckOutcome::fail("no monitoring service registered")
            } else {
                CheckOutcome::pass(format!("monitoring: {}", monitors.join(", ")))
            })
        }),
        ReadinessCheck::new("alert_sinks_configured", Monitoring, Medium, false, |ctx| {
            Ok(if ctx.sinks.is_empty() {
                CheckOutcome::fail("no alert sinks configured")
            } else {
                CheckOutcome::pass(format!("{} alert sink(s) configured", ctx.sinks.len()))
            })
        }),
        ReadinessCheck::new("sink_endpoints_encrypted", Security, High, false, |ctx| {
            let plain: Vec<String> = ctx
                .sinks
                .iter()
                .filter_map(|s| s.url())
                .filter(|url| !url.starts_with("https://"))
                .map(str::to_string)
                .collect();
            Ok(empty_or_list(&plain, "all sink endpoints use https"))
        }),
        ReadinessCheck::new("resource_limits_defined", Security, Medium, false, |ctx| {
            let unbounded: Vec<String> = ctx
                .services
                .values()
                .filter(|s| s.resources.as_ref().is_none_or(|r| r.is_empty()))
                .map(|s| s.name.clone())
                .collect();
            Ok(empty_or_list(&unbounded, "all services declare resource limits"))
        }),
        ReadinessCheck::new("response_time_budget", Performance, High, false, |ctx| {
            let budget = ctx.config.latency_budget_seconds;
            let slow: Vec<String> = ctx
                .health
                .values()
                .filter_map(|r| r.response_time.filter(|t| *t > budget).map(|t| format!("{} ({t:.2}s)", r.service)))
                .collect();
            Ok(empty_or_list(&slow, format!("all responses within {budget}s")))
        }),
        ReadinessCheck::new("uptime_target", Performance, Medium, false, |ctx| {
            let target = ctx.config.uptime_target_percent;
            let below: Vec<String> = ctx
                .health
                .values()
                .filter(|r| r.uptime_percentage < target)
                .map(|r| format!("{} ({:.1}%)", r.service, r.uptime_percentage))
                .collect();
            Ok(empty_or_list(&below, format!("all services at or above {target}% uptime")))
        }),
        ReadinessCheck::new("operational_docs_present", Documentation, Low, false, |ctx| {
            let missing: Vec<String> = ctx
                .config
                .documentation_paths
                .iter()
                .filter(|p| !ctx.base_dir.join(p).exists())
                .map(|p| p.display().to_string())
                .collect();
            Ok(empty_or_list(&missing, "operational documentation present"))
        }),
    ]
}

/// Pass when every selected service is HEALTHY or DEGRADED.
///
/// A service without a health record counts as unknown.
fn services_up(ctx: &ReadinessContext, select: impl Fn(&ServiceDefinition) -> bool, label: &str) -> CheckOutcome {
    let mut total = 0;
    let mut down = Vec::new();
    for service in ctx.services.values().filter(|s| select(s)) {
        total += 1;
        let status = ctx
            .health
            .get(&service.name)
            .map(|r| r.status)
            .unwrap_or(HealthStatus::Unknown);
        if !status.is_up() {
            down.push(format!("{} ({status})", service.name));
        }
    }
    if down.is_empty() {
        CheckOutcome::pass(format!("{total} {label} service(s) up"))
    } else {
        CheckOutcome::fail(format!("{label} services down: {}", down.join(", ")))
    }
}

fn empty_or_list(problems: &[String], ok: impl Into<String>) -> CheckOutcome {
    if problems.is_empty() {
        CheckOutcome::pass(ok)
    } else {
        CheckOutcome::fail(problems.join(", "))
    }
}
