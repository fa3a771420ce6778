//! Prometheus text exposition format.

use std::collections::BTreeMap;
use std::fmt::Write;

use warden_core::HealthRecord;
use warden_heal::HealingStats;

/// Render per-service health gauges and healing counters.
pub fn render_prometheus(health: &BTreeMap<String, HealthRecord>, healing: &HealingStats, active_alerts: usize) -> String {
    let mut out = String::new();

    gauge(&mut out, "warden_service_up", "1 when the service is healthy or degraded.", health, |r| {
        Some(if r.status.is_up() { "1".into() } else { "0".into() })
    });
    gauge(&mut out, "warden_service_response_time_seconds", "Latency of the last probe.", health, |r| {
        r.response_time.map(|t| format!("{t:.4}"))
    });
    gauge(&mut out, "warden_service_uptime_percent", "Rolling uptime percentage.", health, |r| {
        Some(format!("{:.2}", r.uptime_percentage))
    });
    gauge(
        &mut out,
        "warden_service_consecutive_failures",
        "Consecutive failed checks.",
        health,
        |r| Some(r.consecutive_failures.to_string()),
    );

    out.push_str("# HELP warden_service_status Current status, one series per service.\n");
    out.push_str("# TYPE warden_service_status gauge\n");
    for r in health.values() {
        let _ = writeln!(
            out,
            "warden_service_status{{service=\"{}\",status=\"{}\"}} 1",
            escape_label(&r.service),
            r.status
        );
    }

    counter(&mut out, "warden_healing_attempts_total", "Healing invocations.", healing.attempts);
    counter(&mut out, "warden_healing_successes_total", "Healing invocations that succeeded.", healing.successes);
    counter(&mut out, "warden_healing_failures_total", "Healing invocations that exhausted every strategy.", healing.failures);

    out.push_str("# HELP warden_active_alerts Currently active alerts.\n");
    out.push_str("# TYPE warden_active_alerts gauge\n");
    let _ = writeln!(out, "warden_active_alerts {active_alerts}");

    out
}

fn gauge(
    out: &mut String,
    name: &str,
    help: &str,
    health: &BTreeMap<String, HealthRecord>,
    value: impl Fn(&HealthRecord) -> Option<String>,
) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} gauge");
    for r in health.values() {
        if let Some(v) = value(r) {
            let _ = writeln!(out, "{name}{{service=\"{}\"}} {v}", escape_label(&r.service));
        }
    }
}

/// Label values escape backslash, double quote and line feed.
fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn counter(out: &mut String, name: &str, help: &str, value: u64) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {value}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::HealthStatus;

    #[test]
    fn renders_every_family() {
        let mut api = HealthRecord::unknown("api");
        api.status = HealthStatus::Healthy;
        api.response_time = Some(0.125);
        let mut db = HealthRecord::unknown("db");
        db.status = HealthStatus::Unhealthy;
        db.consecutive_failures = 4;
        db.uptime_percentage = 50.0;
        let health = BTreeMap::from([("api".to_string(), api), ("db".to_string(), db)]);
        let stats = HealingStats {
            attempts: 3,
            successes: 2,
            failures: 1,
        };

        let text = render_prometheus(&health, &stats, 2);
        assert!(text.contains("warden_service_up{service=\"api\"} 1\n"));
        assert!(text.contains("warden_service_up{service=\"db\"} 0\n"));
        assert!(text.contains("warden_service_response_time_seconds{service=\"api\"} 0.1250\n"));
        assert!(!text.contains("warden_service_response_time_seconds{service=\"db\"}"));
        assert!(text.contains("warden_service_uptime_percent{service=\"db\"} 50.00\n"));
        assert!(text.contains("warden_service_consecutive_failures{service=\"db\"} 4\n"));
        assert!(text.contains("warden_service_status{service=\"db\",status=\"unhealthy\"} 1\n"));
        assert!(text.contains("# TYPE warden_healing_attempts_total counter\nwarden_healing_attempts_total 3\n"));
        assert!(text.contains("warden_healing_failures_total 1\n"));
        assert!(text.contains("warden_active_alerts 2\n"));
    }

    #[test]
    fn label_values_are_escaped() {
        let name = "odd\"svc\\x\ny";
        let health = BTreeMap::from([(name.to_string(), HealthRecord::unknown(name))]);
        let text = render_prometheus(&health, &HealingStats::default(), 0);
        assert!(text.contains(r#"warden_service_up{service="odd\"svc\\x\ny"} 0"#), "{text}");
        assert!(text.contains(r#"warden_service_status{service="odd\"svc\\x\ny",status="unknown"} 1"#));
        assert!(!text.contains("x\ny"));
    }
}
