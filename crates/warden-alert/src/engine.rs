//! Alert evaluation, lifecycle tracking and dispatch.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use warden_core::{HealthRecord, HealthStatus, WardenConfig, epoch_secs};

use crate::error::AlertDispatchError;
use crate::event::{AlertEvent, AlertStatus, Severity};
use crate::rule::{AlertRule, RuleContext, builtin_rules};
use crate::sink::{AlertSink, build_sinks};

/// Outcome of one [`AlertEngine::dispatch`] call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    /// Number of (sink, event) deliveries that succeeded.
    pub delivered: usize,
    pub failures: Vec<AlertDispatchError>,
}

type AlertKey = (String, String);

pub struct AlertEngine {
    rules: Vec<AlertRule>,
    sinks: Vec<Arc<dyn AlertSink>>,
    dispatch_timeout: Duration,
    /// Currently firing alerts keyed by (rule, service).
    active: Mutex<BTreeMap<AlertKey, AlertEvent>>,
}

impl AlertEngine {
    pub fn new(rules: Vec<AlertRule>, sinks: Vec<Arc<dyn AlertSink>>, dispatch_timeout: Duration) -> Self {
        Self {
            rules,
            sinks,
            dispatch_timeout,
            active: Mutex::new(BTreeMap::new()),
        }
    }

    /// Built-in rules and configured sinks.
    pub fn from_config(config: &WardenConfig) -> anyhow::Result<Self> {
        let rules = builtin_rules(&config.alerts, config.monitor.max_consecutive_failures);
        let sinks = build_sinks(&config.alerts.sinks)?;
        Ok(Self::new(
            rules,
            sinks,
            Duration::from_secs(config.alerts.dispatch_timeout_seconds),
        ))
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.name().to_string()).collect()
    }

    /// Every enabled rule whose condition holds for this record.
    ///
    /// Pure: no lifecycle state is read or written.
    pub fn evaluate(&self, record: &HealthRecord, previous_status: Option<HealthStatus>) -> Vec<AlertEvent> {
        let ctx = RuleContext::new(record, previous_status);
        let now = epoch_secs();
        self.rules
            .iter()
            .filter(|rule| rule.enabled && rule.condition.matches(&ctx))
            .map(|rule| AlertEvent {
                rule: rule.name.clone(),
                service: record.service.clone(),
                severity: rule.severity,
                message: rule.render(record),
                triggered_at: now,
                resolved_at: None,
                status: AlertStatus::Active,
            })
            .collect()
    }

    /// Evaluate one record against the lifecycle state.
    ///
    /// Returns newly fired alerts and resolutions of alerts whose condition
    /// no longer holds. Alerts already active are not emitted again. Info
    /// alerts are one-shot notifications and never become active.
    pub fn process(&self, record: &HealthRecord, previous_status: Option<HealthStatus>) -> Vec<AlertEvent> {
        let fired = self.evaluate(record, previous_status);
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        let mut out = Vec::new();

        for event in &fired {
            if event.severity == Severity::Info {
                out.push(event.clone());
                continue;
            }
            let key = (event.rule.clone(), event.service.clone());
            if !active.contains_key(&key) {
                active.insert(key, event.clone());
                out.push(event.clone());
            }
        }

        let cleared: Vec<AlertKey> = active
            .keys()
            .filter(|(rule, service)| {
                service == &record.service && !fired.iter().any(|e| &e.rule == rule)
            })
            .cloned()
            .collect();
        for key in cleared {
            if let Some(event) = active.remove(&key) {
                out.push(resolve(event));
            }
        }

        out
    }

    /// Process a whole snapshot. Alerts for services no longer present in
    /// `health` are resolved.
    pub fn process_all(
        &self,
        health: &BTreeMap<String, HealthRecord>,
        previous: &BTreeMap<String, HealthStatus>,
    ) -> Vec<AlertEvent> {
        let mut out = Vec::new();
        for (name, record) in health {
            out.extend(self.process(record, previous.get(name).copied()));
        }

        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        let orphaned: Vec<AlertKey> = active
            .keys()
            .filter(|(_, service)| !health.contains_key(service))
            .cloned()
            .collect();
        for key in orphaned {
            if let Some(event) = active.remove(&key) {
                out.push(resolve(event));
            }
        }

        if !out.is_empty() {
            info!(events = out.len(), active = active.len(), "alerts processed");
        }
        out
    }

    /// Currently active alerts, most severe first.
    pub fn active(&self) -> Vec<AlertEvent> {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        let mut events: Vec<AlertEvent> = active.values().cloned().collect();
        events.sort_by(|a, b| a.severity.cmp(&b.severity).then(a.service.cmp(&b.service)));
        events
    }

    /// Deliver events to every sink.
    ///
    /// Each sink runs as its own task; each delivery has its own timeout.
    /// Failures are collected in the report and never returned as errors.
    pub async fn dispatch(&self, events: &[AlertEvent]) -> DispatchReport {
        let mut report = DispatchReport::default();
        if events.is_empty() || self.sinks.is_empty() {
            return report;
        }

        let mut handles = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            let sink = Arc::clone(sink);
            let events = events.to_vec();
            let timeout = self.dispatch_timeout;
            let name = sink.name().to_string();
            let handle = tokio::spawn(async move {
                let mut results = Vec::with_capacity(events.len());
                for event in &events {
                    let result = match tokio::time::timeout(timeout, sink.send(event)).await {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => Err(format!("{e:#}")),
                        Err(_) => Err(format!("timed out after {}s", timeout.as_secs_f64())),
                    };
                    results.push((event.rule.clone(), event.service.clone(), result));
                }
                results
            });
            handles.push((name, handle));
        }

        for (sink, handle) in handles {
            match handle.await {
                Ok(results) => {
                    for (rule, service, result) in results {
                        match result {
                            Ok(()) => report.delivered += 1,
                            Err(reason) => report.failures.push(AlertDispatchError {
                                sink: sink.clone(),
                                rule,
                                service,
                                reason,
                            }),
                        }
                    }
                }
                Err(e) => {
                    for event in events {
                        report.failures.push(AlertDispatchError {
                            sink: sink.clone(),
                            rule: event.rule.clone(),
                            service: event.service.clone(),
                            reason: format!("sink task failed: {e}"),
                        });
                    }
                }
            }
        }

        for failure in &report.failures {
            warn!(sink = %failure.sink, rule = %failure.rule, service = %failure.service, reason = %failure.reason, "alert delivery failed");
        }
        debug!(delivered = report.delivered, failed = report.failures.len(), "alert dispatch complete");
        report
    }
}

fn resolve(mut event: AlertEvent) -> AlertEvent {
    event.status = AlertStatus::Resolved;
    event.resolved_at = Some(epoch_secs());
    event
}
