//! Concurrent health check engine.
//!
//! Fans out one probe per service under a semaphore, isolates every probe
//! behind its own timeout, breaker and task, then folds the observations
//! into the stored health records in one write.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, info, warn};

use warden_core::{HealthRecord, HealthStatus, ServiceDefinition, WardenConfig, epoch_secs};

use crate::breaker::{BreakerRegistry, CircuitBreaker};
use crate::checker::{Probe, ProbeOutcome};
use crate::error::{BreakerError, CheckError, ProbeError};
use crate::uptime::UptimeWindow;

/// Tunables for the engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub timeout: Duration,
    pub max_concurrent_checks: usize,
    pub uptime_window: Duration,
}

impl EngineOptions {
    pub fn from_config(config: &WardenConfig) -> Self {
        Self {
            timeout: config.monitor.timeout(),
            max_concurrent_checks: config.monitor.max_concurrent_checks,
            uptime_window: config.monitor.uptime_window(),
        }
    }
}

/// Outcome of one probe attempt, before it is folded into a record.
#[derive(Debug)]
struct Observation {
    status: HealthStatus,
    error: Option<String>,
    response_time: Option<f64>,
}

#[derive(Default)]
struct Store {
    records: BTreeMap<String, HealthRecord>,
    uptime: HashMap<String, UptimeWindow>,
}

/// Probes services and keeps the latest health record for each.
pub struct HealthEngine {
    probe: Arc<dyn Probe>,
    breakers: Arc<BreakerRegistry>,
    limiter: Arc<Semaphore>,
    options: EngineOptions,
    store: RwLock<Store>,
}

impl HealthEngine {
    pub fn new(probe: Arc<dyn Probe>, breakers: BreakerRegistry, options: EngineOptions) -> Self {
        let permits = options.max_concurrent_checks.max(1);
        Self {
            probe,
            breakers: Arc::new(breakers),
            limiter: Arc::new(Semaphore::new(permits)),
            options,
            store: RwLock::new(Store::default()),
        }
    }

    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    /// Check a single service and store its new record.
    pub async fn check_one(&self, service: &ServiceDefinition) -> HealthRecord {
        let observations = self.observe_all(std::slice::from_ref(service)).await;
        let mut store = self.store.write().await;
        let now = epoch_secs();
        let mut record = HealthRecord::unknown(&service.name);
        for (name, obs) in observations {
            record = commit(&mut store, &self.options, &name, obs, now);
        }
        record
    }

    /// Check every service concurrently and return one record per service.
    ///
    /// Records for services missing from `services` are dropped.
    pub async fn check_all(
        &self,
        services: &BTreeMap<String, ServiceDefinition>,
    ) -> BTreeMap<String, HealthRecord> {
        let started = Instant::now();
        let list: Vec<ServiceDefinition> = services.values().cloned().collect();
        let observations = self.observe_all(&list).await;

        let now = epoch_secs();
        let mut store = self.store.write().await;
        store.records.retain(|name, _| services.contains_key(name));
        store.uptime.retain(|name, _| services.contains_key(name));

        let mut out = BTreeMap::new();
        for (name, obs) in observations {
            let record = commit(&mut store, &self.options, &name, obs, now);
            out.insert(name, record);
        }
        drop(store);

        let unhealthy = out.values().filter(|r| r.status.is_failure()).count();
        info!(
            services = out.len(),
            unhealthy,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "health check batch complete"
        );
        out
    }

    /// Current records, as of the last completed check.
    pub async fn snapshot(&self) -> BTreeMap<String, HealthRecord> {
        self.store.read().await.records.clone()
    }

    pub async fn get(&self, name: &str) -> Option<HealthRecord> {
        self.store.read().await.records.get(name).cloned()
    }

    async fn observe_all(&self, services: &[ServiceDefinition]) -> Vec<(String, Observation)> {
        let handles: Vec<_> = services
            .iter()
            .map(|service| {
                let service = service.clone();
                let probe = Arc::clone(&self.probe);
                let breaker = self.breakers.get(&service.name);
                let limiter = Arc::clone(&self.limiter);
                let timeout = self.options.timeout;
                let name = service.name.clone();
                let handle = tokio::spawn(async move {
                    // The semaphore is never closed, so acquire only fails on shutdown.
                    let _permit = limiter.acquire_owned().await.ok();
                    observe(probe.as_ref(), &breaker, &service, timeout).await
                });
                (name, handle)
            })
            .collect();

        let mut observations = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let obs = match handle.await {
                Ok(obs) => obs,
                Err(e) => {
                    warn!(service = %name, error = %e, "health probe task failed");
                    Observation {
                        status: HealthStatus::Unknown,
                        error: Some(format!("probe task failed: {e}")),
                        response_time: None,
                    }
                }
            };
            observations.push((name, obs));
        }
        observations
    }
}

async fn observe(
    probe: &dyn Probe,
    breaker: &CircuitBreaker,
    service: &ServiceDefinition,
    timeout: Duration,
) -> Observation {
    let started = Instant::now();
    let result = breaker
        .call(|| async {
            let outcome = match tokio::time::timeout(timeout, probe.probe(service, timeout)).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => return Err(CheckError::Internal(e)),
                Err(_) => ProbeOutcome::Failed(ProbeError::Timeout),
            };
            match outcome {
                ProbeOutcome::Failed(e) => Err(CheckError::Probe(e)),
                ok => Ok(ok.status()),
            }
        })
        .await;
    let response_time = Some(started.elapsed().as_secs_f64());

    let obs = match result {
        Ok(status) => Observation {
            status,
            error: None,
            response_time,
        },
        Err(BreakerError::Open { .. }) => Observation {
            status: HealthStatus::Unhealthy,
            error: Some("Circuit breaker open".to_string()),
            response_time: None,
        },
        Err(BreakerError::Operation(CheckError::Probe(e))) => Observation {
            status: HealthStatus::Unhealthy,
            error: Some(e.to_string()),
            response_time,
        },
        Err(BreakerError::Operation(CheckError::Internal(e))) => Observation {
            status: HealthStatus::Unknown,
            error: Some(e.to_string()),
            response_time,
        },
    };
    debug!(
        service = %service.name,
        status = %obs.status,
        error = obs.error.as_deref().unwrap_or(""),
        "service probed"
    );
    obs
}

/// Fold an observation into the stored record for `name`.
fn commit(
    store: &mut Store,
    options: &EngineOptions,
    name: &str,
    obs: Observation,
    now: u64,
) -> HealthRecord {
    let previous = store.records.get(name);
    let consecutive_failures = if obs.status.is_failure() {
        previous.map_or(0, |p| p.consecutive_failures).saturating_add(1)
    } else {
        0
    };
    let last_successful = if obs.status.is_up() {
        Some(now)
    } else {
        previous.and_then(|p| p.last_successful)
    };

    let window = store
        .uptime
        .entry(name.to_string())
        .or_insert_with(|| UptimeWindow::new(options.uptime_window));
    window.record(now, obs.status.is_up());

    let record = HealthRecord {
        service: name.to_string(),
        status: obs.status,
        last_check: now,
        response_time: obs.response_time,
        error: obs.error,
        consecutive_failures,
        last_successful,
        uptime_percentage: window.percentage(),
    };
    store.records.insert(name.to_string(), record.clone());
    record
}
