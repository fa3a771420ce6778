//! The monitor context and its cycle.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tracing::{error, info, warn};

use warden_alert::{AlertEngine, AlertEvent, DispatchReport};
use warden_api::Fleet;
use warden_core::{HealthRecord, HealthStatus, ServiceDefinition, WardenConfig};
use warden_deps::{DependencyGraph, DependencyReport};
use warden_discovery::ServiceRegistry;
use warden_heal::{HealingController, HealingStats};
use warden_health::{BreakerRegistry, EngineOptions, HealthEngine, HttpProbe, Probe};
use warden_readiness::{ReadinessAggregator, ReadinessAssessment, ReadinessContext};

/// What one monitoring cycle did.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub services: usize,
    pub unhealthy: usize,
    pub alerts: Vec<AlertEvent>,
    pub dispatch: DispatchReport,
    pub dependencies: DependencyReport,
}

pub struct Monitor {
    config: WardenConfig,
    /// Directory relative paths in the readiness config resolve against.
    base_dir: PathBuf,
    registry: Arc<ServiceRegistry>,
    engine: HealthEngine,
    alerts: AlertEngine,
    healer: HealingController,
    readiness: ReadinessAggregator,
    dependencies: RwLock<DependencyReport>,
}

impl Monitor {
    /// Build every component from configuration with the HTTP probe.
    pub fn from_config(config: WardenConfig, base_dir: PathBuf) -> anyhow::Result<Self> {
        Self::with_probe(config, base_dir, Arc::new(HttpProbe))
    }

    pub fn with_probe(config: WardenConfig, base_dir: PathBuf, probe: Arc<dyn Probe>) -> anyhow::Result<Self> {
        let registry = Arc::new(ServiceRegistry::from_config(&config.discovery, &config.monitor));
        let engine = HealthEngine::new(
            probe,
            BreakerRegistry::from_config(&config.breaker),
            EngineOptions::from_config(&config),
        );
        let alerts = AlertEngine::from_config(&config)?;
        let healer = HealingController::from_config(Arc::clone(&registry), &config.healing);

        info!(
            manifests = config.discovery.manifests.len(),
            sinks = alerts.sink_names().len(),
            "monitor initialized"
        );

        Ok(Self {
            config,
            base_dir,
            registry,
            engine,
            alerts,
            healer,
            readiness: ReadinessAggregator::standard(),
            dependencies: RwLock::new(DependencyReport::default()),
        })
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &HealthEngine {
        &self.engine
    }

    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    /// discover → check_all → validate dependencies → alert.
    pub async fn run_cycle(&self) -> CycleSummary {
        let started = Instant::now();
        let services = self.registry.discover(false).await;

        let previous: BTreeMap<String, HealthStatus> = self
            .engine
            .snapshot()
            .await
            .into_iter()
            .map(|(name, record)| (name, record.status))
            .collect();
        let health = self.engine.check_all(&services).await;

        let report = DependencyGraph::build(&services).validate(&health);
        *self.dependencies.write().await = report.clone();

        let alerts = self.alerts.process_all(&health, &previous);
        let dispatch = self.alerts.dispatch(&alerts).await;

        let summary = CycleSummary {
            services: health.len(),
            unhealthy: health.values().filter(|r| r.status.is_failure()).count(),
            alerts,
            dispatch,
            dependencies: report,
        };
        info!(
            services = summary.services,
            unhealthy = summary.unhealthy,
            alerts = summary.alerts.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "monitoring cycle complete"
        );
        summary
    }

    /// Run cycles every `interval` until `shutdown` flips.
    ///
    /// Each cycle runs as its own task; a panicking cycle is logged and the
    /// loop carries on.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = interval.as_secs(), "monitoring loop started");

        loop {
            let monitor = Arc::clone(&self);
            if let Err(e) = tokio::spawn(async move { monitor.run_cycle().await }).await {
                error!(error = %e, "monitoring cycle failed");
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => {
                    info!("monitoring loop shutting down");
                    break;
                }
            }
        }
    }

    pub async fn readiness_context(&self) -> ReadinessContext {
        ReadinessContext {
            services: (*self.registry.current().await).clone(),
            health: self.engine.snapshot().await,
            dependencies: self.dependencies.read().await.clone(),
            sinks: self.config.alerts.sinks.clone(),
            config: self.config.readiness.clone(),
            base_dir: self.base_dir.clone(),
        }
    }

    pub async fn assess(&self) -> ReadinessAssessment {
        let ctx = self.readiness_context().await;
        self.readiness.run(&ctx)
    }

    /// Run the healing chain. `None` when the service is not registered.
    ///
    /// A successful heal closes the service's breaker so the next cycle
    /// probes it again.
    pub async fn heal(&self, service: &str) -> Option<bool> {
        if self.registry.discover(false).await.get(service).is_none() {
            warn!(%service, "heal requested for unknown service");
            return None;
        }
        let healed = self.healer.heal(service).await;
        if healed {
            self.engine.breakers().get(service).reset();
        }
        Some(healed)
    }

    pub fn healing_stats(&self) -> HealingStats {
        self.healer.stats()
    }
}

#[async_trait]
impl Fleet for Monitor {
    async fn services(&self) -> BTreeMap<String, ServiceDefinition> {
        (*self.registry.current().await).clone()
    }

    async fn health(&self) -> BTreeMap<String, HealthRecord> {
        self.engine.snapshot().await
    }

    async fn dependencies(&self) -> (BTreeMap<String, BTreeSet<String>>, DependencyReport) {
        let services = self.registry.current().await;
        let graph = DependencyGraph::build(&services);
        (graph.edges().clone(), self.dependencies.read().await.clone())
    }

    fn active_alerts(&self) -> Vec<AlertEvent> {
        self.alerts.active()
    }

    async fn readiness(&self) -> ReadinessAssessment {
        self.assess().await
    }

    async fn heal(&self, service: &str) -> Option<bool> {
        Monitor::heal(self, service).await
    }

    fn healing_stats(&self) -> HealingStats {
        Monitor::healing_stats(self)
    }
}
