//! Healing controller: per-service strategy chains.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::{error, info, warn};

use warden_core::config::{HealingConfig, StrategyKind};
use warden_discovery::ServiceRegistry;

use crate::error::{HealingError, HealingResult};
use crate::strategy::{HealStrategy, build_strategy};

/// Counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealingStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
}

pub struct HealingController {
    registry: Arc<ServiceRegistry>,
    default_chain: Vec<Arc<dyn HealStrategy>>,
    overrides: HashMap<String, Vec<Arc<dyn HealStrategy>>>,
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
}

impl HealingController {
    pub fn new(registry: Arc<ServiceRegistry>, default_chain: Vec<Arc<dyn HealStrategy>>) -> Self {
        Self {
            registry,
            default_chain,
            overrides: HashMap::new(),
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Use `chain` instead of the default for one service.
    pub fn with_override(mut self, service: &str, chain: Vec<Arc<dyn HealStrategy>>) -> Self {
        self.overrides.insert(service.to_string(), chain);
        self
    }

    pub fn from_config(registry: Arc<ServiceRegistry>, config: &HealingConfig) -> Self {
        let mut controller = Self::new(registry, build_chain(&config.strategies, config));
        for (service, kinds) in &config.overrides {
            controller
                .overrides
                .insert(service.clone(), build_chain(kinds, config));
        }
        controller
    }

    /// Strategy names that would be tried for `service`, in order.
    pub fn chain_for(&self, service: &str) -> Vec<String> {
        self.chain(service).iter().map(|s| s.name().to_string()).collect()
    }

    fn chain(&self, service: &str) -> &[Arc<dyn HealStrategy>] {
        self.overrides.get(service).unwrap_or(&self.default_chain)
    }

    pub fn stats(&self) -> HealingStats {
        HealingStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Try to bring `service` back. Returns whether some strategy succeeded.
    pub async fn heal(&self, service: &str) -> bool {
        match self.try_heal(service).await {
            Ok(strategy) => {
                info!(%service, %strategy, "service healed");
                true
            }
            Err(e) => {
                error!(%service, error = %e, "healing failed");
                false
            }
        }
    }

    /// Walk the chain; the first success wins. Returns the winning strategy name.
    pub async fn try_heal(&self, service: &str) -> HealingResult<String> {
        let Some(definition) = self.registry.get(service).await else {
            return Err(HealingError::UnknownService(service.to_string()));
        };
        let chain = self.chain(service);
        if chain.is_empty() {
            return Err(HealingError::NoStrategies {
                service: service.to_string(),
            });
        }

        self.attempts.fetch_add(1, Ordering::Relaxed);
        let mut failures = Vec::new();
        for strategy in chain {
            match strategy.restart(&definition).await {
                Ok(()) => {
                    self.successes.fetch_add(1, Ordering::Relaxed);
                    return Ok(strategy.name().to_string());
                }
                Err(e) => {
                    warn!(%service, strategy = strategy.name(), error = %e, "healing strategy failed");
                    failures.push(format!("{}: {e:#}", strategy.name()));
                }
            }
        }

        self.failures.fetch_add(1, Ordering::Relaxed);
        Err(HealingError::Exhausted {
            service: service.to_string(),
            failures,
        })
    }
}

fn build_chain(kinds: &[StrategyKind], config: &HealingConfig) -> Vec<Arc<dyn HealStrategy>> {
    kinds.iter().map(|k| build_strategy(*k, config)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use warden_core::ServiceDefinition;
    use warden_discovery::{ManifestDefaults, ManifestSource};

    struct Fake {
        name: &'static str,
        succeed: bool,
        calls: AtomicUsize,
    }

    impl Fake {
        fn new(name: &'static str, succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                succeed,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HealStrategy for Fake {
        fn name(&self) -> &str {
            self.name
        }

        async fn restart(&self, _service: &ServiceDefinition) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(())
            } else {
                anyhow::bail!("{} refused", self.name)
            }
        }
    }

    fn chain(fakes: &[&Arc<Fake>]) -> Vec<Arc<dyn HealStrategy>> {
        fakes
            .iter()
            .map(|f| Arc::clone(*f) as Arc<dyn HealStrategy>)
            .collect()
    }

    async fn registry() -> Arc<ServiceRegistry> {
        let manifest = "services:\n  api:\n    ports: [\"8000:8000\"]\n  worker:\n    ports: [\"9000\"]\n";
        let registry = ServiceRegistry::new(
            vec![ManifestSource::Inline {
                name: "test".to_string(),
                content: manifest.to_string(),
            }],
            ManifestDefaults::default(),
            Duration::from_secs(300),
        );
        registry.discover(true).await;
        Arc::new(registry)
    }

    #[tokio::test]
    async fn first_success_stops_the_chain() {
        let a = Fake::new("container", false);
        let b = Fake::new("orchestrator", true);
        let c = Fake::new("process", true);
        let controller = HealingController::new(registry().await, chain(&[&a, &b, &c]));

        assert!(controller.heal("api").await);
        assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 0));
        assert_eq!(
            controller.stats(),
            HealingStats {
                attempts: 1,
                successes: 1,
                failures: 0
            }
        );
    }

    #[tokio::test]
    async fn exhausted_chain_is_not_retried() {
        let a = Fake::new("container", false);
        let b = Fake::new("process", false);
        let controller = HealingController::new(registry().await, chain(&[&a, &b]));

        match controller.try_heal("api").await {
            Err(HealingError::Exhausted { failures, .. }) => {
                assert_eq!(failures, vec!["container: container refused", "process: process refused"]);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!((a.calls(), b.calls()), (1, 1));
        assert!(!controller.heal("api").await);
        assert_eq!(controller.stats().failures, 2);
    }

    #[tokio::test]
    async fn unknown_service_is_rejected() {
        let a = Fake::new("container", true);
        let controller = HealingController::new(registry().await, chain(&[&a]));
        assert!(!controller.heal("ghost").await);
        assert_eq!(a.calls(), 0);
        assert_eq!(controller.stats().attempts, 0);
    }

    #[tokio::test]
    async fn overrides_replace_the_default_chain() {
        let default = Fake::new("container", true);
        let special = Fake::new("process", true);
        let controller = HealingController::new(registry().await, chain(&[&default]))
            .with_override("worker", chain(&[&special]));

        assert!(controller.heal("worker").await);
        assert_eq!((default.calls(), special.calls()), (0, 1));
        assert_eq!(controller.chain_for("worker"), vec!["process"]);
        assert_eq!(controller.chain_for("api"), vec!["container"]);
    }

    #[tokio::test]
    async fn config_builds_chains_with_stubs() {
        let config = HealingConfig {
            overrides: HashMap::from([("worker".to_string(), vec![StrategyKind::Process])]),
            ..Default::default()
        };
        let controller = HealingController::from_config(registry().await, &config);
        assert_eq!(controller.chain_for("api"), vec!["container", "orchestrator", "process"]);
        assert_eq!(controller.chain_for("worker"), vec!["process"]);

        // No process command configured: the stub fails.
        assert!(!controller.heal("worker").await);
    }
}
